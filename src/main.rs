use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    countdown_audio::init_logging();
    countdown_audio::run(countdown_audio::cli::Cli::parse()).await
}
