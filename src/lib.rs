// Countdown Audio - alert sound playback for the countdown timer
// Module declarations
pub mod assets;
pub mod audio;
pub mod cli;
pub mod error;
pub mod settings;
pub mod sound;
pub mod state;

#[cfg(test)]
mod test_utils;

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audio::{CpalHost, Progress, ProgressCallback};
use cli::Cli;
use settings::AlertSettings;
use state::AppState;

pub use audio::AudioPlaybackManager;
pub use error::AudioError;
pub use sound::SoundId;

/// Install the log subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run(cli: Cli) -> Result<()> {
    info!("Starting countdown-audio v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = AlertSettings::load(&cli.settings_dir)?;
    cli.apply(&mut settings);
    if cli.save {
        settings.save(&cli.settings_dir)?;
    }

    let app = AppState::new(Arc::new(CpalHost), settings.clone());
    app.audio.initialize().await;

    if cli.preload_all {
        app.audio.preload_all().await;
    } else {
        app.audio.preload(&settings.sound).await;
    }
    info!(cached = ?app.audio.get_state().cached_ids, "Sounds ready");

    let done = Arc::new(Notify::new());
    let finished = done.clone();
    let on_progress: ProgressCallback = Arc::new(move |progress: Progress| {
        if progress.is_complete() {
            println!("\rplayback complete        ");
            finished.notify_one();
        } else {
            print!(
                "\r{:5.1}%  {:.2}s / {:.2}s",
                progress.percent, progress.elapsed, progress.duration
            );
            let _ = std::io::stdout().flush();
        }
    });

    app.play_alert(Some(on_progress)).await;
    if !app.audio.is_playing() {
        warn!(sound = %settings.sound, "Nothing is playing");
        return Ok(());
    }

    tokio::select! {
        _ = done.notified() => {}
        _ = tokio::signal::ctrl_c() => {
            app.audio.stop();
            println!();
            info!("Playback interrupted");
        }
    }

    app.audio.close();
    Ok(())
}
