// Command line options for the alert player
use clap::Parser;
use std::path::PathBuf;

use crate::settings::AlertSettings;
use crate::sound::SoundId;

#[derive(Debug, Parser)]
#[command(name = "countdown-audio", version, about = "Play a countdown alert sound")]
pub struct Cli {
    /// Sound to play (ascending-chime, gentle-bell, digital-beep, soft-marimba, classic-alarm, none)
    #[arg(long)]
    pub sound: Option<String>,

    /// Volume, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,

    /// Directory or http(s) origin that serves `sounds/<name>.<ext>`
    #[arg(long, env = "COUNTDOWN_AUDIO_ASSETS")]
    pub assets: Option<String>,

    /// Asset file extension
    #[arg(long)]
    pub extension: Option<String>,

    /// Where settings.json lives
    #[arg(long, env = "COUNTDOWN_AUDIO_SETTINGS", default_value = ".")]
    pub settings_dir: PathBuf,

    /// Write the resulting settings back to settings.json
    #[arg(long)]
    pub save: bool,

    /// Decode every preset before playing
    #[arg(long)]
    pub preload_all: bool,
}

impl Cli {
    /// Command line values win over the settings file
    pub fn apply(&self, settings: &mut AlertSettings) {
        if let Some(sound) = &self.sound {
            settings.sound = SoundId::from(sound.as_str());
        }
        if let Some(volume) = self.volume {
            settings.volume = volume;
        }
        if let Some(assets) = &self.assets {
            settings.assets = assets.clone();
        }
        if let Some(extension) = &self.extension {
            settings.extension = extension.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "countdown-audio",
            "--sound",
            "digital-beep",
            "--volume",
            "15",
            "--assets",
            "https://timer.example.com",
        ]);
        let mut settings = AlertSettings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.sound, SoundId::DigitalBeep);
        assert_eq!(settings.volume, 15);
        assert_eq!(settings.assets, "https://timer.example.com");
        assert_eq!(settings.extension, "mp3");
    }

    #[test]
    fn test_volume_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["countdown-audio", "--volume", "101"]).is_err());
    }
}
