// Application state management
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::assets;
use crate::audio::{AudioHost, AudioPlaybackManager, ProgressCallback};
use crate::settings::AlertSettings;

/// Built once at start-up and handed to whatever needs to make a sound
#[derive(Clone)]
pub struct AppState {
    pub audio: AudioPlaybackManager,
    pub settings: Arc<Mutex<AlertSettings>>,
}

impl AppState {
    pub fn new(host: Arc<dyn AudioHost>, settings: AlertSettings) -> Self {
        let assets = assets::from_location(&settings.assets, &settings.extension);
        let audio = AudioPlaybackManager::with_options(host, assets, settings.manager_options());
        Self::with_manager(audio, settings)
    }

    pub fn with_manager(audio: AudioPlaybackManager, settings: AlertSettings) -> Self {
        Self {
            audio,
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    /// Play the configured alert, e.g. when the countdown reaches zero
    pub async fn play_alert(&self, on_progress: Option<ProgressCallback>) {
        let (sound, volume) = {
            let settings = self.settings.lock();
            (settings.sound.clone(), settings.volume())
        };
        self.audio.play(&sound, volume, on_progress).await;
    }

    /// Replace the settings and apply the volume to anything already playing
    pub fn update_settings(&self, settings: AlertSettings) {
        let volume = settings.volume();
        *self.settings.lock() = settings;
        self.audio.set_volume(volume);
        debug!(volume, "Alert settings updated");
    }
}
