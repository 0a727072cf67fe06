// Error types for the audio subsystem
use thiserror::Error;

use crate::sound::SoundId;

#[derive(Error, Debug)]
pub enum AudioError {
    /// The platform has no audio output at all
    #[error("Audio output is not available: {0}")]
    CapabilityAbsent(String),

    /// `initialize` has not produced a context yet
    #[error("Audio is not initialized")]
    NotInitialized,

    #[error("Failed to fetch sound '{id}': {reason}")]
    Fetch { id: SoundId, reason: String },

    #[error("Failed to decode sound '{id}': {reason}")]
    Decode { id: SoundId, reason: String },

    /// The context refused to leave the suspended state
    #[error("Failed to resume audio context: {0}")]
    Resume(String),

    #[error("Failed to start playback: {0}")]
    Start(String),

    #[error("Audio output error: {0}")]
    Output(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    pub fn fetch(id: &SoundId, reason: impl Into<String>) -> Self {
        Self::Fetch { id: id.clone(), reason: reason.into() }
    }

    pub fn decode(id: &SoundId, reason: impl Into<String>) -> Self {
        Self::Decode { id: id.clone(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
