// Sound identifiers for alert presets
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an alert sound.
///
/// `None` is the "no sound" choice. Names this build does not ship are kept
/// as `Unsupported` so a settings file naming a removed preset still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SoundId {
    None,
    #[default]
    AscendingChime,
    GentleBell,
    DigitalBeep,
    SoftMarimba,
    ClassicAlarm,
    Unsupported(String),
}

impl SoundId {
    pub const PRESETS: [SoundId; 5] = [
        SoundId::AscendingChime,
        SoundId::GentleBell,
        SoundId::DigitalBeep,
        SoundId::SoftMarimba,
        SoundId::ClassicAlarm,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SoundId::None => "none",
            SoundId::AscendingChime => "ascending-chime",
            SoundId::GentleBell => "gentle-bell",
            SoundId::DigitalBeep => "digital-beep",
            SoundId::SoftMarimba => "soft-marimba",
            SoundId::ClassicAlarm => "classic-alarm",
            SoundId::Unsupported(name) => name,
        }
    }

    /// Only presets have assets, get cached, or get played
    pub fn is_preset(&self) -> bool {
        !matches!(self, SoundId::None | SoundId::Unsupported(_))
    }

    /// Relative asset path, e.g. `sounds/gentle-bell.mp3`
    pub fn asset_path(&self, extension: &str) -> Option<String> {
        if !self.is_preset() {
            return None;
        }
        Some(format!("sounds/{}.{}", self.as_str(), extension))
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SoundId {
    fn from(name: &str) -> Self {
        match name.trim() {
            "none" | "" => SoundId::None,
            "ascending-chime" => SoundId::AscendingChime,
            "gentle-bell" => SoundId::GentleBell,
            "digital-beep" => SoundId::DigitalBeep,
            "soft-marimba" => SoundId::SoftMarimba,
            "classic-alarm" => SoundId::ClassicAlarm,
            other => SoundId::Unsupported(other.to_string()),
        }
    }
}

impl From<String> for SoundId {
    fn from(name: String) -> Self {
        SoundId::from(name.as_str())
    }
}

impl From<SoundId> for String {
    fn from(id: SoundId) -> Self {
        id.as_str().to_string()
    }
}
