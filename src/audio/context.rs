// Platform audio graph: context, gain node, and one-shot source nodes
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use super::buffer::DecodedBuffer;
use crate::error::Result;
use crate::sound::SoundId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

impl ContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        }
    }
}

/// Persistent volume control shared between the manager and the output.
///
/// Clones refer to the same level, so a write is heard by a source that is
/// already playing.
#[derive(Debug, Clone)]
pub struct GainNode {
    level: Arc<Mutex<f32>>,
}

impl GainNode {
    pub fn new() -> Self {
        Self {
            level: Arc::new(Mutex::new(1.0)),
        }
    }

    pub fn set_level(&self, level: f32) {
        *self.level.lock() = level;
    }

    pub fn level(&self) -> f32 {
        *self.level.lock()
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoked once when a source plays through to the end of its buffer
pub type EndedHook = Box<dyn FnOnce() + Send + 'static>;

/// A started one-shot source.
pub trait SourceNode: Send {
    /// Silence and disconnect the source. Its ended hook will not fire afterwards.
    fn stop(&mut self);
}

/// Connection to the platform's audio output.
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;

    fn resume(&self) -> Result<()>;

    /// Seconds on the audio clock, monotonic while running
    fn current_time(&self) -> f64;

    /// Decode an encoded asset into a buffer at this context's rate
    fn decode(&self, id: &SoundId, bytes: Vec<u8>, extension: &str) -> Result<DecodedBuffer>;

    /// Create a gain node wired to the destination
    fn create_gain(&self) -> Result<GainNode>;

    /// Start playing `buffer` through `gain` immediately
    fn start_source(
        &self,
        buffer: Arc<DecodedBuffer>,
        gain: &GainNode,
        on_ended: EndedHook,
    ) -> Result<Box<dyn SourceNode>>;

    fn close(&self);
}

/// Capability to open an audio context.
pub trait AudioHost: Send + Sync {
    /// Fails with `AudioError::CapabilityAbsent` when there is no audio output at all
    fn open_context(&self) -> Result<Arc<dyn AudioContext>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_clones_share_level() {
        let gain = GainNode::new();
        let output_side = gain.clone();
        assert_eq!(output_side.level(), 1.0);

        gain.set_level(0.25);
        assert_eq!(output_side.level(), 0.25);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ContextState::Running.as_str(), "running");
        assert_eq!(
            serde_json::to_string(&ContextState::Suspended).unwrap(),
            "\"suspended\""
        );
    }
}
