// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod buffer;
pub mod context;
pub mod decoder;
pub mod manager;
pub mod output;
pub mod resample;

pub use buffer::DecodedBuffer;
pub use context::{AudioContext, AudioHost, ContextState, GainNode, SourceNode};
pub use manager::{AudioPlaybackManager, ManagerOptions, ManagerState, Progress, ProgressCallback};
pub use output::CpalHost;
