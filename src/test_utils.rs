//! Test doubles for the audio graph and asset origin.
//!
//! The fake context's clock follows tokio's (pausable) clock, so tests using
//! `start_paused = true` can step through a whole playback deterministically.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::assets::AssetSource;
use crate::audio::buffer::DecodedBuffer;
use crate::audio::context::{AudioContext, AudioHost, ContextState, EndedHook, GainNode, SourceNode};
use crate::audio::manager::{Progress, ProgressCallback};
use crate::error::{AudioError, Result};
use crate::sound::SoundId;

pub const FAKE_SAMPLE_RATE: u32 = 1000;

/// Hands out one shared [`FakeContext`], or reports that audio is absent
pub struct FakeHost {
    context: Option<Arc<FakeContext>>,
    pub opens: AtomicUsize,
}

impl FakeHost {
    pub fn new(context: Arc<FakeContext>) -> Arc<Self> {
        Arc::new(Self {
            context: Some(context),
            opens: AtomicUsize::new(0),
        })
    }

    pub fn absent() -> Arc<Self> {
        Arc::new(Self {
            context: None,
            opens: AtomicUsize::new(0),
        })
    }
}

impl AudioHost for FakeHost {
    fn open_context(&self) -> Result<Arc<dyn AudioContext>> {
        let context = self
            .context
            .clone()
            .ok_or_else(|| AudioError::CapabilityAbsent("no audio in tests".to_string()))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        context.reopen();
        Ok(context)
    }
}

pub struct FakeContext {
    epoch: Instant,
    state: Mutex<ContextState>,
    durations: Mutex<HashMap<SoundId, f64>>,
    gains: Mutex<Vec<GainNode>>,
    pub resume_fails: AtomicBool,
    pub start_fails: AtomicBool,
    pub resume_calls: AtomicUsize,
    pub decode_calls: AtomicUsize,
    pub starts: AtomicUsize,
    /// Sources started and neither stopped nor finished
    pub live_sources: Arc<AtomicUsize>,
}

impl FakeContext {
    pub fn new() -> Arc<Self> {
        Self::with_state(ContextState::Running)
    }

    pub fn suspended() -> Arc<Self> {
        Self::with_state(ContextState::Suspended)
    }

    fn with_state(state: ContextState) -> Arc<Self> {
        Arc::new(Self {
            epoch: Instant::now(),
            state: Mutex::new(state),
            durations: Mutex::new(HashMap::new()),
            gains: Mutex::new(Vec::new()),
            resume_fails: AtomicBool::new(false),
            start_fails: AtomicBool::new(false),
            resume_calls: AtomicUsize::new(0),
            decode_calls: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            live_sources: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Decoded length of `id`; sounds default to one second
    pub fn set_duration(&self, id: SoundId, seconds: f64) {
        self.durations.lock().insert(id, seconds);
    }

    pub fn set_state(&self, state: ContextState) {
        *self.state.lock() = state;
    }

    pub fn gains_created(&self) -> usize {
        self.gains.lock().len()
    }

    pub fn gain_level(&self) -> Option<f32> {
        self.gains.lock().last().map(|g| g.level())
    }

    fn reopen(&self) {
        let mut state = self.state.lock();
        if *state == ContextState::Closed {
            *state = ContextState::Running;
        }
    }
}

impl AudioContext for FakeContext {
    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    fn resume(&self) -> Result<()> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        if self.resume_fails.load(Ordering::SeqCst) {
            return Err(AudioError::Resume("autoplay policy".to_string()));
        }
        *self.state.lock() = ContextState::Running;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn decode(&self, id: &SoundId, bytes: Vec<u8>, _extension: &str) -> Result<DecodedBuffer> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        if bytes == b"corrupt" {
            return Err(AudioError::decode(id, "corrupt asset"));
        }
        let seconds = self.durations.lock().get(id).copied().unwrap_or(1.0);
        Ok(DecodedBuffer::silence(seconds, FAKE_SAMPLE_RATE, 1))
    }

    fn create_gain(&self) -> Result<GainNode> {
        let gain = GainNode::new();
        self.gains.lock().push(gain.clone());
        Ok(gain)
    }

    fn start_source(
        &self,
        buffer: Arc<DecodedBuffer>,
        _gain: &GainNode,
        on_ended: EndedHook,
    ) -> Result<Box<dyn SourceNode>> {
        if self.start_fails.load(Ordering::SeqCst) {
            return Err(AudioError::Start("device busy".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.live_sources.fetch_add(1, Ordering::SeqCst);

        let stopped = Arc::new(AtomicBool::new(false));
        let playback_stopped = stopped.clone();
        let live = self.live_sources.clone();
        let length = Duration::from_secs_f64(buffer.duration());
        tokio::spawn(async move {
            tokio::time::sleep(length).await;
            if !playback_stopped.swap(true, Ordering::SeqCst) {
                live.fetch_sub(1, Ordering::SeqCst);
                on_ended();
            }
        });

        Ok(Box::new(FakeSource {
            stopped,
            live: self.live_sources.clone(),
        }))
    }

    fn close(&self) {
        *self.state.lock() = ContextState::Closed;
    }
}

struct FakeSource {
    stopped: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
}

impl SourceNode for FakeSource {
    fn stop(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// In-memory asset origin with injectable failures and latency
#[derive(Default)]
pub struct FakeAssets {
    failing: Mutex<HashSet<SoundId>>,
    corrupt: Mutex<HashSet<SoundId>>,
    delays: Mutex<HashMap<SoundId, Duration>>,
    pub fetches: AtomicUsize,
}

impl FakeAssets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, id: SoundId, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(id);
        } else {
            set.remove(&id);
        }
    }

    pub fn set_corrupt(&self, id: SoundId) {
        self.corrupt.lock().insert(id);
    }

    pub fn set_delay(&self, id: SoundId, delay: Duration) {
        self.delays.lock().insert(id, delay);
    }
}

#[async_trait]
impl AssetSource for FakeAssets {
    async fn fetch(&self, id: &SoundId) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(id) {
            return Err(AudioError::fetch(id, "connection reset"));
        }
        if self.corrupt.lock().contains(id) {
            return Ok(b"corrupt".to_vec());
        }
        Ok(id.as_str().as_bytes().to_vec())
    }

    fn extension(&self) -> &str {
        "wav"
    }
}

/// Progress callback that records every report
pub fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<Progress>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let callback: ProgressCallback = Arc::new(move |progress: Progress| sink.lock().push(progress));
    (callback, calls)
}
