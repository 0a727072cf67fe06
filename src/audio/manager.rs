// Alert sound playback manager
// Owns the audio context, the decoded buffer cache, and at most one playing session

use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::buffer::DecodedBuffer;
use super::context::{AudioContext, AudioHost, ContextState, GainNode, SourceNode};
use crate::assets::AssetSource;
use crate::error::{AudioError, Result};
use crate::sound::SoundId;

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// One progress report.
///
/// The completion report is always `(100, 0, 0)`; callers should treat
/// `percent == 100` as "finished" and ignore the other two fields then.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub percent: f64,
    pub elapsed: f64,
    pub duration: f64,
}

impl Progress {
    pub const COMPLETE: Progress = Progress {
        percent: 100.0,
        elapsed: 0.0,
        duration: 0.0,
    };

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// How often a playing session reports progress
    pub progress_interval: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Diagnostic snapshot returned by [`AudioPlaybackManager::get_state`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerState {
    pub initialized: bool,
    pub context_state: Option<ContextState>,
    pub cached_ids: Vec<SoundId>,
    pub active_session: Option<SoundId>,
}

/// Delivers one session's reports until it is closed.
/// Closing waits for a report in flight, so none arrive after teardown returns.
struct Reporter {
    callback: ProgressCallback,
    // Reentrant so a callback may stop playback itself
    open: ReentrantMutex<Cell<bool>>,
}

impl Reporter {
    fn new(callback: ProgressCallback) -> Arc<Self> {
        Arc::new(Self {
            callback,
            open: ReentrantMutex::new(Cell::new(true)),
        })
    }

    /// Returns false once the session has been torn down
    fn report(&self, progress: Progress) -> bool {
        let open = self.open.lock();
        if open.get() {
            (self.callback)(progress);
        }
        open.get()
    }

    fn close(&self) {
        self.open.lock().set(false);
    }
}

struct Session {
    token: u64,
    id: SoundId,
    source: Box<dyn SourceNode>,
    reporter: Option<Arc<Reporter>>,
    watcher: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct State {
    context: Option<Arc<dyn AudioContext>>,
    gain: Option<GainNode>,
    buffers: HashMap<SoundId, Arc<OnceCell<Arc<DecodedBuffer>>>>,
    session: Option<Session>,
    /// Bumped by every play and stop; a play only starts if it is still current
    generation: u64,
}

struct Inner {
    host: Arc<dyn AudioHost>,
    assets: Arc<dyn AssetSource>,
    options: ManagerOptions,
    state: Mutex<State>,
}

/// Handle to the application's single playback manager.
///
/// Build one at start-up and clone the handle wherever sounds are played.
/// No public operation returns an error: failures are logged and degrade to
/// silence so the timer keeps working.
#[derive(Clone)]
pub struct AudioPlaybackManager {
    inner: Arc<Inner>,
}

impl AudioPlaybackManager {
    pub fn new(host: Arc<dyn AudioHost>, assets: Arc<dyn AssetSource>) -> Self {
        Self::with_options(host, assets, ManagerOptions::default())
    }

    pub fn with_options(
        host: Arc<dyn AudioHost>,
        assets: Arc<dyn AssetSource>,
        options: ManagerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                assets,
                options,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Create the audio context and gain node, or resume a suspended context.
    ///
    /// Call from a user-initiated action. Safe to call repeatedly.
    pub async fn initialize(&self) {
        if let Some(context) = self.context() {
            if context.state() == ContextState::Suspended {
                if let Err(e) = resume_context(context).await {
                    warn!(error = %e, "Audio context is still suspended");
                }
            }
            return;
        }

        let host = self.inner.host.clone();
        let opened = tokio::task::spawn_blocking(move || {
            let context = host.open_context()?;
            let gain = context.create_gain()?;
            Ok::<_, AudioError>((context, gain))
        })
        .await;

        let (context, gain) = match opened {
            Ok(Ok(pair)) => pair,
            Ok(Err(AudioError::CapabilityAbsent(reason))) => {
                error!(%reason, "Audio is not available, alert sounds are disabled");
                return;
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to open audio output");
                return;
            }
            Err(e) => {
                error!(error = %e, "Audio initialization task failed");
                return;
            }
        };

        let context = {
            let mut state = self.inner.state.lock();
            if let Some(existing) = state.context.clone() {
                // A concurrent initialize won; keep the first context
                drop(state);
                context.close();
                existing
            } else {
                state.context = Some(context.clone());
                state.gain = Some(gain);
                info!(state = context.state().as_str(), "Audio context created");
                context
            }
        };

        if context.state() == ContextState::Suspended {
            if let Err(e) = resume_context(context).await {
                warn!(error = %e, "Audio context created but suspended");
            }
        }
    }

    /// Fetch and decode `id` into the cache ahead of playback
    pub async fn preload(&self, id: &SoundId) {
        if !id.is_preset() {
            debug!(sound = %id, "Not a preset, nothing to preload");
            return;
        }
        if self.context().is_none() {
            warn!(sound = %id, "Audio is not initialized, skipping preload");
            return;
        }

        if let Err(e) = self.load(id).await {
            error!(sound = %id, error = %e, "Failed to preload sound");
        }
    }

    /// Preload every preset, one after another
    pub async fn preload_all(&self) {
        for id in SoundId::PRESETS.iter() {
            self.preload(id).await;
        }
    }

    /// Play `id` at `volume` (0-100), replacing whatever is playing.
    ///
    /// `on_progress` receives `(0, 0, duration)` at start, increasing
    /// percentages while playing, and `(100, 0, 0)` once on natural completion.
    pub async fn play(&self, id: &SoundId, volume: i32, on_progress: Option<ProgressCallback>) {
        if *id == SoundId::None {
            return;
        }
        if !id.is_preset() {
            warn!(sound = %id, "Unsupported sound, nothing played");
            return;
        }
        let Some(context) = self.context() else {
            warn!(sound = %id, "Audio is not initialized, nothing played");
            return;
        };

        let token = self.inner.supersede();

        if context.state() == ContextState::Suspended {
            debug!(sound = %id, "Resuming audio context before playback");
            if let Err(e) = resume_context(context.clone()).await {
                error!(sound = %id, error = %e, "Could not resume audio, nothing played");
                return;
            }
        }

        let buffer = match self.load(id).await {
            Ok(buffer) => buffer,
            Err(e) => {
                error!(sound = %id, error = %e, "Failed to load sound, nothing played");
                return;
            }
        };

        let duration = buffer.duration();
        let reporter = on_progress.map(Reporter::new);
        let (ended_tx, ended_rx) = oneshot::channel::<()>();
        let started_at = {
            let mut state = self.inner.state.lock();
            if state.generation != token {
                debug!(sound = %id, "Superseded while loading, not starting");
                return;
            }
            let Some(gain) = state.gain.clone() else {
                warn!(sound = %id, "Audio was closed while loading, nothing played");
                return;
            };

            gain.set_level(volume_to_gain(volume));
            let started_at = context.current_time();
            let source = match context.start_source(
                buffer,
                &gain,
                Box::new(move || {
                    let _ = ended_tx.send(());
                }),
            ) {
                Ok(source) => source,
                Err(e) => {
                    error!(sound = %id, error = %e, "Failed to start playback");
                    return;
                }
            };

            state.session = Some(Session {
                token,
                id: id.clone(),
                source,
                reporter: reporter.clone(),
                watcher: None,
            });
            started_at
        };
        info!(sound = %id, volume, duration, "Playing sound");

        if let Some(reporter) = &reporter {
            reporter.report(Progress {
                percent: 0.0,
                elapsed: 0.0,
                duration,
            });
        }

        let watcher = tokio::spawn(watch_session(
            Arc::downgrade(&self.inner),
            token,
            context,
            started_at,
            duration,
            reporter,
            ended_rx,
        ));

        let mut state = self.inner.state.lock();
        match state.session.as_mut() {
            Some(session) if session.token == token => session.watcher = Some(watcher),
            _ => watcher.abort(),
        }
    }

    /// Abort the current session without a completion report
    pub fn stop(&self) {
        self.inner.supersede();
    }

    /// Change the volume of the persistent gain node, audible immediately
    pub fn set_volume(&self, volume: i32) {
        match self.inner.state.lock().gain.as_ref() {
            Some(gain) => gain.set_level(volume_to_gain(volume)),
            None => debug!("Audio is not initialized, volume not applied"),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    /// Stop playback and close the audio context. Cached buffers are kept.
    pub fn close(&self) {
        self.stop();
        let context = {
            let mut state = self.inner.state.lock();
            state.gain = None;
            state.context.take()
        };
        if let Some(context) = context {
            context.close();
            info!("Audio context closed");
        }
    }

    pub fn get_state(&self) -> ManagerState {
        let state = self.inner.state.lock();
        let cached_ids = SoundId::PRESETS
            .iter()
            .filter(|id| {
                state
                    .buffers
                    .get(*id)
                    .map_or(false, |cell| cell.initialized())
            })
            .cloned()
            .collect();

        ManagerState {
            initialized: state.context.is_some(),
            context_state: state.context.as_ref().map(|c| c.state()),
            cached_ids,
            active_session: state.session.as_ref().map(|s| s.id.clone()),
        }
    }

    fn context(&self) -> Option<Arc<dyn AudioContext>> {
        self.inner.state.lock().context.clone()
    }

    /// Cached buffer for `id`, fetching and decoding it on first use.
    /// Concurrent callers share one load; a failed load leaves the entry empty.
    async fn load(&self, id: &SoundId) -> Result<Arc<DecodedBuffer>> {
        let (cell, context) = {
            let mut state = self.inner.state.lock();
            let context = state.context.clone().ok_or(AudioError::NotInitialized)?;
            let cell = state.buffers.entry(id.clone()).or_default().clone();
            (cell, context)
        };

        let buffer = cell
            .get_or_try_init(move || async move {
                let bytes = self.inner.assets.fetch(id).await?;
                let extension = self.inner.assets.extension().to_string();
                let decode_id = id.clone();
                let buffer = tokio::task::spawn_blocking(move || {
                    context.decode(&decode_id, bytes, &extension)
                })
                .await
                .map_err(|e| AudioError::decode(id, e.to_string()))??;

                info!(sound = %id, duration = buffer.duration(), "Sound decoded and cached");
                Ok::<_, AudioError>(Arc::new(buffer))
            })
            .await?;

        Ok(buffer.clone())
    }
}

impl Inner {
    /// Invalidate pending plays and tear down the active session
    fn supersede(&self) -> u64 {
        let (generation, session) = {
            let mut state = self.state.lock();
            state.generation += 1;
            (state.generation, state.session.take())
        };
        if let Some(session) = session {
            teardown(session, false);
        }
        generation
    }

    /// End session `token` if it is still the active one
    fn finish(&self, token: u64, completed: bool) {
        let session = {
            let mut state = self.state.lock();
            match state.session.as_ref() {
                Some(session) if session.token == token => state.session.take(),
                _ => None,
            }
        };
        if let Some(session) = session {
            teardown(session, completed);
        }
    }
}

/// The one teardown path. Only natural completion sends the final report.
fn teardown(mut session: Session, completed: bool) {
    if let Some(watcher) = session.watcher.take() {
        watcher.abort();
    }
    session.source.stop();
    if let Some(reporter) = session.reporter.take() {
        if completed {
            reporter.report(Progress::COMPLETE);
        }
        reporter.close();
    }
    debug!(sound = %session.id, completed, "Session ended");
}

async fn watch_session(
    inner: Weak<Inner>,
    token: u64,
    context: Arc<dyn AudioContext>,
    started_at: f64,
    duration: f64,
    reporter: Option<Arc<Reporter>>,
    mut ended: oneshot::Receiver<()>,
) {
    let progress_interval = match inner.upgrade() {
        Some(inner) => inner.options.progress_interval,
        None => return,
    };

    let completed = match reporter {
        None => ended.await.is_ok(),
        Some(reporter) => {
            let mut ticker = tokio::time::interval(progress_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately
            ticker.tick().await;
            let mut last_percent = 0.0;

            loop {
                tokio::select! {
                    result = &mut ended => break result.is_ok(),
                    _ = ticker.tick() => {
                        let elapsed = (context.current_time() - started_at).max(0.0);
                        let percent = if duration > 0.0 {
                            (elapsed / duration * 100.0).min(100.0)
                        } else {
                            100.0
                        };
                        if percent >= 100.0 {
                            break true;
                        }
                        if percent > last_percent {
                            last_percent = percent;
                            if !reporter.report(Progress { percent, elapsed, duration }) {
                                return;
                            }
                        }
                    }
                }
            }
        }
    };

    // A dropped ended hook means the source went away without finishing
    if let Some(inner) = inner.upgrade() {
        inner.finish(token, completed);
    }
}

async fn resume_context(context: Arc<dyn AudioContext>) -> Result<()> {
    tokio::task::spawn_blocking(move || context.resume())
        .await
        .map_err(|e| AudioError::Resume(e.to_string()))?
}

/// Linear 0-100 to 0.0-1.0; out-of-range values pass through unchecked
fn volume_to_gain(volume: i32) -> f32 {
    volume as f32 / 100.0
}
