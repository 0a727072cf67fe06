// Audio output using cpal
// The stream lives on its own thread; voices reach the render callback through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::buffer::DecodedBuffer;
use super::context::{AudioContext, AudioHost, ContextState, EndedHook, GainNode, SourceNode};
use super::{decoder, resample};
use crate::error::{AudioError, Result};
use crate::sound::SoundId;

const COMMAND_QUEUE_SIZE: usize = 64;
const RESUME_TIMEOUT: Duration = Duration::from_secs(2);

type CommandProducer = ringbuf::HeapProd<VoiceCommand>;
type CommandConsumer = ringbuf::HeapCons<VoiceCommand>;

struct Voice {
    id: u64,
    buffer: Arc<DecodedBuffer>,
    gain: GainNode,
    position: usize,
    on_ended: Option<EndedHook>,
}

enum VoiceCommand {
    Start(Voice),
    Stop(u64),
}

enum StreamCommand {
    Play(mpsc::SyncSender<std::result::Result<(), String>>),
    Close,
}

struct Shared {
    frames_rendered: AtomicU64,
    sample_rate: AtomicU32,
    state: Mutex<ContextState>,
}

/// Opens contexts on the default cpal output device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalHost;

impl AudioHost for CpalHost {
    fn open_context(&self) -> Result<Arc<dyn AudioContext>> {
        Ok(Arc::new(CpalContext::open()?))
    }
}

pub struct CpalContext {
    shared: Arc<Shared>,
    commands: Arc<Mutex<CommandProducer>>,
    control: Mutex<Option<mpsc::Sender<StreamCommand>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    next_voice: AtomicU64,
}

impl CpalContext {
    /// Create the output stream on a dedicated thread and wait until it is ready
    pub fn open() -> Result<Self> {
        let shared = Arc::new(Shared {
            frames_rendered: AtomicU64::new(0),
            sample_rate: AtomicU32::new(0),
            state: Mutex::new(ContextState::Suspended),
        });

        let rb = HeapRb::<VoiceCommand>::new(COMMAND_QUEUE_SIZE);
        let (producer, consumer) = rb.split();

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let (control_tx, control_rx) = mpsc::channel::<StreamCommand>();

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || run_output_thread(consumer, thread_shared, ready_tx, control_rx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                return Err(AudioError::Output(
                    "Audio thread exited before the stream was ready".to_string(),
                ))
            }
        }

        Ok(Self {
            shared,
            commands: Arc::new(Mutex::new(producer)),
            control: Mutex::new(Some(control_tx)),
            thread: Mutex::new(Some(handle)),
            next_voice: AtomicU64::new(1),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate.load(Ordering::SeqCst)
    }
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        *self.shared.state.lock()
    }

    fn resume(&self) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        {
            let control = self.control.lock();
            let sender = control
                .as_ref()
                .ok_or_else(|| AudioError::Resume("Context is closed".to_string()))?;
            sender
                .send(StreamCommand::Play(reply_tx))
                .map_err(|_| AudioError::Resume("Audio thread is gone".to_string()))?;
        }

        match reply_rx.recv_timeout(RESUME_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AudioError::Resume(e)),
            Err(_) => Err(AudioError::Resume("Timed out waiting for the audio thread".to_string())),
        }
    }

    fn current_time(&self) -> f64 {
        let rate = self.sample_rate();
        if rate == 0 {
            return 0.0;
        }
        self.shared.frames_rendered.load(Ordering::Relaxed) as f64 / rate as f64
    }

    fn decode(&self, id: &SoundId, bytes: Vec<u8>, extension: &str) -> Result<DecodedBuffer> {
        let buffer =
            decoder::decode_bytes(bytes, Some(extension)).map_err(|e| AudioError::decode(id, e))?;
        resample::to_rate(buffer, self.sample_rate()).map_err(|e| AudioError::decode(id, e))
    }

    fn create_gain(&self) -> Result<GainNode> {
        if self.state() == ContextState::Closed {
            return Err(AudioError::Output("Context is closed".to_string()));
        }
        Ok(GainNode::new())
    }

    fn start_source(
        &self,
        buffer: Arc<DecodedBuffer>,
        gain: &GainNode,
        on_ended: EndedHook,
    ) -> Result<Box<dyn SourceNode>> {
        if self.state() == ContextState::Closed {
            return Err(AudioError::Start("Context is closed".to_string()));
        }

        let id = self.next_voice.fetch_add(1, Ordering::SeqCst);
        let cancelled = Arc::new(AtomicBool::new(false));
        let hook_cancelled = cancelled.clone();
        let hook: EndedHook = Box::new(move || {
            if !hook_cancelled.load(Ordering::SeqCst) {
                on_ended();
            }
        });

        let voice = Voice {
            id,
            buffer,
            gain: gain.clone(),
            position: 0,
            on_ended: Some(hook),
        };

        if self.commands.lock().try_push(VoiceCommand::Start(voice)).is_err() {
            return Err(AudioError::Start("Voice command queue is full".to_string()));
        }
        debug!(voice = id, "Source started");

        Ok(Box::new(CpalSource {
            id,
            cancelled,
            commands: self.commands.clone(),
        }))
    }

    fn close(&self) {
        if let Some(control) = self.control.lock().take() {
            let _ = control.send(StreamCommand::Close);
        }
        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                error!("Audio thread panicked");
            }
        }
        *self.shared.state.lock() = ContextState::Closed;
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        self.close();
    }
}

struct CpalSource {
    id: u64,
    cancelled: Arc<AtomicBool>,
    commands: Arc<Mutex<CommandProducer>>,
}

impl SourceNode for CpalSource {
    fn stop(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.commands.lock().try_push(VoiceCommand::Stop(self.id)).is_err() {
            warn!(voice = self.id, "Voice command queue is full, source keeps playing");
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_output_thread(
    consumer: CommandConsumer,
    shared: Arc<Shared>,
    ready: mpsc::SyncSender<Result<()>>,
    control: mpsc::Receiver<StreamCommand>,
) {
    let stream = match build_output(consumer, shared.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // Autoplay-style start: a stream that refuses to play stays suspended until resumed
    let state = match stream.play() {
        Ok(()) => ContextState::Running,
        Err(e) => {
            warn!("Output stream did not start, context is suspended: {}", e);
            ContextState::Suspended
        }
    };
    *shared.state.lock() = state;
    let _ = ready.send(Ok(()));

    while let Ok(command) = control.recv() {
        match command {
            StreamCommand::Play(reply) => {
                let result = stream.play().map_err(|e| format!("Failed to start stream: {}", e));
                if result.is_ok() {
                    *shared.state.lock() = ContextState::Running;
                }
                let _ = reply.send(result);
            }
            StreamCommand::Close => break,
        }
    }

    let _ = stream.pause();
    debug!("Audio thread stopped");
}

fn build_output(consumer: CommandConsumer, shared: Arc<Shared>) -> Result<Stream> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::CapabilityAbsent("No output device available".to_string()))?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Output(format!("Failed to get default output config: {}", e)))?;

    let sample_format = config.sample_format();
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    shared.sample_rate.store(sample_rate, Ordering::SeqCst);

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        sample_rate,
        channels,
        "Opening audio output"
    );

    let mixer = Mixer {
        commands: consumer,
        voice: None,
        channels,
        shared: shared.clone(),
    };
    let stream_config: StreamConfig = config.into();

    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer, shared),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer, shared),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer, shared),
        format => Err(AudioError::Output(format!(
            "Unsupported sample format: {:?}",
            format
        ))),
    }
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut mixer: Mixer,
    shared: Arc<Shared>,
) -> Result<Stream> {
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mixer.render(data);
            },
            move |err| {
                error!("Audio output error: {}", err);
                let mut state = shared.state.lock();
                if *state == ContextState::Running {
                    *state = ContextState::Suspended;
                }
            },
            None,
        )
        .map_err(|e| AudioError::Output(format!("Failed to build output stream: {}", e)))
}

/// Render-side state, owned by the cpal callback
struct Mixer {
    commands: CommandConsumer,
    voice: Option<Voice>,
    channels: usize,
    shared: Arc<Shared>,
}

impl Mixer {
    fn render<T: cpal::SizedSample + cpal::FromSample<f32>>(&mut self, data: &mut [T]) {
        while let Some(command) = self.commands.try_pop() {
            match command {
                // A newer voice replaces the old one without firing its ended hook
                VoiceCommand::Start(voice) => self.voice = Some(voice),
                VoiceCommand::Stop(id) => {
                    if self.voice.as_ref().map(|v| v.id) == Some(id) {
                        self.voice = None;
                    }
                }
            }
        }

        let channels = self.channels.max(1);
        let frames = data.len() / channels;

        match self.voice.as_mut() {
            Some(voice) => {
                let level = voice.gain.level();
                let total = voice.buffer.frames();
                for frame in data.chunks_mut(channels) {
                    if voice.position < total {
                        for (ch, out) in frame.iter_mut().enumerate() {
                            let sample = voice.buffer.output_sample(voice.position, ch, channels);
                            *out = T::from_sample(sample * level);
                        }
                        voice.position += 1;
                    } else {
                        for out in frame.iter_mut() {
                            *out = T::from_sample(0.0f32);
                        }
                    }
                }

                if voice.position >= total {
                    if let Some(on_ended) = voice.on_ended.take() {
                        on_ended();
                    }
                    self.voice = None;
                }
            }
            None => {
                for out in data.iter_mut() {
                    *out = T::from_sample(0.0f32);
                }
            }
        }

        self.shared
            .frames_rendered
            .fetch_add(frames as u64, Ordering::Relaxed);
    }
}
