// Decoded PCM held in memory for the lifetime of the manager

/// Interleaved f32 samples for one sound asset.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

impl DecodedBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Silent buffer of the given length, mostly useful in tests
    pub fn silence(duration_secs: f64, sample_rate: u32, channels: usize) -> Self {
        let frames = (duration_secs * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; frames * channels.max(1)], sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample for `channel` of `frame`, upmixing mono and folding extra
    /// output channels onto the last source channel
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let ch = channel.min(self.channels - 1);
        self.samples
            .get(frame * self.channels + ch)
            .copied()
            .unwrap_or(0.0)
    }

    /// Sample for output `channel` on a device with `out_channels`.
    /// A mono device gets the average of every source channel.
    pub fn output_sample(&self, frame: usize, channel: usize, out_channels: usize) -> f32 {
        if out_channels == 1 && self.channels > 1 {
            let start = frame * self.channels;
            return self
                .samples
                .get(start..start + self.channels)
                .map_or(0.0, |f| f.iter().sum::<f32>() / self.channels as f32);
        }
        self.sample(frame, channel)
    }
}
