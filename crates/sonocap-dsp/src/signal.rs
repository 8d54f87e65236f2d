/// A normalized multi-channel signal: interleaved f32 samples in [-1, 1]
/// with logical shape (frames, channels). Moved, never shared, between
/// pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    channels: u16,
}

impl Signal {
    /// Wrap interleaved samples. The sample count must divide evenly into
    /// whole frames.
    pub fn from_interleaved(samples: Vec<f32>, channels: u16) -> Self {
        debug_assert!(channels >= 1);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        Self { samples, channels }
    }

    pub fn empty(channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            channels,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.frames() as f32 / sample_rate as f32
    }

    /// Interleaved sample view, channel-major within each frame.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Iterator over one channel's samples across all frames.
    pub fn channel(&self, ch: u16) -> impl Iterator<Item = f32> + '_ {
        debug_assert!(ch < self.channels);
        self.samples
            .iter()
            .skip(ch as usize)
            .step_by(self.channels as usize)
            .copied()
    }

    /// Append another signal of the same channel layout.
    pub fn append(&mut self, other: Signal) {
        assert_eq!(
            self.channels, other.channels,
            "cannot append signals with different channel counts"
        );
        self.samples.extend(other.samples);
    }

    pub fn into_interleaved(self) -> Vec<f32> {
        self.samples
    }
}
