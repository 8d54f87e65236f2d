use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHUNK_FRAMES, DEFAULT_ENERGY_THRESHOLD, DEFAULT_FRAME_TIME_LEN, DEFAULT_SAMPLE_RATE_HZ,
};
use crate::error::{CaptureError, FormatError};

/// Sample encodings the capture core understands. Everything else coming out
/// of a device is rejected at stream-open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    I8,
    I16,
    I32,
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::I8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I32 | SampleFormat::F32 => 4,
        }
    }
}

impl TryFrom<cpal::SampleFormat> for SampleFormat {
    type Error = FormatError;

    fn try_from(format: cpal::SampleFormat) -> Result<Self, Self::Error> {
        match format {
            cpal::SampleFormat::I8 => Ok(SampleFormat::I8),
            cpal::SampleFormat::I16 => Ok(SampleFormat::I16),
            cpal::SampleFormat::I32 => Ok(SampleFormat::I32),
            cpal::SampleFormat::F32 => Ok(SampleFormat::F32),
            other => Err(FormatError::Unsupported {
                format: format!("{:?}", other),
            }),
        }
    }
}

impl From<SampleFormat> for cpal::SampleFormat {
    fn from(format: SampleFormat) -> Self {
        match format {
            SampleFormat::I8 => cpal::SampleFormat::I8,
            SampleFormat::I16 => cpal::SampleFormat::I16,
            SampleFormat::I32 => cpal::SampleFormat::I32,
            SampleFormat::F32 => cpal::SampleFormat::F32,
        }
    }
}

/// Parameters of one capture session. Fixed at `init` and immutable for the
/// session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_frames: usize,
    pub sample_format: SampleFormat,
    /// Mean-square energy cutoff separating silent from active windows.
    pub energy_threshold: f32,
    /// Length of one energy-analysis window, in seconds.
    pub frame_time_len: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE_HZ,
            channels: 1,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            sample_format: SampleFormat::I16,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
            frame_time_len: DEFAULT_FRAME_TIME_LEN,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::Config("sample_rate must be non-zero".into()));
        }
        if self.channels == 0 {
            return Err(CaptureError::Config("channels must be >= 1".into()));
        }
        if self.chunk_frames == 0 {
            return Err(CaptureError::Config("chunk_frames must be non-zero".into()));
        }
        if self.frame_time_len <= 0.0 {
            return Err(CaptureError::Config("frame_time_len must be positive".into()));
        }
        Ok(())
    }

    /// Samples in one energy-analysis window.
    pub fn analysis_window_frames(&self) -> usize {
        (self.sample_rate as f32 * self.frame_time_len) as usize
    }

    /// Bytes in one interleaved frame across all channels.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }

    pub fn chunk_duration_secs(&self) -> f32 {
        self.chunk_frames as f32 / self.sample_rate as f32
    }
}
