//! Default capture and analysis constants.
//!
//! [`crate::CaptureConfig::default`] is built from these, so the literals
//! live in exactly one place.

/// Default sample rate for capture and analysis (Hz).
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;

/// Default frames per hardware chunk read.
/// At 16kHz, 1024 frames = 64ms per blocking read.
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// Default length of one energy-analysis window, in seconds.
pub const DEFAULT_FRAME_TIME_LEN: f32 = 0.1;

/// Default mean-square energy threshold below which a window is silent.
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 1e-3;

/// Chunk duration at the defaults, in milliseconds (derived constant).
pub const DEFAULT_CHUNK_DURATION_MS: f32 =
    (DEFAULT_CHUNK_FRAMES as f32 * 1000.0) / DEFAULT_SAMPLE_RATE_HZ as f32;
