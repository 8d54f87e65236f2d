use std::time::Duration;
use thiserror::Error;

use crate::state::SessionState;

/// Umbrella error for the capture core. The four inner kinds map to the
/// distinct failure categories callers are expected to branch on.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WAV persistence error: {0}")]
    Persist(String),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Hardware input failures. Fatal to the capture session; never retried
/// automatically so a disconnected device is not masked.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No matching input device: {name:?}")]
    NotFound { name: Option<String> },

    #[error("Device disconnected")]
    Disconnected,

    #[error("No audio data for {duration:?}")]
    NoData { duration: Duration },

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Device enumeration error: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("Stream error: {0}")]
    Stream(#[from] cpal::StreamError),
}

/// Operation invoked in the wrong lifecycle state. Rejected synchronously,
/// no retry.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Already initialized")]
    AlreadyInitialized,

    #[error("Operation '{operation}' requires init() first")]
    NotInitialized { operation: &'static str },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("Capture loop already running")]
    AlreadyRunning,
}

/// Raw sample buffer cannot be decoded. Fatal for that decode call only.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unsupported sample encoding: {format}")]
    Unsupported { format: String },

    #[error("Raw buffer of {len} bytes is not a multiple of the {frame_bytes}-byte frame")]
    Misaligned { len: usize, frame_bytes: usize },
}

/// Signal too short for the requested analysis window. Callers treat this as
/// "insufficient data", not a crash.
#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Signal of {frames} frames is shorter than one {frame_size}-sample window")]
    InsufficientData { frames: usize, frame_size: usize },

    #[error("Analysis window size must be non-zero")]
    ZeroWindow,
}
