pub mod config;
pub mod constants;
pub mod error;
pub mod state;

pub use config::{CaptureConfig, SampleFormat};
pub use constants::{
    DEFAULT_CHUNK_FRAMES, DEFAULT_ENERGY_THRESHOLD, DEFAULT_FRAME_TIME_LEN, DEFAULT_SAMPLE_RATE_HZ,
};
pub use error::{CaptureError, DeviceError, FormatError, SegmentationError, StateError};
pub use state::{SessionState, SessionStateCell};
