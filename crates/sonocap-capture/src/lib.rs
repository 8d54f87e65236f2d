pub mod assembler;
pub mod controller;
pub mod device;
pub mod queue;
pub mod source;
pub mod stats;
pub mod wav;

// Public API
pub use assembler::{CaptureResult, ListenOptions, SegmentAssembler};
pub use controller::CaptureController;
pub use device::InputStreamHandle;
pub use queue::DeliveryQueue;
pub use source::{ChunkSource, StreamChunkSource};
pub use stats::CaptureStats;
