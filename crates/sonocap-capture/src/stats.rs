use std::sync::atomic::AtomicU64;

/// Counters for one capture session, shared between the stream callback,
/// the capture thread, and embedders.
#[derive(Debug, Default)]
pub struct CaptureStats {
    /// Callback buffers handed off to the chunk source.
    pub chunks_captured: AtomicU64,
    /// Callback buffers dropped because the transport channel was full.
    pub callback_drops: AtomicU64,
    /// Segments completed by the capture loop.
    pub segments_completed: AtomicU64,
}
