use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::VecDeque;
use std::time::Duration;

use sonocap_foundation::DeviceError;

/// Blocking source of raw interleaved sample bytes.
///
/// One `read` blocks until exactly `frames` frames are available and yields
/// them, or reports end-of-availability with `None` once the underlying
/// stream has closed. No partial chunk is ever exposed.
pub trait ChunkSource: Send {
    fn read(&mut self, frames: usize) -> Result<Option<Vec<u8>>, DeviceError>;
}

/// Chunk source backed by the bounded channel the stream callback feeds.
///
/// The callback pushes whatever buffer sizes the host hands it; this side
/// re-slices the byte stream into exact frame counts.
pub struct StreamChunkSource {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    frame_bytes: usize,
    timeout: Duration,
}

impl StreamChunkSource {
    pub fn new(rx: Receiver<Vec<u8>>, frame_bytes: usize, timeout: Duration) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            frame_bytes,
            timeout,
        }
    }
}

impl ChunkSource for StreamChunkSource {
    fn read(&mut self, frames: usize) -> Result<Option<Vec<u8>>, DeviceError> {
        let needed = frames * self.frame_bytes;
        while self.pending.len() < needed {
            match self.rx.recv_timeout(self.timeout) {
                Ok(bytes) => self.pending.extend(bytes),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(DeviceError::NoData {
                        duration: self.timeout,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if !self.pending.is_empty() {
                        tracing::debug!(
                            buffered = self.pending.len(),
                            "stream closed; discarding partial chunk bytes"
                        );
                        self.pending.clear();
                    }
                    return Ok(None);
                }
            }
        }
        Ok(Some(self.pending.drain(..needed).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn reslices_callback_buffers_to_exact_frames() {
        let (tx, rx) = bounded(8);
        // 2-byte frames; callback hands over uneven buffer sizes
        tx.send(vec![0u8; 3]).unwrap();
        tx.send(vec![1u8; 5]).unwrap();
        let mut source = StreamChunkSource::new(rx, 2, Duration::from_millis(100));

        let chunk = source.read(3).unwrap().unwrap();
        assert_eq!(chunk.len(), 6);
        let chunk = source.read(1).unwrap().unwrap();
        assert_eq!(chunk, vec![1, 1]);
    }

    #[test]
    fn disconnect_ends_stream_and_drops_partial() {
        let (tx, rx) = bounded(8);
        tx.send(vec![0u8; 3]).unwrap();
        drop(tx);
        let mut source = StreamChunkSource::new(rx, 2, Duration::from_millis(100));

        // 3 buffered bytes cannot satisfy 2 full frames; the partial is
        // discarded, not exposed
        assert!(source.read(2).unwrap().is_none());
        assert!(source.read(1).unwrap().is_none());
    }

    #[test]
    fn starvation_times_out() {
        let (_tx, rx) = bounded::<Vec<u8>>(8);
        let mut source = StreamChunkSource::new(rx, 2, Duration::from_millis(20));
        let err = source.read(1).unwrap_err();
        assert!(matches!(err, DeviceError::NoData { .. }));
    }
}
