use sonocap_foundation::SegmentationError;

use crate::signal::Signal;

/// Energy-based silence classifier.
///
/// Partitions a signal into non-overlapping windows of `frame_size` samples
/// along the frame axis and compares each window's mean-square energy against
/// the threshold, per channel. A window is active if any channel clears the
/// threshold; a signal is silent only if no window is active.
#[derive(Debug, Clone)]
pub struct EnergyDetector {
    frame_size: usize,
    threshold: f32,
}

impl EnergyDetector {
    pub fn new(frame_size: usize, threshold: f32) -> Self {
        Self {
            frame_size,
            threshold,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Classify a whole signal. Trailing samples short of one window are
    /// discarded from classification; a signal shorter than one window is an
    /// error ("insufficient data").
    pub fn is_silent(&self, signal: &Signal) -> Result<bool, SegmentationError> {
        if self.frame_size == 0 {
            return Err(SegmentationError::ZeroWindow);
        }
        let num_windows = signal.frames() / self.frame_size;
        if num_windows == 0 {
            return Err(SegmentationError::InsufficientData {
                frames: signal.frames(),
                frame_size: self.frame_size,
            });
        }

        let mut active_windows = 0usize;
        for ch in 0..signal.channels() {
            let ch_samples: Vec<f32> = signal.channel(ch).collect();
            for window in ch_samples.chunks_exact(self.frame_size) {
                let energy = mean_square(window);
                if energy >= self.threshold {
                    active_windows += 1;
                }
            }
        }

        tracing::trace!(
            frames = signal.frames(),
            windows = num_windows,
            active = active_windows,
            threshold = self.threshold,
            "energy classification"
        );

        Ok(active_windows == 0)
    }
}

fn mean_square(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f32 = window.iter().map(|&s| s * s).sum();
    sum / window.len() as f32
}
