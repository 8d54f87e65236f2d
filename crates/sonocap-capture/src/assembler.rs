use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sonocap_dsp::{codec, EnergyDetector, Signal};
use sonocap_foundation::{CaptureConfig, CaptureError};

use crate::source::ChunkSource;
use crate::wav;

/// Below this nominal duration the dynamic path has no room for its
/// `target - 2` lower bound and capture falls back to fixed duration.
const MIN_DYNAMIC_SECONDS: f32 = 5.0;

/// Parameters for one capture cycle.
#[derive(Debug, Clone)]
pub struct ListenOptions {
    /// Nominal segment duration in seconds.
    pub seconds: f32,
    /// Select dynamic speech-completeness segmentation instead of a fixed
    /// duration (requires `seconds >= 5`).
    pub speech_completeness: bool,
    /// Fixed mode: classify the finished segment as mute. Dynamic mode:
    /// discard silent batches while searching for the segment anchor.
    pub mute_check: bool,
    pub save_wave: bool,
    /// Explicit output path; auto-generated from timestamp, channel count,
    /// and cycle id when absent.
    pub file_name: Option<PathBuf>,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            seconds: 5.0,
            speech_completeness: false,
            mute_check: false,
            save_wave: false,
            file_name: None,
        }
    }
}

/// One completed capture cycle.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub signal: Signal,
    pub is_mute: bool,
    pub saved_path: Option<PathBuf>,
}

/// Consumes chunks from a [`ChunkSource`] and assembles them into segments,
/// either of fixed duration or grown dynamically until trailing silence.
///
/// Strictly sequential; the cooperative stop flag is observed between chunk
/// reads and between batch boundaries, never mid-read.
pub struct SegmentAssembler<S: ChunkSource> {
    source: S,
    config: CaptureConfig,
    detector: EnergyDetector,
    stop: Arc<AtomicBool>,
    cycle_id: u64,
}

impl<S: ChunkSource> SegmentAssembler<S> {
    pub fn new(source: S, config: CaptureConfig, stop: Arc<AtomicBool>) -> Self {
        let detector = EnergyDetector::new(
            config.analysis_window_frames(),
            config.energy_threshold,
        );
        Self {
            source,
            config,
            detector,
            stop,
            cycle_id: 0,
        }
    }

    /// Run one capture cycle. Returns `None` when a stop request arrives
    /// before any content is captured (a normal idle outcome, not an error).
    pub fn capture(&mut self, opts: &ListenOptions) -> Result<Option<CaptureResult>, CaptureError> {
        self.cycle_id += 1;

        let dynamic = opts.speech_completeness && opts.seconds >= MIN_DYNAMIC_SECONDS;
        if opts.speech_completeness && !dynamic {
            tracing::debug!(
                seconds = opts.seconds,
                "target below dynamic minimum; using fixed-duration capture"
            );
        }

        let (signal, is_mute) = if dynamic {
            match self.capture_dynamic(opts.seconds, opts.mute_check)? {
                // A dynamic segment contains speech by construction.
                Some(signal) => (signal, false),
                None => return Ok(None),
            }
        } else {
            match self.capture_fixed(opts.seconds, opts.mute_check)? {
                Some(pair) => pair,
                None => return Ok(None),
            }
        };

        let saved_path = if opts.save_wave {
            let path = opts.file_name.clone().unwrap_or_else(|| {
                wav::default_file_name(self.config.channels, self.cycle_id)
            });
            wav::write_signal(&path, &signal, self.config.sample_rate, self.config.sample_format)?;
            Some(path)
        } else {
            None
        };

        tracing::debug!(
            cycle = self.cycle_id,
            frames = signal.frames(),
            duration_secs = signal.duration_secs(self.config.sample_rate),
            is_mute,
            "capture cycle complete"
        );

        Ok(Some(CaptureResult {
            signal,
            is_mute,
            saved_path,
        }))
    }

    /// Accumulate exactly `seconds * sample_rate` frames, reading
    /// `min(chunk_frames, remaining)` per blocking read. An early stop or
    /// stream end yields the partial signal captured so far.
    fn capture_fixed(
        &mut self,
        seconds: f32,
        mute_check: bool,
    ) -> Result<Option<(Signal, bool)>, CaptureError> {
        let total_frames = (seconds * self.config.sample_rate as f32).round() as usize;
        let mut raw = Vec::with_capacity(total_frames * self.config.frame_bytes());
        let mut remaining = total_frames;

        while remaining > 0 {
            let to_read = remaining.min(self.config.chunk_frames);
            match self.source.read(to_read)? {
                Some(bytes) => {
                    raw.extend(bytes);
                    remaining -= to_read;
                }
                None => break,
            }
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }

        if raw.is_empty() {
            return Ok(None);
        }

        let signal = codec::decode(&raw, self.config.sample_format, self.config.channels)?;
        let is_mute = mute_check && self.batch_is_silent(&signal);
        Ok(Some((signal, is_mute)))
    }

    /// Dynamic speech-completeness capture.
    ///
    /// Anchor phase: accumulate 1 s batches, discarding silent ones while
    /// `mute_check` is on, until one anchors the segment. Growth phase:
    /// append batches; once `target - 2` seconds accumulate, halve the batch
    /// size to 0.5 s and end the segment at the first silent batch (the
    /// triggering batch is excluded). `target + 10` seconds is a hard cap.
    fn capture_dynamic(
        &mut self,
        target_seconds: f32,
        mute_check: bool,
    ) -> Result<Option<Signal>, CaptureError> {
        let rate = self.config.sample_rate;
        let min_secs = target_seconds - 2.0;
        let max_secs = target_seconds + 10.0;

        let mut segment: Option<Signal> = None;
        let mut accumulated = 0.0f32;
        let mut fine_grained = false;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            let batch_frames = if fine_grained {
                rate as usize / 2
            } else {
                rate as usize
            };
            let (raw, complete) = self.read_batch(batch_frames)?;
            if raw.is_empty() {
                break;
            }

            let batch = codec::decode(&raw, self.config.sample_format, self.config.channels)?;
            let batch_secs = batch.frames() as f32 / rate as f32;

            match segment.as_mut() {
                None => {
                    if mute_check && self.batch_is_silent(&batch) {
                        tracing::trace!("silent batch before anchor; discarding");
                        continue;
                    }
                    accumulated += batch_secs;
                    segment = Some(batch);
                }
                Some(seg) => {
                    if fine_grained && self.batch_is_silent(&batch) {
                        tracing::debug!(
                            accumulated_secs = accumulated,
                            "trailing silence detected; segment complete"
                        );
                        break;
                    }
                    accumulated += batch_secs;
                    seg.append(batch);
                }
            }

            if !complete {
                break;
            }
            if !fine_grained && accumulated >= min_secs {
                tracing::trace!(
                    accumulated_secs = accumulated,
                    "minimum duration reached; switching to half batches"
                );
                fine_grained = true;
            }
            if accumulated >= max_secs {
                tracing::debug!(accumulated_secs = accumulated, "hard duration cap reached");
                break;
            }
        }

        Ok(segment)
    }

    /// Read one batch in chunk-sized slices, observing the stop flag between
    /// reads. The flag says whether the full batch was assembled.
    fn read_batch(&mut self, batch_frames: usize) -> Result<(Vec<u8>, bool), CaptureError> {
        let mut raw = Vec::with_capacity(batch_frames * self.config.frame_bytes());
        let mut remaining = batch_frames;

        while remaining > 0 {
            let to_read = remaining.min(self.config.chunk_frames);
            match self.source.read(to_read)? {
                Some(bytes) => {
                    raw.extend(bytes);
                    remaining -= to_read;
                }
                None => return Ok((raw, false)),
            }
            if self.stop.load(Ordering::Relaxed) {
                return Ok((raw, remaining == 0));
            }
        }

        Ok((raw, true))
    }

    /// A batch too short for one analysis window counts as active, so
    /// insufficient data is never dropped as silence.
    fn batch_is_silent(&self, batch: &Signal) -> bool {
        match self.detector.is_silent(batch) {
            Ok(silent) => silent,
            Err(err) => {
                tracing::debug!("treating short batch as active: {}", err);
                false
            }
        }
    }
}
