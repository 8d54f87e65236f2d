//! Assembler and queue behavior over scripted chunk sources.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sonocap_capture::{ChunkSource, DeliveryQueue, ListenOptions, SegmentAssembler};
use sonocap_foundation::{CaptureConfig, DeviceError, SampleFormat};

/// Small-rate config keeping second-scale scenarios cheap: 1 s = 800 frames,
/// one analysis window = 80 frames.
fn test_config() -> CaptureConfig {
    CaptureConfig {
        sample_rate: 800,
        channels: 1,
        chunk_frames: 100,
        sample_format: SampleFormat::I16,
        energy_threshold: 1e-3,
        frame_time_len: 0.1,
    }
}

const ACTIVE: i16 = 8000;
const SILENT: i16 = 0;

fn i16_mono_bytes(amplitude: i16, frames: usize) -> Vec<u8> {
    std::iter::repeat(amplitude.to_le_bytes())
        .take(frames)
        .flatten()
        .collect()
}

/// Replays a fixed byte script, ending the stream when exhausted. Records
/// the frame count of every read.
struct PatternSource {
    data: Vec<u8>,
    pos: usize,
    frame_bytes: usize,
    reads: Arc<Mutex<Vec<usize>>>,
}

impl PatternSource {
    fn new(data: Vec<u8>, frame_bytes: usize) -> (Self, Arc<Mutex<Vec<usize>>>) {
        let reads = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                data,
                pos: 0,
                frame_bytes,
                reads: reads.clone(),
            },
            reads,
        )
    }
}

impl ChunkSource for PatternSource {
    fn read(&mut self, frames: usize) -> Result<Option<Vec<u8>>, DeviceError> {
        let needed = frames * self.frame_bytes;
        if self.pos + needed > self.data.len() {
            return Ok(None);
        }
        self.reads.lock().push(frames);
        let chunk = self.data[self.pos..self.pos + needed].to_vec();
        self.pos += needed;
        Ok(Some(chunk))
    }
}

/// Endless constant-amplitude source, optionally sleeping per read to mimic
/// a blocking hardware stream.
struct ToneSource {
    amplitude: i16,
    read_delay: Duration,
    frames_read: Arc<AtomicUsize>,
}

impl ToneSource {
    fn new(amplitude: i16, read_delay: Duration) -> Self {
        Self {
            amplitude,
            read_delay,
            frames_read: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ChunkSource for ToneSource {
    fn read(&mut self, frames: usize) -> Result<Option<Vec<u8>>, DeviceError> {
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        self.frames_read.fetch_add(frames, Ordering::Relaxed);
        Ok(Some(i16_mono_bytes(self.amplitude, frames)))
    }
}

fn assembler<S: ChunkSource>(
    source: S,
    config: CaptureConfig,
) -> (SegmentAssembler<S>, Arc<AtomicBool>) {
    let stop = Arc::new(AtomicBool::new(false));
    (SegmentAssembler::new(source, config, stop.clone()), stop)
}

#[test]
fn fixed_mode_reads_exact_chunk_sequence() {
    // 2 s at 16 kHz with 1024-frame chunks: 31 full reads plus one 256-frame
    // remainder, 32000 frames total.
    let config = CaptureConfig {
        sample_rate: 16_000,
        chunk_frames: 1024,
        ..test_config()
    };
    let (source, reads) = PatternSource::new(i16_mono_bytes(SILENT, 33_000), 2);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 2.0,
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    assert_eq!(result.signal.frames(), 32_000);
    let reads = reads.lock();
    assert_eq!(reads.len(), 32);
    assert!(reads[..31].iter().all(|&n| n == 1024));
    assert_eq!(reads[31], 256);
}

#[test]
fn fixed_mode_returns_partial_on_stream_end() {
    // 1.5 s of data against a 2 s request
    let config = test_config();
    let (source, _) = PatternSource::new(i16_mono_bytes(ACTIVE, 1200), 2);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 2.0,
            ..Default::default()
        })
        .unwrap()
        .unwrap();
    assert_eq!(result.signal.frames(), 1200);
}

#[test]
fn fixed_mode_mute_classification() {
    let config = test_config();
    let opts = ListenOptions {
        seconds: 1.0,
        mute_check: true,
        ..Default::default()
    };

    let (source, _) = PatternSource::new(i16_mono_bytes(SILENT, 800), 2);
    let (mut asm, _stop) = assembler(source, config.clone());
    assert!(asm.capture(&opts).unwrap().unwrap().is_mute);

    let (source, _) = PatternSource::new(i16_mono_bytes(ACTIVE, 800), 2);
    let (mut asm, _stop) = assembler(source, config);
    assert!(!asm.capture(&opts).unwrap().unwrap().is_mute);
}

#[test]
fn dynamic_segmentation_core_scenario() {
    // Energy per second: [S, S, A, A, A, S, S]. target 5 s, mute_check on.
    // Anchor discards the two silent batches, growth accumulates three
    // active seconds (min = 5 - 2 = 3), granularity halves, and the first
    // silent half batch ends the segment and is excluded.
    let config = test_config();
    let rate = config.sample_rate as usize;
    let mut data = i16_mono_bytes(SILENT, 2 * rate);
    data.extend(i16_mono_bytes(ACTIVE, 3 * rate));
    data.extend(i16_mono_bytes(SILENT, 2 * rate));

    let (source, reads) = PatternSource::new(data, 2);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 5.0,
            speech_completeness: true,
            mute_check: true,
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    // 3 s of content, none of it silent padding
    assert_eq!(result.signal.frames(), 3 * rate);
    assert!(!result.is_mute);

    // Termination consumed exactly the 5 full batches plus one half batch
    let consumed: usize = reads.lock().iter().sum();
    assert_eq!(consumed, 5 * rate + rate / 2);
}

#[test]
fn dynamic_without_mute_check_anchors_immediately() {
    // No anchor filtering: the first (silent) batch starts the segment and
    // trailing-silence detection still ends it after the minimum duration.
    let config = test_config();
    let rate = config.sample_rate as usize;
    let (source, _) = PatternSource::new(i16_mono_bytes(SILENT, 8 * rate), 2);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 5.0,
            speech_completeness: true,
            mute_check: false,
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    assert_eq!(result.signal.frames(), 3 * rate);
}

#[test]
fn dynamic_hard_cap_bounds_segment_length() {
    // Uninterrupted speech: the segment must terminate at target + 10 s.
    let config = test_config();
    let rate = config.sample_rate as usize;
    let source = ToneSource::new(ACTIVE, Duration::ZERO);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 5.0,
            speech_completeness: true,
            mute_check: true,
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    assert_eq!(result.signal.frames(), 15 * rate);
}

#[test]
fn dynamic_target_below_minimum_falls_back_to_fixed() {
    let config = test_config();
    let rate = config.sample_rate as usize;
    let (source, _) = PatternSource::new(i16_mono_bytes(ACTIVE, 4 * rate), 2);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 2.0,
            speech_completeness: true,
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    // Fixed-duration semantics: exactly 2 s, no growth
    assert_eq!(result.signal.frames(), 2 * rate);
}

/// Silence source that raises the shared stop flag after a set number of
/// reads, simulating a stop request during an idle anchor search.
struct SilenceThenStop {
    reads_left: usize,
    stop: Arc<AtomicBool>,
}

impl ChunkSource for SilenceThenStop {
    fn read(&mut self, frames: usize) -> Result<Option<Vec<u8>>, DeviceError> {
        if self.reads_left == 0 {
            self.stop.store(true, Ordering::SeqCst);
        } else {
            self.reads_left -= 1;
        }
        Ok(Some(i16_mono_bytes(SILENT, frames)))
    }
}

#[test]
fn stop_during_idle_anchor_search_yields_none() {
    let config = test_config();
    let stop = Arc::new(AtomicBool::new(false));
    let source = SilenceThenStop {
        reads_left: 12,
        stop: stop.clone(),
    };
    let mut asm = SegmentAssembler::new(source, config, stop);

    let result = asm
        .capture(&ListenOptions {
            seconds: 5.0,
            speech_completeness: true,
            mute_check: true,
            ..Default::default()
        })
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn stop_mid_capture_is_observed_within_one_chunk_read() {
    let config = test_config();
    let source = ToneSource::new(ACTIVE, Duration::from_millis(5));
    let (mut asm, stop) = assembler(source, config.clone());

    let (tx, rx) = crossbeam_channel::bounded(1);
    let worker = thread::spawn(move || {
        let result = asm.capture(&ListenOptions {
            seconds: 60.0,
            ..Default::default()
        });
        let _ = tx.send(result);
    });

    thread::sleep(Duration::from_millis(50));
    let requested = Instant::now();
    stop.store(true, Ordering::SeqCst);

    let result = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("capture must observe the stop request");
    assert!(requested.elapsed() < Duration::from_millis(500));

    let partial = result.unwrap().unwrap();
    assert!(partial.signal.frames() > 0);
    assert!(partial.signal.frames() < 60 * config.sample_rate as usize);
    worker.join().unwrap();
}

#[test]
fn save_wave_writes_segment_to_requested_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("segment.wav");
    let config = test_config();
    let (source, _) = PatternSource::new(i16_mono_bytes(ACTIVE, 800), 2);
    let (mut asm, _stop) = assembler(source, config);

    let result = asm
        .capture(&ListenOptions {
            seconds: 1.0,
            save_wave: true,
            file_name: Some(path.clone()),
            ..Default::default()
        })
        .unwrap()
        .unwrap();

    assert_eq!(result.saved_path.as_deref(), Some(path.as_path()));
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.duration(), 800);
}

#[test]
fn delivery_queue_favors_freshness_under_producer_pressure() {
    let queue = Arc::new(DeliveryQueue::new(3));
    for seq in 0..5u32 {
        queue.push(seq);
    }
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.evicted(), 2);
    // Realtime read drains to the freshest element
    assert_eq!(queue.pop_latest(true), Some(4));
    assert!(queue.is_empty());
}
