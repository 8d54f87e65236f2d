use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sonocap_foundation::{
    CaptureConfig, CaptureError, SessionState, SessionStateCell, StateError,
};

use crate::assembler::{CaptureResult, ListenOptions, SegmentAssembler};
use crate::device::{self, InputStreamHandle};
use crate::queue::DeliveryQueue;
use crate::source::StreamChunkSource;
use crate::stats::CaptureStats;

/// Bounded wait for the worker to acknowledge a stop request.
const STOP_WAIT: Duration = Duration::from_secs(1);
const STOP_POLL: Duration = Duration::from_millis(50);

const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Owns one capture session: device handle, capture thread, and the
/// delivery queue's producer side. Exactly one capture thread exists per
/// controller instance.
pub struct CaptureController {
    config: Option<CaptureConfig>,
    state: Arc<SessionStateCell>,
    queue: Arc<DeliveryQueue<CaptureResult>>,
    stats: Arc<CaptureStats>,
    stop: Arc<AtomicBool>,
    stream: Option<InputStreamHandle>,
    assembler: Option<Arc<Mutex<SegmentAssembler<StreamChunkSource>>>>,
    worker: Option<JoinHandle<()>>,
    worker_error: Arc<Mutex<Option<CaptureError>>>,
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl CaptureController {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            config: None,
            state: Arc::new(SessionStateCell::new()),
            queue: Arc::new(DeliveryQueue::new(queue_capacity)),
            stats: Arc::new(CaptureStats::default()),
            stop: Arc::new(AtomicBool::new(false)),
            stream: None,
            assembler: None,
            worker: None,
            worker_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the input device and stream for one session. A failed open
    /// leaves the session uninitialized.
    pub fn init(
        &mut self,
        config: CaptureConfig,
        device_name: Option<&str>,
    ) -> Result<(), CaptureError> {
        // One session per controller: any state past Uninitialized,
        // including Stopped, rejects re-init.
        if self.state.current() != SessionState::Uninitialized {
            return Err(StateError::AlreadyInitialized.into());
        }
        config.validate()?;

        let (handle, source) = device::open_input(&config, device_name, self.stats.clone())?;

        self.stop.store(false, Ordering::SeqCst);
        self.assembler = Some(Arc::new(Mutex::new(SegmentAssembler::new(
            source,
            config.clone(),
            self.stop.clone(),
        ))));
        self.stream = Some(handle);
        self.config = Some(config);
        self.state.transition(SessionState::Initialized)?;
        Ok(())
    }

    /// Run one capture cycle synchronously on the calling thread.
    pub fn listen(&self, opts: &ListenOptions) -> Result<Option<CaptureResult>, CaptureError> {
        if let Some(err) = self.worker_error.lock().take() {
            return Err(err);
        }
        match self.state.current() {
            SessionState::Initialized => {}
            SessionState::Running | SessionState::Stopping => {
                return Err(StateError::AlreadyRunning.into());
            }
            _ => {
                return Err(StateError::NotInitialized { operation: "listen" }.into());
            }
        }
        let assembler = self
            .assembler
            .as_ref()
            .ok_or(StateError::NotInitialized { operation: "listen" })?;
        let mut guard = assembler.lock();
        guard.capture(opts)
    }

    /// Spawn the background capture loop. Completed segments land on the
    /// delivery queue; loop errors end the session and surface on the next
    /// `get` or `listen`.
    pub fn start(&mut self, opts: ListenOptions) -> Result<(), CaptureError> {
        match self.state.current() {
            SessionState::Initialized => {}
            SessionState::Running | SessionState::Stopping => {
                return Err(StateError::AlreadyRunning.into());
            }
            _ => {
                return Err(StateError::NotInitialized { operation: "start" }.into());
            }
        }
        let assembler = self
            .assembler
            .clone()
            .ok_or(StateError::NotInitialized { operation: "start" })?;

        self.state.transition(SessionState::Running)?;

        let stop = self.stop.clone();
        let queue = self.queue.clone();
        let stats = self.stats.clone();
        let state = self.state.clone();
        let worker_error = self.worker_error.clone();

        let handle = thread::Builder::new()
            .name("sonocap-capture".to_string())
            .spawn(move || {
                tracing::debug!("capture loop started");
                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let result = assembler.lock().capture(&opts);
                    match result {
                        Ok(Some(segment)) => {
                            // A segment finished by the stop request itself is
                            // discarded, matching the loop's stop-then-exit shape.
                            if stop.load(Ordering::SeqCst) {
                                break;
                            }
                            stats.segments_completed.fetch_add(1, Ordering::Relaxed);
                            queue.push(segment);
                        }
                        Ok(None) => {
                            // Continuous silence or idle stop; keep listening.
                        }
                        Err(err) => {
                            tracing::error!("capture loop terminated: {}", err);
                            *worker_error.lock() = Some(err);
                            break;
                        }
                    }
                }
                let _ = state.transition(SessionState::Stopped);
                tracing::debug!("capture loop stopped");
            })
            .map_err(|e| CaptureError::Fatal(format!("failed to spawn capture thread: {e}")))?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Read a completed segment. `realtime` drains the queue to the freshest
    /// segment. `None` is a normal idle condition.
    pub fn get(&self, realtime: bool) -> Result<Option<CaptureResult>, CaptureError> {
        if let Some(err) = self.worker_error.lock().take() {
            return Err(err);
        }
        Ok(self.queue.pop_latest(realtime))
    }

    /// Request a cooperative stop and wait (bounded) for the worker to
    /// acknowledge. Never hangs: on timeout a warning is logged and the
    /// caller regains control, leaving final teardown to `Drop`.
    pub fn stop(&mut self) {
        match self.state.current() {
            SessionState::Uninitialized | SessionState::Stopped => return,
            SessionState::Initialized => {
                self.release();
                let _ = self.state.transition(SessionState::Stopped);
                return;
            }
            SessionState::Running | SessionState::Stopping => {}
        }

        self.stop.store(true, Ordering::SeqCst);
        // The worker may have already observed the flag and gone to Stopped.
        if self.state.current() == SessionState::Running {
            let _ = self.state.transition(SessionState::Stopping);
        }

        if let Some(handle) = self.worker.take() {
            let deadline = Instant::now() + STOP_WAIT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(STOP_POLL);
            }
            if handle.is_finished() {
                let _ = handle.join();
                self.release();
            } else {
                tracing::warn!(
                    "capture worker did not stop within {:?}; deferring teardown",
                    STOP_WAIT
                );
                self.worker = Some(handle);
            }
        } else {
            self.release();
            let _ = self.state.transition(SessionState::Stopped);
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    pub fn config(&self) -> Option<&CaptureConfig> {
        self.config.as_ref()
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Drop the stream and assembler; closing the stream disconnects the
    /// chunk source, which unblocks a worker stuck in a read.
    fn release(&mut self) {
        self.stream = None;
        self.assembler = None;
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Releasing the stream first ends the chunk source, so a still-running
        // worker observes end-of-stream instead of blocking.
        self.release();
        if let Some(handle) = self.worker.take() {
            let deadline = Instant::now() + STOP_WAIT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(STOP_POLL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::warn!("detaching capture worker that outlived its controller");
            }
        }
    }
}
