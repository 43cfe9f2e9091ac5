//! Blocking capture to async consumer bridge
//!
//! The device callback pushes raw buffers onto a lock-free queue. A dedicated
//! worker thread drains that queue, copies each buffer into a [`Frame`] and
//! republishes it on an unbounded tokio channel read by [`AudioSequence`].
//! Teardown (`stop`/`close`) is gated so it runs once no matter how many
//! callers race on it.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::frame::{Delivery, Frame};
use super::sequence::AudioSequence;
use super::source::{CaptureParams, FrameSink, FrameSource};
use crate::error::{Result, StreamError};

/// Lifecycle of a capture bridge; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BridgeState {
    Idle = 0,
    Streaming = 1,
    Stopping = 2,
    Closed = 3,
}

impl BridgeState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Streaming,
            2 => Self::Stopping,
            _ => Self::Closed,
        }
    }
}

/// Configuration for a capture bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub params: CaptureParams,
    /// How long the worker waits on the raw queue before re-checking for stop
    pub poll_interval: Duration,
    /// Upper bound on how long `close` waits for the worker thread
    pub join_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            params: CaptureParams::default(),
            poll_interval: Duration::from_millis(100),
            join_timeout: Duration::from_secs(1),
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    /// Disconnects when the worker thread returns
    done_rx: Receiver<()>,
}

struct Inner {
    config: BridgeConfig,
    state: AtomicU8,
    stop_gate: AtomicBool,
    close_gate: AtomicBool,
    halted: Arc<AtomicBool>,
    source: Mutex<Box<dyn FrameSource>>,
    publisher: Mutex<Option<mpsc::UnboundedSender<Delivery>>>,
    worker: Mutex<Option<Worker>>,
}

/// Bridges a blocking [`FrameSource`] to an [`AudioSequence`]
///
/// Cloning yields another handle to the same bridge, so an interrupt handler
/// can close it while the owner is still streaming.
#[derive(Clone)]
pub struct CaptureBridge {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CaptureBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBridge")
            .field("state", &self.state())
            .finish()
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CaptureBridge {
    pub fn new(source: Box<dyn FrameSource>, config: BridgeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: AtomicU8::new(BridgeState::Idle as u8),
                stop_gate: AtomicBool::new(false),
                close_gate: AtomicBool::new(false),
                halted: Arc::new(AtomicBool::new(false)),
                source: Mutex::new(source),
                publisher: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Open the device and start the transfer worker
    ///
    /// Returns the sequence the captured frames are delivered on. A bridge
    /// starts at most once.
    pub fn start(&self) -> Result<AudioSequence> {
        let inner = &self.inner;

        if inner
            .state
            .compare_exchange(
                BridgeState::Idle as u8,
                BridgeState::Streaming as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(StreamError::device(format!(
                "capture bridge cannot start from state {:?}",
                self.state()
            )));
        }

        let params = inner.config.params.clone();
        let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<Vec<u8>>();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();

        // Published before the device opens, so a close racing with start
        // always has an end marker to send
        *lock(&inner.publisher) = Some(delivery_tx.clone());

        {
            let mut source = lock(&inner.source);
            info!(
                "Opening capture device {} ({}Hz, {} channel, {} samples/frame)",
                source.name(),
                params.sample_rate,
                params.channels,
                params.frame_size
            );

            if let Err(e) = source.open(&params, FrameSink::new(raw_tx)) {
                error!("Failed to open capture device: {}", e);
                lock(&inner.publisher).take();
                inner.stop_gate.store(true, Ordering::Release);
                inner.close_gate.store(true, Ordering::Release);
                inner
                    .state
                    .store(BridgeState::Closed as u8, Ordering::Release);
                return Err(e);
            }
        }

        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let halted = Arc::clone(&inner.halted);
        let worker_tx = delivery_tx;
        let poll_interval = inner.config.poll_interval;

        let handle = thread::Builder::new()
            .name("capture-bridge".to_string())
            .spawn(move || transfer_frames(raw_rx, worker_tx, halted, poll_interval, done_tx));

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn capture worker: {}", e);
                self.close();
                return Err(StreamError::device(format!(
                    "failed to spawn capture worker: {}",
                    e
                )));
            }
        };

        *lock(&inner.worker) = Some(Worker { handle, done_rx });

        if inner.close_gate.load(Ordering::Acquire) {
            // close() ran while the device was opening and found no worker
            debug!("Capture bridge closed during start");
            let worker = lock(&inner.worker).take();
            if let Some(worker) = worker {
                inner.join_worker(worker);
            }
        } else {
            info!("Capture bridge streaming");
        }

        Ok(AudioSequence::new(delivery_rx))
    }

    /// Stop capturing: closes the device and tells the worker to finish
    ///
    /// Only the first call has any effect. Does not publish the end marker.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stop, join the worker (bounded wait) and publish the end marker
    ///
    /// Only the first call has any effect; later calls return immediately.
    /// Blocks for at most the configured join timeout.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Inner {
    fn stop(&self) {
        if self.stop_gate.swap(true, Ordering::AcqRel) {
            return;
        }

        let previous = self
            .state
            .compare_exchange(
                BridgeState::Streaming as u8,
                BridgeState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(BridgeState::from_u8);

        match previous {
            Ok(_) => {
                let mut source = lock(&self.source);
                source.close();
                info!("Capture device {} closed", source.name());
            }
            Err(_) => {
                // Never started: nothing to release
                let _ = self.state.compare_exchange(
                    BridgeState::Idle as u8,
                    BridgeState::Stopping as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
        }

        // Device is closed, so whatever is left in the raw queue is final
        self.halted.store(true, Ordering::Release);
    }

    fn close(&self) {
        if self.close_gate.swap(true, Ordering::AcqRel) {
            return;
        }

        self.stop();

        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            self.join_worker(worker);
        }

        let publisher = lock(&self.publisher).take();
        if let Some(tx) = publisher {
            if tx.send(Delivery::End).is_ok() {
                info!("Audio stream ended");
            } else {
                debug!("Audio consumer already gone, end marker not delivered");
            }
        }

        self.state
            .store(BridgeState::Closed as u8, Ordering::Release);
        info!("Audio resources released");
    }
}

impl Inner {
    /// Wait for the worker to exit, up to the join timeout
    fn join_worker(&self, worker: Worker) {
        match worker.done_rx.recv_timeout(self.config.join_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Capture worker did not finish within {:?}, detaching it",
                    self.config.join_timeout
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    error!("Capture worker panicked");
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.close_gate.load(Ordering::Acquire) {
            debug!("Capture bridge dropped while open, closing");
            self.close();
        }
    }
}

/// Worker thread body: raw queue -> frames -> async channel
fn transfer_frames(
    raw_rx: Receiver<Vec<u8>>,
    tx: mpsc::UnboundedSender<Delivery>,
    halted: Arc<AtomicBool>,
    poll_interval: Duration,
    _done: Sender<()>,
) {
    debug!("Capture worker started");
    let mut forwarded: u64 = 0;

    let publish = |bytes: &[u8]| tx.send(Delivery::Frame(Frame::copy_from(bytes))).is_ok();

    loop {
        if halted.load(Ordering::Acquire) {
            for bytes in raw_rx.try_iter() {
                if !publish(bytes.as_slice()) {
                    break;
                }
                forwarded += 1;
            }
            break;
        }

        match raw_rx.recv_timeout(poll_interval) {
            Ok(bytes) => {
                if !publish(bytes.as_slice()) {
                    debug!("Audio consumer dropped, capture worker exiting");
                    break;
                }
                forwarded += 1;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Capture worker stopped after {} frames", forwarded);
}
