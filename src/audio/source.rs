use crossbeam_channel::Sender;
use tracing::{trace, warn};

use crate::error::Result;

/// Parameters the capture device is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureParams {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (only mono is supported)
    pub channels: u16,
    /// Samples per frame delivered to the callback
    pub frame_size: usize,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            frame_size: 2_400, // 100ms at 24kHz
        }
    }
}

impl CaptureParams {
    /// Bytes in one frame of 16-bit samples
    pub fn frame_bytes(&self) -> usize {
        self.frame_size * self.channels as usize * 2
    }
}

/// Per-frame callback target handed to a [`FrameSource`]
///
/// Pushing never blocks: the frame goes onto an unbounded queue drained by
/// the bridge worker thread.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: Sender<Vec<u8>>,
}

impl FrameSink {
    pub(crate) fn new(tx: Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Hand one captured frame to the bridge
    pub fn push(&self, bytes: &[u8]) {
        if self.tx.try_send(bytes.to_vec()).is_err() {
            trace!("Capture frame dropped: bridge worker is gone");
        }
    }

    /// Report a device status condition (overflow, glitch)
    pub fn status(&self, status: &str) {
        warn!("Capture stream status: {}", status);
    }
}

/// Blocking capture device
///
/// Implementations call [`FrameSink::push`] from their own callback context
/// once per frame of exactly `params.frame_size` samples.
pub trait FrameSource: Send {
    /// Open the device and begin delivering frames to `sink`
    fn open(&mut self, params: &CaptureParams, sink: FrameSink) -> Result<()>;

    /// Stop delivering frames and release the device
    ///
    /// No callback may run after this returns.
    fn close(&mut self);

    /// Name for logging
    fn name(&self) -> &str;
}
