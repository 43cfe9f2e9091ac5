// Test doubles shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use live_translate::audio::{CaptureParams, FrameSink, FrameSource};
use live_translate::{Frame, StreamError};

#[derive(Default)]
struct DeviceState {
    sink: Option<FrameSink>,
    opened: usize,
    closed: usize,
    params: Option<CaptureParams>,
}

/// Capture device driven by the test through a [`DeviceHandle`]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
    /// Keep the sink alive after close, so the bridge worker never sees a disconnect
    hold_sink_on_close: bool,
    fail_open: bool,
    open_delay: Duration,
}

/// Test-side view of a [`FakeDevice`]
#[derive(Clone)]
pub struct DeviceHandle {
    state: Arc<Mutex<DeviceState>>,
}

impl FakeDevice {
    pub fn new() -> (Self, DeviceHandle) {
        Self::build(false, false)
    }

    pub fn holding_sink() -> (Self, DeviceHandle) {
        Self::build(true, false)
    }

    pub fn busy() -> (Self, DeviceHandle) {
        Self::build(false, true)
    }

    /// Device whose `open` blocks for `delay` before succeeding
    pub fn slow_open(delay: Duration) -> (Self, DeviceHandle) {
        let (mut device, handle) = Self::build(false, false);
        device.open_delay = delay;
        (device, handle)
    }

    fn build(hold_sink_on_close: bool, fail_open: bool) -> (Self, DeviceHandle) {
        let state = Arc::new(Mutex::new(DeviceState::default()));
        (
            Self {
                state: Arc::clone(&state),
                hold_sink_on_close,
                fail_open,
                open_delay: Duration::ZERO,
            },
            DeviceHandle { state },
        )
    }
}

impl FrameSource for FakeDevice {
    fn open(&mut self, params: &CaptureParams, sink: FrameSink) -> live_translate::Result<()> {
        if self.fail_open {
            return Err(StreamError::device("device busy"));
        }
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        let mut state = self.state.lock().unwrap();
        state.opened += 1;
        state.params = Some(params.clone());
        state.sink = Some(sink);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        if !self.hold_sink_on_close {
            state.sink = None;
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

impl DeviceHandle {
    /// Deliver one frame as the device callback would; false once closed
    pub fn push(&self, frame: &Frame) -> bool {
        let state = self.state.lock().unwrap();
        if state.closed > 0 {
            return false;
        }
        match &state.sink {
            Some(sink) => {
                sink.push(frame.as_bytes());
                true
            }
            None => false,
        }
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn params(&self) -> Option<CaptureParams> {
        self.state.lock().unwrap().params.clone()
    }

    /// Wait (up to 2s) for the bridge to open the device
    pub async fn wait_opened(&self) {
        for _ in 0..200 {
            if self.opened() > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("device was never opened");
    }
}

/// Distinguishable frame: `samples` copies of `index`
pub fn numbered_frame(index: usize, samples: usize) -> Frame {
    Frame::from_samples(&vec![index as i16; samples])
}

/// Value of the `type` field of an outbound JSON message
pub fn message_type(json: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    value["type"].as_str().unwrap().to_string()
}
