//! Microphone capture through cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info};

use super::source::{CaptureParams, FrameSink, FrameSource};
use crate::error::{Result, StreamError};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is created, played and dropped through `&mut self` on
/// `MicrophoneSource`, which the bridge only touches behind its mutex.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Default (or named) input device, captured as i16 mono
pub struct MicrophoneSource {
    device_name: Option<String>,
    stream: Option<SendableStream>,
}

impl MicrophoneSource {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
        }
    }

    fn find_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();

        match &self.device_name {
            Some(name) => {
                let devices = host
                    .input_devices()
                    .map_err(|e| StreamError::device(format!("failed to enumerate devices: {}", e)))?;

                for device in devices {
                    if device.name().map(|n| &n == name).unwrap_or(false) {
                        return Ok(device);
                    }
                }

                Err(StreamError::device(format!("input device '{}' not found", name)))
            }
            None => host
                .default_input_device()
                .ok_or_else(|| StreamError::device("no default input device")),
        }
    }
}

impl FrameSource for MicrophoneSource {
    fn open(&mut self, params: &CaptureParams, sink: FrameSink) -> Result<()> {
        if self.stream.is_some() {
            return Err(StreamError::device("microphone already open"));
        }

        let device = self.find_device()?;
        let stream_config = cpal::StreamConfig {
            channels: params.channels,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // Device buffers vary in size; regroup into exact frames
        let frame_size = params.frame_size;
        let mut pending: Vec<i16> = Vec::with_capacity(frame_size * 2);
        let data_sink = sink.clone();
        let frame_bytes = params.frame_bytes();
        let mut scratch: Vec<u8> = Vec::with_capacity(frame_bytes);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    pending.extend_from_slice(data);
                    while pending.len() >= frame_size {
                        scratch.clear();
                        scratch.extend(pending.drain(..frame_size).flat_map(|s| s.to_le_bytes()));
                        data_sink.push(&scratch);
                    }
                },
                move |err| sink.status(&err.to_string()),
                None,
            )
            .map_err(|e| StreamError::device(format!("failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| StreamError::device(format!("failed to start input stream: {}", e)))?;

        info!(
            "Microphone {} capturing",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the stream stops the callback and releases the sink
        if let Some(SendableStream(stream)) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Failed to pause input stream before release: {}", e);
            }
            drop(stream);
        }
    }

    fn name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("default microphone")
    }
}
