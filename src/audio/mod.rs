pub mod bridge;
pub mod frame;
pub mod interrupt;
pub mod sequence;
pub mod source;

#[cfg(feature = "cpal-audio")]
pub mod microphone;

pub use bridge::{BridgeConfig, BridgeState, CaptureBridge};
pub use frame::{Delivery, Frame};
pub use interrupt::{InterruptGuard, SigintScope};
pub use sequence::AudioSequence;
pub use source::{CaptureParams, FrameSink, FrameSource};

#[cfg(feature = "cpal-audio")]
pub use microphone::MicrophoneSource;
