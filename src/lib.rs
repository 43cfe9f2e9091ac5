pub mod audio;
pub mod config;
pub mod error;
pub mod realtime;
pub mod session;

pub use audio::{
    AudioSequence, BridgeConfig, BridgeState, CaptureBridge, CaptureParams, Frame, FrameSink,
    FrameSource, InterruptGuard, SigintScope,
};
pub use config::Config;
pub use error::{Result, StreamError};
pub use realtime::{
    ClientEvent, CompletionSignal, MessageSink, MessageSource, ProtocolPump, PumpConfig,
    PumpStats, ServerEvent, SessionNegotiator, TranscriptEvent,
};
pub use session::{LiveSession, SessionOptions};
