//! Live translation session
//!
//! Ties the pieces together for one run:
//! - session setup exchange with the realtime service
//! - microphone capture through the capture bridge
//! - the duplex pump streaming audio out and transcripts back
//! - teardown of capture and connection on every exit path

mod config;
mod session;

pub use config::SessionOptions;
pub use session::LiveSession;
