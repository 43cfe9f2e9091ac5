use thiserror::Error;

/// Errors raised by the capture bridge and the realtime pump
#[derive(Debug, Error)]
pub enum StreamError {
    /// The capture device could not be opened (unsupported parameters, busy, missing)
    #[error("audio device unavailable: {message}")]
    DeviceUnavailable { message: String },

    /// Sending or receiving on the live connection failed
    #[error("transport error: {message}")]
    Transport { message: String },

    /// An inbound message could not be parsed
    #[error("malformed message: {message}")]
    MalformedMessage { message: String },

    /// The session setup exchange did not complete
    #[error("session handshake failed: {message}")]
    Handshake { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The interrupt handler could not be installed
    #[error("interrupt handling unavailable: {message}")]
    Interrupt { message: String },
}

impl StreamError {
    pub fn device(message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn interrupt(message: impl Into<String>) -> Self {
        Self::Interrupt {
            message: message.into(),
        }
    }

    /// Whether this error must tear the whole session down
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedMessage { .. })
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
