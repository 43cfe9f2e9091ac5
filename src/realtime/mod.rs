//! Realtime service protocol: wire messages, connection, handshake and pump

pub mod messages;
pub mod negotiate;
pub mod pump;
pub mod transport;

pub use messages::{ClientEvent, ServerEvent, SessionSettings};
pub use negotiate::SessionNegotiator;
pub use pump::{CompletionSignal, ProtocolPump, PumpConfig, PumpStats, TranscriptAssembler, TranscriptEvent};
pub use transport::{connect, ConnectOptions, MessageSink, MessageSource, WsSink, WsSource};
