use std::time::Duration;

use tracing::{info, warn};

use super::messages::{ClientEvent, ServerEvent, SessionSettings};
use super::transport::{MessageSink, MessageSource};
use crate::error::{Result, StreamError};

/// Session setup exchange run before the pump takes over the connection
///
/// Waits for the service greeting, sends the configuration once, then waits
/// for the acknowledgement.
#[derive(Debug, Clone)]
pub struct SessionNegotiator {
    timeout: Duration,
}

impl SessionNegotiator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn negotiate<K, R>(
        &self,
        sink: &mut K,
        source: &mut R,
        settings: SessionSettings,
    ) -> Result<()>
    where
        K: MessageSink + ?Sized,
        R: MessageSource + ?Sized,
    {
        let greeting = self.next_event(source, "session.created").await?;
        if !matches!(greeting, ServerEvent::SessionCreated { .. }) {
            warn!("Expected session.created, got {:?}", greeting);
        }

        let update = ClientEvent::SessionUpdate { session: settings }.to_json()?;
        sink.send_text(update)
            .await
            .map_err(|e| StreamError::handshake(format!("failed to send session.update: {}", e)))?;
        info!("Session configuration sent");

        let ack = self.next_event(source, "session.updated").await?;
        if !matches!(ack, ServerEvent::SessionUpdated { .. }) {
            warn!("Expected session.updated, got {:?}", ack);
        }

        info!("Realtime session ready");
        Ok(())
    }

    async fn next_event<R>(&self, source: &mut R, expected: &str) -> Result<ServerEvent>
    where
        R: MessageSource + ?Sized,
    {
        let text = tokio::time::timeout(self.timeout, source.recv_text())
            .await
            .map_err(|_| {
                StreamError::handshake(format!("timed out after {:?} waiting for {}", self.timeout, expected))
            })?
            .map_err(|e| StreamError::handshake(format!("waiting for {}: {}", expected, e)))?
            .ok_or_else(|| StreamError::handshake(format!("connection closed before {}", expected)))?;

        let event = ServerEvent::parse(&text)
            .map_err(|e| StreamError::handshake(format!("unreadable {}: {}", expected, e)))?;

        if let ServerEvent::Error { error } = &event {
            return Err(StreamError::handshake(format!(
                "service rejected session: {}",
                error.message
            )));
        }

        Ok(event)
    }
}
