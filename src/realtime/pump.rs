//! Duplex protocol pump
//!
//! Two directions share one connection and run as concurrent futures on the
//! caller's task:
//! - send: audio frames -> `input_audio_buffer.append`, plus commit and
//!   response requests at their configured frame cadences
//! - receive: server events -> [`TranscriptEvent`]s
//!
//! The send direction ends when the audio sequence ends and raises the
//! [`CompletionSignal`]. Once the receive direction sees the signal it keeps
//! reading for at most one more receive timeout, then stops even if the
//! service is still talking. An error in either direction drops the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{ClientEvent, ServerEvent};
use super::transport::{MessageSink, MessageSource};
use crate::audio::Frame;
use crate::error::{Result, StreamError};

/// Transcript text surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Accumulated partial text of the current response
    Interim(String),
    /// Complete text of a finished response
    Final(String),
}

/// Set-once flag shared by the two pump directions
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    flag: Arc<AtomicBool>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal; returns true for the call that actually set it
    pub fn set(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Send a commit after every N frames
    pub commit_every: Option<u32>,
    /// Request a response after every N frames
    pub response_every: Option<u32>,
    /// Per-attempt receive timeout; also the tail window read after the audio ends
    pub receive_timeout: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            commit_every: Some(20),
            response_every: Some(40),
            receive_timeout: Duration::from_millis(500),
        }
    }
}

/// Counters reported when the pump finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    pub frames_sent: u64,
    pub commits_sent: u64,
    pub responses_requested: u64,
    pub interim_events: u64,
    pub final_events: u64,
    pub malformed_skipped: u64,
}

/// Folds text deltas into interim text and resets on completion
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    interim: String,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Apply one server event, returning the transcript update it produces
    pub fn apply(&mut self, event: ServerEvent) -> Option<TranscriptEvent> {
        match event {
            ServerEvent::ResponseTextDelta { delta } => {
                self.interim.push_str(&delta);
                self.interim.push(' ');
                Some(TranscriptEvent::Interim(self.interim.clone()))
            }
            ServerEvent::ResponseTextDone { text } => {
                self.interim.clear();
                Some(TranscriptEvent::Final(text))
            }
            ServerEvent::Error { error } => {
                warn!(
                    "Realtime service error ({}): {}",
                    error.code.as_deref().unwrap_or("unknown"),
                    error.message
                );
                None
            }
            _ => None,
        }
    }
}

pub struct ProtocolPump {
    config: PumpConfig,
    events: mpsc::UnboundedSender<TranscriptEvent>,
}

impl ProtocolPump {
    pub fn new(config: PumpConfig, events: mpsc::UnboundedSender<TranscriptEvent>) -> Self {
        Self { config, events }
    }

    /// Drive both directions until the audio ends and the receive side stops
    pub async fn run<A, K, R>(&self, audio: A, sink: &mut K, source: &mut R) -> Result<PumpStats>
    where
        A: Stream<Item = Frame> + Unpin,
        K: MessageSink + ?Sized,
        R: MessageSource + ?Sized,
    {
        let done = CompletionSignal::new();

        let (sent, received) = tokio::try_join!(
            self.send_audio(audio, sink, &done),
            self.receive_transcripts(source, &done),
        )?;

        let stats = PumpStats {
            interim_events: received.interim_events,
            final_events: received.final_events,
            malformed_skipped: received.malformed_skipped,
            ..sent
        };

        info!(
            "Pump finished: {} frames, {} commits, {} responses, {} final transcripts",
            stats.frames_sent, stats.commits_sent, stats.responses_requested, stats.final_events
        );

        Ok(stats)
    }

    async fn send_audio<A, K>(&self, mut audio: A, sink: &mut K, done: &CompletionSignal) -> Result<PumpStats>
    where
        A: Stream<Item = Frame> + Unpin,
        K: MessageSink + ?Sized,
    {
        let commit = ClientEvent::commit().to_json()?;
        let response = ClientEvent::create_text_response().to_json()?;
        let mut stats = PumpStats::default();
        let mut uncommitted: u64 = 0;

        while let Some(frame) = audio.next().await {
            sink.send_text(ClientEvent::append_audio(frame.as_bytes()).to_json()?)
                .await?;
            stats.frames_sent += 1;
            uncommitted += 1;

            if is_due(stats.frames_sent, self.config.commit_every) {
                sink.send_text(commit.clone()).await?;
                stats.commits_sent += 1;
                uncommitted = 0;
            }

            if is_due(stats.frames_sent, self.config.response_every) {
                sink.send_text(response.clone()).await?;
                stats.responses_requested += 1;
            }
        }

        // Flush the tail so the last partial window is not left in the buffer
        if self.config.commit_every.is_some_and(|n| n > 0) && uncommitted > 0 {
            sink.send_text(commit).await?;
            stats.commits_sent += 1;
        }

        done.set();
        debug!("Audio send loop finished after {} frames", stats.frames_sent);

        Ok(stats)
    }

    async fn receive_transcripts<R>(&self, source: &mut R, done: &CompletionSignal) -> Result<PumpStats>
    where
        R: MessageSource + ?Sized,
    {
        let mut assembler = TranscriptAssembler::new();
        let mut stats = PumpStats::default();
        let mut deadline: Option<Instant> = None;

        loop {
            if deadline.is_none() && done.is_set() {
                deadline = Some(Instant::now() + self.config.receive_timeout);
            }

            // Audio is done: read only until the tail window closes
            let wait = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        break;
                    }
                    left
                }
                None => self.config.receive_timeout,
            };

            let received = match tokio::time::timeout(wait, source.recv_text()).await {
                Err(_) => {
                    if done.is_set() {
                        break;
                    }
                    continue;
                }
                Ok(received) => received,
            };

            let text = match received {
                Ok(Some(text)) => text,
                Ok(None) if done.is_set() => break,
                Ok(None) => {
                    return Err(StreamError::transport("connection closed by the service"))
                }
                Err(e) if !e.is_fatal() => {
                    warn!("Skipping inbound message: {}", e);
                    stats.malformed_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let event = match ServerEvent::parse(&text) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping inbound message: {}", e);
                    stats.malformed_skipped += 1;
                    continue;
                }
            };

            if let Some(update) = assembler.apply(event) {
                match &update {
                    TranscriptEvent::Interim(_) => stats.interim_events += 1,
                    TranscriptEvent::Final(_) => stats.final_events += 1,
                }
                if self.events.send(update).is_err() {
                    debug!("Transcript listener gone, dropping update");
                }
            }
        }

        debug!("Transcript receive loop finished");
        Ok(stats)
    }
}

fn is_due(count: u64, cadence: Option<u32>) -> bool {
    match cadence {
        Some(n) if n > 0 => count % u64::from(n) == 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_fires_after_nth_frame() {
        assert!(!is_due(19, Some(20)));
        assert!(is_due(20, Some(20)));
        assert!(is_due(40, Some(20)));
        assert!(!is_due(20, None));
        assert!(!is_due(20, Some(0)));
    }

    #[test]
    fn test_completion_signal_sets_once() {
        let signal = CompletionSignal::new();
        let reader = signal.clone();
        assert!(!reader.is_set());
        assert!(signal.set());
        assert!(!signal.set());
        assert!(reader.is_set());
    }

    #[test]
    fn test_assembler_accumulates_and_clears() {
        let mut assembler = TranscriptAssembler::new();

        let first = assembler.apply(ServerEvent::ResponseTextDelta { delta: "Hel".into() });
        assert_eq!(first, Some(TranscriptEvent::Interim("Hel ".into())));

        let second = assembler.apply(ServerEvent::ResponseTextDelta { delta: "lo".into() });
        assert_eq!(second, Some(TranscriptEvent::Interim("Hel lo ".into())));

        let done = assembler.apply(ServerEvent::ResponseTextDone { text: "Hello".into() });
        assert_eq!(done, Some(TranscriptEvent::Final("Hello".into())));
        assert_eq!(assembler.interim(), "");

        assert_eq!(assembler.apply(ServerEvent::Other), None);
    }
}
