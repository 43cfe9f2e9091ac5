use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::config::SessionOptions;
use crate::audio::{CaptureBridge, FrameSource, InterruptGuard, SigintScope};
use crate::config::Config;
use crate::realtime::{
    transport, ConnectOptions, MessageSink, MessageSource, ProtocolPump, PumpStats,
    SessionNegotiator, TranscriptEvent,
};

/// One live translation session: connect, configure, stream until interrupted
pub struct LiveSession {
    config: Config,
    options: SessionOptions,
    api_key: String,
}

impl LiveSession {
    pub fn new(config: Config, options: SessionOptions, api_key: String) -> Self {
        Self {
            config,
            options,
            api_key,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Connect to the service and stream `source` until Ctrl-C
    ///
    /// SIGINT is held by the session until it returns, then goes back to
    /// terminating the process.
    pub async fn run(
        &self,
        source: Box<dyn FrameSource>,
        events: mpsc::UnboundedSender<TranscriptEvent>,
    ) -> Result<PumpStats> {
        let connect = ConnectOptions {
            url: self.config.service.url.clone(),
            model: self.config.service.model.clone(),
            api_key: self.api_key.clone(),
            log_session: self.config.service.log_session,
        };

        let (mut sink, mut stream) = transport::connect(&connect)
            .await
            .context("Failed to connect to realtime service")?;

        let (scope, interrupted) =
            SigintScope::register().context("Failed to install interrupt handler")?;

        let result = self
            .run_over(source, &mut sink, &mut stream, events, interrupted)
            .await;
        drop(scope);

        result
    }

    /// Run the session over an already open connection
    ///
    /// `interrupt` resolving closes the capture bridge, which ends the audio
    /// stream and with it the session. The bridge is closed on every exit path.
    pub async fn run_over<K, R, F>(
        &self,
        source: Box<dyn FrameSource>,
        sink: &mut K,
        stream: &mut R,
        events: mpsc::UnboundedSender<TranscriptEvent>,
        interrupt: F,
    ) -> Result<PumpStats>
    where
        K: MessageSink + ?Sized,
        R: MessageSource + ?Sized,
        F: Future<Output = ()> + Send + 'static,
    {
        let started_at = Instant::now();
        info!(
            "Starting live translation {} -> {}",
            self.options.source_lang, self.options.target_lang
        );

        SessionNegotiator::new(self.config.handshake_timeout())
            .negotiate(sink, stream, self.options.settings())
            .await
            .context("Session setup failed")?;

        let bridge = CaptureBridge::new(source, self.config.bridge_config());
        let audio = bridge.start().context("Failed to start audio capture")?;
        let guard = InterruptGuard::install(bridge.clone(), interrupt);

        let pump = ProtocolPump::new(self.config.pump_config(), events);
        let result = pump.run(audio, sink, stream).await;

        drop(guard);
        if let Err(e) = tokio::task::spawn_blocking(move || bridge.close()).await {
            warn!("Capture teardown task failed: {}", e);
        }

        if let Err(e) = sink.close().await {
            warn!("Failed to close connection cleanly: {}", e);
        }

        let stats = result.context("Realtime session failed")?;
        info!(
            "Session finished after {:.1}s ({} frames streamed)",
            started_at.elapsed().as_secs_f64(),
            stats.frames_sent
        );

        Ok(stats)
    }
}
