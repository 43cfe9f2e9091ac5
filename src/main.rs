use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use live_translate::config::{resolve_api_key, TurnDetection};
use live_translate::{Config, FrameSource, LiveSession, SessionOptions, TranscriptEvent};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Live audio transcription and translation
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Source language
    #[arg(short = 's', long = "source-lang")]
    source_lang: String,

    /// Target language
    #[arg(short = 't', long = "target-lang")]
    target_lang: String,

    /// Config file (defaults to config/live-translate.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service token (defaults to $OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Samples per audio frame
    #[arg(long)]
    frame_size: Option<usize>,

    /// Frames between buffer commits (0 disables)
    #[arg(long)]
    commit_every: Option<u32>,

    /// Frames between response requests (0 disables)
    #[arg(long)]
    response_every: Option<u32>,

    /// Turn detection mode
    #[arg(long, value_enum)]
    turn_detection: Option<TurnDetection>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(frame_size) = args.frame_size {
        cfg.audio.frame_size = frame_size;
    }
    if let Some(n) = args.commit_every {
        cfg.pump.commit_every = Some(n);
    }
    if let Some(n) = args.response_every {
        cfg.pump.response_every = Some(n);
    }
    if let Some(mode) = args.turn_detection {
        cfg.session.turn_detection = mode;
    }
    cfg.validate()?;

    let api_key = resolve_api_key(args.api_key)?;
    let options = SessionOptions::from_defaults(args.source_lang, args.target_lang, &cfg.session);
    let source = microphone(&cfg)?;

    info!("Press Ctrl-C to stop");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_transcripts(events_rx));

    let session = LiveSession::new(cfg, options, api_key);
    let stats = session.run(source, events_tx).await?;

    printer.await?;

    info!(
        "Streamed {} frames, received {} translations ({} malformed messages skipped)",
        stats.frames_sent, stats.final_events, stats.malformed_skipped
    );

    Ok(())
}

#[cfg(feature = "cpal-audio")]
fn microphone(cfg: &Config) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(live_translate::audio::MicrophoneSource::new(
        cfg.audio.device.clone(),
    )))
}

#[cfg(not(feature = "cpal-audio"))]
fn microphone(_cfg: &Config) -> Result<Box<dyn FrameSource>> {
    Err(live_translate::StreamError::device(
        "built without microphone support (`--no-default-features`), rebuild with the `cpal-audio` feature",
    )
    .into())
}

/// Interim text is redrawn on one line; final text gets its own line
async fn print_transcripts(mut events: mpsc::UnboundedReceiver<TranscriptEvent>) {
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        match event {
            TranscriptEvent::Interim(text) => {
                print!("\r\x1b[K{}", text);
            }
            TranscriptEvent::Final(text) => {
                println!("\r\x1b[K{}", text);
            }
        }
        stdout.flush().ok();
    }
}
