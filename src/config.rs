use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::{BridgeConfig, CaptureParams};
use crate::error::StreamError;
use crate::realtime::PumpConfig;

/// Config file looked up when no explicit path is given (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config/live-translate";

/// Environment variable prefix, e.g. `LIVE_TRANSLATE__AUDIO__FRAME_SIZE=4800`
pub const ENV_PREFIX: &str = "LIVE_TRANSLATE";

/// Environment variable holding the service token
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub pump: PumpSettings,
    pub session: SessionDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub url: String,
    pub model: String,
    pub handshake_timeout_ms: u64,
    pub log_session: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.openai.com/v1/realtime".to_string(),
            model: "gpt-4o-realtime-preview".to_string(),
            handshake_timeout_ms: 10_000,
            log_session: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per frame (2400 = 100ms at 24kHz)
    pub frame_size: usize,
    pub poll_interval_ms: u64,
    pub join_timeout_ms: u64,
    /// Input device name, system default when unset
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            frame_size: 2_400,
            poll_interval_ms: 100,
            join_timeout_ms: 1_000,
            device: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PumpSettings {
    /// Frames between `input_audio_buffer.commit` messages (0 or unset disables)
    pub commit_every: Option<u32>,
    /// Frames between `response.create` messages (0 or unset disables)
    pub response_every: Option<u32>,
    pub receive_timeout_ms: u64,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            commit_every: Some(20),
            response_every: Some(40),
            receive_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TurnDetection {
    /// Client drives turns with commit/response cadences
    #[default]
    None,
    ServerVad,
    SemanticVad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eagerness {
    Low,
    Medium,
    #[default]
    High,
    Auto,
}

impl Eagerness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub turn_detection: TurnDetection,
    pub eagerness: Eagerness,
    pub temperature: f32,
    /// Replaces the generated translator instructions
    pub instructions: Option<String>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            turn_detection: TurnDetection::None,
            eagerness: Eagerness::High,
            temperature: 0.8,
            instructions: None,
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then `LIVE_TRANSLATE__*` variables
    ///
    /// With no explicit path the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.audio.frame_size == 0 {
            return Err(StreamError::config("audio.frame_size must be greater than zero"));
        }
        if self.audio.channels != 1 {
            return Err(StreamError::config(format!(
                "audio.channels must be 1 (mono), got {}",
                self.audio.channels
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(StreamError::config("audio.sample_rate must be greater than zero"));
        }
        if self.audio.poll_interval_ms == 0 {
            return Err(StreamError::config("audio.poll_interval_ms must be greater than zero"));
        }
        if self.service.handshake_timeout_ms == 0 {
            return Err(StreamError::config(
                "service.handshake_timeout_ms must be greater than zero",
            ));
        }
        if self.pump.receive_timeout_ms == 0 {
            return Err(StreamError::config("pump.receive_timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            params: CaptureParams {
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
                frame_size: self.audio.frame_size,
            },
            poll_interval: Duration::from_millis(self.audio.poll_interval_ms),
            join_timeout: Duration::from_millis(self.audio.join_timeout_ms),
        }
    }

    pub fn pump_config(&self) -> PumpConfig {
        PumpConfig {
            commit_every: self.pump.commit_every.filter(|n| *n > 0),
            response_every: self.pump.response_every.filter(|n| *n > 0),
            receive_timeout: Duration::from_millis(self.pump.receive_timeout_ms),
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.service.handshake_timeout_ms)
    }
}

/// Pick the service token: explicit value first, then `OPENAI_API_KEY`
pub fn resolve_api_key(explicit: Option<String>) -> crate::error::Result<String> {
    explicit
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| StreamError::config(format!("{} is not set", API_KEY_ENV)))
}
