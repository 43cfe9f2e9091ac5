use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Message sent to the realtime service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionSettings },

    /// One base64-encoded PCM frame
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },

    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    #[serde(rename = "response.create")]
    ResponseCreate { response: ResponseOptions },
}

impl ClientEvent {
    pub fn append_audio(pcm: &[u8]) -> Self {
        use base64::Engine;
        Self::InputAudioBufferAppend {
            audio: base64::engine::general_purpose::STANDARD.encode(pcm),
        }
    }

    pub fn commit() -> Self {
        Self::InputAudioBufferCommit
    }

    pub fn create_text_response() -> Self {
        Self::ResponseCreate {
            response: ResponseOptions {
                modalities: vec!["text".to_string()],
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| StreamError::transport(format!("failed to encode client event: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOptions {
    pub modalities: Vec<String>,
}

/// Body of the `session.update` configuration message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub input_audio_format: String,
    /// `null` disables server-side turn detection
    pub turn_detection: Option<TurnDetectionSettings>,
    pub input_audio_transcription: Option<serde_json::Value>,
    pub tool_choice: String,
    pub temperature: f32,
    pub max_response_output_tokens: MaxTokens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetectionSettings {
    #[serde(rename = "type")]
    pub kind: String,
    pub create_response: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub eagerness: Option<String>,
}

/// Either a token count or the literal `"inf"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    Limit(u32),
    Unlimited(String),
}

impl MaxTokens {
    pub fn unlimited() -> Self {
        Self::Unlimited("inf".to_string())
    }
}

/// Message received from the realtime service
///
/// Only the events the pump acts on are modelled; every other `type` lands
/// in [`ServerEvent::Other`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: serde_json::Value,
    },

    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: serde_json::Value,
    },

    #[serde(rename = "response.text.delta")]
    ResponseTextDelta { delta: String },

    #[serde(rename = "response.text.done")]
    ResponseTextDone { text: String },

    #[serde(rename = "error")]
    Error { error: ServerError },

    #[serde(other)]
    Other,
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StreamError::malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}
