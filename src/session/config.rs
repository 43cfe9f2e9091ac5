use serde::{Deserialize, Serialize};

use crate::config::{Eagerness, SessionDefaults, TurnDetection};
use crate::realtime::messages::{MaxTokens, SessionSettings, TurnDetectionSettings};

/// Per-run options for a translation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Language spoken into the microphone
    pub source_lang: String,

    /// Language the translation is produced in
    pub target_lang: String,

    pub turn_detection: TurnDetection,

    /// Only used with semantic VAD
    pub eagerness: Eagerness,

    pub temperature: f32,

    /// Overrides the generated translator instructions
    pub instructions: Option<String>,
}

impl SessionOptions {
    pub fn new(source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self::from_defaults(source_lang, target_lang, &SessionDefaults::default())
    }

    pub fn from_defaults(
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        defaults: &SessionDefaults,
    ) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            turn_detection: defaults.turn_detection,
            eagerness: defaults.eagerness,
            temperature: defaults.temperature,
            instructions: defaults.instructions.clone(),
        }
    }

    /// Live translator prompt for this language pair
    pub fn instructions(&self) -> String {
        if let Some(custom) = &self.instructions {
            return custom.clone();
        }

        format!(
            "You are a live translator. Translate what you hear from {source} into {target} \
             as it is spoken. Reply with the {target} translation only, never the {source} \
             source text and never any commentary. When there is no speech, reply with '...'. \
             Keep each translation natural and consistent with what you translated before.",
            source = self.source_lang,
            target = self.target_lang,
        )
    }

    /// Body of the `session.update` message
    pub fn settings(&self) -> SessionSettings {
        let turn_detection = match self.turn_detection {
            TurnDetection::None => None,
            TurnDetection::ServerVad => Some(TurnDetectionSettings {
                kind: "server_vad".to_string(),
                create_response: true,
                eagerness: None,
            }),
            TurnDetection::SemanticVad => Some(TurnDetectionSettings {
                kind: "semantic_vad".to_string(),
                create_response: true,
                eagerness: Some(self.eagerness.as_str().to_string()),
            }),
        };

        SessionSettings {
            modalities: vec!["text".to_string()],
            instructions: self.instructions(),
            input_audio_format: "pcm16".to_string(),
            turn_detection,
            input_audio_transcription: None,
            tool_choice: "auto".to_string(),
            temperature: self.temperature,
            max_response_output_tokens: MaxTokens::unlimited(),
        }
    }
}
