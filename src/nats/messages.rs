use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RelayError;
use crate::translation::{LanguagePair, StartRequest, TranslationResult};

/// Asks the speech worker to open a session for a call
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStartMessage {
    pub session_id: String,
    pub source_language: String,
    pub target_language: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
}

/// Tells the speech worker the call is over
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStopMessage {
    pub session_id: String,
    pub timestamp: String,
}

/// Caller audio frame published to the speech worker
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String,
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Recognised utterance returned by the speech worker
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TranslationResultMessage {
    pub session_id: String,

    /// Translated text keyed by language (`es`, or a full tag such as `es-MX`)
    #[serde(default)]
    pub translations: HashMap<String, String>,

    /// Base64-encoded synthesized PCM for the translation
    #[serde(default)]
    pub audio: String,

    /// Set when the worker failed to process an utterance
    #[serde(default)]
    pub error: Option<String>,

    /// Set when the worker has ended the session
    #[serde(default)]
    pub terminal: bool,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl SessionStartMessage {
    pub fn new(request: &StartRequest) -> Self {
        Self {
            session_id: request.call_id.clone(),
            source_language: request.languages.spoken.clone(),
            target_language: request.languages.translated.clone(),
            sample_rate: request.sample_rate,
            channels: 1,
            timestamp: now(),
        }
    }
}

impl SessionStopMessage {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            timestamp: now(),
        }
    }
}

impl AudioFrameMessage {
    /// Mono caller audio; an empty final frame marks the end of the stream
    pub fn new(session_id: &str, pcm: &[u8], sample_rate: u32, sequence: u32, final_frame: bool) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm),
            sample_rate,
            channels: 1,
            timestamp: now(),
            final_frame,
        }
    }
}

impl TranslationResultMessage {
    /// Pick the translation for the call's target language
    pub fn translation_for(&self, languages: &LanguagePair) -> Option<&str> {
        [languages.translation_key(), languages.translated.as_str()]
            .iter()
            .find_map(|key| {
                self.translations
                    .iter()
                    .find(|(lang, _)| lang.eq_ignore_ascii_case(key))
                    .map(|(_, text)| text.as_str())
            })
    }

    pub fn into_result(self, languages: &LanguagePair) -> Result<TranslationResult, RelayError> {
        if let Some(error) = self.error {
            return Err(RelayError::AdapterInternal(error));
        }

        let text = self
            .translation_for(languages)
            .ok_or_else(|| {
                RelayError::AdapterInternal(format!(
                    "no translation for {} in result",
                    languages.translation_key()
                ))
            })?
            .to_string();

        let audio = base64::engine::general_purpose::STANDARD
            .decode(&self.audio)
            .map_err(|e| RelayError::AdapterInternal(format!("invalid synthesized audio: {}", e)))?;

        Ok(TranslationResult {
            call_id: self.session_id,
            language_spoken: languages.spoken.clone(),
            language_translated: languages.translated.clone(),
            text,
            audio,
        })
    }
}
