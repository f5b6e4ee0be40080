//! Speech translation adapter contract
//!
//! The relay never talks to a speech pipeline directly. It talks to a
//! [`TranslationAdapter`], which:
//! - reads caller audio from an [`AudioInputReader`]
//! - recognises, translates and synthesizes utterances
//! - delivers each [`TranslationResult`] to a [`ResultSink`]
//!
//! `start` hands back a [`Subscription`] whose `stop` detaches the sink and
//! halts the pipeline.

mod stream;
mod subscription;

pub use stream::{audio_input, AudioInputReader, AudioInputWriter};
pub use subscription::{ResultCallback, ResultSink, Subscription};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Source and target language of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub spoken: String,
    pub translated: String,
}

impl LanguagePair {
    pub fn new(spoken: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            spoken: spoken.into(),
            translated: translated.into(),
        }
    }

    /// Key the speech service files translations under (`es-MX` -> `es`)
    pub fn translation_key(&self) -> &str {
        primary_subtag(&self.translated)
    }

    /// Check both tags against the languages the speech service accepts.
    /// An empty list accepts any well-formed tag.
    pub fn validate(&self, supported: &[String]) -> Result<(), RelayError> {
        for tag in [&self.spoken, &self.translated] {
            if !is_well_formed(tag) {
                return Err(RelayError::UnsupportedLanguage(format!(
                    "malformed language tag {:?}",
                    tag
                )));
            }

            if !supported.is_empty() && !supported.iter().any(|s| s.eq_ignore_ascii_case(tag)) {
                return Err(RelayError::UnsupportedLanguage(tag.clone()));
            }
        }

        Ok(())
    }
}

fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

fn is_well_formed(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Everything an adapter needs to open a speech session
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub call_id: String,
    pub languages: LanguagePair,
    /// Sample rate of the 16-bit mono PCM pushed into the session
    pub sample_rate: u32,
}

/// One recognised, translated and synthesized utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub call_id: String,
    pub language_spoken: String,
    pub language_translated: String,
    /// Translated text
    pub text: String,
    /// Synthesized speech for `text` (raw PCM, unframed)
    pub audio: Vec<u8>,
}

/// Speech translation capability, one instance per connection
///
/// Implementations:
/// - NATS speech bus (`crate::nats::NatsTranslationAdapter`)
#[async_trait]
pub trait TranslationAdapter: Send {
    /// Open a recognition/translation/synthesis session
    ///
    /// Fails with `Configuration` when credentials are missing or rejected and
    /// `UnsupportedLanguage` when either tag is not accepted.
    async fn start(
        &mut self,
        request: &StartRequest,
        audio: AudioInputReader,
        sink: ResultSink,
    ) -> Result<Subscription, RelayError>;

    /// Adapter name for logging
    fn name(&self) -> &str;
}

/// Builds a fresh adapter for every connection
pub trait AdapterFactory: Send + Sync {
    fn create(&self) -> Box<dyn TranslationAdapter>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<String> {
        vec!["en-US".to_string(), "es-MX".to_string()]
    }

    #[test]
    fn test_translation_key_uses_primary_subtag() {
        assert_eq!(LanguagePair::new("en-US", "es-MX").translation_key(), "es");
        assert_eq!(LanguagePair::new("en-US", "fr").translation_key(), "fr");
    }

    #[test]
    fn test_validate_accepts_supported_pair_case_insensitively() {
        assert!(LanguagePair::new("en-us", "ES-MX").validate(&supported()).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let err = LanguagePair::new("en-US", "xx-YY")
            .validate(&supported())
            .unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedLanguage(tag) if tag == "xx-YY"));
    }

    #[test]
    fn test_validate_rejects_malformed_tag() {
        assert!(LanguagePair::new("", "es-MX").validate(&[]).is_err());
        assert!(LanguagePair::new("en--US", "es-MX").validate(&[]).is_err());
        assert!(LanguagePair::new("en US", "es-MX").validate(&[]).is_err());
    }

    #[test]
    fn test_empty_supported_list_accepts_any_tag() {
        assert!(LanguagePair::new("sw-KE", "tl").validate(&[]).is_ok());
    }
}
