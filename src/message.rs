use serde::{Deserialize, Serialize};

use crate::translation::{LanguagePair, TranslationResult};

/// Call description exchanged with the telephony platform and browser clients
///
/// The same JSON shape is used for:
/// - the first message on the audio socket (call id + languages, no text)
/// - the headers in the answer webhook
/// - each caption pushed to observers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationMessage {
    #[serde(rename = "UUID")]
    pub uuid: String,

    #[serde(rename = "Text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(rename = "LanguageSpoken")]
    pub language_spoken: String,

    #[serde(rename = "LanguageTranslated")]
    pub language_translated: String,
}

impl TranslationMessage {
    pub fn languages(&self) -> LanguagePair {
        LanguagePair::new(&self.language_spoken, &self.language_translated)
    }
}

impl From<&TranslationResult> for TranslationMessage {
    fn from(result: &TranslationResult) -> Self {
        Self {
            uuid: result.call_id.clone(),
            text: Some(result.text.clone()),
            language_spoken: result.language_spoken.clone(),
            language_translated: result.language_translated.clone(),
        }
    }
}
