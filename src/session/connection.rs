use crate::error::RelayError;
use crate::message::TranslationMessage;
use crate::translation::LanguagePair;

/// The call served by one audio socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSession {
    /// Correlation key supplied by the telephony platform
    pub call_id: String,
    pub languages: LanguagePair,
    pub open: bool,
}

impl ConnectionSession {
    /// Parse the first socket message. The platform may deliver it zero-padded
    /// to the receive buffer size, so trailing NULs and whitespace are ignored.
    pub fn from_handshake(payload: &[u8]) -> Result<Self, RelayError> {
        let end = payload
            .iter()
            .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);

        let message: TranslationMessage = serde_json::from_slice(&payload[..end])
            .map_err(|e| RelayError::Protocol(format!("invalid call configuration: {}", e)))?;

        if message.uuid.trim().is_empty() {
            return Err(RelayError::Protocol("call configuration has no UUID".to_string()));
        }

        Ok(Self {
            languages: message.languages(),
            call_id: message.uuid,
            open: true,
        })
    }
}
