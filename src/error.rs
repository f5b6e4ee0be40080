use thiserror::Error;

/// Close code sent when the session is refused by configuration or language checks.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
/// Close code sent when the handshake payload could not be parsed.
pub const CLOSE_INVALID_PAYLOAD: u16 = 1007;
/// Close code sent when the speech adapter ended the session.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Everything that can end or degrade a relay session.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Speech credentials or region are missing or were rejected.
    #[error("Speech service configuration error: {0}")]
    Configuration(String),

    /// A language tag is not recognised by the speech service.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The first socket message was not a valid call configuration.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket I/O failed mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The speech adapter reported a failure of its own.
    #[error("Speech adapter error: {0}")]
    AdapterInternal(String),
}

impl RelayError {
    /// WebSocket close code to report to the peer, if the socket is still usable.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            RelayError::Configuration(_) | RelayError::UnsupportedLanguage(_) => {
                Some(CLOSE_POLICY_VIOLATION)
            }
            RelayError::Protocol(_) => Some(CLOSE_INVALID_PAYLOAD),
            RelayError::AdapterInternal(_) => Some(CLOSE_INTERNAL_ERROR),
            RelayError::Transport(_) => None,
        }
    }

    /// Short label used in logs and session stats.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration",
            RelayError::UnsupportedLanguage(_) => "unsupported_language",
            RelayError::Protocol(_) => "protocol",
            RelayError::Transport(_) => "transport",
            RelayError::AdapterInternal(_) => "adapter_internal",
        }
    }
}
