use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::relay::RelayState;

/// Why a relay session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndReason {
    /// The peer closed the socket (or the stream ended)
    PeerClosed {
        code: Option<u16>,
        reason: Option<String>,
    },
    /// The speech adapter ended the session
    AdapterTerminated,
    /// The session was aborted
    Error { kind: String, message: String },
}

/// Statistics about a relay session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Server-generated id of the socket connection
    pub connection_id: String,

    /// Call id from the handshake, if one was received
    pub call_id: Option<String>,

    /// When the socket was accepted
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// States the relay passed through, in order
    pub states: Vec<RelayState>,

    pub end_reason: EndReason,

    /// Caller audio messages forwarded to the adapter
    pub chunks_forwarded: usize,

    /// Caller audio bytes forwarded to the adapter
    pub bytes_forwarded: usize,

    /// Translation results delivered by the adapter
    pub results_received: usize,

    /// Wire frames written to the socket
    pub frames_sent: usize,

    /// Synthesized audio bytes written to the socket
    pub bytes_sent: usize,

    /// Synthesized bytes never sent (partial tail frames)
    pub bytes_dropped: usize,

    /// Synthesized buffers still queued at teardown
    pub buffers_discarded: usize,
}

impl SessionStats {
    pub fn entered(&self, state: RelayState) -> bool {
        self.states.contains(&state)
    }
}
