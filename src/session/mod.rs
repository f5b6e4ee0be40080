//! Audio relay sessions
//!
//! One session per accepted audio socket:
//! - `SessionResources` allocates the adapter, audio input stream and
//!   outbound queue up front and releases them exactly once
//! - `AudioRelay` runs the handshake / streaming / draining state machine
//! - `SessionStats` summarises the session when it ends

mod connection;
mod relay;
mod resources;
mod socket;
mod stats;

pub use connection::ConnectionSession;
pub use relay::{AudioRelay, RelaySettings, RelayState};
pub use resources::{OutboundSender, SessionResources};
pub use socket::{AudioSocket, CloseReason, Inbound};
pub use stats::{EndReason, SessionStats};
