use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use std::borrow::Cow;

use crate::audio::WireFrame;
use crate::error::RelayError;

/// Close code and reason of a WebSocket close handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// One message read from the audio socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// Ping/pong, answered by the transport
    Control,
    /// Peer closed the stream (or it ended without a close frame)
    Close(Option<CloseReason>),
}

/// Bidirectional audio socket driven by the relay loop
#[async_trait]
pub trait AudioSocket: Send {
    async fn recv(&mut self) -> Result<Inbound, RelayError>;

    /// Write one wire frame. `frame.is_final` marks the last frame of a
    /// synthesized buffer for transports that fragment messages.
    async fn send_frame(&mut self, frame: &WireFrame<'_>) -> Result<(), RelayError>;

    async fn close(&mut self, reason: Option<CloseReason>) -> Result<(), RelayError>;
}

// Each wire frame goes out as its own binary message, which is what the
// telephony platform expects for 20ms frames.
#[async_trait]
impl AudioSocket for WebSocket {
    async fn recv(&mut self) -> Result<Inbound, RelayError> {
        match WebSocket::recv(self).await {
            None => Ok(Inbound::Close(None)),
            Some(Err(e)) => Err(RelayError::Transport(e.to_string())),
            Some(Ok(Message::Binary(data))) => Ok(Inbound::Binary(data)),
            Some(Ok(Message::Text(text))) => Ok(Inbound::Text(text)),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => Ok(Inbound::Control),
            Some(Ok(Message::Close(frame))) => Ok(Inbound::Close(frame.map(|f| CloseReason {
                code: f.code,
                reason: f.reason.into_owned(),
            }))),
        }
    }

    async fn send_frame(&mut self, frame: &WireFrame<'_>) -> Result<(), RelayError> {
        self.send(Message::Binary(frame.chunk.to_vec()))
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }

    async fn close(&mut self, reason: Option<CloseReason>) -> Result<(), RelayError> {
        let frame = reason.map(|r| CloseFrame {
            code: r.code,
            reason: Cow::Owned(r.reason),
        });

        self.send(Message::Close(frame))
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }
}
