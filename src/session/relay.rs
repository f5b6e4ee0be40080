use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::connection::ConnectionSession;
use super::resources::SessionResources;
use super::socket::{AudioSocket, CloseReason, Inbound};
use super::stats::{EndReason, SessionStats};
use crate::audio::FrameCodec;
use crate::captions::CaptionPublisher;
use crate::config::Config;
use crate::error::{RelayError, CLOSE_INTERNAL_ERROR};
use crate::message::TranslationMessage;
use crate::translation::{AdapterFactory, ResultCallback, StartRequest, TranslationResult};

/// Lifecycle of one audio socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Handshaking,
    Streaming,
    Draining,
    Closed,
}

/// Knobs the relay loop needs from configuration
#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub codec: FrameCodec,
    /// Sample rate of the caller audio handed to the adapter
    pub sample_rate: u32,
    /// Upper bound on how long adapter shutdown may take
    pub stop_timeout: Duration,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        Ok(Self {
            codec: FrameCodec::new(config.relay.frame_size, config.relay.remainder)?,
            sample_rate: config.relay.sample_rate,
            stop_timeout: config.speech.stop_timeout(),
        })
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            codec: FrameCodec::default(),
            sample_rate: 16000,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

enum Handshake {
    Session(ConnectionSession),
    Closed(Option<CloseReason>),
}

#[derive(Default)]
struct Counters {
    chunks_forwarded: usize,
    bytes_forwarded: usize,
    frames_sent: usize,
    bytes_sent: usize,
    bytes_dropped: usize,
}

/// Relays one call's audio between the socket and a speech adapter
///
/// The loop is sequential: each iteration first flushes every synthesized
/// buffer queued by the adapter, then blocks on one inbound message. Results
/// arrive on the adapter's own task and only touch the outbound queue and the
/// caption publisher.
pub struct AudioRelay<S> {
    socket: S,
    connection_id: String,
    captions: Arc<dyn CaptionPublisher>,
    settings: RelaySettings,
    resources: SessionResources,
    session: Option<ConnectionSession>,
    state: RelayState,
    history: Vec<RelayState>,
    results: Arc<AtomicUsize>,
    counters: Counters,
}

impl<S: AudioSocket> AudioRelay<S> {
    /// Bind a freshly accepted socket to a new adapter instance. Resources are
    /// acquired immediately, before the handshake.
    pub fn new(
        socket: S,
        factory: &dyn AdapterFactory,
        captions: Arc<dyn CaptionPublisher>,
        settings: RelaySettings,
    ) -> Self {
        let resources = SessionResources::acquire(factory, settings.stop_timeout);

        Self {
            socket,
            connection_id: uuid::Uuid::new_v4().to_string(),
            captions,
            settings,
            resources,
            session: None,
            state: RelayState::Handshaking,
            history: vec![RelayState::Handshaking],
            results: Arc::new(AtomicUsize::new(0)),
            counters: Counters::default(),
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Serve the socket until it closes. Never fails: every error is logged,
    /// and every exit path goes through the same teardown.
    pub async fn run(mut self) -> SessionStats {
        let started_at = Utc::now();
        info!("Audio socket accepted (connection {})", self.connection_id);

        let end_reason = match self.serve().await {
            Ok(reason) => reason,
            Err(e) => self.abort(e).await,
        };

        let buffers_discarded = self.teardown().await;

        let stats = SessionStats {
            connection_id: self.connection_id.clone(),
            call_id: self.session.as_ref().map(|s| s.call_id.clone()),
            started_at,
            duration_secs: Utc::now()
                .signed_duration_since(started_at)
                .num_milliseconds() as f64
                / 1000.0,
            states: self.history.clone(),
            end_reason,
            chunks_forwarded: self.counters.chunks_forwarded,
            bytes_forwarded: self.counters.bytes_forwarded,
            results_received: self.results.load(Ordering::SeqCst),
            frames_sent: self.counters.frames_sent,
            bytes_sent: self.counters.bytes_sent,
            bytes_dropped: self.counters.bytes_dropped,
            buffers_discarded,
        };

        info!(
            "Session {} closed: call={:?}, {:.1}s, {} chunks in, {} results, {} frames out, {} bytes dropped",
            stats.connection_id,
            stats.call_id,
            stats.duration_secs,
            stats.chunks_forwarded,
            stats.results_received,
            stats.frames_sent,
            stats.bytes_dropped
        );

        stats
    }

    fn transition(&mut self, next: RelayState) {
        if self.state == next {
            return;
        }
        debug!(
            "Connection {}: {:?} -> {:?}",
            self.connection_id, self.state, next
        );
        self.state = next;
        self.history.push(next);
    }

    async fn serve(&mut self) -> Result<EndReason, RelayError> {
        let session = match self.handshake().await? {
            Handshake::Session(session) => session,
            Handshake::Closed(reason) => {
                info!("Socket closed before handshake");
                return Ok(peer_closed(reason));
            }
        };

        info!(
            "Handshake complete: call {} ({} -> {})",
            session.call_id, session.languages.spoken, session.languages.translated
        );

        let request = StartRequest {
            call_id: session.call_id.clone(),
            languages: session.languages.clone(),
            sample_rate: self.settings.sample_rate,
        };
        self.session = Some(session);

        let on_result = self.result_callback()?;
        self.resources.start(&request, on_result).await?;

        self.transition(RelayState::Streaming);
        self.stream().await
    }

    async fn handshake(&mut self) -> Result<Handshake, RelayError> {
        loop {
            match self.socket.recv().await? {
                Inbound::Text(text) => {
                    return ConnectionSession::from_handshake(text.as_bytes()).map(Handshake::Session)
                }
                Inbound::Binary(data) => {
                    return ConnectionSession::from_handshake(&data).map(Handshake::Session)
                }
                Inbound::Control => continue,
                Inbound::Close(reason) => return Ok(Handshake::Closed(reason)),
            }
        }
    }

    /// Results feed captions and the outbound queue from the adapter's task
    fn result_callback(&self) -> Result<ResultCallback, RelayError> {
        let outbound = self.resources.outbound_sender()?;
        let captions = Arc::clone(&self.captions);
        let results = Arc::clone(&self.results);

        Ok(Box::new(move |result: TranslationResult| {
            results.fetch_add(1, Ordering::SeqCst);
            captions.publish(TranslationMessage::from(&result));
            if outbound.send(result.audio).is_err() {
                debug!("Outbound queue closed, dropping synthesized audio");
            }
        }))
    }

    async fn stream(&mut self) -> Result<EndReason, RelayError> {
        loop {
            self.flush_outbound().await?;

            match self.socket.recv().await? {
                Inbound::Binary(pcm) => {
                    self.counters.chunks_forwarded += 1;
                    self.counters.bytes_forwarded += pcm.len();
                    self.resources.push_audio(pcm);
                }
                Inbound::Text(text) => {
                    warn!("Ignoring {} byte text message mid-stream", text.len());
                }
                Inbound::Control => {}
                Inbound::Close(reason) => {
                    self.transition(RelayState::Draining);
                    info!("Peer closed audio socket ({:?})", reason);
                    if let Err(e) = self.socket.close(reason.clone()).await {
                        debug!("Close handshake already complete: {}", e);
                    }
                    return Ok(peer_closed(reason));
                }
            }

            if self.resources.adapter_terminated() {
                self.transition(RelayState::Draining);
                warn!("Speech adapter ended the session");
                let reason = CloseReason::new(CLOSE_INTERNAL_ERROR, "speech session ended");
                if let Err(e) = self.socket.close(Some(reason)).await {
                    debug!("Failed to close socket: {}", e);
                }
                return Ok(EndReason::AdapterTerminated);
            }
        }
    }

    /// Frame and send every queued buffer, one buffer at a time
    async fn flush_outbound(&mut self) -> Result<(), RelayError> {
        let codec = self.settings.codec;

        while let Some(buffer) = self.resources.next_outbound() {
            for frame in codec.frames(&buffer) {
                self.socket.send_frame(&frame).await?;
                self.counters.frames_sent += 1;
                self.counters.bytes_sent += frame.len();
            }
            self.counters.bytes_dropped += codec.dropped_bytes(buffer.len());
        }

        Ok(())
    }

    async fn abort(&mut self, e: RelayError) -> EndReason {
        match &e {
            RelayError::Transport(_) | RelayError::Protocol(_) => {
                warn!("Connection {} aborted: {}", self.connection_id, e)
            }
            _ => error!("Connection {} aborted: {}", self.connection_id, e),
        }

        if self.state == RelayState::Streaming {
            self.transition(RelayState::Draining);
        }

        if let Some(code) = e.close_code() {
            let reason = CloseReason::new(code, e.kind());
            if let Err(close_err) = self.socket.close(Some(reason)).await {
                debug!("Failed to close socket: {}", close_err);
            }
        }

        EndReason::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }

    async fn teardown(&mut self) -> usize {
        self.transition(RelayState::Closed);
        if let Some(session) = self.session.as_mut() {
            session.open = false;
        }
        self.resources.release().await
    }
}

fn peer_closed(reason: Option<CloseReason>) -> EndReason {
    match reason {
        Some(r) => EndReason::PeerClosed {
            code: Some(r.code),
            reason: Some(r.reason),
        },
        None => EndReason::PeerClosed {
            code: None,
            reason: None,
        },
    }
}
