use super::state::AppState;
use crate::captions::{CaptionPublisher, CaptionScope, CAPTION_EVENT};
use crate::message::TranslationMessage;
use crate::session::AudioRelay;
use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnswerQuery {
    /// Call id assigned by the telephony platform
    pub uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionQuery {
    /// Only honoured when captions are scoped per call
    pub uuid: Option<String>,
}

/// Call-control action telling the platform to stream audio to us
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectAction {
    pub action: String,
    pub endpoint: Vec<WebsocketEndpoint>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebsocketEndpoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
    #[serde(rename = "content-type")]
    pub content_type: String,
    /// Echoed back by the platform as the first socket message
    pub headers: TranslationMessage,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /webhooks/answer
/// Route an incoming call's audio to the relay socket
pub async fn answer_call(
    State(state): State<AppState>,
    Query(query): Query<AnswerQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let host = state.config.service.public_host.clone().or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    });

    let Some(host) = host else {
        error!("Answer webhook called without a Host header");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Cannot determine public host".to_string(),
            }),
        )
            .into_response();
    };

    let uuid = query.uuid.unwrap_or_default();
    info!("Answering call {}", uuid);

    let call = &state.config.call;
    let action = ConnectAction {
        action: "connect".to_string(),
        endpoint: vec![WebsocketEndpoint {
            kind: "websocket".to_string(),
            uri: format!("ws://{}/ws", host),
            content_type: format!("audio/l16;rate={}", state.relay.sample_rate),
            headers: TranslationMessage {
                uuid,
                text: None,
                language_spoken: call.language_spoken.clone(),
                language_translated: call.language_translated.clone(),
            },
        }],
    };

    (StatusCode::OK, Json(vec![action])).into_response()
}

/// GET /ws
/// Audio socket opened by the telephony platform
pub async fn audio_socket(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| async move {
        let captions: Arc<dyn CaptionPublisher> = state.captions.clone();
        let relay = AudioRelay::new(socket, state.adapters.as_ref(), captions, state.relay);

        let active = state.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Audio socket {} upgraded ({} active)", relay.connection_id(), active);
        relay.run().await;
        state.active_sessions.fetch_sub(1, Ordering::SeqCst);
    })
}

/// GET /captions
/// Server-sent event stream of translated captions
pub async fn caption_stream(
    State(state): State<AppState>,
    Query(query): Query<CaptionQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    if query.uuid.is_some() && state.captions.scope() == CaptionScope::All {
        debug!("Caption scope is 'all', ignoring call filter");
    }

    let observer = state.captions.subscribe(query.uuid);
    info!("Caption observer connected ({} total)", state.captions.observer_count());

    let events = observer
        .into_stream()
        .map(|caption| Event::default().event(CAPTION_EVENT).json_data(caption));

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
