mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use call_translator::config::Config;
use call_translator::http::{create_router, AppState};
use call_translator::translation::AdapterFactory;
use common::{FakeFactory, WAIT};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

fn app_state(config: Config) -> (AppState, Arc<FakeFactory>) {
    let factory = Arc::new(FakeFactory::default());
    let adapters: Arc<dyn AdapterFactory> = factory.clone();
    (AppState::new(config, adapters).unwrap(), factory)
}

async fn get(state: AppState, uri: &str, host: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(uri);
    if let Some(host) = host {
        request = request.header(header::HOST, host);
    }

    create_router(state)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_health_check() {
    let (state, _) = app_state(Config::default());

    let response = get(state, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_answer_webhook_points_platform_at_socket() {
    let (state, _) = app_state(Config::default());

    let response = get(state, "/webhooks/answer?uuid=call-42", Some("relay.example.com")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!([{
            "action": "connect",
            "endpoint": [{
                "type": "websocket",
                "uri": "ws://relay.example.com/ws",
                "content-type": "audio/l16;rate=16000",
                "headers": {
                    "UUID": "call-42",
                    "LanguageSpoken": "en-US",
                    "LanguageTranslated": "es-MX"
                }
            }]
        }])
    );
}

#[tokio::test]
async fn test_answer_webhook_prefers_configured_host() {
    let mut config = Config::default();
    config.service.public_host = Some("public.example.com".to_string());
    config.call.language_translated = "fr-FR".to_string();
    let (state, _) = app_state(config);

    let response = get(state, "/webhooks/answer?uuid=call-42", Some("10.0.0.5:5000")).await;
    let body = json_body(response).await;

    let endpoint = &body[0]["endpoint"][0];
    assert_eq!(endpoint["uri"], "ws://public.example.com/ws");
    assert_eq!(endpoint["headers"]["LanguageTranslated"], "fr-FR");
}

#[tokio::test]
async fn test_answer_webhook_without_host() {
    let (state, _) = app_state(Config::default());

    let response = get(state, "/webhooks/answer?uuid=call-42", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_caption_stream_is_event_stream() {
    let (state, _) = app_state(Config::default());
    let captions = state.captions.clone();

    let response = get(state, "/captions?uuid=call-42", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(captions.observer_count(), 1);
}

#[tokio::test]
async fn test_audio_socket_end_to_end() {
    let (state, factory) = app_state(Config::default());
    let mut captions = state.captions.subscribe(None);
    let active = state.active_sessions.clone();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();

    client
        .send(Message::Text(
            r#"{"UUID":"call-e2e","LanguageSpoken":"en-US","LanguageTranslated":"es-MX"}"#.to_string(),
        ))
        .await
        .unwrap();
    client.send(Message::Binary(vec![7; 640])).await.unwrap();

    eventually(|| factory.created() == 1).await;
    let probe = factory.probe(0);
    probe.wait_started().await;
    assert_eq!(probe.request().unwrap().call_id, "call-e2e");
    eventually(|| probe.audio().len() == 1).await;
    assert_eq!(active.load(Ordering::SeqCst), 1);

    assert!(probe.emit("hola", vec![9; 1280]));

    let caption = tokio::time::timeout(WAIT, captions.next()).await.unwrap().unwrap();
    assert_eq!(caption.uuid, "call-e2e");
    assert_eq!(caption.text.as_deref(), Some("hola"));

    // Queued audio goes out on the next pass through the loop
    client.send(Message::Binary(vec![8; 640])).await.unwrap();

    for _ in 0..2 {
        let message = tokio::time::timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        match message {
            Message::Binary(frame) => assert_eq!(frame, vec![9; 640]),
            other => panic!("expected binary frame, got {:?}", other),
        }
    }

    client.close(None).await.unwrap();
    eventually(|| probe.is_stopped()).await;
    eventually(|| active.load(Ordering::SeqCst) == 0).await;
}
