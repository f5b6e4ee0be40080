use base64::Engine;
use call_translator::error::RelayError;
use call_translator::nats::messages::{
    AudioFrameMessage, SessionStartMessage, SessionStopMessage, TranslationResultMessage,
};
use call_translator::translation::{LanguagePair, StartRequest};

fn es_mx() -> LanguagePair {
    LanguagePair::new("en-US", "es-MX")
}

fn request() -> StartRequest {
    StartRequest {
        call_id: "call-1".to_string(),
        languages: es_mx(),
        sample_rate: 16000,
    }
}

#[test]
fn test_caller_audio_frame_wire_format() {
    let pcm: Vec<u8> = (0..=255).collect();
    let msg = AudioFrameMessage::new("call-1", &pcm, 16000, 7, false);

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["session_id"], "call-1");
    assert_eq!(json["sequence"], 7);
    assert_eq!(json["sample_rate"], 16000);
    assert_eq!(json["channels"], 1);
    assert_eq!(json["final"], false);
    assert!(json.get("final_frame").is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(json["pcm"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, pcm);
}

#[test]
fn test_end_of_stream_marker_is_empty_final_frame() {
    let msg = AudioFrameMessage::new("call-1", &[], 16000, 42, true);

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["final"], true);
    assert_eq!(json["pcm"], "");
    assert_eq!(json["sequence"], 42);
}

#[test]
fn test_session_start_carries_call_languages() {
    let msg = SessionStartMessage::new(&request());

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["session_id"], "call-1");
    assert_eq!(json["source_language"], "en-US");
    assert_eq!(json["target_language"], "es-MX");
    assert_eq!(json["sample_rate"], 16000);
    assert_eq!(json["channels"], 1);
}

#[test]
fn test_session_stop_names_the_call() {
    let msg = SessionStopMessage::new("call-1");

    let json = serde_json::to_value(&msg).unwrap();
    let fields: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(fields, ["session_id", "timestamp"]);
    assert_eq!(json["session_id"], "call-1");
}

#[test]
fn test_result_decodes_text_and_audio() {
    let pcm: Vec<u8> = vec![1, 0, 2, 0, 3, 0];
    let json = format!(
        r#"{{
            "session_id": "call-1",
            "translations": {{"es": "Hola mundo"}},
            "audio": "{}"
        }}"#,
        base64::engine::general_purpose::STANDARD.encode(&pcm)
    );

    let msg: TranslationResultMessage = serde_json::from_str(&json).unwrap();
    assert!(!msg.terminal);

    let result = msg.into_result(&es_mx()).unwrap();
    assert_eq!(result.call_id, "call-1");
    assert_eq!(result.text, "Hola mundo");
    assert_eq!(result.audio, pcm);
    assert_eq!(result.language_spoken, "en-US");
    assert_eq!(result.language_translated, "es-MX");
}

#[test]
fn test_result_falls_back_to_full_language_tag() {
    let json = r#"{"session_id": "call-1", "translations": {"ES-mx": "Hola"}}"#;
    let msg: TranslationResultMessage = serde_json::from_str(json).unwrap();

    assert_eq!(msg.translation_for(&es_mx()), Some("Hola"));

    // Text-only result: no synthesized audio
    let result = msg.into_result(&es_mx()).unwrap();
    assert!(result.audio.is_empty());
}

#[test]
fn test_result_missing_target_language() {
    let json = r#"{"session_id": "call-1", "translations": {"fr": "Bonjour"}}"#;
    let msg: TranslationResultMessage = serde_json::from_str(json).unwrap();

    assert!(matches!(
        msg.into_result(&es_mx()),
        Err(RelayError::AdapterInternal(_))
    ));
}

#[test]
fn test_worker_error_message() {
    let json = r#"{"session_id": "call-1", "error": "synthesis failed", "terminal": true}"#;
    let msg: TranslationResultMessage = serde_json::from_str(json).unwrap();
    assert!(msg.terminal);

    match msg.into_result(&es_mx()) {
        Err(RelayError::AdapterInternal(e)) => assert_eq!(e, "synthesis failed"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_invalid_audio_is_adapter_error() {
    let json = r#"{"session_id": "call-1", "translations": {"es": "Hola"}, "audio": "***"}"#;
    let msg: TranslationResultMessage = serde_json::from_str(json).unwrap();

    assert!(matches!(
        msg.into_result(&es_mx()),
        Err(RelayError::AdapterInternal(_))
    ));
}
