// Wire shapes of realtime protocol messages

use base64::Engine;
use live_translate::realtime::messages::{ClientEvent, ServerEvent};
use live_translate::StreamError;

#[test]
fn test_append_serialization() {
    let pcm: Vec<u8> = [100i16, -200, 300]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();

    let json = ClientEvent::append_audio(&pcm).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["type"], "input_audio_buffer.append");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value["audio"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, pcm);
}

#[test]
fn test_control_messages_exact_json() {
    assert_eq!(
        ClientEvent::commit().to_json().unwrap(),
        r#"{"type":"input_audio_buffer.commit"}"#
    );
    assert_eq!(
        ClientEvent::create_text_response().to_json().unwrap(),
        r#"{"type":"response.create","response":{"modalities":["text"]}}"#
    );
}

#[test]
fn test_text_delta_deserialization() {
    let event = ServerEvent::parse(
        r#"{"type":"response.text.delta","event_id":"ev_1","response_id":"r_1","delta":"Hola"}"#,
    )
    .unwrap();
    assert_eq!(
        event,
        ServerEvent::ResponseTextDelta {
            delta: "Hola".to_string()
        }
    );
}

#[test]
fn test_text_done_deserialization() {
    let event = ServerEvent::parse(r#"{"type":"response.text.done","text":"Hola mundo"}"#).unwrap();
    assert_eq!(
        event,
        ServerEvent::ResponseTextDone {
            text: "Hola mundo".to_string()
        }
    );
}

#[test]
fn test_unrecognised_types_are_ignored() {
    for json in [
        r#"{"type":"input_audio_buffer.committed","item_id":"x"}"#,
        r#"{"type":"response.done","response":{}}"#,
        r#"{"type":"conversation.item.created"}"#,
    ] {
        assert_eq!(ServerEvent::parse(json).unwrap(), ServerEvent::Other);
    }
}

#[test]
fn test_server_error_event() {
    let event = ServerEvent::parse(
        r#"{"type":"error","error":{"type":"invalid_request_error","code":"bad","message":"nope"}}"#,
    )
    .unwrap();

    match event {
        ServerEvent::Error { error } => {
            assert_eq!(error.code.as_deref(), Some("bad"));
            assert_eq!(error.message, "nope");
        }
        other => panic!("expected error event, got {:?}", other),
    }
}

#[test]
fn test_malformed_inputs() {
    for text in [
        "not json at all",
        r#"{"type":"response.text.delta"}"#,
        r#"["response.text.done"]"#,
    ] {
        let err = ServerEvent::parse(text).unwrap_err();
        assert!(matches!(err, StreamError::MalformedMessage { .. }), "{}", text);
        assert!(!err.is_fatal());
    }
}
