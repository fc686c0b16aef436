// Tests for wire-format classification and the audio text encoding
//
// Classification must place every inbound unit into exactly one kind and
// survive protocol drift; the base64 audio path must be a lossless
// round trip that rejects corrupt input.

use std::time::Duration;
use voicelink::capture::AudioClip;
use voicelink::error::ClientError;
use voicelink::protocol::{codec, ProtocolMessage};

#[test]
fn test_audio_encoding_round_trip() {
    let original: Vec<u8> = (0u8..=255).collect();

    let encoded = codec::encode_audio(&original);
    let decoded = codec::decode_audio(&encoded).unwrap();

    assert_eq!(decoded, original);
}

#[test]
fn test_decode_rejects_invalid_encoding() {
    let err = codec::decode_audio("definitely not base64!!!").unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[test]
fn test_decode_rejects_truncated_encoding() {
    let mut encoded = codec::encode_audio(&[1, 2, 3, 4, 5, 6, 7]);
    encoded.truncate(encoded.len() - 1);

    let err = codec::decode_audio(&encoded).unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[test]
fn test_classify_transcript() {
    let msg = codec::classify_text(r#"{"type":"transcript","text":"hello"}"#);
    assert_eq!(msg, ProtocolMessage::Transcript("hello".to_string()));
}

#[test]
fn test_classify_partial_and_final_response() {
    let partial = codec::classify_text(r#"{"type":"partial_response","text":"thinking"}"#);
    assert_eq!(
        partial,
        ProtocolMessage::TextDelta {
            text: "thinking".to_string(),
            last: false,
        }
    );

    let last = codec::classify_text(r#"{"type":"final_response","text":"done"}"#);
    assert_eq!(
        last,
        ProtocolMessage::TextDelta {
            text: "done".to_string(),
            last: true,
        }
    );
}

#[test]
fn test_classify_assistant_audio_decodes_payload() {
    let payload = vec![10u8, 20, 30, 40];
    let raw = format!(
        r#"{{"type":"assistant_audio","audio":"{}"}}"#,
        codec::encode_audio(&payload)
    );

    let msg = codec::classify_text(&raw);
    assert_eq!(msg, ProtocolMessage::AudioFrame(payload));
}

#[test]
fn test_classify_assistant_audio_with_bad_encoding_is_nonfatal() {
    let msg = codec::classify_text(r#"{"type":"assistant_audio","audio":"%%%%"}"#);
    assert!(matches!(msg, ProtocolMessage::DebugNotice(_)));
}

#[test]
fn test_classify_vad_error_debug_ping() {
    assert_eq!(
        codec::classify_text(r#"{"type":"vad_status","speech":true}"#),
        ProtocolMessage::VadStatus(true)
    );
    assert_eq!(
        codec::classify_text(r#"{"type":"error","message":"boom"}"#),
        ProtocolMessage::ErrorNotice("boom".to_string())
    );
    assert_eq!(
        codec::classify_text(r#"{"type":"debug","message":"trace"}"#),
        ProtocolMessage::DebugNotice("trace".to_string())
    );
    assert_eq!(
        codec::classify_text(r#"{"type":"ping"}"#),
        ProtocolMessage::ProcessControl
    );
}

#[test]
fn test_unknown_envelope_survives_as_debug_notice() {
    let msg = codec::classify_text(r#"{"type":"hologram","payload":42}"#);
    assert!(matches!(msg, ProtocolMessage::DebugNotice(_)));
}

#[test]
fn test_malformed_json_survives_as_debug_notice() {
    let msg = codec::classify_text("{not json at all");
    assert!(matches!(msg, ProtocolMessage::DebugNotice(_)));
}

#[test]
fn test_binary_frames_are_audio() {
    let msg = codec::classify_binary(vec![1, 2, 3]);
    assert_eq!(msg, ProtocolMessage::AudioFrame(vec![1, 2, 3]));
}

#[test]
fn test_process_audio_envelope_shape() {
    let clip = AudioClip {
        bytes: vec![9, 8, 7],
        mime_type: "audio/wav".to_string(),
        duration: Duration::from_millis(750),
    };

    let frame = codec::process_audio_frame(&clip, "session-abc").unwrap();
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

    assert_eq!(value["type"], "process_audio");
    assert_eq!(value["mimeType"], "audio/wav");
    assert_eq!(value["session_id"], "session-abc");

    let content = value["content"].as_str().unwrap();
    assert_eq!(codec::decode_audio(content).unwrap(), vec![9, 8, 7]);
}
