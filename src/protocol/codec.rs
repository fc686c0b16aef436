use crate::capture::AudioClip;
use crate::error::Result;
use crate::protocol::messages::{InboundEnvelope, ProcessAudioEnvelope, ProtocolMessage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// Encode audio bytes for JSON-framed transports.
pub fn encode_audio(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Exact inverse of [`encode_audio`]. Truncated or invalid input yields a
/// typed decode error rather than corrupt bytes.
pub fn decode_audio(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// Classify one textual inbound unit.
///
/// Unknown or malformed envelopes classify as `DebugNotice`: the session
/// must survive protocol drift from the remote side.
pub fn classify_text(raw: &str) -> ProtocolMessage {
    match serde_json::from_str::<InboundEnvelope>(raw) {
        Ok(InboundEnvelope::Transcript { text }) => ProtocolMessage::Transcript(text),
        Ok(InboundEnvelope::PartialResponse { text }) => ProtocolMessage::TextDelta {
            text,
            last: false,
        },
        Ok(InboundEnvelope::FinalResponse { text }) => ProtocolMessage::TextDelta {
            text,
            last: true,
        },
        Ok(InboundEnvelope::AssistantAudio { audio, .. }) => match decode_audio(&audio) {
            Ok(bytes) => ProtocolMessage::AudioFrame(bytes),
            Err(e) => {
                debug!("Undecodable assistant audio: {}", e);
                ProtocolMessage::DebugNotice(format!("undecodable assistant audio: {}", e))
            }
        },
        Ok(InboundEnvelope::VadStatus { speech }) => ProtocolMessage::VadStatus(speech),
        Ok(InboundEnvelope::Error { message }) => ProtocolMessage::ErrorNotice(message),
        Ok(InboundEnvelope::Debug { message }) => ProtocolMessage::DebugNotice(message),
        Ok(InboundEnvelope::Ping) => ProtocolMessage::ProcessControl,
        Err(e) => {
            debug!("Unrecognized envelope ({}): {}", e, truncate(raw, 120));
            ProtocolMessage::DebugNotice(format!("unrecognized envelope: {}", truncate(raw, 120)))
        }
    }
}

/// Classify one binary inbound unit. Binary frames are always audio.
pub fn classify_binary(bytes: Vec<u8>) -> ProtocolMessage {
    ProtocolMessage::AudioFrame(bytes)
}

/// Serialize a finalized clip as a `process_audio` control envelope.
pub fn process_audio_frame(clip: &AudioClip, session_id: &str) -> Result<String> {
    let envelope = ProcessAudioEnvelope {
        content: encode_audio(&clip.bytes),
        mime_type: clip.mime_type.clone(),
        session_id: session_id.to_string(),
    };
    serde_json::to_string(&envelope)
        .map_err(|e| crate::error::ClientError::Transport(format!("envelope encode: {}", e)))
}

fn truncate(raw: &str, max: usize) -> &str {
    match raw.char_indices().nth(max) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
