use serde::{Deserialize, Serialize};

/// Classified inbound message. Every inbound unit maps to exactly one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    /// Audio payload for playback (already decoded from the wire encoding)
    AudioFrame(Vec<u8>),
    /// Keepalive / processing control signal, no payload
    ProcessControl,
    /// Assistant text, incremental; `last` marks the final revision
    TextDelta { text: String, last: bool },
    /// Recognized transcript of the user's utterance
    Transcript(String),
    /// Remote voice-activity signal
    VadStatus(bool),
    /// Remote-reported error, surfaced to the user
    ErrorNotice(String),
    /// Unrecognized or malformed inbound unit; logged, never fatal
    DebugNotice(String),
}

/// Inbound JSON envelopes, discriminated by `type`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEnvelope {
    #[serde(rename = "transcript")]
    Transcript { text: String },
    #[serde(rename = "partial_response")]
    PartialResponse { text: String },
    #[serde(rename = "final_response")]
    FinalResponse { text: String },
    #[serde(rename = "assistant_audio")]
    AssistantAudio {
        /// Base64-encoded audio bytes
        audio: String,
        #[serde(rename = "mimeType", default)]
        mime_type: Option<String>,
    },
    #[serde(rename = "vad_status")]
    VadStatus { speech: bool },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "debug")]
    Debug { message: String },
    #[serde(rename = "ping")]
    Ping,
}

/// Outbound control envelope carrying one finalized clip.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename = "process_audio")]
pub struct ProcessAudioEnvelope {
    /// Base64-encoded clip bytes
    pub content: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Session identity, attached to every outbound exchange
    pub session_id: String,
}
