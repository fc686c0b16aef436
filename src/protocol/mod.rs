pub mod codec;
pub mod messages;

pub use messages::{InboundEnvelope, ProcessAudioEnvelope, ProtocolMessage};
