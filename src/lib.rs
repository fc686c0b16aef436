pub mod capture;
pub mod config;
pub mod error;
pub mod playback;
pub mod protocol;
pub mod session;
pub mod transport;

pub use capture::{
    AudioChunk, AudioClip, CaptureDevice, CaptureFormat, CaptureSession, CaptureState,
    ClipOutcome, CpalDevice,
};
pub use config::Config;
pub use error::{ClientError, DiscardReason, Result};
pub use playback::{AudioSink, PlaybackHandle, PlaybackQueue, PlaybackUpdate, RodioSink};
pub use protocol::{InboundEnvelope, ProcessAudioEnvelope, ProtocolMessage};
pub use session::{
    GestureAdapter, GestureEvent, GestureMode, Intent, SessionController, SessionStats, UiEvent,
};
pub use transport::{
    BackoffPolicy, ConnectionState, StreamChannel, TransportChannel, TransportFactory,
    UploadChannel,
};
