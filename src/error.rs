use std::time::Duration;

/// Errors surfaced by the voice client engine.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No microphone present or permission denied. Fatal to this capture
    /// attempt only; the next gesture may retry.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Request/response exchange failed (non-2xx status, unexpected
    /// payload type, or network failure). Not retried automatically.
    #[error("transport error: {0}")]
    Transport(String),

    /// A send was attempted while the streamed connection is not open.
    /// The payload is dropped, never queued.
    #[error("not connected")]
    NotConnected,

    /// Reconnect attempts exceeded the configured maximum. Terminal.
    #[error("connection failed after {attempts} attempts")]
    ConnectionExhausted { attempts: u32 },

    /// Malformed audio payload (invalid base64 or undecodable audio).
    /// The affected playback item is skipped.
    #[error("audio decode error: {0}")]
    Decode(String),

    /// WebSocket protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP request failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<base64::DecodeError> for ClientError {
    fn from(err: base64::DecodeError) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<hound::Error> for ClientError {
    fn from(err: hound::Error) -> Self {
        ClientError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Why a finalized recording was discarded instead of transmitted.
///
/// A discard is a normal outcome, not an error: accidental taps produce
/// clips below the thresholds and must be dropped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Clip duration below the configured minimum.
    TooShort { duration: Duration, min: Duration },
    /// Clip byte length below the configured minimum.
    TooSmall { bytes: usize, min: usize },
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardReason::TooShort { duration, min } => write!(
                f,
                "clip too short ({}ms < {}ms)",
                duration.as_millis(),
                min.as_millis()
            ),
            DiscardReason::TooSmall { bytes, min } => {
                write!(f, "clip too small ({} bytes < {} bytes)", bytes, min)
            }
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
