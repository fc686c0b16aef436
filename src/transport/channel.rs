use crate::capture::AudioClip;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::protocol::ProtocolMessage;
use crate::transport::backoff::BackoffPolicy;
use crate::transport::stream::StreamChannel;
use crate::transport::upload::UploadChannel;
use std::fmt;
use tokio::sync::{mpsc, watch};

/// Connection lifecycle of a transport channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Transport strategy behind one interface.
///
/// Two interchangeable implementations exist: a one-shot upload exchange
/// per turn, and a persistent duplex socket with reconnection. Both
/// deliver inbound replies on the single receiver returned by `open`, in
/// arrival order, so the caller has one dispatch path regardless of
/// strategy.
#[async_trait::async_trait]
pub trait TransportChannel: Send + Sync + fmt::Debug {
    /// Open the channel and return the inbound message stream.
    async fn open(&mut self) -> Result<mpsc::Receiver<ProtocolMessage>>;

    /// Transmit one finalized clip.
    ///
    /// Fails fast with `NotConnected` while a streamed channel is not
    /// Open; payloads are never queued while disconnected.
    async fn send_clip(&self, clip: &AudioClip) -> Result<()>;

    /// Close the channel and stop any reconnection.
    async fn close(&mut self) -> Result<()>;

    /// Observe connection state transitions.
    fn connection(&self) -> watch::Receiver<ConnectionState>;

    /// Strategy name for logging.
    fn name(&self) -> &str;
}

/// Selects the transport strategy at startup.
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(config: &Config, session_id: &str) -> Result<Box<dyn TransportChannel>> {
        match config.transport.mode.as_str() {
            "upload" => Ok(Box::new(UploadChannel::new(
                &config.transport,
                session_id.to_string(),
            )?)),
            "stream" => Ok(Box::new(StreamChannel::new(
                &config.transport,
                BackoffPolicy::from_config(&config.reconnect),
                session_id.to_string(),
            ))),
            other => Err(ClientError::Config(format!(
                "unknown transport mode: {}",
                other
            ))),
        }
    }
}
