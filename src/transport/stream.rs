use crate::capture::AudioClip;
use crate::config::TransportConfig;
use crate::error::{ClientError, Result};
use crate::protocol::{codec, ProtocolMessage};
use crate::transport::backoff::BackoffPolicy;
use crate::transport::channel::{ConnectionState, TransportChannel};
use futures::{SinkExt, StreamExt};
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Persistent duplex transport over a WebSocket.
///
/// A readiness probe gates the first socket attempt. On unexpected close
/// the connection worker reconnects with a growing, capped delay; the
/// attempt counter resets to zero on every successful open, and after the
/// configured maximum the channel goes terminally Closed and surfaces the
/// failure. Sends fail fast with `NotConnected` while the socket is not
/// Open — nothing is queued while disconnected.
///
/// Outbound policy: finalized clips are sent as single `process_audio`
/// envelopes, applied consistently for the whole session.
#[derive(Debug)]
pub struct StreamChannel {
    stream_url: String,
    health_url: String,
    probe_timeout: Duration,
    policy: BackoffPolicy,
    session_id: String,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    worker: Option<JoinHandle<()>>,
}

impl StreamChannel {
    pub fn new(config: &TransportConfig, policy: BackoffPolicy, session_id: String) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        Self {
            stream_url: config.stream_url.clone(),
            health_url: config.health_url.clone(),
            probe_timeout: Duration::from_secs(config.request_timeout_secs),
            policy,
            session_id,
            state_tx,
            state_rx,
            outbound: Mutex::new(None),
            shutdown_tx: None,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl TransportChannel for StreamChannel {
    async fn open(&mut self) -> Result<mpsc::Receiver<ProtocolMessage>> {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if let Ok(mut guard) = self.outbound.lock() {
            *guard = Some(outbound_tx);
        }
        self.shutdown_tx = Some(shutdown_tx);

        let worker = ConnectionWorker {
            stream_url: self.stream_url.clone(),
            health_url: self.health_url.clone(),
            probe_timeout: self.probe_timeout,
            policy: self.policy.clone(),
            state_tx: self.state_tx.clone(),
            inbound_tx,
            outbound_rx,
            shutdown_rx,
        };
        self.worker = Some(tokio::spawn(worker.run()));

        Ok(inbound_rx)
    }

    async fn send_clip(&self, clip: &AudioClip) -> Result<()> {
        if *self.state_rx.borrow() != ConnectionState::Open {
            return Err(ClientError::NotConnected);
        }

        let frame = codec::process_audio_frame(clip, &self.session_id)?;

        let tx = self
            .outbound
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(ClientError::NotConnected)?;

        // Bounded: a full or closed outbound queue drops the send rather
        // than building a backlog.
        tx.try_send(frame).map_err(|_| ClientError::NotConnected)?;

        info!(
            "Clip queued for streaming: {} bytes, {:.1}s",
            clip.bytes.len(),
            clip.duration.as_secs_f64()
        );

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(true);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
        if let Ok(mut guard) = self.outbound.lock() {
            guard.take();
        }
        let _ = self.state_tx.send(ConnectionState::Closed);
        info!("Stream transport closed");
        Ok(())
    }

    fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn name(&self) -> &str {
        "stream"
    }
}

struct ConnectionWorker {
    stream_url: String,
    health_url: String,
    probe_timeout: Duration,
    policy: BackoffPolicy,
    state_tx: watch::Sender<ConnectionState>,
    inbound_tx: mpsc::Sender<ProtocolMessage>,
    outbound_rx: mpsc::Receiver<String>,
    shutdown_rx: watch::Receiver<bool>,
}

#[derive(Debug, PartialEq, Eq)]
enum SocketExit {
    /// Remote closed or the socket errored; reconnection may follow
    Closed,
    /// Local shutdown; no reconnection
    Shutdown,
}

impl ConnectionWorker {
    async fn run(self) {
        let ConnectionWorker {
            stream_url,
            health_url,
            probe_timeout,
            policy,
            state_tx,
            inbound_tx,
            mut outbound_rx,
            mut shutdown_rx,
        } = self;

        if !probe_until_ready(
            &health_url,
            probe_timeout,
            &policy,
            &state_tx,
            &inbound_tx,
            &mut shutdown_rx,
        )
        .await
        {
            let _ = state_tx.send(ConnectionState::Closed);
            return;
        }

        let mut attempt: u32 = 0;
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let _ = state_tx.send(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });

            match connect_async(stream_url.as_str()).await {
                Ok((socket, _)) => {
                    info!("WebSocket connected: {}", stream_url);
                    attempt = 0;
                    let _ = state_tx.send(ConnectionState::Open);

                    let exit =
                        run_socket(socket, &inbound_tx, &mut outbound_rx, &mut shutdown_rx).await;
                    if exit == SocketExit::Shutdown {
                        break;
                    }
                    warn!("WebSocket connection lost");
                }
                Err(e) => {
                    warn!("WebSocket connect failed: {}", e);
                }
            }

            attempt += 1;
            if policy.exhausted(attempt) {
                let exhausted = ClientError::ConnectionExhausted {
                    attempts: policy.max_attempts(),
                };
                error!("{}", exhausted);
                let _ = state_tx.send(ConnectionState::Closed);
                let _ = inbound_tx
                    .send(ProtocolMessage::ErrorNotice(exhausted.to_string()))
                    .await;
                return;
            }

            let delay = policy.delay(attempt);
            info!(
                "Reconnecting in {}ms (attempt {}/{})",
                delay.as_millis(),
                attempt,
                policy.max_attempts()
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        let _ = state_tx.send(ConnectionState::Closed);
    }
}

/// Readiness probe consulted before the first socket attempt. Probe
/// failures retry on the reconnect schedule instead of opening the socket.
async fn probe_until_ready(
    health_url: &str,
    timeout: Duration,
    policy: &BackoffPolicy,
    state_tx: &watch::Sender<ConnectionState>,
    inbound_tx: &mpsc::Sender<ProtocolMessage>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> bool {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Health probe client: {}", e);
            return false;
        }
    };

    let mut attempt: u32 = 0;
    loop {
        if *shutdown_rx.borrow() {
            return false;
        }

        match client.get(health_url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Health probe ok: {}", health_url);
                return true;
            }
            Ok(response) => {
                warn!("Health probe returned {}", response.status());
            }
            Err(e) => {
                warn!("Health probe failed: {}", e);
            }
        }

        attempt += 1;
        if policy.exhausted(attempt) {
            let exhausted = ClientError::ConnectionExhausted {
                attempts: policy.max_attempts(),
            };
            error!("Health probe never succeeded: {}", exhausted);
            let _ = inbound_tx
                .send(ProtocolMessage::ErrorNotice(exhausted.to_string()))
                .await;
            return false;
        }

        let _ = state_tx.send(ConnectionState::Reconnecting);
        let delay = policy.delay(attempt);
        debug!("Probe retry in {}ms (attempt {})", delay.as_millis(), attempt);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => {}
        }
    }
}

/// Drive one live socket until it closes, errors, or shutdown is signalled.
/// Inbound frames are classified and forwarded in arrival order.
async fn run_socket(
    socket: Socket,
    inbound_tx: &mpsc::Sender<ProtocolMessage>,
    outbound_rx: &mut mpsc::Receiver<String>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SocketExit {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let message = codec::classify_text(&text);
                    if inbound_tx.send(message).await.is_err() {
                        return SocketExit::Shutdown;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let message = codec::classify_binary(bytes);
                    if inbound_tx.send(message).await.is_err() {
                        return SocketExit::Shutdown;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("WebSocket closed by remote: {:?}", frame);
                    return SocketExit::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    return SocketExit::Closed;
                }
                None => return SocketExit::Closed,
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        warn!("WebSocket send failed: {}", e);
                        return SocketExit::Closed;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SocketExit::Shutdown;
                }
            },
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                    return SocketExit::Shutdown;
                }
            }
        }
    }
}
