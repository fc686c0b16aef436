use crate::capture::AudioClip;
use crate::config::TransportConfig;
use crate::error::{ClientError, Result};
use crate::protocol::ProtocolMessage;
use crate::transport::channel::{ConnectionState, TransportChannel};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Response header carrying the assistant transcript alongside the audio body.
const TRANSCRIPT_HEADER: &str = "x-transcript";

/// Request/response transport: one multipart upload per turn.
///
/// Each turn is self-contained, so the channel always reports Open and has
/// no reconnection machinery. The reply (audio body plus transcript
/// header) is delivered through the same inbound channel streamed mode
/// uses. A failed turn is surfaced and never retried automatically.
#[derive(Debug)]
pub struct UploadChannel {
    client: reqwest::Client,
    url: String,
    session_id: String,
    inbound: Mutex<Option<mpsc::Sender<ProtocolMessage>>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl UploadChannel {
    pub fn new(config: &TransportConfig, session_id: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Open);

        Ok(Self {
            client,
            url: config.upload_url.clone(),
            session_id,
            inbound: Mutex::new(None),
            state_tx,
            state_rx,
        })
    }

    fn inbound_sender(&self) -> Result<mpsc::Sender<ProtocolMessage>> {
        self.inbound
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or_else(|| ClientError::Transport("channel not opened".to_string()))
    }
}

#[async_trait::async_trait]
impl TransportChannel for UploadChannel {
    async fn open(&mut self) -> Result<mpsc::Receiver<ProtocolMessage>> {
        let (tx, rx) = mpsc::channel(64);
        if let Ok(mut guard) = self.inbound.lock() {
            *guard = Some(tx);
        }
        info!("Upload transport ready: {}", self.url);
        Ok(rx)
    }

    async fn send_clip(&self, clip: &AudioClip) -> Result<()> {
        let inbound = self.inbound_sender()?;

        let part = reqwest::multipart::Part::bytes(clip.bytes.clone())
            .file_name("recording.wav")
            .mime_str(&clip.mime_type)?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("session_id", self.session_id.clone());

        info!(
            "Uploading clip: {} bytes, {:.1}s",
            clip.bytes.len(),
            clip.duration.as_secs_f64()
        );

        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "upload failed with status {}",
                status
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("audio") {
            return Err(ClientError::Transport(format!(
                "unexpected response content type: {}",
                content_type
            )));
        }

        let transcript = response
            .headers()
            .get(TRANSCRIPT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let audio = response.bytes().await?.to_vec();

        // Transcript first so the text surfaces even if playback lags.
        if let Some(text) = transcript {
            let _ = inbound.send(ProtocolMessage::Transcript(text)).await;
        }

        inbound
            .send(ProtocolMessage::AudioFrame(audio))
            .await
            .map_err(|_| ClientError::Transport("inbound channel closed".to_string()))?;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Ok(mut guard) = self.inbound.lock() {
            guard.take();
        }
        let _ = self.state_tx.send(ConnectionState::Closed);
        Ok(())
    }

    fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn name(&self) -> &str {
        "upload"
    }
}
