use crate::error::{ClientError, Result};
use std::io::Cursor;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Audio output capability: decode one payload and play it to completion.
///
/// Decode failures are typed so a caller can skip the payload and keep
/// going; they must never poison the sink itself.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one audio payload, resolving when playback finishes.
    async fn play(&self, bytes: Vec<u8>) -> Result<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Speaker output via rodio.
///
/// The rodio output stream is not `Send`, so a dedicated thread owns it
/// for the sink's lifetime; payloads and completion signals cross over
/// channels.
pub struct RodioSink {
    requests: mpsc::UnboundedSender<PlayRequest>,
}

struct PlayRequest {
    bytes: Vec<u8>,
    done: oneshot::Sender<Result<()>>,
}

impl RodioSink {
    pub fn new() -> Result<Self> {
        let (requests, rx) = mpsc::unbounded_channel::<PlayRequest>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || playback_thread(rx, ready_tx));

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { requests }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ClientError::DeviceUnavailable(
                "playback thread exited before stream start".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl AudioSink for RodioSink {
    async fn play(&self, bytes: Vec<u8>) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.requests
            .send(PlayRequest {
                bytes,
                done: done_tx,
            })
            .map_err(|_| {
                ClientError::DeviceUnavailable("playback thread terminated".to_string())
            })?;

        done_rx.await.map_err(|_| {
            ClientError::DeviceUnavailable("playback completion signal lost".to_string())
        })?
    }

    fn name(&self) -> &str {
        "rodio"
    }
}

/// Owns the rodio output stream and plays requests one at a time.
fn playback_thread(
    mut requests: mpsc::UnboundedReceiver<PlayRequest>,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
) {
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(ClientError::DeviceUnavailable(format!(
                "no audio output: {}",
                e
            ))));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));
    info!("Audio output ready");

    while let Some(request) = requests.blocking_recv() {
        let result = play_one(&handle, request.bytes);
        if let Err(e) = &result {
            warn!("Playback failed: {}", e);
        }
        let _ = request.done.send(result);
    }
}

fn play_one(handle: &rodio::OutputStreamHandle, bytes: Vec<u8>) -> Result<()> {
    let source = rodio::Decoder::new(Cursor::new(bytes))
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    let sink = rodio::Sink::try_new(handle)
        .map_err(|e| ClientError::DeviceUnavailable(e.to_string()))?;

    sink.append(source);
    sink.sleep_until_end();

    Ok(())
}
