use crate::capture::clip::{AudioChunk, AudioClip};
use crate::capture::device::CaptureDevice;
use crate::config::CaptureConfig;
use crate::error::{DiscardReason, Result};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capture lifecycle. Only one session may be `Recording` per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopping,
}

/// The single outcome of a completed capture session.
#[derive(Debug)]
pub enum ClipOutcome {
    /// Clip passed validity filtering and is ready for transmission
    Ready(AudioClip),
    /// Clip fell below the duration/size thresholds and was dropped
    Discarded(DiscardReason),
}

/// A microphone capture session.
///
/// State machine: `Idle --start()--> Recording --stop()--> Stopping
/// --(flush complete)--> Idle`. `start()` while Recording and `stop()`
/// while Idle are no-ops. Chunks accumulate in capture order and are
/// finalized into one clip at `stop()`; validity filtering happens there,
/// before any transmission is attempted.
pub struct CaptureSession {
    device: Box<dyn CaptureDevice>,
    config: CaptureConfig,
    state: CaptureState,
    collector: Option<JoinHandle<Vec<AudioChunk>>>,
}

impl CaptureSession {
    pub fn new(device: Box<dyn CaptureDevice>, config: CaptureConfig) -> Self {
        Self {
            device,
            config,
            state: CaptureState::Idle,
            collector: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Acquire the device and begin accumulating chunks.
    ///
    /// No-op if already recording. Fails with `DeviceUnavailable` when the
    /// microphone cannot be acquired; the session stays Idle and the next
    /// gesture may retry.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            warn!("Capture already active, ignoring start");
            return Ok(());
        }

        let mut chunk_rx = self.device.acquire(self.config.chunk_interval()).await?;

        let collector = tokio::spawn(async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = chunk_rx.recv().await {
                chunks.push(chunk);
            }
            chunks
        });

        self.collector = Some(collector);
        self.state = CaptureState::Recording;

        info!(
            "Recording started on {} ({}ms chunks)",
            self.device.name(),
            self.config.chunk_interval_ms
        );

        Ok(())
    }

    /// Stop recording: release the device, flush buffered chunks, and
    /// finalize the clip.
    ///
    /// Returns `None` when called while Idle (no-op), otherwise exactly one
    /// `ClipOutcome` for the completed session. The device is released
    /// before finalization so no chunk can be emitted past this point.
    pub async fn stop(&mut self) -> Result<Option<ClipOutcome>> {
        if self.state != CaptureState::Recording {
            debug!("Capture not active, ignoring stop");
            return Ok(None);
        }

        self.state = CaptureState::Stopping;

        let release_result = self.device.release().await;

        let chunks = match self.collector.take() {
            Some(handle) => match handle.await {
                Ok(chunks) => chunks,
                Err(e) => {
                    error!("Chunk collector panicked: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        self.state = CaptureState::Idle;
        release_result?;

        let clip = AudioClip::from_pcm_chunks(&chunks, self.device.format())?;

        info!(
            "Capture finalized: {} chunks, {} bytes, {:.1}s",
            chunks.len(),
            clip.bytes.len(),
            clip.duration.as_secs_f64()
        );

        if let Some(reason) = clip.validate(
            self.config.min_clip_duration(),
            self.config.min_clip_bytes,
        ) {
            debug!("Clip discarded: {}", reason);
            return Ok(Some(ClipOutcome::Discarded(reason)));
        }

        Ok(Some(ClipOutcome::Ready(clip)))
    }
}
