use crate::capture::clip::{AudioChunk, CaptureFormat};
use crate::error::{ClientError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Capture device capability.
///
/// Implementations own the underlying hardware handle. `acquire` starts
/// chunk emission at a fixed cadence and `release` must free the hardware
/// (a leaked handle keeps the capture indicator lit and the device locked).
#[async_trait::async_trait]
pub trait CaptureDevice: Send {
    /// Acquire the device and start emitting chunks at the given cadence.
    ///
    /// Fails with `DeviceUnavailable` when no device exists or permission
    /// is denied.
    async fn acquire(&mut self, chunk_interval: Duration) -> Result<mpsc::Receiver<AudioChunk>>;

    /// Stop chunk emission and free the hardware. Idempotent.
    async fn release(&mut self) -> Result<()>;

    /// PCM format of emitted chunks.
    fn format(&self) -> CaptureFormat;

    /// Device name for logging.
    fn name(&self) -> &str;
}

/// Microphone capture via cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread for the
/// lifetime of one acquisition; `release` signals the thread and joins it.
pub struct CpalDevice {
    format: CaptureFormat,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop: Arc<AtomicBool>,
    handle: std::thread::JoinHandle<()>,
}

impl CpalDevice {
    pub fn new(format: CaptureFormat) -> Self {
        Self {
            format,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for CpalDevice {
    async fn acquire(&mut self, chunk_interval: Duration) -> Result<mpsc::Receiver<AudioChunk>> {
        if self.worker.is_some() {
            return Err(ClientError::DeviceUnavailable(
                "microphone already acquired".to_string(),
            ));
        }

        let device = cpal::default_host().default_input_device().ok_or_else(|| {
            ClientError::DeviceUnavailable("no input device available".to_string())
        })?;

        info!(
            "Acquiring input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let (chunk_tx, chunk_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let format = self.format;
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            capture_thread(device, format, chunk_interval, chunk_tx, thread_stop, ready_tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop, handle });
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ClientError::DeviceUnavailable(
                    "capture thread exited before stream start".to_string(),
                ))
            }
        }
    }

    async fn release(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            // Join off the runtime so a slow device teardown cannot stall
            // other tasks.
            tokio::task::spawn_blocking(move || {
                if worker.handle.join().is_err() {
                    warn!("Capture thread panicked during release");
                }
            })
            .await
            .ok();
            info!("Input device released");
        }
        Ok(())
    }

    fn format(&self) -> CaptureFormat {
        self.format
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            let _ = worker.handle.join();
        }
    }
}

/// Owns the cpal stream: accumulates callback samples into cadence-sized
/// chunks and forwards them until stopped.
fn capture_thread(
    device: cpal::Device,
    format: CaptureFormat,
    chunk_interval: Duration,
    chunk_tx: mpsc::Sender<AudioChunk>,
    stop: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let stream_config = cpal::StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let chunk_bytes =
        (format.bytes_per_second() as u128 * chunk_interval.as_millis() / 1000).max(2) as usize;

    // Shared with the callback so the tail of a recording can be flushed
    // as a final (shorter) chunk on release.
    let accum = Arc::new(std::sync::Mutex::new(ChunkAccumulator {
        pending: Vec::with_capacity(chunk_bytes),
        emitted_bytes: 0,
    }));

    let data_tx = chunk_tx.clone();
    let data_accum = Arc::clone(&accum);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mut accum = match data_accum.lock() {
                Ok(a) => a,
                Err(_) => return,
            };
            for &sample in data {
                let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                accum.pending.extend_from_slice(&s.to_le_bytes());

                if accum.pending.len() >= chunk_bytes {
                    let chunk = AudioChunk {
                        pcm: std::mem::replace(
                            &mut accum.pending,
                            Vec::with_capacity(chunk_bytes),
                        ),
                        offset: format.duration_of(accum.emitted_bytes),
                    };
                    accum.emitted_bytes += chunk.pcm.len();
                    if data_tx.try_send(chunk).is_err() {
                        warn!("Dropping audio chunk: consumer not keeping up");
                    }
                }
            }
        },
        move |err| {
            warn!("Capture stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(ClientError::DeviceUnavailable(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(ClientError::DeviceUnavailable(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(10));
    }

    // Stop the callback first, then flush whatever it buffered.
    drop(stream);

    if let Ok(mut accum) = accum.lock() {
        if !accum.pending.is_empty() {
            let chunk = AudioChunk {
                pcm: std::mem::take(&mut accum.pending),
                offset: format.duration_of(accum.emitted_bytes),
            };
            if chunk_tx.blocking_send(chunk).is_err() {
                warn!("Dropping final audio chunk: channel closed");
            }
        }
    }

    // Closing the channel lets the collector finish its flush.
    drop(chunk_tx);
}

struct ChunkAccumulator {
    pending: Vec<u8>,
    emitted_bytes: usize,
}
