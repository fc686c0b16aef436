use crate::error::{ClientError, Result};
use crate::playback::sink::AudioSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One queued audio payload awaiting playback.
#[derive(Debug)]
pub struct PlaybackItem {
    /// Arrival order, assigned at enqueue time
    pub sequence: u64,
    /// Decodable audio bytes
    pub bytes: Vec<u8>,
}

/// Progress updates emitted by the queue worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackUpdate {
    Started { sequence: u64 },
    Finished { sequence: u64 },
    /// Item skipped after a decode/playback failure; the queue continues
    Skipped { sequence: u64, reason: String },
}

/// Cheap handle for enqueueing from event-dispatch tasks.
#[derive(Clone)]
pub struct PlaybackHandle {
    items: mpsc::Sender<PlaybackItem>,
    next_sequence: Arc<AtomicU64>,
}

impl PlaybackHandle {
    /// Append one payload to the tail of the queue. Returns its arrival
    /// sequence number.
    pub async fn enqueue(&self, bytes: Vec<u8>) -> Result<u64> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.items
            .send(PlaybackItem { sequence, bytes })
            .await
            .map_err(|_| {
                ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "playback queue closed",
                ))
            })?;
        debug!("Enqueued playback item {}", sequence);
        Ok(sequence)
    }
}

/// Strictly sequential playback of queued audio payloads.
///
/// A single worker task owns the "currently playing" slot: items play in
/// arrival order, at most one at a time, and a failed item is skipped and
/// reported without halting the queue. Audio and text updates for the
/// same logical turn arrive through different message kinds at different
/// times; this queue is what keeps the audio side ordered regardless.
pub struct PlaybackQueue {
    handle: PlaybackHandle,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackQueue {
    /// Spawn the queue worker. Progress updates arrive on the returned
    /// receiver.
    pub fn new(
        sink: Arc<dyn AudioSink>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<PlaybackUpdate>) {
        let (items_tx, mut items_rx) = mpsc::channel::<PlaybackItem>(capacity.max(1));
        let (updates_tx, updates_rx) = mpsc::channel(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(item) = items_rx.recv().await {
                let sequence = item.sequence;
                let _ = updates_tx.send(PlaybackUpdate::Started { sequence }).await;

                match sink.play(item.bytes).await {
                    Ok(()) => {
                        let _ = updates_tx.send(PlaybackUpdate::Finished { sequence }).await;
                    }
                    Err(e) => {
                        warn!("Skipping playback item {}: {}", sequence, e);
                        let _ = updates_tx
                            .send(PlaybackUpdate::Skipped {
                                sequence,
                                reason: e.to_string(),
                            })
                            .await;
                    }
                }
            }
            debug!("Playback queue drained");
        });

        let queue = Self {
            handle: PlaybackHandle {
                items: items_tx,
                next_sequence: Arc::new(AtomicU64::new(0)),
            },
            worker: Some(worker),
        };

        (queue, updates_rx)
    }

    pub fn handle(&self) -> PlaybackHandle {
        self.handle.clone()
    }

    /// Stop accepting new items and wait for in-flight playback to finish.
    pub async fn shutdown(mut self) {
        let PlaybackHandle { items, .. } = self.handle;
        drop(items);
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}
