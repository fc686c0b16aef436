// Integration tests for the capture session state machine
//
// A scripted fake device stands in for the microphone so chunk emission,
// flushing, and validity filtering can be driven deterministically.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voicelink::capture::{
    AudioChunk, CaptureDevice, CaptureFormat, CaptureSession, CaptureState, ClipOutcome,
};
use voicelink::config::CaptureConfig;
use voicelink::error::{ClientError, DiscardReason};

/// 16kHz mono 16-bit PCM: 32 bytes per millisecond.
const BYTES_PER_MS: usize = 32;

struct FakeDevice {
    format: CaptureFormat,
    /// PCM chunk payloads handed out after acquire
    script: Vec<Vec<u8>>,
    fail_acquire: bool,
    acquires: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl FakeDevice {
    fn scripted(script: Vec<Vec<u8>>) -> (Self, Arc<AtomicBool>, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicBool::new(false));
        let acquires = Arc::new(AtomicUsize::new(0));
        let device = Self {
            format: CaptureFormat::new(16000, 1),
            script,
            fail_acquire: false,
            acquires: Arc::clone(&acquires),
            released: Arc::clone(&released),
        };
        (device, released, acquires)
    }

    fn unavailable() -> Self {
        Self {
            format: CaptureFormat::new(16000, 1),
            script: Vec::new(),
            fail_acquire: true,
            acquires: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    async fn acquire(
        &mut self,
        _chunk_interval: Duration,
    ) -> voicelink::Result<mpsc::Receiver<AudioChunk>> {
        if self.fail_acquire {
            return Err(ClientError::DeviceUnavailable("scripted failure".to_string()));
        }

        self.acquires.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(16);
        let script = self.script.clone();
        let format = self.format;

        tokio::spawn(async move {
            let mut emitted_bytes = 0usize;
            for pcm in script {
                let chunk = AudioChunk {
                    offset: format.duration_of(emitted_bytes),
                    pcm,
                };
                emitted_bytes += chunk.pcm.len();
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn release(&mut self) -> voicelink::Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn format(&self) -> CaptureFormat {
        self.format
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn capture_config(min_clip_ms: u64, min_clip_bytes: usize) -> CaptureConfig {
    CaptureConfig {
        chunk_interval_ms: 100,
        min_clip_ms,
        min_clip_bytes,
        sample_rate: 16000,
        channels: 1,
    }
}

/// PCM payload of the given duration at 16kHz mono.
fn pcm_ms(ms: usize) -> Vec<u8> {
    vec![0u8; ms * BYTES_PER_MS]
}

#[tokio::test]
async fn test_short_recording_discarded() -> Result<()> {
    // 200ms of audio against a 500ms minimum: the clip must be dropped
    // at finalize time, before any transmission.
    let (device, released, _) = FakeDevice::scripted(vec![pcm_ms(100), pcm_ms(100)]);
    let mut session = CaptureSession::new(Box::new(device), capture_config(500, 0));

    session.start().await?;
    let outcome = session.stop().await?.expect("completed session has an outcome");

    match outcome {
        ClipOutcome::Discarded(DiscardReason::TooShort { duration, min }) => {
            assert_eq!(duration, Duration::from_millis(200));
            assert_eq!(min, Duration::from_millis(500));
        }
        other => panic!("expected TooShort discard, got {:?}", other),
    }

    assert!(released.load(Ordering::SeqCst), "device must be released");
    assert_eq!(session.state(), CaptureState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_small_recording_discarded() -> Result<()> {
    // Duration passes but the byte threshold does not.
    let (device, _, _) = FakeDevice::scripted(vec![pcm_ms(300)]);
    let mut session = CaptureSession::new(Box::new(device), capture_config(100, 1_000_000));

    session.start().await?;
    let outcome = session.stop().await?.expect("completed session has an outcome");

    assert!(matches!(
        outcome,
        ClipOutcome::Discarded(DiscardReason::TooSmall { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_valid_recording_finalized_as_wav() -> Result<()> {
    let (device, released, _) = FakeDevice::scripted(vec![pcm_ms(500), pcm_ms(500)]);
    let mut session = CaptureSession::new(Box::new(device), capture_config(500, 4096));

    session.start().await?;
    let outcome = session.stop().await?.expect("completed session has an outcome");

    let clip = match outcome {
        ClipOutcome::Ready(clip) => clip,
        other => panic!("expected a ready clip, got {:?}", other),
    };

    assert_eq!(clip.mime_type, "audio/wav");
    assert_eq!(clip.duration, Duration::from_secs(1));
    assert_eq!(&clip.bytes[..4], b"RIFF", "clip must be a WAV container");
    assert!(clip.bytes.len() > 1000 * BYTES_PER_MS, "payload plus header");

    assert!(released.load(Ordering::SeqCst));
    assert_eq!(session.state(), CaptureState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_start_while_recording_is_noop() -> Result<()> {
    let (device, _, acquires) = FakeDevice::scripted(vec![pcm_ms(600)]);
    let mut session = CaptureSession::new(Box::new(device), capture_config(100, 0));

    session.start().await?;
    session.start().await?; // second start must not re-acquire

    assert_eq!(acquires.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), CaptureState::Recording);

    session.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() -> Result<()> {
    let (device, released, _) = FakeDevice::scripted(Vec::new());
    let mut session = CaptureSession::new(Box::new(device), capture_config(100, 0));

    let outcome = session.stop().await?;
    assert!(outcome.is_none(), "stop while Idle yields no outcome");
    assert!(!released.load(Ordering::SeqCst), "nothing to release");
    Ok(())
}

#[tokio::test]
async fn test_exactly_one_outcome_per_session() -> Result<()> {
    let (device, _, _) = FakeDevice::scripted(vec![pcm_ms(600)]);
    let mut session = CaptureSession::new(Box::new(device), capture_config(100, 0));

    session.start().await?;
    let first = session.stop().await?;
    let second = session.stop().await?;

    assert!(first.is_some());
    assert!(second.is_none(), "a second stop must not produce an outcome");
    Ok(())
}

#[tokio::test]
async fn test_device_unavailable_is_recoverable() -> Result<()> {
    let mut session = CaptureSession::new(
        Box::new(FakeDevice::unavailable()),
        capture_config(100, 0),
    );

    let err = session.start().await.expect_err("acquire must fail");
    assert!(matches!(err, ClientError::DeviceUnavailable(_)));
    assert_eq!(
        session.state(),
        CaptureState::Idle,
        "failed start leaves the session Idle so the next gesture can retry"
    );
    Ok(())
}
