use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub transport: TransportConfig,
    pub reconnect: ReconnectConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Cadence of chunk emission while recording, in milliseconds
    pub chunk_interval_ms: u64,
    /// Recordings shorter than this are discarded at finalize time
    pub min_clip_ms: u64,
    /// Recordings smaller than this are discarded at finalize time
    pub min_clip_bytes: usize,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Capture channel count (1 = mono)
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport strategy: "upload" or "stream"
    pub mode: String,
    /// Endpoint for the one-shot upload exchange
    pub upload_url: String,
    /// WebSocket endpoint for the streamed session
    pub stream_url: String,
    /// Readiness probe consulted before the first socket attempt
    pub health_url: String,
    /// Per-request timeout for the upload exchange
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Base delay between reconnect attempts, in milliseconds
    pub base_ms: u64,
    /// Ceiling on the reconnect delay, in milliseconds
    pub cap_ms: u64,
    /// Give up after this many consecutive failed attempts
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Bound on queued-but-not-yet-played audio items
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            transport: TransportConfig::default(),
            reconnect: ReconnectConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_interval_ms: 250,
            min_clip_ms: 500,     // accidental taps produce shorter clips
            min_clip_bytes: 4096, // near-silent utterances produce smaller ones
            sample_rate: 16000,
            channels: 1,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: "stream".to_string(),
            upload_url: "http://localhost:8000/chat/audio".to_string(),
            stream_url: "ws://localhost:8000/ws/audio".to_string(),
            health_url: "http://localhost:8000/health".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: 1000,
            cap_ms: 10000,
            max_attempts: 5,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

impl Config {
    /// Load configuration from an optional file, with `VOICELINK_*`
    /// environment variables layered on top
    /// (e.g. `VOICELINK_CAPTURE__MIN_CLIP_MS=800`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("VOICELINK").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl CaptureConfig {
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }

    pub fn min_clip_duration(&self) -> Duration {
        Duration::from_millis(self.min_clip_ms)
    }
}

impl ReconnectConfig {
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    pub fn cap(&self) -> Duration {
        Duration::from_millis(self.cap_ms)
    }
}
