// Tests for configuration loading and defaults
//
// Every behavioral knob (cadence, thresholds, backoff, endpoints) must be
// adjustable; defaults apply when a file provides only part of a section.

use anyhow::Result;
use std::io::Write;
use tempfile::TempDir;
use voicelink::Config;

#[test]
fn test_defaults_cover_every_knob() {
    let config = Config::default();

    assert_eq!(config.capture.chunk_interval_ms, 250);
    assert_eq!(config.capture.min_clip_ms, 500);
    assert_eq!(config.capture.min_clip_bytes, 4096);
    assert_eq!(config.capture.sample_rate, 16000);
    assert_eq!(config.capture.channels, 1);

    assert_eq!(config.transport.mode, "stream");
    assert!(config.transport.upload_url.ends_with("/chat/audio"));
    assert!(config.transport.health_url.ends_with("/health"));

    assert_eq!(config.reconnect.base_ms, 1000);
    assert_eq!(config.reconnect.cap_ms, 10000);
    assert_eq!(config.reconnect.max_attempts, 5);

    assert_eq!(config.playback.queue_capacity, 64);
}

#[test]
fn test_load_from_file_with_partial_sections() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("voicelink.toml");

    let mut file = std::fs::File::create(&path)?;
    writeln!(
        file,
        r#"
[capture]
min_clip_ms = 800
chunk_interval_ms = 100

[reconnect]
max_attempts = 3
"#
    )?;

    let config = Config::load(Some(path.to_str().unwrap()))?;

    // Overridden values
    assert_eq!(config.capture.min_clip_ms, 800);
    assert_eq!(config.capture.chunk_interval_ms, 100);
    assert_eq!(config.reconnect.max_attempts, 3);

    // Untouched values fall back to defaults
    assert_eq!(config.capture.sample_rate, 16000);
    assert_eq!(config.reconnect.base_ms, 1000);
    assert_eq!(config.transport.mode, "stream");

    Ok(())
}

#[test]
fn test_duration_helpers() {
    let config = Config::default();

    assert_eq!(config.capture.chunk_interval().as_millis(), 250);
    assert_eq!(config.capture.min_clip_duration().as_millis(), 500);
    assert_eq!(config.reconnect.base().as_millis(), 1000);
    assert_eq!(config.reconnect.cap().as_millis(), 10000);
}
