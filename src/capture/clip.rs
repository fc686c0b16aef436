use crate::error::{DiscardReason, Result};
use std::io::Cursor;
use std::time::Duration;

/// PCM format emitted by a capture device (16-bit LE, interleaved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl CaptureFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Bytes of PCM per second at this format.
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * 2
    }

    /// Exact duration of a PCM byte run at this format.
    pub fn duration_of(&self, pcm_len: usize) -> Duration {
        let bps = self.bytes_per_second();
        if bps == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(pcm_len as f64 / bps as f64)
    }
}

/// One incremental slice of captured audio before finalization.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw PCM bytes (16-bit LE, interleaved)
    pub pcm: Vec<u8>,
    /// Offset from the start of the recording
    pub offset: Duration,
}

/// A finalized, complete captured utterance ready for transmission.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Encoded audio bytes (WAV container)
    pub bytes: Vec<u8>,
    /// MIME/codec tag describing `bytes`
    pub mime_type: String,
    /// Total duration of the utterance
    pub duration: Duration,
}

impl AudioClip {
    /// Concatenate PCM chunks in capture order and wrap them in a WAV
    /// container. Duration comes from sample math, not wall-clock time.
    pub fn from_pcm_chunks(chunks: &[AudioChunk], format: CaptureFormat) -> Result<Self> {
        let pcm: Vec<u8> = chunks.iter().flat_map(|c| c.pcm.iter().copied()).collect();
        let duration = format.duration_of(pcm.len());

        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in pcm.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
            }
            writer.finalize()?;
        }

        Ok(Self {
            bytes: cursor.into_inner(),
            mime_type: "audio/wav".to_string(),
            duration,
        })
    }

    /// Validity filter applied at finalize time, before any transmission.
    /// Returns the reason when the clip must be discarded.
    pub fn validate(&self, min_duration: Duration, min_bytes: usize) -> Option<DiscardReason> {
        if self.duration < min_duration {
            return Some(DiscardReason::TooShort {
                duration: self.duration,
                min: min_duration,
            });
        }
        if self.bytes.len() < min_bytes {
            return Some(DiscardReason::TooSmall {
                bytes: self.bytes.len(),
                min: min_bytes,
            });
        }
        None
    }
}
