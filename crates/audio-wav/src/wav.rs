use std::path::{Path, PathBuf};

use crate::error::{AudioWavError, Result};

/// Sample rate the project store expects for playback-ready audio.
pub const CANONICAL_SAMPLE_RATE: u32 = 48_000;
/// Channel count the project store expects for playback-ready audio.
pub const CANONICAL_CHANNELS: u16 = 2;
/// Bit depths accepted without re-encoding.
pub const CANONICAL_BITS_PER_SAMPLE: [u16; 3] = [16, 24, 32];

/// Header facts read from a WAV file's `fmt`/`data` chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct WavHeader {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub is_float: bool,
    pub duration_seconds: f64,
}

impl WavHeader {
    /// Whether this file already matches the canonical format and needs no
    /// re-encode.
    ///
    /// # Example
    /// ```no_run
    /// use audio_wav::inspect;
    ///
    /// let header = inspect("clip.wav").expect("wav should be readable");
    /// let _ready = header.is_canonical();
    /// ```
    pub fn is_canonical(&self) -> bool {
        self.sample_rate == CANONICAL_SAMPLE_RATE
            && self.channels == CANONICAL_CHANNELS
            && CANONICAL_BITS_PER_SAMPLE.contains(&self.bits_per_sample)
            && !self.is_float
    }
}

/// Reads WAV header facts without decoding sample data.
///
/// # Example
/// ```no_run
/// use audio_wav::inspect;
///
/// let header = inspect("clip.wav").expect("wav should be readable");
/// assert!(header.sample_rate > 0);
/// ```
pub fn inspect(path: impl AsRef<Path>) -> Result<WavHeader> {
    let path = path.as_ref();

    let reader = hound::WavReader::open(path).map_err(|source| match source {
        hound::Error::FormatError(_) => AudioWavError::NotRiffWave {
            path: path.to_path_buf(),
        },
        hound::Error::IoError(io_err) => AudioWavError::Io {
            context: "open wav for header inspection",
            path: path.to_path_buf(),
            source: io_err,
        },
        other => AudioWavError::Decode {
            path: path.to_path_buf(),
            source: other,
        },
    })?;

    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioWavError::MissingFmtChunk {
            path: path.to_path_buf(),
        });
    }
    let frame_count = reader.duration();
    if frame_count == 0 && reader.len() == 0 {
        return Err(AudioWavError::MissingDataChunk {
            path: path.to_path_buf(),
        });
    }

    let is_float = matches!(spec.sample_format, hound::SampleFormat::Float);
    if is_float && spec.bits_per_sample != 32 {
        return Err(AudioWavError::UnsupportedSampleFormat {
            path: path.to_path_buf(),
            bits_per_sample: spec.bits_per_sample,
        });
    }

    let duration_seconds = frame_count as f64 / spec.sample_rate as f64;

    Ok(WavHeader {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        is_float,
        duration_seconds,
    })
}
