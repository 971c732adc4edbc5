use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, AudioWavError>;

/// Errors produced while resolving, inspecting, or canonicalizing a WAV file.
#[derive(Debug)]
pub enum AudioWavError {
    NoSourceAudioFound {
        searched: Vec<PathBuf>,
    },
    NotRiffWave {
        path: PathBuf,
    },
    MissingFmtChunk {
        path: PathBuf,
    },
    MissingDataChunk {
        path: PathBuf,
    },
    UnsupportedSampleFormat {
        path: PathBuf,
        bits_per_sample: u16,
    },
    AudioValidationFailed {
        path: PathBuf,
        reason: String,
    },
    ConverterUnavailable {
        command: &'static str,
        source: std::io::Error,
    },
    ConverterFailed {
        command: String,
        stderr: String,
    },
    Io {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Decode {
        path: PathBuf,
        source: hound::Error,
    },
}

impl Display for AudioWavError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSourceAudioFound { searched } => {
                write!(f, "no source audio found, searched {} candidates", searched.len())
            }
            Self::NotRiffWave { path } => {
                write!(f, "not a RIFF/WAVE file: {}", path.display())
            }
            Self::MissingFmtChunk { path } => {
                write!(f, "missing fmt chunk: {}", path.display())
            }
            Self::MissingDataChunk { path } => {
                write!(f, "missing data chunk: {}", path.display())
            }
            Self::UnsupportedSampleFormat { path, bits_per_sample } => {
                write!(
                    f,
                    "unsupported sample format in {}: {bits_per_sample} bits per sample",
                    path.display()
                )
            }
            Self::AudioValidationFailed { path, reason } => {
                write!(f, "audio validation failed for {}: {reason}", path.display())
            }
            Self::ConverterUnavailable { command, source } => {
                write!(f, "converter unavailable ({command}): {source}")
            }
            Self::ConverterFailed { command, stderr } => {
                write!(f, "converter failed ({command}): {}", stderr.trim())
            }
            Self::Io { context, path, source } => {
                write!(f, "{context}: {} ({source})", path.display())
            }
            Self::Decode { path, source } => {
                write!(f, "failed to decode wav header {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AudioWavError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConverterUnavailable { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}
