use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// One failure record produced while coercing raw ASR data into segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    pub clip_index: Option<usize>,
    pub segment_index: Option<usize>,
    pub reason: String,
}

/// Error taxonomy for the project core. Each variant carries enough detail
/// to seed a bug report without the caller re-deriving context.
#[derive(Debug)]
pub enum CoreError {
    /// I1-I7 invariant violation. Always fatal for the attempted operation;
    /// the store reverts the candidate and the prior state is untouched.
    InvariantViolation {
        invariant: &'static str,
        clip_id: Option<String>,
        segment_index: Option<usize>,
        detail: String,
    },
    /// Raw ASR data could not be coerced into a valid project.
    ImportValidation { failures: Vec<ImportFailure> },
    /// Audio missing/unreadable, converter failed, temp dir unwritable.
    Resource { detail: String },
    /// Malformed or unrecognized event received from the transport.
    Protocol { detail: String },
    /// Package unreadable, version mismatch, or checksum mismatch.
    Persistence { path: Option<PathBuf>, detail: String },
    PersistenceIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    PersistenceSerialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Requested clip id does not exist in the current project.
    UnknownClip { clip_id: String },
    /// Requested segment index does not exist on the target clip.
    UnknownSegment { clip_id: String, segment_index: usize },
    /// Edit was attempted against a segment of the wrong kind (e.g.
    /// `editWord` targeting a Spacer).
    WrongSegmentKind {
        clip_id: String,
        segment_index: usize,
        expected: &'static str,
    },
    /// An edit operation's payload failed its own structural precondition,
    /// e.g. a split index at a clip boundary or a non-contiguous merge.
    InvalidOperation { reason: String },
    Audio(audio_wav::AudioWavError),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvariantViolation {
                invariant,
                clip_id,
                segment_index,
                detail,
            } => {
                write!(f, "invariant {invariant} violated")?;
                if let Some(clip_id) = clip_id {
                    write!(f, " (clip {clip_id}")?;
                    if let Some(segment_index) = segment_index {
                        write!(f, ", segment {segment_index}")?;
                    }
                    write!(f, ")")?;
                }
                write!(f, ": {detail}")
            }
            Self::ImportValidation { failures } => {
                write!(f, "import validation failed with {} failure(s)", failures.len())
            }
            Self::Resource { detail } => write!(f, "resource error: {detail}"),
            Self::Protocol { detail } => write!(f, "protocol error: {detail}"),
            Self::Persistence { path, detail } => match path {
                Some(path) => write!(f, "persistence error ({}): {detail}", path.display()),
                None => write!(f, "persistence error: {detail}"),
            },
            Self::PersistenceIo { context, path, source } => {
                write!(f, "{context}: {} ({source})", path.display())
            }
            Self::PersistenceSerialization { path, source } => {
                write!(f, "package document failed to (de)serialize at {} ({source})", path.display())
            }
            Self::UnknownClip { clip_id } => write!(f, "unknown clip: {clip_id}"),
            Self::UnknownSegment { clip_id, segment_index } => {
                write!(f, "unknown segment {segment_index} on clip {clip_id}")
            }
            Self::WrongSegmentKind { clip_id, segment_index, expected } => {
                write!(f, "segment {segment_index} on clip {clip_id} is not a {expected}")
            }
            Self::InvalidOperation { reason } => write!(f, "invalid operation: {reason}"),
            Self::Audio(err) => write!(f, "audio preparation error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PersistenceIo { source, .. } => Some(source),
            Self::PersistenceSerialization { source, .. } => Some(source),
            Self::Audio(err) => Some(err),
            _ => None,
        }
    }
}

impl From<audio_wav::AudioWavError> for CoreError {
    fn from(value: audio_wav::AudioWavError) -> Self {
        Self::Audio(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violation_display_includes_clip_and_segment() {
        let err = CoreError::InvariantViolation {
            invariant: "I2",
            clip_id: Some("clip-1".to_string()),
            segment_index: Some(3),
            detail: "segment out of order".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("I2"));
        assert!(message.contains("clip-1"));
        assert!(message.contains('3'));
    }
}
