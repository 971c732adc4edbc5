//! Root data model: `ProjectData`, `Clip`, the speaker table, and the
//! preserved transcription detail. No mutation logic lives here — that is
//! the store's job (`crate::store`); this module only defines the shapes
//! and the invariant checks the store runs against them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::segment::{Segment, ValidateOptions, validate};
use crate::time::{self, STEADY_STATE_EPSILON};

pub const PROJECT_DATA_VERSION: &str = "2.0";

/// Lifecycle state of a clip. Deletion is soft: the clip is retained for
/// restore and for EDL contiguity decisions (I5 is only checked over active
/// clips).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipStatus {
    Active,
    Deleted,
}

/// How a clip came to exist, preserved for UI styling; carries no semantics
/// the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipKind {
    Transcribed,
    SpeakerChange,
    ParagraphBreak,
    UserCreated,
}

/// A contiguous timeline block with a speaker and an ordered sequence of
/// segments that must completely cover `[0, duration]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: Uuid,
    pub speaker: String,
    pub start_time: f64,
    pub end_time: f64,
    pub order: usize,
    pub status: ClipStatus,
    #[serde(rename = "type")]
    pub kind: ClipKind,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub segments: Vec<Segment>,
}

impl Clip {
    pub fn duration(&self) -> f64 {
        time::round6(self.end_time - self.start_time)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ClipStatus::Active)
    }

    /// Validates this clip's segments against I1-I4 using the given
    /// tolerance mode.
    pub fn validate_segments(&self, options: ValidateOptions) -> Result<()> {
        let result = validate(&self.segments, self.duration(), options);
        if !result.is_ok() {
            return Err(CoreError::InvariantViolation {
                invariant: "I1-I4",
                clip_id: Some(self.id.to_string()),
                segment_index: None,
                detail: result.errors.join("; "),
            });
        }
        Ok(())
    }
}

/// Speaker id -> display-name table, with a fallback id used when neither a
/// word nor its containing segment carries a speaker tag from the ASR
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speakers {
    pub names: HashMap<String, String>,
    pub default_speaker_id: String,
}

impl Speakers {
    pub fn new(default_speaker_id: impl Into<String>) -> Self {
        let default_speaker_id = default_speaker_id.into();
        let mut names = HashMap::new();
        names.insert(default_speaker_id.clone(), "Unknown Speaker".to_string());
        Self {
            names,
            default_speaker_id,
        }
    }

    /// Global rename in the speaker map; clips and words reference ids, so
    /// this is a table-only update.
    pub fn rename(&mut self, old_name: &str, new_name: &str) {
        for display_name in self.names.values_mut() {
            if display_name == old_name {
                *display_name = new_name.to_string();
            }
        }
    }
}

/// One segment of the original ASR result, preserved verbatim for
/// provenance and re-import diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalAsrSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: Option<String>,
}

/// Transcription detail kept alongside the editable clip data: the raw ASR
/// segments and whatever aggregate stats accompanied them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub language: Option<String>,
    pub original_segments: Vec<OriginalAsrSegment>,
    pub status: TranscriptionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TranscriptionStatus {
    Completed,
    Partial,
}

/// Canonical WAV parameters plus provenance, passed through from the audio
/// prepare contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub original_name: String,
    pub path: String,
    pub embedded_path: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub duration_sec: f64,
    pub was_converted: bool,
}

/// Identity and provenance metadata for the project as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub audio: AudioInfo,
    pub asr_provider: Option<String>,
}

/// Grouping configuration used by the import pipeline; kept with the data
/// so re-grouping decisions stay reproducible from a saved project alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingConfig {
    pub max_clip_duration: f64,
    pub spacer_threshold: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_clip_duration: 30.0,
            spacer_threshold: 1.0,
        }
    }
}

/// Ordered clips plus the grouping configuration that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipsData {
    pub clips: Vec<Clip>,
    pub grouping: GroupingConfig,
    /// Monotonically-increasing token bumped after every successful
    /// operation so external observers can detect state change cheaply.
    pub version: String,
}

/// The root value: the authoritative representation of a transcribed
/// recording and all edits applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub version: String,
    pub project: ProjectInfo,
    pub transcription: Transcription,
    pub speakers: Speakers,
    pub clips: ClipsData,
}

impl ProjectData {
    pub fn active_clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.clips.iter().filter(|clip| clip.is_active())
    }

    pub fn find_clip(&self, clip_id: Uuid) -> Option<&Clip> {
        self.clips.clips.iter().find(|clip| clip.id == clip_id)
    }

    pub fn find_clip_mut(&mut self, clip_id: Uuid) -> Option<&mut Clip> {
        self.clips.clips.iter_mut().find(|clip| clip.id == clip_id)
    }

    /// Runs every invariant (I1-I7) needed after any successful operation.
    /// `tolerant` selects import-mode tolerance for I1-I4 (used by `load`
    /// when the incoming data is itself freshly imported).
    pub fn validate_all(&self, tolerant: bool) -> Result<()> {
        let options = ValidateOptions {
            is_import: tolerant,
            spacer_threshold: self.clips.grouping.spacer_threshold,
        };

        for clip in &self.clips.clips {
            clip.validate_segments(options)?;
        }

        self.validate_dense_ordering()?;
        self.validate_no_timeline_overlap()?;
        Ok(())
    }

    /// I6: `clip.order` values form `0..N-1` after any structural change.
    fn validate_dense_ordering(&self) -> Result<()> {
        let mut orders: Vec<usize> = self.clips.clips.iter().map(|clip| clip.order).collect();
        orders.sort_unstable();
        let expected: Vec<usize> = (0..orders.len()).collect();
        if orders != expected {
            return Err(CoreError::InvariantViolation {
                invariant: "I6",
                clip_id: None,
                segment_index: None,
                detail: "clip order values are not a dense 0..N-1 sequence".to_string(),
            });
        }
        Ok(())
    }

    /// I5: for active clips sorted by `startTime`, each `startTime` is at or
    /// after the previous clip's `endTime`.
    fn validate_no_timeline_overlap(&self) -> Result<()> {
        let mut active: Vec<&Clip> = self.active_clips().collect();
        active.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap());
        for window in active.windows(2) {
            if window[1].start_time + STEADY_STATE_EPSILON < window[0].end_time {
                return Err(CoreError::InvariantViolation {
                    invariant: "I5",
                    clip_id: Some(window[1].id.to_string()),
                    segment_index: None,
                    detail: format!(
                        "clip starts at {} before previous clip ends at {}",
                        window[1].start_time, window[0].end_time
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Fixture data shared by this crate's own tests and by doctests in other
/// modules. Not gated on `#[cfg(test)]` so doctests (compiled as a separate
/// crate) can reach it.
pub mod fixtures {
    use super::*;
    use crate::segment::make_word;

    pub fn sample_project() -> ProjectData {
        let now = Utc::now();
        let clip = Clip {
            id: Uuid::new_v4(),
            speaker: "speaker-1".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            order: 0,
            status: ClipStatus::Active,
            kind: ClipKind::Transcribed,
            created_at: now,
            modified_at: now,
            style: None,
            segments: vec![Segment::Word(make_word(
                "hello".to_string(),
                0.0,
                1.0,
                0.95,
                None,
                None,
            ))],
        };

        ProjectData {
            version: PROJECT_DATA_VERSION.to_string(),
            project: ProjectInfo {
                id: Uuid::new_v4(),
                name: "sample".to_string(),
                created_at: now,
                modified_at: now,
                audio: AudioInfo {
                    original_name: "sample.wav".to_string(),
                    path: "sample.wav".to_string(),
                    embedded_path: Some("audio/original.wav".to_string()),
                    sample_rate: 48_000,
                    channels: 2,
                    bit_depth: 16,
                    duration_sec: 1.0,
                    was_converted: false,
                },
                asr_provider: None,
            },
            transcription: Transcription {
                language: Some("en".to_string()),
                original_segments: vec![OriginalAsrSegment {
                    start: 0.0,
                    end: 1.0,
                    text: "hello".to_string(),
                    speaker: Some("speaker-1".to_string()),
                }],
                status: TranscriptionStatus::Completed,
            },
            speakers: Speakers::new("speaker-1"),
            clips: ClipsData {
                clips: vec![clip],
                grouping: GroupingConfig::default(),
                version: now.to_rfc3339(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixtures::sample_project;

    #[test]
    fn sample_project_passes_all_invariants() {
        let project = sample_project();
        project.validate_all(false).expect("sample project should be valid");
    }

    #[test]
    fn dense_ordering_violation_is_rejected() {
        let mut project = sample_project();
        project.clips.clips[0].order = 5;
        let result = project.validate_all(false);
        assert!(matches!(
            result,
            Err(CoreError::InvariantViolation { invariant: "I6", .. })
        ));
    }

    #[test]
    fn overlapping_active_clips_are_rejected() {
        let mut project = sample_project();
        let mut second = project.clips.clips[0].clone();
        second.id = Uuid::new_v4();
        second.order = 1;
        second.start_time = 0.5;
        second.end_time = 1.5;
        project.clips.clips.push(second);
        let result = project.validate_all(false);
        assert!(matches!(
            result,
            Err(CoreError::InvariantViolation { invariant: "I5", .. })
        ));
    }
}
