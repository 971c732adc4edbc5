//! Import pipeline: turns a raw ASR result plus audio metadata into an
//! initial, fully valid `ProjectData`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, ImportFailure, Result};
use crate::project::{
    AudioInfo, Clip, ClipKind, ClipStatus, ClipsData, GroupingConfig, OriginalAsrSegment, ProjectData,
    ProjectInfo, Speakers, Transcription, TranscriptionStatus, PROJECT_DATA_VERSION,
};
use crate::segment::{
    Segment, ValidateOptions, make_spacer, make_word, normalize_for_import, validate, validate_normalized,
};

const SILENCE_SPEAKER: &str = "Silence";

/// One ASR word as received from the provider, before unit normalization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWord {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// One ASR segment as received from the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub words: Vec<RawWord>,
}

/// Input contract for the import pipeline: the normalized ASR result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionResult {
    pub segments: Vec<RawSegment>,
    pub language: Option<String>,
    #[serde(default)]
    pub speakers: std::collections::HashMap<String, String>,
}

/// Audio metadata accompanying an import, already passed through
/// `AudioPreparer` (see `crate::audio`).
#[derive(Debug, Clone)]
pub struct ImportAudioMetadata {
    pub original_name: String,
    pub resolved_path: String,
    pub embedded_path: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub duration_sec: f64,
    pub was_converted: bool,
    pub asr_provider: Option<String>,
}

/// Import-tunable policy knobs; defaults match the spec's defaults.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub max_clip_duration: f64,
    pub spacer_threshold: f64,
    /// Speaker id assigned to a word whose segment also carries no speaker
    /// tag at all; mirrors `Speakers::default_speaker_id`.
    pub default_speaker_id: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_clip_duration: 30.0,
            spacer_threshold: 1.0,
            default_speaker_id: "unknown-speaker".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct FlatWord {
    start: f64,
    end: f64,
    text: String,
    confidence: f64,
    speaker: String,
}

/// Imports a raw ASR result into a fully valid `ProjectData`.
///
/// # Example
/// ```
/// use transcript_core::import::{import_transcription, ImportAudioMetadata, ImportOptions, RawSegment, RawWord, TranscriptionResult};
/// use std::collections::HashMap;
///
/// let result = TranscriptionResult {
///     segments: vec![RawSegment {
///         start: 0.0,
///         end: 1.0,
///         text: "hi".to_string(),
///         speaker: Some("speaker-1".to_string()),
///         words: vec![RawWord { start: 0.0, end: 1.0, text: "hi".to_string(), confidence: Some(0.9), speaker: None }],
///     }],
///     language: Some("en".to_string()),
///     speakers: HashMap::new(),
/// };
/// let audio = ImportAudioMetadata {
///     original_name: "a.wav".to_string(),
///     resolved_path: "a.wav".to_string(),
///     embedded_path: None,
///     sample_rate: 48_000,
///     channels: 2,
///     bit_depth: 16,
///     duration_sec: 1.0,
///     was_converted: false,
///     asr_provider: None,
/// };
/// let project = import_transcription(result, audio, ImportOptions::default()).expect("import should succeed");
/// assert_eq!(project.clips.clips.len(), 1);
/// ```
pub fn import_transcription(
    result: TranscriptionResult,
    audio: ImportAudioMetadata,
    options: ImportOptions,
) -> Result<ProjectData> {
    let original_segments: Vec<OriginalAsrSegment> = result
        .segments
        .iter()
        .map(|segment| OriginalAsrSegment {
            start: segment.start,
            end: segment.end,
            text: segment.text.clone(),
            speaker: segment.speaker.clone(),
        })
        .collect();

    let mut flat = flatten_words(&result.segments, &options.default_speaker_id);
    flat.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
    normalize_units(&mut flat);

    let clips = group_into_clips(&flat, &options)?;

    let mut speakers = Speakers::new(options.default_speaker_id.clone());
    for (id, name) in &result.speakers {
        speakers.names.insert(id.clone(), name.clone());
    }
    for clip in &clips {
        speakers
            .names
            .entry(clip.speaker.clone())
            .or_insert_with(|| clip.speaker.clone());
    }

    let now = Utc::now();
    Ok(ProjectData {
        version: PROJECT_DATA_VERSION.to_string(),
        project: ProjectInfo {
            id: Uuid::new_v4(),
            name: audio.original_name.clone(),
            created_at: now,
            modified_at: now,
            audio: AudioInfo {
                original_name: audio.original_name,
                path: audio.resolved_path,
                embedded_path: audio.embedded_path,
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                bit_depth: audio.bit_depth,
                duration_sec: audio.duration_sec,
                was_converted: audio.was_converted,
            },
            asr_provider: audio.asr_provider,
        },
        transcription: Transcription {
            language: result.language,
            original_segments,
            status: TranscriptionStatus::Completed,
        },
        speakers,
        clips: ClipsData {
            clips,
            grouping: GroupingConfig {
                max_clip_duration: options.max_clip_duration,
                spacer_threshold: options.spacer_threshold,
            },
            version: now.to_rfc3339(),
        },
    })
}

/// Step 1: flattens words across segments, inheriting segment speaker where
/// a word has none.
fn flatten_words(segments: &[RawSegment], default_speaker_id: &str) -> Vec<FlatWord> {
    let mut flat = Vec::new();
    for segment in segments {
        if segment.words.is_empty() {
            flat.push(FlatWord {
                start: segment.start,
                end: segment.end,
                text: segment.text.clone(),
                confidence: 1.0,
                speaker: segment.speaker.clone().unwrap_or_else(|| default_speaker_id.to_string()),
            });
            continue;
        }
        for word in &segment.words {
            let speaker = word
                .speaker
                .clone()
                .or_else(|| segment.speaker.clone())
                .unwrap_or_else(|| default_speaker_id.to_string());
            flat.push(FlatWord {
                start: word.start,
                end: word.end,
                text: word.text.clone(),
                confidence: word.confidence.unwrap_or(1.0),
                speaker,
            });
        }
    }
    flat
}

/// Step 2: detects whether word timestamps are in milliseconds by taking
/// the median of positive word durations; divides by 1000 if it exceeds 10.
/// This decision is logged, not assumed.
fn normalize_units(words: &mut [FlatWord]) {
    let mut durations: Vec<f64> = words
        .iter()
        .map(|word| word.end - word.start)
        .filter(|duration| *duration > 0.0)
        .collect();
    if durations.is_empty() {
        return;
    }
    durations.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = durations[durations.len() / 2];

    if median > 10.0 {
        tracing::info!(median_duration = median, "word timestamps detected as milliseconds, converting to seconds");
        for word in words.iter_mut() {
            word.start /= 1000.0;
            word.end /= 1000.0;
        }
    } else {
        tracing::info!(median_duration = median, "word timestamps detected as seconds, no conversion");
    }
}

/// Steps 3-5: groups flattened words into clips by speaker change, max
/// clip duration, and gap-to-spacer-threshold triggers; builds each clip's
/// segments; validates with import tolerance.
fn group_into_clips(words: &[FlatWord], options: &ImportOptions) -> Result<Vec<Clip>> {
    if words.is_empty() {
        return Err(CoreError::ImportValidation {
            failures: vec![ImportFailure {
                clip_index: None,
                segment_index: None,
                reason: "no words to import".to_string(),
            }],
        });
    }

    let mut clips = Vec::new();
    let mut current_start_index = 0usize;

    let mut index = 1usize;
    while index <= words.len() {
        let at_end = index == words.len();
        let speaker_changed = !at_end && words[index].speaker != words[current_start_index].speaker;
        let running_duration = if at_end {
            words[index - 1].end - words[current_start_index].start
        } else {
            words[index].start - words[current_start_index].start
        };
        let duration_exceeded = running_duration > options.max_clip_duration;
        let gap_triggers_split = !at_end && (words[index].start - words[index - 1].end) >= options.spacer_threshold;

        if at_end || speaker_changed || duration_exceeded || gap_triggers_split {
            let clip_words = &words[current_start_index..index];
            let clip = build_clip(clip_words, options)?;
            let clip_end = clip.end_time;
            clips.push(clip);

            if gap_triggers_split {
                let gap = words[index].start - words[index - 1].end;
                clips.push(build_silence_clip(clip_end, gap));
            }

            current_start_index = index;
        }

        index += 1;
    }

    for (order, clip) in clips.iter_mut().enumerate() {
        clip.order = order;
    }

    Ok(clips)
}

/// A dedicated spacer-only clip covering inter-clip silence.
fn build_silence_clip(start_time: f64, gap: f64) -> Clip {
    let now = Utc::now();
    let spacer = make_spacer(0.0, gap, Some(format!("{gap:.1}s")));
    Clip {
        id: Uuid::new_v4(),
        speaker: SILENCE_SPEAKER.to_string(),
        start_time,
        end_time: start_time + gap,
        order: 0,
        status: ClipStatus::Active,
        kind: ClipKind::Transcribed,
        created_at: now,
        modified_at: now,
        style: None,
        segments: vec![Segment::Spacer(spacer)],
    }
}

/// Step 4: walks a clip's words, emitting a Word segment then handling the
/// gap to the next word per the segment algebra's gap-detection policy.
fn build_clip(words: &[FlatWord], options: &ImportOptions) -> Result<Clip> {
    let clip_start = words[0].start;
    let mut segments = Vec::with_capacity(words.len() * 2);

    for (position, word) in words.iter().enumerate() {
        let relative_start = word.start - clip_start;
        let mut relative_end = word.end - clip_start;
        let mut original_end = word.end;

        if let Some(next) = words.get(position + 1) {
            let gap = next.start - word.end;
            if gap > 0.0 && gap < options.spacer_threshold {
                // Extend to absorb the gap and rescale originalEnd so that
                // (originalEnd - originalStart) / (end - start) is preserved.
                let new_relative_end = next.start - clip_start;
                let original_span = word.end - word.start;
                let edited_span = (relative_end - relative_start).max(1e-9);
                original_end = word.start + original_span * (new_relative_end - relative_start) / edited_span;
                relative_end = new_relative_end;
            }
        }

        let built = make_word(
            word.text.clone(),
            relative_start,
            relative_end,
            word.confidence,
            Some(word.start),
            Some(original_end),
        );
        segments.push(Segment::Word(built));

        if let Some(next) = words.get(position + 1) {
            let gap = next.start - word.end;
            if gap >= options.spacer_threshold {
                let spacer_start = relative_end;
                let spacer_end = next.start - clip_start;
                segments.push(Segment::Spacer(make_spacer(spacer_start, spacer_end, None)));
            }
        }
    }

    let normalized = normalize_for_import(segments);
    validate_normalized(&normalized.segments)?;

    if normalized.trimmed_count > 0 || normalized.shifted_count > 0 || normalized.removed_count > 0 {
        tracing::info!(
            trimmed = normalized.trimmed_count,
            shifted = normalized.shifted_count,
            removed = normalized.removed_count,
            "import normalization repaired segment sequence",
        );
    }

    let clip_end = clip_start + normalized.segments.last().map(|s| s.end()).unwrap_or(0.0);
    let duration = clip_end - clip_start;

    let validate_options = ValidateOptions {
        is_import: true,
        spacer_threshold: options.spacer_threshold,
    };
    let validation = validate(&normalized.segments, duration, validate_options);
    if !validation.is_ok() {
        return Err(CoreError::ImportValidation {
            failures: validation
                .errors
                .into_iter()
                .map(|reason| ImportFailure {
                    clip_index: None,
                    segment_index: None,
                    reason,
                })
                .collect(),
        });
    }
    for warning in &validation.warnings {
        tracing::warn!(warning, "import validation warning");
    }

    let now = Utc::now();
    Ok(Clip {
        id: Uuid::new_v4(),
        speaker: words[0].speaker.clone(),
        start_time: clip_start,
        end_time: clip_end,
        order: 0,
        status: ClipStatus::Active,
        kind: ClipKind::Transcribed,
        created_at: now,
        modified_at: now,
        style: None,
        segments: normalized.segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ImportAudioMetadata {
        ImportAudioMetadata {
            original_name: "a.wav".to_string(),
            resolved_path: "a.wav".to_string(),
            embedded_path: None,
            sample_rate: 48_000,
            channels: 2,
            bit_depth: 16,
            duration_sec: 10.0,
            was_converted: false,
            asr_provider: None,
        }
    }

    fn word(start: f64, end: f64, speaker: &str) -> RawWord {
        RawWord {
            start,
            end,
            text: "w".to_string(),
            confidence: Some(0.9),
            speaker: Some(speaker.to_string()),
        }
    }

    #[test]
    fn unit_detection_converts_millisecond_timestamps() {
        let result = TranscriptionResult {
            segments: vec![RawSegment {
                start: 1000.0,
                end: 1500.0,
                text: "hi".to_string(),
                speaker: Some("speaker-1".to_string()),
                words: vec![word(1000.0, 1500.0, "speaker-1")],
            }],
            language: None,
            speakers: Default::default(),
        };
        let project = import_transcription(result, metadata(), ImportOptions::default()).expect("import");
        let clip = &project.clips.clips[0];
        let Segment::Word(w) = &clip.segments[0] else {
            panic!("expected a word segment")
        };
        assert!((w.original_start - 1.0).abs() < 1e-9);
        assert!((w.original_end - 1.5).abs() < 1e-9);
    }

    #[test]
    fn large_gap_becomes_dedicated_silence_clip() {
        let result = TranscriptionResult {
            segments: vec![RawSegment {
                start: 0.0,
                end: 4.0,
                text: "a b".to_string(),
                speaker: Some("speaker-1".to_string()),
                words: vec![word(0.0, 1.0, "speaker-1"), word(3.5, 4.0, "speaker-1")],
            }],
            language: None,
            speakers: Default::default(),
        };
        let project = import_transcription(result, metadata(), ImportOptions::default()).expect("import");
        assert_eq!(project.clips.clips.len(), 3);
        assert_eq!(project.clips.clips[1].speaker, SILENCE_SPEAKER);
        let Segment::Spacer(spacer) = &project.clips.clips[1].segments[0] else {
            panic!("expected a spacer segment")
        };
        assert!((spacer.duration - 2.5).abs() < 1e-6);
    }

    #[test]
    fn small_gap_extends_previous_word_proportionally() {
        let result = TranscriptionResult {
            segments: vec![RawSegment {
                start: 0.0,
                end: 1.0,
                text: "a b".to_string(),
                speaker: Some("speaker-1".to_string()),
                words: vec![word(0.0, 0.5, "speaker-1"), word(0.6, 1.0, "speaker-1")],
            }],
            language: None,
            speakers: Default::default(),
        };
        let mut options = ImportOptions::default();
        options.spacer_threshold = 1.0;
        let project = import_transcription(result, metadata(), options).expect("import");
        assert_eq!(project.clips.clips.len(), 1);
        let Segment::Word(first) = &project.clips.clips[0].segments[0] else {
            panic!("expected a word segment")
        };
        assert!((first.end - 0.6).abs() < 1e-6);
        assert!((first.original_end - 0.6).abs() < 1e-6);
    }

    #[test]
    fn speaker_change_starts_a_new_clip() {
        let result = TranscriptionResult {
            segments: vec![RawSegment {
                start: 0.0,
                end: 2.0,
                text: "a b".to_string(),
                speaker: None,
                words: vec![word(0.0, 1.0, "speaker-1"), word(1.0, 2.0, "speaker-2")],
            }],
            language: None,
            speakers: Default::default(),
        };
        let project = import_transcription(result, metadata(), ImportOptions::default()).expect("import");
        assert_eq!(project.clips.clips.len(), 2);
        assert_eq!(project.clips.clips[0].speaker, "speaker-1");
        assert_eq!(project.clips.clips[1].speaker, "speaker-2");
    }

    #[test]
    fn imported_project_passes_all_invariants() {
        let result = TranscriptionResult {
            segments: vec![RawSegment {
                start: 0.0,
                end: 2.0,
                text: "a b".to_string(),
                speaker: Some("speaker-1".to_string()),
                words: vec![word(0.0, 1.0, "speaker-1"), word(1.0, 2.0, "speaker-1")],
            }],
            language: None,
            speakers: Default::default(),
        };
        let project = import_transcription(result, metadata(), ImportOptions::default()).expect("import");
        project.validate_all(false).expect("imported project should be valid");
    }
}
