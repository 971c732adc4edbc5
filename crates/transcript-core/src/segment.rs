//! Segment algebra: construct, validate, and normalize ordered segment
//! sequences within a clip. Pure and synchronous; no knowledge of clips,
//! speakers, or the store lives here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::time::{self, MIN_SEGMENT_DURATION, SMALL_OVERLAP_TOLERANCE, round6};

/// A Word segment: transcribed text with preserved original audio timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: Uuid,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub confidence: f64,
    #[serde(rename = "originalStart")]
    pub original_start: f64,
    #[serde(rename = "originalEnd")]
    pub original_end: f64,
}

/// A Spacer segment: pure silence, played as such, with no original-audio
/// mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacer {
    pub id: Uuid,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub label: Option<String>,
}

/// Either kind of segment that can appear in a clip's ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Word(Word),
    Spacer(Spacer),
}

impl Segment {
    pub fn id(&self) -> Uuid {
        match self {
            Segment::Word(w) => w.id,
            Segment::Spacer(s) => s.id,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Segment::Word(w) => w.start,
            Segment::Spacer(s) => s.start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Segment::Word(w) => w.end,
            Segment::Spacer(s) => s.end,
        }
    }

    pub fn set_start(&mut self, value: f64) {
        match self {
            Segment::Word(w) => w.start = value,
            Segment::Spacer(s) => {
                s.start = value;
                s.duration = round6(s.end - s.start);
            }
        }
    }

    pub fn set_end(&mut self, value: f64) {
        match self {
            Segment::Word(w) => w.end = value,
            Segment::Spacer(s) => {
                s.end = value;
                s.duration = round6(s.end - s.start);
            }
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Segment::Word(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Segment::Word(_) => "Word",
            Segment::Spacer(_) => "Spacer",
        }
    }
}

/// Builds a Word. Original times default to the edited times when omitted.
///
/// # Example
/// ```
/// use transcript_core::segment::make_word;
///
/// let word = make_word("hi".to_string(), 0.0, 0.5, 0.9, None, None);
/// assert_eq!(word.original_start, 0.0);
/// ```
pub fn make_word(
    text: String,
    start: f64,
    end: f64,
    confidence: f64,
    original_start: Option<f64>,
    original_end: Option<f64>,
) -> Word {
    let start = round6(start.max(0.0));
    let end = round6(end.max(start));
    Word {
        id: Uuid::new_v4(),
        start,
        end,
        text,
        confidence: confidence.clamp(0.0, 1.0),
        original_start: round6(original_start.unwrap_or(start)),
        original_end: round6(original_end.unwrap_or(end)),
    }
}

/// Builds a Spacer, sanitizing start/end and recomputing duration.
/// Zero-duration spacers are allowed by construction; normalization removes
/// them.
///
/// # Example
/// ```
/// use transcript_core::segment::make_spacer;
///
/// let spacer = make_spacer(1.0, 2.5, None);
/// assert_eq!(spacer.duration, 1.5);
/// ```
pub fn make_spacer(start: f64, end: f64, label: Option<String>) -> Spacer {
    let start = round6(start.max(0.0));
    let end = round6(end.max(start));
    Spacer {
        id: Uuid::new_v4(),
        start,
        end,
        duration: round6(end - start),
        label,
    }
}

/// Options controlling `validate`'s strictness.
#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    pub is_import: bool,
    pub spacer_threshold: f64,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            is_import: false,
            spacer_threshold: 1.0,
        }
    }
}

/// Outcome of `validate`: hard failures plus lenient warnings (import mode
/// only).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks I1-I4 against one clip's segment sequence. In import mode, small
/// inter-segment gaps below `spacer_threshold` are downgraded to warnings.
///
/// # Example
/// ```
/// use transcript_core::segment::{make_spacer, make_word, validate, ValidateOptions};
///
/// let segments = vec![
///     transcript_core::segment::Segment::Word(make_word("a".to_string(), 0.0, 1.0, 1.0, None, None)),
/// ];
/// let result = validate(&segments, 1.0, ValidateOptions::default());
/// assert!(result.is_ok());
/// ```
pub fn validate(segments: &[Segment], clip_duration: f64, options: ValidateOptions) -> ValidationResult {
    let mut result = ValidationResult::default();

    if segments.is_empty() {
        result.errors.push("clip has no segments".to_string());
        return result;
    }

    for (index, segment) in segments.iter().enumerate() {
        if !segment.start().is_finite() || segment.start() < 0.0 {
            result.errors.push(format!("segment {index} has a non-finite or negative start"));
        }
        if !segment.end().is_finite() || segment.end() < 0.0 {
            result.errors.push(format!("segment {index} has a non-finite or negative end"));
        }
        if segment.start() > segment.end() {
            result.errors.push(format!("segment {index} has start > end"));
        }
    }

    let coverage_epsilon = if options.is_import {
        time::import_epsilon(options.spacer_threshold)
    } else {
        crate::time::STEADY_STATE_EPSILON
    };

    if !time::approx_eq(segments[0].start(), 0.0, coverage_epsilon) {
        result
            .errors
            .push(format!("first segment does not start at 0 (I4): start={}", segments[0].start()));
    }
    let last_end = segments[segments.len() - 1].end();
    if !time::approx_eq(last_end, clip_duration, coverage_epsilon) {
        result.errors.push(format!(
            "last segment does not reach clip duration (I4): end={last_end}, duration={clip_duration}"
        ));
    }

    for window in segments.windows(2) {
        let gap = window[1].start() - window[0].end();
        if gap < 0.0 {
            result.errors.push(format!("segments overlap (I2/I3): gap={gap}"));
        } else if gap > 0.0 {
            if options.is_import && gap < options.spacer_threshold {
                result
                    .warnings
                    .push(format!("small inter-segment gap of {gap}s below spacer threshold"));
            } else if !options.is_import {
                result.errors.push(format!("gap between segments (I2): gap={gap}"));
            }
        }
    }

    result
}

/// Result of `normalize_for_import`: the repaired sequence plus repair
/// counters and the indices each repair touched, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct NormalizedResult {
    pub segments: Vec<Segment>,
    pub trimmed_count: usize,
    pub shifted_count: usize,
    pub removed_count: usize,
    pub trimmed_at: Vec<usize>,
    pub shifted_at: Vec<usize>,
    pub removed_at: Vec<usize>,
}

/// Deterministic repair pass over a pre-sorted-by-start segment list.
///
/// # Example
/// ```
/// use transcript_core::segment::{make_word, normalize_for_import, Segment};
///
/// let segments = vec![
///     Segment::Word(make_word("a".to_string(), 0.0, 1.0, 1.0, None, None)),
///     Segment::Word(make_word("b".to_string(), 0.999, 2.0, 1.0, None, None)),
/// ];
/// let result = normalize_for_import(segments);
/// assert_eq!(result.trimmed_count, 1);
/// ```
pub fn normalize_for_import(segments: Vec<Segment>) -> NormalizedResult {
    let mut out = NormalizedResult::default();

    for mut current in segments {
        current.set_start(round6(current.start().max(0.0)));
        current.set_end(round6(current.end().max(current.start())));

        if let Some(previous) = out.segments.last_mut() {
            let overlap = current.start() - previous.end();
            if overlap < 0.0 {
                if overlap >= SMALL_OVERLAP_TOLERANCE {
                    let new_end = previous.start().max(current.start());
                    previous.set_end(round6(new_end));
                    out.trimmed_count += 1;
                    out.trimmed_at.push(out.segments.len() - 1);
                } else {
                    current.set_start(previous.end());
                    if current.end() < current.start() {
                        current.set_end(current.start());
                    }
                    out.shifted_count += 1;
                    out.shifted_at.push(out.segments.len());
                }
            }
        }

        if current.end() - current.start() < MIN_SEGMENT_DURATION {
            out.removed_count += 1;
            out.removed_at.push(out.segments.len());
            continue;
        }

        out.segments.push(current);
    }

    out
}

/// Strict re-validation of an already-normalized sequence: any residual
/// overlap, negative duration, or non-monotone order aborts the import.
pub fn validate_normalized(segments: &[Segment]) -> Result<()> {
    for (index, segment) in segments.iter().enumerate() {
        if segment.end() < segment.start() {
            return Err(CoreError::ImportValidation {
                failures: vec![crate::error::ImportFailure {
                    clip_index: None,
                    segment_index: Some(index),
                    reason: "segment has negative duration after normalization".to_string(),
                }],
            });
        }
    }
    for window in segments.windows(2) {
        if window[1].start() < window[0].end() {
            return Err(CoreError::ImportValidation {
                failures: vec![crate::error::ImportFailure {
                    clip_index: None,
                    segment_index: None,
                    reason: "residual overlap after normalization".to_string(),
                }],
            });
        }
    }
    Ok(())
}

/// Binary search for the segment containing (or immediately preceding) `t`.
///
/// # Example
/// ```
/// use transcript_core::segment::{find_at_time, make_word, Segment};
///
/// let segments = vec![Segment::Word(make_word("a".to_string(), 0.0, 1.0, 1.0, None, None))];
/// assert!(find_at_time(&segments, 0.5).is_some());
/// ```
pub fn find_at_time(segments: &[Segment], t: f64) -> Option<&Segment> {
    let index = match segments.binary_search_by(|segment| segment.start().partial_cmp(&t).unwrap()) {
        Ok(index) => index,
        Err(0) => return None,
        Err(index) => index - 1,
    };
    segments.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start: f64, end: f64) -> Segment {
        Segment::Word(make_word("w".to_string(), start, end, 1.0, None, None))
    }

    #[test]
    fn make_spacer_clamps_and_rounds() {
        let spacer = make_spacer(-1.0, 0.123_456_78, None);
        assert_eq!(spacer.start, 0.0);
        assert_eq!(spacer.duration, spacer.end - spacer.start);
    }

    #[test]
    fn validate_accepts_full_coverage_sequence() {
        let segments = vec![word(0.0, 0.5), word(0.5, 1.0)];
        let result = validate(&segments, 1.0, ValidateOptions::default());
        assert!(result.is_ok());
    }

    #[test]
    fn validate_flags_gap_as_error_outside_import_mode() {
        let segments = vec![word(0.0, 0.4), word(0.6, 1.0)];
        let result = validate(&segments, 1.0, ValidateOptions::default());
        assert!(!result.is_ok());
    }

    #[test]
    fn validate_downgrades_small_gap_to_warning_in_import_mode() {
        let segments = vec![word(0.0, 0.4), word(0.6, 1.0)];
        let options = ValidateOptions {
            is_import: true,
            spacer_threshold: 1.0,
        };
        let result = validate(&segments, 1.0, options);
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn normalize_trims_small_overlap() {
        let segments = vec![word(0.0, 1.0), word(0.999, 2.0)];
        let result = normalize_for_import(segments);
        assert_eq!(result.trimmed_count, 1);
        assert_eq!(result.segments[0].end(), 0.999);
    }

    #[test]
    fn normalize_shifts_large_overlap() {
        let segments = vec![word(0.0, 1.0), word(0.5, 2.0)];
        let result = normalize_for_import(segments);
        assert_eq!(result.shifted_count, 1);
        assert_eq!(result.segments[1].start(), 1.0);
    }

    #[test]
    fn normalize_drops_degenerate_segments() {
        let segments = vec![word(0.0, 1.0), word(1.0, 1.0000001)];
        let result = normalize_for_import(segments);
        assert_eq!(result.removed_count, 1);
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn normalize_is_idempotent() {
        let segments = vec![word(0.0, 1.0), word(0.999, 2.0), word(1.4, 1.4000001)];
        let once = normalize_for_import(segments);
        let twice = normalize_for_import(once.segments.clone());
        assert_eq!(once.segments, twice.segments);
    }

    #[test]
    fn find_at_time_returns_containing_segment() {
        let segments = vec![word(0.0, 1.0), word(1.0, 2.0)];
        let found = find_at_time(&segments, 1.5).expect("segment exists");
        assert_eq!(found.start(), 1.0);
    }
}
