//! EDL Projector: derives a playable edit decision list from the current
//! `ProjectData`. Pure: no I/O, takes a snapshot, returns a value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::project::ProjectData;
use crate::segment::Segment;

/// Per-segment detail within one EDL entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdlSegment {
    pub kind: EdlSegmentKind,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_start_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_end_sec: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdlSegmentKind {
    Word,
    Spacer,
}

/// One clip's entry on the edited timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdlEntry {
    pub id: Uuid,
    pub order: usize,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_start_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_end_sec: Option<f64>,
    pub segments: Vec<EdlSegment>,
}

/// A full EDL publication, carrying the monotone revision the transport
/// acknowledges back via `edlApplied{revision}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edl {
    pub revision: u64,
    pub entries: Vec<EdlEntry>,
}

/// Projects the current state into a playable EDL.
///
/// Walks active clips in `order`, packs each into a contiguous
/// edited-timeline window, and emits per-segment detail using each
/// segment's own clip-relative timing. Word segments surface their
/// preserved original timing; Spacer segments never do (the transport
/// synthesizes silence from duration alone).
///
/// # Example
/// ```
/// use transcript_core::edl::project_edl;
/// use transcript_core::project::fixtures::sample_project;
///
/// let project = sample_project();
/// let edl = project_edl(&project, 1);
/// assert_eq!(edl.revision, 1);
/// assert_eq!(edl.entries.len(), 1);
/// ```
pub fn project_edl(project: &ProjectData, revision: u64) -> Edl {
    let mut active: Vec<&crate::project::Clip> = project.active_clips().collect();
    active.sort_by_key(|clip| clip.order);

    let mut entries = Vec::with_capacity(active.len());
    let mut cursor = 0.0f64;

    for clip in active {
        let edited_start = cursor;
        let edited_end = cursor + clip.duration();
        cursor = edited_end;

        let moved = (clip.start_time - edited_start).abs() > crate::time::STEADY_STATE_EPSILON;

        let segments: Vec<EdlSegment> = clip
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Word(word) => EdlSegment {
                    kind: EdlSegmentKind::Word,
                    start_sec: word.start,
                    end_sec: word.end,
                    text: Some(word.text.clone()),
                    original_start_sec: Some(word.original_start),
                    original_end_sec: Some(word.original_end),
                },
                Segment::Spacer(spacer) => EdlSegment {
                    kind: EdlSegmentKind::Spacer,
                    start_sec: spacer.start,
                    end_sec: spacer.end,
                    text: None,
                    original_start_sec: None,
                    original_end_sec: None,
                },
            })
            .collect();

        let (original_start_sec, original_end_sec) = if moved {
            original_bounds(clip)
        } else {
            (None, None)
        };

        entries.push(EdlEntry {
            id: clip.id,
            order: clip.order,
            start_sec: edited_start,
            end_sec: edited_end,
            original_start_sec,
            original_end_sec,
            segments,
        });
    }

    Edl { revision, entries }
}

/// First Word original start and last Word original end within a clip;
/// `None` if the clip contains only spacers.
fn original_bounds(clip: &crate::project::Clip) -> (Option<f64>, Option<f64>) {
    let first = clip.segments.iter().find_map(|segment| match segment {
        Segment::Word(word) => Some(word.original_start),
        Segment::Spacer(_) => None,
    });
    let last = clip.segments.iter().rev().find_map(|segment| match segment {
        Segment::Word(word) => Some(word.original_end),
        Segment::Spacer(_) => None,
    });
    match (first, last) {
        (Some(first), Some(last)) => (Some(first), Some(last)),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ClipStatus;
    use crate::project::fixtures::sample_project;

    #[test]
    fn soft_deleted_middle_clip_is_packed_around() {
        let mut project = sample_project();
        let mut second = project.clips.clips[0].clone();
        second.id = Uuid::new_v4();
        second.order = 1;
        second.start_time = 2.0;
        second.end_time = 5.0;
        second.status = ClipStatus::Deleted;

        let mut third = project.clips.clips[0].clone();
        third.id = Uuid::new_v4();
        third.order = 2;
        third.start_time = 5.0;
        third.end_time = 10.0;

        project.clips.clips[0].end_time = 2.0;
        project.clips.clips.push(second);
        project.clips.clips.push(third);

        let edl = project_edl(&project, 3);
        assert_eq!(edl.entries.len(), 2);
        assert_eq!(edl.entries[0].start_sec, 0.0);
        assert_eq!(edl.entries[0].end_sec, 2.0);
        assert_eq!(edl.entries[1].start_sec, 2.0);
        assert_eq!(edl.entries[1].end_sec, 7.0);
    }

    #[test]
    fn revision_is_carried_through_unchanged() {
        let project = sample_project();
        let edl = project_edl(&project, 42);
        assert_eq!(edl.revision, 42);
    }
}
