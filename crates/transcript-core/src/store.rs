//! Project Store: the authoritative, single-threaded owner of `ProjectData`.
//! Every mutation goes through `apply`, which runs the operation against a
//! candidate copy, validates the full invariant set, and only promotes the
//! candidate to state on success.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::project::{Clip, ClipStatus, ProjectData};
use crate::segment::Segment;
use crate::time;

const DEFAULT_HISTORY_CAP: usize = 100;

/// The full edit-operation vocabulary the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    SplitClip { clip_id: Uuid, segment_index: usize },
    MergeClips { clip_ids: Vec<Uuid> },
    DeleteClip { clip_id: Uuid },
    ReorderClip { clip_id: Uuid, new_order: usize },
    InsertSpacer { clip_id: Uuid, segment_index: usize, duration: f64 },
    EditWord { clip_id: Uuid, segment_index: usize, new_text: String },
    ChangeSpeaker { clip_id: Uuid, new_speaker: String },
    RenameSpeaker { old_name: String, new_name: String },
}

/// One entry in the store's bounded history: only successfully applied
/// operations are recorded (a failed `apply` is visible via the returned
/// `Err` and the `OperationFailed` event, never added here).
#[derive(Debug, Clone, PartialEq)]
pub struct EditOperation {
    pub id: Uuid,
    pub timestamp: chrono::DateTime<Utc>,
    pub payload: OperationPayload,
}

/// Events the store emits in strict order-of-application.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ProjectUpdated(ProjectData),
    ProjectError(String),
    OperationApplied(EditOperation),
    OperationFailed(EditOperation, String),
}

/// The authoritative owner of `ProjectData`. One instance per loaded
/// project; holds no process-wide statics.
#[derive(Debug)]
pub struct ProjectStore {
    project: Option<ProjectData>,
    history: VecDeque<EditOperation>,
    history_cap: usize,
    current_project_path: Option<PathBuf>,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStore {
    pub fn new() -> Self {
        Self {
            project: None,
            history: VecDeque::new(),
            history_cap: DEFAULT_HISTORY_CAP,
            current_project_path: None,
        }
    }

    /// Validates all clips (import tolerance if the transcription is
    /// `completed` or the clip data is already versioned "2.0"), then
    /// replaces state atomically.
    pub fn load(&mut self, project: ProjectData) -> Result<Vec<StoreEvent>> {
        let tolerant = project.transcription.status == crate::project::TranscriptionStatus::Completed
            || project.version == crate::project::PROJECT_DATA_VERSION;
        if let Err(error) = project.validate_all(tolerant) {
            let message = error.to_string();
            return Ok(vec![StoreEvent::ProjectError(message)]);
        }
        self.project = Some(project.clone());
        Ok(vec![StoreEvent::ProjectUpdated(project)])
    }

    /// A deep, immutable copy suitable for persistence or display.
    pub fn snapshot(&self) -> Option<ProjectData> {
        self.project.clone()
    }

    pub fn current_project_path(&self) -> Option<&PathBuf> {
        self.current_project_path.as_ref()
    }

    pub fn set_project_path(&mut self, path: Option<PathBuf>) {
        self.current_project_path = path;
    }

    /// Bounded history of successfully applied operations, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &EditOperation> {
        self.history.iter()
    }

    /// Executes `payload` on a candidate copy of state, validates I1-I7,
    /// and only on success promotes the candidate. On failure the prior
    /// state is untouched and only `OperationFailed` is emitted.
    pub fn apply(&mut self, payload: OperationPayload) -> Result<Vec<StoreEvent>> {
        let operation = EditOperation {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        };

        let Some(current) = self.project.as_ref() else {
            return Err(CoreError::Resource {
                detail: "no project is loaded".to_string(),
            });
        };

        let mut candidate = current.clone();
        let outcome = apply_payload(&mut candidate, &operation.payload);

        match outcome.and_then(|()| candidate.validate_all(false)) {
            Ok(()) => {
                candidate.clips.version = Utc::now().to_rfc3339();
                self.project = Some(candidate.clone());
                self.record_history(operation.clone());
                tracing::info!(operation_id = %operation.id, "operation applied");
                Ok(vec![
                    StoreEvent::OperationApplied(operation),
                    StoreEvent::ProjectUpdated(candidate),
                ])
            }
            Err(error) => {
                let message = error.to_string();
                tracing::warn!(operation_id = %operation.id, reason = %message, "operation failed");
                Ok(vec![StoreEvent::OperationFailed(operation, message)])
            }
        }
    }

    fn record_history(&mut self, operation: EditOperation) {
        self.history.push_back(operation);
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
    }
}

fn apply_payload(project: &mut ProjectData, payload: &OperationPayload) -> Result<()> {
    match payload {
        OperationPayload::SplitClip { clip_id, segment_index } => split_clip(project, *clip_id, *segment_index),
        OperationPayload::MergeClips { clip_ids } => merge_clips(project, clip_ids),
        OperationPayload::DeleteClip { clip_id } => delete_clip(project, *clip_id),
        OperationPayload::ReorderClip { clip_id, new_order } => reorder_clip(project, *clip_id, *new_order),
        OperationPayload::InsertSpacer {
            clip_id,
            segment_index,
            duration,
        } => insert_spacer(project, *clip_id, *segment_index, *duration),
        OperationPayload::EditWord {
            clip_id,
            segment_index,
            new_text,
        } => edit_word(project, *clip_id, *segment_index, new_text),
        OperationPayload::ChangeSpeaker { clip_id, new_speaker } => change_speaker(project, *clip_id, new_speaker),
        OperationPayload::RenameSpeaker { old_name, new_name } => {
            project.speakers.rename(old_name, new_name);
            Ok(())
        }
    }
}

fn require_clip_index(project: &ProjectData, clip_id: Uuid) -> Result<usize> {
    project
        .clips
        .clips
        .iter()
        .position(|clip| clip.id == clip_id)
        .ok_or_else(|| CoreError::UnknownClip {
            clip_id: clip_id.to_string(),
        })
}

/// Partitions a clip's segments at `segment_index` (strictly interior),
/// creating two clips with adjusted clip-relative times.
fn split_clip(project: &mut ProjectData, clip_id: Uuid, segment_index: usize) -> Result<()> {
    let index = require_clip_index(project, clip_id)?;
    let clip = &project.clips.clips[index];

    if segment_index == 0 || segment_index >= clip.segments.len() {
        return Err(CoreError::InvalidOperation {
            reason: format!(
                "split index {segment_index} is not strictly interior (clip has {} segments)",
                clip.segments.len()
            ),
        });
    }

    let split_at_abs = time::clip_to_abs(clip.start_time, clip.segments[segment_index].start());

    let (left_segments, right_segments): (Vec<Segment>, Vec<Segment>) = {
        let mut left = Vec::with_capacity(segment_index);
        let mut right = Vec::with_capacity(clip.segments.len() - segment_index);
        for (i, segment) in clip.segments.iter().enumerate() {
            if i < segment_index {
                left.push(segment.clone());
            } else {
                let mut shifted = segment.clone();
                let offset = clip.segments[segment_index].start();
                shifted.set_start(time::round6(shifted.start() - offset));
                shifted.set_end(time::round6(shifted.end() - offset));
                right.push(shifted);
            }
        }
        (left, right)
    };

    let now = Utc::now();
    let left_end = split_at_abs;
    let right_start = split_at_abs;
    let right_end = clip.end_time;

    let mut left_clip = clip.clone();
    left_clip.end_time = left_end;
    left_clip.segments = left_segments;
    left_clip.modified_at = now;

    let mut right_clip = clip.clone();
    right_clip.id = Uuid::new_v4();
    right_clip.start_time = right_start;
    right_clip.end_time = right_end;
    right_clip.segments = right_segments;
    right_clip.created_at = now;
    right_clip.modified_at = now;

    project.clips.clips[index] = left_clip;
    project.clips.clips.insert(index + 1, right_clip);
    renumber(project);
    Ok(())
}

/// Concatenates segments of contiguous clips (by `order`) in order, shifting
/// each contributing segment's times by the running cumulative duration.
fn merge_clips(project: &mut ProjectData, clip_ids: &[Uuid]) -> Result<()> {
    if clip_ids.len() < 2 {
        return Err(CoreError::InvalidOperation {
            reason: "merge requires at least 2 clips".to_string(),
        });
    }

    let mut indices: Vec<usize> = clip_ids
        .iter()
        .map(|id| require_clip_index(project, *id))
        .collect::<Result<_>>()?;
    indices.sort_unstable();

    let mut orders: Vec<usize> = indices.iter().map(|&i| project.clips.clips[i].order).collect();
    orders.sort_unstable();
    let contiguous = orders.windows(2).all(|window| window[1] == window[0] + 1);
    if !contiguous {
        return Err(CoreError::InvalidOperation {
            reason: "merge requires clips with contiguous order values".to_string(),
        });
    }

    let clips_in_order: Vec<Clip> = {
        let mut ordered = indices
            .iter()
            .map(|&i| project.clips.clips[i].clone())
            .collect::<Vec<_>>();
        ordered.sort_by_key(|clip| clip.order);
        ordered
    };

    let first = &clips_in_order[0];
    let mut merged_segments = Vec::new();
    let mut cumulative = 0.0f64;
    for clip in &clips_in_order {
        for segment in &clip.segments {
            let mut shifted = segment.clone();
            shifted.set_start(time::round6(shifted.start() + cumulative));
            shifted.set_end(time::round6(shifted.end() + cumulative));
            merged_segments.push(shifted);
        }
        cumulative += clip.duration();
    }

    let now = Utc::now();
    let merged = Clip {
        id: Uuid::new_v4(),
        speaker: first.speaker.clone(),
        start_time: first.start_time,
        end_time: clips_in_order.last().unwrap().end_time,
        order: first.order,
        status: ClipStatus::Active,
        kind: first.kind,
        created_at: first.created_at,
        modified_at: now,
        style: first.style.clone(),
        segments: merged_segments,
    };

    let mut sorted_indices = indices.clone();
    sorted_indices.sort_unstable_by(|a, b| b.cmp(a));
    for &index in &sorted_indices {
        project.clips.clips.remove(index);
    }
    let insert_at = sorted_indices.last().copied().unwrap_or(0);
    project.clips.clips.insert(insert_at, merged);
    renumber(project);
    Ok(())
}

/// Soft delete: sets `status = deleted`. The clip is retained for restore
/// and for EDL contiguity decisions.
fn delete_clip(project: &mut ProjectData, clip_id: Uuid) -> Result<()> {
    let index = require_clip_index(project, clip_id)?;
    project.clips.clips[index].status = ClipStatus::Deleted;
    project.clips.clips[index].modified_at = Utc::now();
    Ok(())
}

/// Splices a clip to `new_order`, renumbering densely afterward.
fn reorder_clip(project: &mut ProjectData, clip_id: Uuid, new_order: usize) -> Result<()> {
    let index = require_clip_index(project, clip_id)?;
    let clip = project.clips.clips.remove(index);
    let insert_at = new_order.min(project.clips.clips.len());
    project.clips.clips.insert(insert_at, clip);
    renumber(project);
    Ok(())
}

/// Inserts a Spacer at `segment_index`, shifting all later segments by
/// `+duration` and increasing the clip's `duration`/`endTime`.
fn insert_spacer(project: &mut ProjectData, clip_id: Uuid, segment_index: usize, duration: f64) -> Result<()> {
    let index = require_clip_index(project, clip_id)?;
    let clip = &mut project.clips.clips[index];

    if segment_index > clip.segments.len() {
        return Err(CoreError::UnknownSegment {
            clip_id: clip_id.to_string(),
            segment_index,
        });
    }

    let insertion_point = if segment_index == clip.segments.len() {
        clip.segments.last().map(|s| s.end()).unwrap_or(0.0)
    } else {
        clip.segments[segment_index].start()
    };

    for segment in clip.segments.iter_mut().skip(segment_index) {
        segment.set_start(time::round6(segment.start() + duration));
        segment.set_end(time::round6(segment.end() + duration));
    }

    let spacer = crate::segment::make_spacer(insertion_point, insertion_point + duration, None);
    clip.segments.insert(segment_index, Segment::Spacer(spacer));
    clip.end_time = time::round6(clip.end_time + duration);
    clip.modified_at = Utc::now();
    Ok(())
}

/// Replaces a Word's `text` only; times and originals untouched. Fails if
/// the target is not a Word.
fn edit_word(project: &mut ProjectData, clip_id: Uuid, segment_index: usize, new_text: &str) -> Result<()> {
    let index = require_clip_index(project, clip_id)?;
    let clip = &mut project.clips.clips[index];
    let segment = clip
        .segments
        .get_mut(segment_index)
        .ok_or_else(|| CoreError::UnknownSegment {
            clip_id: clip_id.to_string(),
            segment_index,
        })?;

    match segment {
        Segment::Word(word) => {
            word.text = new_text.to_string();
            clip.modified_at = Utc::now();
            Ok(())
        }
        Segment::Spacer(_) => Err(CoreError::WrongSegmentKind {
            clip_id: clip_id.to_string(),
            segment_index,
            expected: "Word",
        }),
    }
}

/// Updates the speaker tag on a clip.
fn change_speaker(project: &mut ProjectData, clip_id: Uuid, new_speaker: &str) -> Result<()> {
    let index = require_clip_index(project, clip_id)?;
    project.clips.clips[index].speaker = new_speaker.to_string();
    project.clips.clips[index].modified_at = Utc::now();
    Ok(())
}

/// Runs `renumber(order)` densely after a structural change.
fn renumber(project: &mut ProjectData) {
    for (new_order, clip) in project.clips.clips.iter_mut().enumerate() {
        clip.order = new_order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::fixtures::sample_project;
    use crate::segment::make_word;

    fn store_with_sample() -> ProjectStore {
        let mut store = ProjectStore::new();
        store.load(sample_project()).expect("load should succeed");
        store
    }

    fn two_segment_project() -> ProjectData {
        let mut project = sample_project();
        let clip = &mut project.clips.clips[0];
        clip.end_time = 2.0;
        clip.segments = vec![
            Segment::Word(make_word("a".to_string(), 0.0, 1.0, 0.9, None, None)),
            Segment::Word(make_word("b".to_string(), 1.0, 2.0, 0.9, None, None)),
        ];
        project
    }

    fn assert_failed(events: Vec<StoreEvent>) {
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StoreEvent::OperationFailed(..)));
    }

    #[test]
    fn split_at_boundary_fails_and_preserves_state() {
        let mut store = ProjectStore::new();
        store.load(two_segment_project()).expect("load");
        let clip_id = store.snapshot().unwrap().clips.clips[0].id;
        let before = store.snapshot().unwrap();

        let events = store
            .apply(OperationPayload::SplitClip {
                clip_id,
                segment_index: 0,
            })
            .expect("apply should not itself error");
        assert_failed(events);
        assert_eq!(store.snapshot().unwrap(), before);

        let events = store
            .apply(OperationPayload::SplitClip {
                clip_id,
                segment_index: 2,
            })
            .expect("apply should not itself error");
        assert_failed(events);
        assert_eq!(store.snapshot().unwrap(), before);
    }

    #[test]
    fn split_then_merge_round_trips_up_to_id_and_timestamps() {
        let mut store = ProjectStore::new();
        store.load(two_segment_project()).expect("load");
        let clip_id = store.snapshot().unwrap().clips.clips[0].id;

        store
            .apply(OperationPayload::SplitClip {
                clip_id,
                segment_index: 1,
            })
            .expect("split should succeed");
        let after_split = store.snapshot().unwrap();
        assert_eq!(after_split.clips.clips.len(), 2);

        let ids: Vec<Uuid> = after_split.clips.clips.iter().map(|c| c.id).collect();
        store
            .apply(OperationPayload::MergeClips { clip_ids: ids })
            .expect("merge should succeed");
        let after_merge = store.snapshot().unwrap();

        assert_eq!(after_merge.clips.clips.len(), 1);
        assert_eq!(after_merge.clips.clips[0].segments.len(), 2);
        assert_eq!(after_merge.clips.clips[0].start_time, 0.0);
        assert_eq!(after_merge.clips.clips[0].end_time, 2.0);
    }

    #[test]
    fn merge_non_contiguous_fails() {
        let mut project = two_segment_project();
        let mut third = project.clips.clips[0].clone();
        third.id = Uuid::new_v4();
        third.order = 2;
        third.start_time = 2.0;
        third.end_time = 3.0;
        third.segments = vec![Segment::Word(make_word("c".to_string(), 0.0, 1.0, 0.9, None, None))];

        let mut second = project.clips.clips[0].clone();
        second.id = Uuid::new_v4();
        second.order = 1;
        second.start_time = 1.0;
        second.end_time = 2.0;
        project.clips.clips[0].end_time = 1.0;
        project.clips.clips[0].segments = vec![Segment::Word(make_word("a".to_string(), 0.0, 1.0, 0.9, None, None))];

        project.clips.clips.push(second);
        project.clips.clips.push(third);

        let mut store = ProjectStore::new();
        store.load(project).expect("load");
        let snapshot = store.snapshot().unwrap();
        let before = snapshot.clone();
        let id0 = snapshot.clips.clips[0].id;
        let id2 = snapshot.clips.clips[2].id;

        let events = store
            .apply(OperationPayload::MergeClips {
                clip_ids: vec![id0, id2],
            })
            .expect("apply should not itself error");
        assert_failed(events);
        assert_eq!(store.snapshot().unwrap(), before);
    }

    #[test]
    fn reorder_clip_moves_position_and_renumbers_order_field() {
        let mut project = two_segment_project();
        let mut third = project.clips.clips[0].clone();
        third.id = Uuid::new_v4();
        third.order = 2;
        third.start_time = 2.0;
        third.end_time = 3.0;
        third.segments = vec![Segment::Word(make_word("c".to_string(), 0.0, 1.0, 0.9, None, None))];

        let mut second = project.clips.clips[0].clone();
        second.id = Uuid::new_v4();
        second.order = 1;
        second.start_time = 1.0;
        second.end_time = 2.0;
        project.clips.clips[0].end_time = 1.0;
        project.clips.clips[0].segments = vec![Segment::Word(make_word("a".to_string(), 0.0, 1.0, 0.9, None, None))];

        project.clips.clips.push(second);
        project.clips.clips.push(third);

        let mut store = ProjectStore::new();
        store.load(project).expect("load");
        let snapshot = store.snapshot().unwrap();
        let id_a = snapshot.clips.clips[0].id;
        let id_b = snapshot.clips.clips[1].id;
        let id_c = snapshot.clips.clips[2].id;

        store
            .apply(OperationPayload::ReorderClip {
                clip_id: id_c,
                new_order: 0,
            })
            .expect("reorder should succeed");

        let after = store.snapshot().unwrap();
        let ids: Vec<Uuid> = after.clips.clips.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![id_c, id_a, id_b]);
        for (position, clip) in after.clips.clips.iter().enumerate() {
            assert_eq!(clip.order, position);
        }
    }

    #[test]
    fn soft_delete_keeps_clip_for_edl_packing() {
        let mut store = store_with_sample();
        let clip_id = store.snapshot().unwrap().clips.clips[0].id;
        store.apply(OperationPayload::DeleteClip { clip_id }).expect("delete");
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.clips.clips.len(), 1);
        assert_eq!(snapshot.clips.clips[0].status, ClipStatus::Deleted);
    }

    #[test]
    fn edit_word_on_spacer_fails() {
        let mut project = sample_project();
        project.clips.clips[0].segments = vec![Segment::Spacer(crate::segment::make_spacer(0.0, 1.0, None))];
        let mut store = ProjectStore::new();
        store.load(project).expect("load");
        let clip_id = store.snapshot().unwrap().clips.clips[0].id;

        let events = store
            .apply(OperationPayload::EditWord {
                clip_id,
                segment_index: 0,
                new_text: "oops".to_string(),
            })
            .expect("apply should not itself error");
        assert_failed(events);
    }

    #[test]
    fn successful_operations_are_recorded_in_history() {
        let mut store = store_with_sample();
        let clip_id = store.snapshot().unwrap().clips.clips[0].id;
        store
            .apply(OperationPayload::ChangeSpeaker {
                clip_id,
                new_speaker: "speaker-2".to_string(),
            })
            .expect("change speaker should succeed");
        assert_eq!(store.history().count(), 1);
    }

    #[test]
    fn failed_operations_are_not_recorded_in_history() {
        let mut store = store_with_sample();
        let events = store
            .apply(OperationPayload::DeleteClip {
                clip_id: Uuid::new_v4(),
            })
            .expect("apply should not itself error");
        assert_failed(events);
        assert_eq!(store.history().count(), 0);
    }
}
