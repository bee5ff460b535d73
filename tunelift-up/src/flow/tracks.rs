//! Track collection management
//!
//! Ordered collection of track entries assembled before/while the release is
//! created remotely. Enforces per-release-type cardinality and keeps track
//! numbering contiguous from 1.

use uuid::Uuid;

use crate::flow::FlowError;
use crate::models::{ReleaseDraft, ReleaseType, TrackEntry, TrackPatch};

/// Result of checking a track count against a release type's range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountCheck {
    Ok,
    TooFew { required_min: usize, actual: usize },
    TooMany { allowed_max: usize, actual: usize },
}

impl CountCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, CountCheck::Ok)
    }
}

/// Check a track count against the type's required range
pub fn validate_count(release_type: ReleaseType, count: usize) -> CountCheck {
    let range = release_type.required_track_count();
    if count < range.min {
        return CountCheck::TooFew {
            required_min: range.min,
            actual: count,
        };
    }
    if let Some(max) = range.max {
        if count > max {
            return CountCheck::TooMany {
                allowed_max: max,
                actual: count,
            };
        }
    }
    CountCheck::Ok
}

/// Append a new entry with the next sequential track number.
///
/// Rejects with `CapacityExceeded` once the chosen type's maximum is
/// reached. With no type chosen yet there is no cap; the count is
/// re-checked by the tracks guard.
pub fn add_entry(draft: &mut ReleaseDraft, title: String) -> Result<Uuid, FlowError> {
    if let Some(release_type) = draft.release_type {
        if let Some(max) = release_type.required_track_count().max {
            if draft.tracks.len() >= max {
                return Err(FlowError::CapacityExceeded {
                    release_type: release_type.as_str(),
                    max,
                });
            }
        }
    }

    let entry = TrackEntry::new(draft.tracks.len() as u32 + 1, title);
    let local_id = entry.local_id;
    draft.tracks.push(entry);
    Ok(local_id)
}

/// Remove an entry and renumber the remainder contiguously from 1,
/// preserving relative order.
///
/// Local bookkeeping only: an already-attached remote track is not
/// retracted by this operation.
pub fn remove_entry(draft: &mut ReleaseDraft, local_id: Uuid) -> Result<TrackEntry, FlowError> {
    let index = draft
        .tracks
        .iter()
        .position(|t| t.local_id == local_id)
        .ok_or(FlowError::UnknownTrack(local_id))?;

    let removed = draft.tracks.remove(index);
    renumber(draft);
    Ok(removed)
}

/// Partial update of an entry's descriptive fields. Attachment state is
/// untouched; `TrackPatch` has no remote-id field.
pub fn update_entry(
    draft: &mut ReleaseDraft,
    local_id: Uuid,
    patch: TrackPatch,
) -> Result<(), FlowError> {
    let entry = draft
        .track_mut(local_id)
        .ok_or(FlowError::UnknownTrack(local_id))?;
    patch.apply_to(entry);
    Ok(())
}

fn renumber(draft: &mut ReleaseDraft) {
    for (index, entry) in draft.tracks.iter_mut().enumerate() {
        entry.track_number = index as u32 + 1;
    }
}
