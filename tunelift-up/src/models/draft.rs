//! Release draft aggregate
//!
//! The draft is the in-progress state of one upload flow: release metadata,
//! cover reference, assembled tracks, acknowledgment flags and the current
//! wizard step. It is mutated exclusively by the flow engine and mirrored to
//! durable storage on every mutation so a reload can resume it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tunelift_common::events::FlowStep;
use uuid::Uuid;

use crate::models::track::TrackEntry;

/// Release type, which determines the required track-count range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    /// Exactly one track
    Single,
    /// Two to four tracks
    Medley,
    /// Five or more tracks
    Album,
}

impl ReleaseType {
    /// Required track-count range for this release type
    pub fn required_track_count(self) -> TrackCountRange {
        match self {
            ReleaseType::Single => TrackCountRange { min: 1, max: Some(1) },
            ReleaseType::Medley => TrackCountRange { min: 2, max: Some(4) },
            ReleaseType::Album => TrackCountRange { min: 5, max: None },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseType::Single => "single",
            ReleaseType::Medley => "medley",
            ReleaseType::Album => "album",
        }
    }
}

/// Inclusive track-count range; `max == None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackCountRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl TrackCountRange {
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

/// Draft lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    /// Flow is active
    InProgress,
    /// Submitted for review; terminal
    Completed,
    /// Last gateway submission was rejected; retry or correct and resubmit
    Failed,
    /// Explicitly abandoned; terminal
    Cancelled,
}

impl DraftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftStatus::InProgress => "IN_PROGRESS",
            DraftStatus::Completed => "COMPLETED",
            DraftStatus::Failed => "FAILED",
            DraftStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Stored cover art reference, including the dimensions echoed by the
/// storage backend for the review step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverArt {
    pub upload_id: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Step transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTransition {
    pub draft_id: Uuid,
    pub old_step: FlowStep,
    pub new_step: FlowStep,
    pub transitioned_at: DateTime<Utc>,
}

/// Release draft (aggregate root of one upload flow)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDraft {
    /// Unique draft identifier
    pub draft_id: Uuid,

    /// Durable-storage key; one draft per session key
    pub session_key: String,

    /// Flow plan variant name ("full" or "express")
    pub variant: String,

    /// Publishing artist identity, supplied by the caller's session context
    pub artist_id: Uuid,
    pub artist_name: String,

    /// Release title; must be non-empty before the metadata step completes
    pub title: String,

    /// Release type; unset until chosen
    pub release_type: Option<ReleaseType>,

    // Optional descriptive metadata
    pub genre: Option<String>,
    pub language: Option<String>,
    pub upc: Option<String>,
    pub record_label: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub release_date: Option<chrono::NaiveDate>,

    /// Stored cover art, if uploaded
    pub cover: Option<CoverArt>,

    /// First copyright checkpoint; must be true to submit
    pub copyright_acknowledged: bool,

    /// Final confirmation checkpoint (plans with a second checkpoint only)
    pub submit_confirmed: bool,

    /// Server-assigned release id. Set if and only if the create-release
    /// call has succeeded at least once; gates all track attachment.
    pub remote_release_id: Option<String>,

    /// Ordered track entries; insertion order is the track ordering
    pub tracks: Vec<TrackEntry>,

    /// Current wizard step
    pub step: FlowStep,

    /// Lifecycle status
    pub status: DraftStatus,

    /// Most recent flow-level error, kept for the status endpoint
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReleaseDraft {
    /// Create a fresh draft positioned at the plan's first step
    pub fn new(
        session_key: String,
        variant: String,
        artist_id: Uuid,
        artist_name: String,
        first_step: FlowStep,
    ) -> Self {
        let now = Utc::now();
        Self {
            draft_id: Uuid::new_v4(),
            session_key,
            variant,
            artist_id,
            artist_name,
            title: String::new(),
            release_type: None,
            genre: None,
            language: None,
            upc: None,
            record_label: None,
            producer: None,
            writer: None,
            release_date: None,
            cover: None,
            copyright_acknowledged: false,
            submit_confirmed: false,
            remote_release_id: None,
            tracks: Vec::new(),
            step: first_step,
            status: DraftStatus::InProgress,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new step
    pub fn transition_to(&mut self, new_step: FlowStep) -> StepTransition {
        let transition = StepTransition {
            draft_id: self.draft_id,
            old_step: self.step,
            new_step,
            transitioned_at: Utc::now(),
        };
        self.step = new_step;
        if new_step == FlowStep::Complete {
            self.status = DraftStatus::Completed;
        }
        transition
    }

    /// True once the draft has everything submission requires: title, type,
    /// acknowledgment, and a track list whose count is in the type's range
    /// with every entry titled and attached remotely.
    pub fn is_complete(&self) -> bool {
        let release_type = match self.release_type {
            Some(t) => t,
            None => return false,
        };
        !self.title.trim().is_empty()
            && self.copyright_acknowledged
            && release_type.required_track_count().contains(self.tracks.len())
            && self
                .tracks
                .iter()
                .all(|t| t.remote_track_id.is_some() && !t.title.trim().is_empty())
    }

    /// Number of tracks attached to the remote release
    pub fn attached_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.remote_track_id.is_some()).count()
    }

    /// Find a track entry by its client-assigned id
    pub fn track(&self, local_id: Uuid) -> Option<&TrackEntry> {
        self.tracks.iter().find(|t| t.local_id == local_id)
    }

    pub fn track_mut(&mut self, local_id: Uuid) -> Option<&mut TrackEntry> {
        self.tracks.iter_mut().find(|t| t.local_id == local_id)
    }

    /// Check if the draft is in a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, DraftStatus::Completed | DraftStatus::Cancelled)
    }

    /// Bump the mutation timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
