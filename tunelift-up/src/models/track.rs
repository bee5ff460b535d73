//! Track entry model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit-content flag for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplicitFlag {
    #[default]
    No,
    Yes,
    /// Clean re-recording of an explicit original
    Covered,
}

/// One track/section of a release being assembled.
///
/// `local_id` is client-assigned and stable for the session; it is never the
/// server-assigned track id. An entry with `remote_track_id` set has been
/// persisted remotely; removing it locally does not retract the remote record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEntry {
    pub local_id: Uuid,

    /// 1-based position within the release; kept contiguous on removal
    pub track_number: u32,

    /// Track title; required before submission
    pub title: String,

    /// Storage identifier, set once the audio upload finishes
    pub audio_upload_id: Option<String>,

    /// Server-assigned track id, set once the attach call succeeds
    pub remote_track_id: Option<String>,

    pub duration_secs: Option<u32>,
    pub isrc: Option<String>,
    pub explicit: ExplicitFlag,
    pub lead_vocal: Option<String>,
    pub featured: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub lyrics: Option<String>,

    /// Upload progress, 0-100
    pub upload_progress: u8,

    /// Last error from this entry's upload/attach sequence
    pub error: Option<String>,
}

impl TrackEntry {
    pub fn new(track_number: u32, title: String) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            track_number,
            title,
            audio_upload_id: None,
            remote_track_id: None,
            duration_secs: None,
            isrc: None,
            explicit: ExplicitFlag::No,
            lead_vocal: None,
            featured: None,
            producer: None,
            writer: None,
            lyrics: None,
            upload_progress: 0,
            error: None,
        }
    }

    /// True once the track is persisted on the remote release
    pub fn is_attached(&self) -> bool {
        self.remote_track_id.is_some()
    }
}

/// Partial update for a track entry.
///
/// Deliberately has no `remote_track_id` field; attachment state is owned by
/// the flow engine alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub duration_secs: Option<u32>,
    pub isrc: Option<String>,
    pub explicit: Option<ExplicitFlag>,
    pub lead_vocal: Option<String>,
    pub featured: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub lyrics: Option<String>,
}

impl TrackPatch {
    /// Apply the patch to an entry, leaving unset fields untouched
    pub fn apply_to(self, entry: &mut TrackEntry) {
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(duration) = self.duration_secs {
            entry.duration_secs = Some(duration);
        }
        if let Some(isrc) = self.isrc {
            entry.isrc = Some(isrc);
        }
        if let Some(explicit) = self.explicit {
            entry.explicit = explicit;
        }
        if let Some(lead_vocal) = self.lead_vocal {
            entry.lead_vocal = Some(lead_vocal);
        }
        if let Some(featured) = self.featured {
            entry.featured = Some(featured);
        }
        if let Some(producer) = self.producer {
            entry.producer = Some(producer);
        }
        if let Some(writer) = self.writer {
            entry.writer = Some(writer);
        }
        if let Some(lyrics) = self.lyrics {
            entry.lyrics = Some(lyrics);
        }
    }
}
