//! Event types for the Tunelift event system
//!
//! Flow events are broadcast by the upload wizard service and forwarded to
//! SSE subscribers (the dashboard's progress indicators).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Wizard step within an upload flow.
///
/// Shared here because flow events reference the step a draft moved between,
/// and more than one service renders those events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    /// Cover art upload
    Cover,
    /// Release type selection
    TypeSelect,
    /// Release metadata entry
    Metadata,
    /// Per-track audio upload and attachment
    Tracks,
    /// Read-only confirmation of the assembled release
    Review,
    /// Final confirmation before submission
    Submit,
    /// Terminal step, reached only after a successful submission
    Complete,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Cover => "cover",
            FlowStep::TypeSelect => "type_select",
            FlowStep::Metadata => "metadata",
            FlowStep::Tracks => "tracks",
            FlowStep::Review => "review",
            FlowStep::Submit => "submit",
            FlowStep::Complete => "complete",
        }
    }
}

/// Flow event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlowEvent {
    /// A new upload flow was started
    FlowStarted {
        draft_id: Uuid,
        session_key: String,
        variant: String,
        timestamp: DateTime<Utc>,
    },

    /// The flow moved between wizard steps
    StepChanged {
        draft_id: Uuid,
        old_step: FlowStep,
        new_step: FlowStep,
        timestamp: DateTime<Utc>,
    },

    /// Cover upload progress (0-100)
    CoverUploadProgress {
        draft_id: Uuid,
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// Cover art was stored
    CoverUploaded {
        draft_id: Uuid,
        upload_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The remote release record was created
    ReleaseCreated {
        draft_id: Uuid,
        remote_release_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Track audio upload progress (0-100)
    TrackUploadProgress {
        draft_id: Uuid,
        local_id: Uuid,
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// A track was attached to the remote release
    TrackAttached {
        draft_id: Uuid,
        local_id: Uuid,
        remote_track_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A track's upload/attach sequence failed
    TrackFailed {
        draft_id: Uuid,
        local_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission for review started
    SubmitStarted {
        draft_id: Uuid,
        remote_release_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission for review succeeded
    SubmitSucceeded {
        draft_id: Uuid,
        status: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission for review failed
    SubmitFailed {
        draft_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A locally cancelled submission was reconciled against server state
    SubmitReconciled {
        draft_id: Uuid,
        submitted: bool,
        timestamp: DateTime<Utc>,
    },

    /// The draft was discarded and its stored copy cleared
    DraftAbandoned {
        draft_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl FlowEvent {
    /// Event type name for SSE event framing
    pub fn event_type(&self) -> &'static str {
        match self {
            FlowEvent::FlowStarted { .. } => "FlowStarted",
            FlowEvent::StepChanged { .. } => "StepChanged",
            FlowEvent::CoverUploadProgress { .. } => "CoverUploadProgress",
            FlowEvent::CoverUploaded { .. } => "CoverUploaded",
            FlowEvent::ReleaseCreated { .. } => "ReleaseCreated",
            FlowEvent::TrackUploadProgress { .. } => "TrackUploadProgress",
            FlowEvent::TrackAttached { .. } => "TrackAttached",
            FlowEvent::TrackFailed { .. } => "TrackFailed",
            FlowEvent::SubmitStarted { .. } => "SubmitStarted",
            FlowEvent::SubmitSucceeded { .. } => "SubmitSucceeded",
            FlowEvent::SubmitFailed { .. } => "SubmitFailed",
            FlowEvent::SubmitReconciled { .. } => "SubmitReconciled",
            FlowEvent::DraftAbandoned { .. } => "DraftAbandoned",
        }
    }

    /// The draft this event belongs to, for per-flow SSE filtering
    pub fn draft_id(&self) -> Uuid {
        match self {
            FlowEvent::FlowStarted { draft_id, .. }
            | FlowEvent::StepChanged { draft_id, .. }
            | FlowEvent::CoverUploadProgress { draft_id, .. }
            | FlowEvent::CoverUploaded { draft_id, .. }
            | FlowEvent::ReleaseCreated { draft_id, .. }
            | FlowEvent::TrackUploadProgress { draft_id, .. }
            | FlowEvent::TrackAttached { draft_id, .. }
            | FlowEvent::TrackFailed { draft_id, .. }
            | FlowEvent::SubmitStarted { draft_id, .. }
            | FlowEvent::SubmitSucceeded { draft_id, .. }
            | FlowEvent::SubmitFailed { draft_id, .. }
            | FlowEvent::SubmitReconciled { draft_id, .. }
            | FlowEvent::DraftAbandoned { draft_id, .. } => *draft_id,
        }
    }
}

/// Broadcast bus for flow events.
///
/// Thin wrapper over a bounded `tokio::sync::broadcast` channel. Subscribers
/// that fall behind lose the oldest events; emitters never block.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FlowEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening. Callers that emit best-effort progress
    /// ignore the result.
    pub fn emit(
        &self,
        event: FlowEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<FlowEvent>> {
        self.tx.send(event)
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
