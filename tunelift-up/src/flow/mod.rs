//! Upload flow state machine
//!
//! The wizard's step sequencing, guard predicates, and remote side effects.
//! Step order and per-step guards are data (`plan`), not hand-written
//! control flow, so page variants share one machine.

pub mod engine;
pub mod plan;
pub mod tracks;

use thiserror::Error;
use uuid::Uuid;

use crate::services::{GatewayError, UploadError};

pub use engine::{DraftPatch, FlowServices, NewTrackRequest, UploadFlowEngine};
pub use plan::{AdvanceGuard, EnterAction, FlowPlan, StepSpec};
pub use tracks::CountCheck;

/// Flow-level error taxonomy
#[derive(Debug, Error)]
pub enum FlowError {
    /// A guard or mutation precondition failed. Local only; never sent to
    /// the gateway. Carries the offending field where one exists.
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    /// The release type's maximum track count is already reached
    #[error("Track limit reached: a {release_type} release allows at most {max} tracks")]
    CapacityExceeded {
        release_type: &'static str,
        max: usize,
    },

    /// No track entry with the given local id
    #[error("No track with id {0}")]
    UnknownTrack(Uuid),

    /// Upload client failure
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Release gateway failure
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Draft persistence failure
    #[error("Draft storage error: {0}")]
    Storage(#[from] tunelift_common::Error),
}

impl FlowError {
    pub fn validation(field: Option<&'static str>, message: impl Into<String>) -> Self {
        FlowError::Validation {
            field,
            message: message.into(),
        }
    }
}
