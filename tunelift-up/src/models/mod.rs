//! Data models for the upload wizard service

pub mod draft;
pub mod track;

pub use draft::{
    CoverArt, DraftStatus, ReleaseDraft, ReleaseType, StepTransition, TrackCountRange,
};
pub use track::{ExplicitFlag, TrackEntry, TrackPatch};
