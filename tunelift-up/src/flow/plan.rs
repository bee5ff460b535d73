//! Flow plans: step order, guards, and on-enter actions as data
//!
//! The dashboard's page variants differ only in step order, whether cover
//! art is mandatory, and how many copyright checkpoints they present. Each
//! variant is a `FlowPlan` value; the engine interprets the plan instead of
//! duplicating control flow per variant.

use tunelift_common::events::FlowStep;

use crate::flow::tracks::{self, CountCheck};
use crate::flow::FlowError;
use crate::models::ReleaseDraft;

/// Guard predicate evaluated before advancing out of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceGuard {
    /// Always passes
    None,
    /// Cover art must be stored
    CoverPresent,
    /// Release type chosen and the copyright checkpoint checked
    TypeChosen,
    /// Title present, type chosen, copyright acknowledged
    MetadataComplete,
    /// Track count in the type's range, every entry titled, uploaded, and
    /// attached remotely
    TracksReady,
    /// Everything submission requires; evaluated by the submit action
    ReadyToSubmit,
}

/// Side effect run when a step is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterAction {
    /// Create the remote release if it does not exist yet (idempotent;
    /// never issues a second create once the release id is set)
    EnsureRemoteRelease,
    /// Run the upload/extract/attach sequence for staged tracks, in order
    AttachStagedTracks,
}

/// One step of a plan
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub step: FlowStep,
    /// Guard to advance *from* this step
    pub guard: AdvanceGuard,
    /// Actions run on entering this step
    pub on_enter: &'static [EnterAction],
}

const TRACKS_ON_ENTER: &[EnterAction] =
    &[EnterAction::EnsureRemoteRelease, EnterAction::AttachStagedTracks];

fn cover_guard(cover_required: bool) -> AdvanceGuard {
    if cover_required {
        AdvanceGuard::CoverPresent
    } else {
        AdvanceGuard::None
    }
}

/// A configured flow variant
#[derive(Debug, Clone)]
pub struct FlowPlan {
    pub name: &'static str,
    /// Whether cover art is mandatory before leaving the cover step
    pub cover_required: bool,
    /// Whether a second confirmation checkpoint gates submission
    pub final_confirmation: bool,
    steps: Vec<StepSpec>,
}

impl FlowPlan {
    /// The seven-step wizard: cover is optional, type selection and review
    /// are present, and submission requires a second confirmation.
    pub fn full() -> Self {
        let cover_required = false;
        Self {
            name: "full",
            cover_required,
            final_confirmation: true,
            steps: vec![
                StepSpec {
                    step: FlowStep::Cover,
                    guard: cover_guard(cover_required),
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::TypeSelect,
                    guard: AdvanceGuard::TypeChosen,
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Metadata,
                    guard: AdvanceGuard::MetadataComplete,
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Tracks,
                    guard: AdvanceGuard::TracksReady,
                    on_enter: TRACKS_ON_ENTER,
                },
                StepSpec {
                    step: FlowStep::Review,
                    guard: AdvanceGuard::None,
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Submit,
                    guard: AdvanceGuard::ReadyToSubmit,
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Complete,
                    guard: AdvanceGuard::None,
                    on_enter: &[],
                },
            ],
        }
    }

    /// The condensed wizard: no type-selection or review step, cover art
    /// mandatory, single copyright checkpoint. The release type is chosen
    /// during metadata entry.
    pub fn express() -> Self {
        let cover_required = true;
        Self {
            name: "express",
            cover_required,
            final_confirmation: false,
            steps: vec![
                StepSpec {
                    step: FlowStep::Cover,
                    guard: cover_guard(cover_required),
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Metadata,
                    guard: AdvanceGuard::MetadataComplete,
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Tracks,
                    guard: AdvanceGuard::TracksReady,
                    on_enter: TRACKS_ON_ENTER,
                },
                StepSpec {
                    step: FlowStep::Submit,
                    guard: AdvanceGuard::ReadyToSubmit,
                    on_enter: &[],
                },
                StepSpec {
                    step: FlowStep::Complete,
                    guard: AdvanceGuard::None,
                    on_enter: &[],
                },
            ],
        }
    }

    /// Look up a plan by its stored variant name
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "full" => Some(Self::full()),
            "express" => Some(Self::express()),
            _ => None,
        }
    }

    pub fn first_step(&self) -> FlowStep {
        self.steps[0].step
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn spec(&self, step: FlowStep) -> Option<&StepSpec> {
        self.steps.iter().find(|s| s.step == step)
    }

    fn position(&self, step: FlowStep) -> Option<usize> {
        self.steps.iter().position(|s| s.step == step)
    }

    /// Step after `step` in this plan
    pub fn next_after(&self, step: FlowStep) -> Option<FlowStep> {
        let index = self.position(step)?;
        self.steps.get(index + 1).map(|s| s.step)
    }

    /// Step immediately before `step` in this plan
    pub fn prev_before(&self, step: FlowStep) -> Option<FlowStep> {
        let index = self.position(step)?;
        index.checked_sub(1).map(|i| self.steps[i].step)
    }
}

impl AdvanceGuard {
    /// Evaluate the guard against the draft. Validation failures are local;
    /// nothing goes over the wire.
    pub fn check(&self, plan: &FlowPlan, draft: &ReleaseDraft) -> Result<(), FlowError> {
        match self {
            AdvanceGuard::None => Ok(()),

            AdvanceGuard::CoverPresent => {
                if draft.cover.is_none() {
                    return Err(FlowError::validation(
                        Some("cover"),
                        "Upload cover art before continuing",
                    ));
                }
                Ok(())
            }

            AdvanceGuard::TypeChosen => {
                if draft.release_type.is_none() {
                    return Err(FlowError::validation(
                        Some("release_type"),
                        "Choose a release type before continuing",
                    ));
                }
                require_acknowledgment(draft)
            }

            AdvanceGuard::MetadataComplete => {
                if draft.title.trim().is_empty() {
                    return Err(FlowError::validation(
                        Some("title"),
                        "Enter a release title before continuing",
                    ));
                }
                if draft.release_type.is_none() {
                    return Err(FlowError::validation(
                        Some("release_type"),
                        "Choose a release type before continuing",
                    ));
                }
                require_acknowledgment(draft)
            }

            AdvanceGuard::TracksReady => {
                let release_type = draft.release_type.ok_or_else(|| {
                    FlowError::validation(
                        Some("release_type"),
                        "Choose a release type before continuing",
                    )
                })?;

                match tracks::validate_count(release_type, draft.tracks.len()) {
                    CountCheck::Ok => {}
                    CountCheck::TooFew { required_min, actual } => {
                        return Err(FlowError::validation(
                            Some("tracks"),
                            format!(
                                "Too few tracks: a {} requires at least {} ({} present)",
                                release_type.as_str(),
                                required_min,
                                actual
                            ),
                        ));
                    }
                    CountCheck::TooMany { allowed_max, actual } => {
                        return Err(FlowError::validation(
                            Some("tracks"),
                            format!(
                                "Too many tracks: a {} allows at most {} ({} present)",
                                release_type.as_str(),
                                allowed_max,
                                actual
                            ),
                        ));
                    }
                }

                for entry in &draft.tracks {
                    if entry.title.trim().is_empty() {
                        return Err(FlowError::validation(
                            Some("tracks"),
                            format!("Track {} needs a title", entry.track_number),
                        ));
                    }
                    if entry.audio_upload_id.is_none() {
                        return Err(FlowError::validation(
                            Some("tracks"),
                            format!("Track {} has no uploaded audio", entry.track_number),
                        ));
                    }
                    if entry.remote_track_id.is_none() {
                        let detail = entry
                            .error
                            .as_deref()
                            .unwrap_or("attachment has not completed");
                        return Err(FlowError::validation(
                            Some("tracks"),
                            format!("Track {} is not attached yet: {}", entry.track_number, detail),
                        ));
                    }
                }
                Ok(())
            }

            AdvanceGuard::ReadyToSubmit => {
                if draft.remote_release_id.is_none() {
                    return Err(FlowError::validation(
                        None,
                        "The release has not been created yet",
                    ));
                }
                require_acknowledgment(draft)?;
                if plan.final_confirmation && !draft.submit_confirmed {
                    return Err(FlowError::validation(
                        Some("submit_confirmed"),
                        "Confirm the submission to continue",
                    ));
                }
                if !draft.is_complete() {
                    return Err(FlowError::validation(
                        None,
                        "The release is not complete; return to the previous steps to finish it",
                    ));
                }
                Ok(())
            }
        }
    }
}

fn require_acknowledgment(draft: &ReleaseDraft) -> Result<(), FlowError> {
    if !draft.copyright_acknowledged {
        return Err(FlowError::validation(
            Some("copyright_acknowledged"),
            "Acknowledge the copyright terms before continuing",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_plan_orders_all_seven_steps() {
        let plan = FlowPlan::full();
        let order: Vec<FlowStep> = plan.steps().iter().map(|s| s.step).collect();
        assert_eq!(
            order,
            vec![
                FlowStep::Cover,
                FlowStep::TypeSelect,
                FlowStep::Metadata,
                FlowStep::Tracks,
                FlowStep::Review,
                FlowStep::Submit,
                FlowStep::Complete,
            ]
        );
    }

    #[test]
    fn express_plan_omits_type_select_and_review() {
        let plan = FlowPlan::express();
        assert!(plan.spec(FlowStep::TypeSelect).is_none());
        assert!(plan.spec(FlowStep::Review).is_none());
        assert!(plan.cover_required);
        assert!(!plan.final_confirmation);
    }

    #[test]
    fn tracks_step_carries_both_enter_actions() {
        for plan in [FlowPlan::full(), FlowPlan::express()] {
            let spec = plan.spec(FlowStep::Tracks).unwrap();
            assert_eq!(
                spec.on_enter,
                &[EnterAction::EnsureRemoteRelease, EnterAction::AttachStagedTracks][..]
            );
        }
    }

    #[test]
    fn complete_has_no_successor() {
        let plan = FlowPlan::full();
        assert_eq!(plan.next_after(FlowStep::Complete), None);
        assert_eq!(plan.prev_before(FlowStep::Cover), None);
    }

    #[test]
    fn unknown_variant_name_is_none() {
        assert!(FlowPlan::by_name("turbo").is_none());
    }
}
