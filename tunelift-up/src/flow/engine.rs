//! Upload flow engine
//!
//! Drives one draft through its plan: validates guards, runs on-enter side
//! effects, and issues the remote calls in their fixed dependency order.
//! The engine owns the draft exclusively; callers serialize access through
//! a lock, which doubles as the in-flight latch around release creation.
//! Every successful mutation is mirrored to durable storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tunelift_common::events::{EventBus, FlowEvent, FlowStep};
use uuid::Uuid;

use crate::db::DraftRepository;
use crate::flow::plan::{EnterAction, FlowPlan};
use crate::flow::{tracks, FlowError};
use crate::models::{CoverArt, DraftStatus, ReleaseDraft, ReleaseType, TrackPatch};
use crate::services::{
    title_from_filename, AttachTrackPayload, CreateReleasePayload, FileKind, FilePayload,
    MetadataExtractor, ProgressSink, ReleaseGateway, UploadClient,
};

/// Collaborators the engine depends on
#[derive(Clone)]
pub struct FlowServices {
    pub uploader: Arc<dyn UploadClient>,
    pub gateway: Arc<dyn ReleaseGateway>,
    pub repo: Arc<dyn DraftRepository>,
    pub events: EventBus,
}

/// A new track: optional user-supplied title plus the audio file
pub struct NewTrackRequest {
    pub title: Option<String>,
    pub file: FilePayload,
}

/// Partial update of draft metadata and acknowledgment flags
#[derive(Debug, Default, Deserialize)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub release_type: Option<ReleaseType>,
    /// Required when changing the type while tracks exist; the change
    /// resets the track list
    #[serde(default)]
    pub confirm_track_reset: bool,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub upc: Option<String>,
    pub record_label: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub release_date: Option<chrono::NaiveDate>,
    pub copyright_acknowledged: Option<bool>,
    pub submit_confirmed: Option<bool>,
}

/// State machine for one upload flow
pub struct UploadFlowEngine {
    plan: FlowPlan,
    draft: ReleaseDraft,
    services: FlowServices,
    extractor: MetadataExtractor,
    /// Audio bytes staged per entry until attachment succeeds. Never
    /// serialized; after a resume the user re-attaches missing files.
    staged_audio: HashMap<Uuid, FilePayload>,
    create_in_flight: bool,
}

impl UploadFlowEngine {
    /// Start a fresh flow positioned at the plan's first step
    pub async fn start(
        plan: FlowPlan,
        session_key: String,
        artist_id: Uuid,
        artist_name: String,
        services: FlowServices,
    ) -> Result<Self, FlowError> {
        let draft = ReleaseDraft::new(
            session_key.clone(),
            plan.name.to_string(),
            artist_id,
            artist_name,
            plan.first_step(),
        );

        let mut engine = Self {
            plan,
            draft,
            services,
            extractor: MetadataExtractor::new(),
            staged_audio: HashMap::new(),
            create_in_flight: false,
        };
        engine.persist().await?;

        tracing::info!(
            draft_id = %engine.draft.draft_id,
            variant = engine.plan.name,
            artist_id = %engine.draft.artist_id,
            "Upload flow started"
        );
        engine.emit(FlowEvent::FlowStarted {
            draft_id: engine.draft.draft_id,
            session_key,
            variant: engine.plan.name.to_string(),
            timestamp: Utc::now(),
        });

        Ok(engine)
    }

    /// Restore a stored draft for a session key.
    ///
    /// The stored draft must belong to the caller's artist; a mismatch
    /// invalidates the stored copy instead of silently adopting it, so an
    /// abandoned draft on a shared device never leaks across accounts.
    pub async fn resume(
        session_key: &str,
        artist_id: Uuid,
        services: FlowServices,
    ) -> Result<Option<Self>, FlowError> {
        let Some(draft) = services.repo.load(session_key).await? else {
            return Ok(None);
        };

        if draft.artist_id != artist_id {
            tracing::warn!(
                session_key = session_key,
                stored_artist = %draft.artist_id,
                current_artist = %artist_id,
                "Stored draft belongs to a different artist; invalidating"
            );
            services.repo.clear(session_key).await?;
            return Ok(None);
        }

        let Some(plan) = FlowPlan::by_name(&draft.variant) else {
            tracing::warn!(
                session_key = session_key,
                variant = %draft.variant,
                "Stored draft references an unknown flow variant; invalidating"
            );
            services.repo.clear(session_key).await?;
            return Ok(None);
        };

        tracing::info!(
            draft_id = %draft.draft_id,
            step = draft.step.as_str(),
            "Resumed stored draft"
        );

        Ok(Some(Self {
            plan,
            draft,
            services,
            extractor: MetadataExtractor::new(),
            staged_audio: HashMap::new(),
            create_in_flight: false,
        }))
    }

    pub fn draft(&self) -> &ReleaseDraft {
        &self.draft
    }

    pub fn plan(&self) -> &FlowPlan {
        &self.plan
    }

    /// Apply a metadata/acknowledgment patch.
    ///
    /// Changing the release type while tracks exist requires
    /// `confirm_track_reset` and clears the track list.
    pub async fn apply(&mut self, patch: DraftPatch) -> Result<(), FlowError> {
        self.ensure_active()?;

        if let Some(new_type) = patch.release_type {
            if self.draft.release_type != Some(new_type) && !self.draft.tracks.is_empty() {
                if !patch.confirm_track_reset {
                    return Err(FlowError::validation(
                        Some("release_type"),
                        format!(
                            "Changing the release type discards the {} existing track(s); \
                             set confirm_track_reset to proceed",
                            self.draft.tracks.len()
                        ),
                    ));
                }
                tracing::info!(
                    draft_id = %self.draft.draft_id,
                    old_type = ?self.draft.release_type,
                    new_type = ?new_type,
                    discarded_tracks = self.draft.tracks.len(),
                    "Release type changed; track list reset"
                );
                self.draft.tracks.clear();
                self.staged_audio.clear();
            }
            self.draft.release_type = Some(new_type);
        }

        if let Some(title) = patch.title {
            self.draft.title = title;
        }
        if let Some(genre) = patch.genre {
            self.draft.genre = Some(genre);
        }
        if let Some(language) = patch.language {
            self.draft.language = Some(language);
        }
        if let Some(upc) = patch.upc {
            self.draft.upc = Some(upc);
        }
        if let Some(record_label) = patch.record_label {
            self.draft.record_label = Some(record_label);
        }
        if let Some(producer) = patch.producer {
            self.draft.producer = Some(producer);
        }
        if let Some(writer) = patch.writer {
            self.draft.writer = Some(writer);
        }
        if let Some(release_date) = patch.release_date {
            self.draft.release_date = Some(release_date);
        }
        if let Some(acknowledged) = patch.copyright_acknowledged {
            self.draft.copyright_acknowledged = acknowledged;
        }
        if let Some(confirmed) = patch.submit_confirmed {
            self.draft.submit_confirmed = confirmed;
        }

        self.persist().await
    }

    /// Upload cover art and record the stored reference
    pub async fn upload_cover(&mut self, file: FilePayload) -> Result<(), FlowError> {
        self.ensure_active()?;

        let draft_id = self.draft.draft_id;
        let events = self.services.events.clone();
        let high_water = Arc::new(AtomicU8::new(0));
        let sink: ProgressSink = {
            let high_water = high_water.clone();
            Arc::new(move |percent| {
                let previous = high_water.fetch_max(percent, Ordering::Relaxed);
                if percent > previous {
                    let _ = events.emit(FlowEvent::CoverUploadProgress {
                        draft_id,
                        percent,
                        timestamp: Utc::now(),
                    });
                }
            })
        };

        let stored = match self.services.uploader.upload(&file, FileKind::Cover, sink).await {
            Ok(stored) => stored,
            Err(e) => {
                self.draft.last_error = Some(e.to_string());
                self.persist().await?;
                return Err(e.into());
            }
        };

        self.draft.cover = Some(CoverArt {
            upload_id: stored.upload_id.clone(),
            url: stored.url,
            width: stored.width,
            height: stored.height,
        });
        self.draft.last_error = None;
        self.persist().await?;

        tracing::info!(
            draft_id = %draft_id,
            upload_id = %stored.upload_id,
            "Cover art stored"
        );
        self.emit(FlowEvent::CoverUploaded {
            draft_id,
            upload_id: stored.upload_id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Stage a new track. When the flow is on the tracks step and the
    /// release already exists, the track's upload/extract/attach sequence
    /// runs immediately; otherwise it runs on entering the tracks step.
    pub async fn add_track(&mut self, request: NewTrackRequest) -> Result<Uuid, FlowError> {
        self.ensure_active()?;

        let title = request.title.unwrap_or_default();
        let local_id = tracks::add_entry(&mut self.draft, title)?;
        self.staged_audio.insert(local_id, request.file);
        self.persist().await?;

        if self.draft.step == FlowStep::Tracks && self.draft.remote_release_id.is_some() {
            self.process_track(local_id).await?;
        }

        Ok(local_id)
    }

    /// Stage replacement audio for an entry whose upload never completed
    /// (typically after a resume, where staged bytes are not restorable).
    pub async fn attach_audio(&mut self, local_id: Uuid, file: FilePayload) -> Result<(), FlowError> {
        self.ensure_active()?;

        let entry = self
            .draft
            .track_mut(local_id)
            .ok_or(FlowError::UnknownTrack(local_id))?;
        if entry.is_attached() {
            return Err(FlowError::validation(
                Some("tracks"),
                "This track is already attached; remove it and add a new one to replace the audio",
            ));
        }
        entry.audio_upload_id = None;
        entry.upload_progress = 0;
        entry.error = None;
        self.staged_audio.insert(local_id, file);
        self.persist().await?;

        if self.draft.step == FlowStep::Tracks && self.draft.remote_release_id.is_some() {
            self.process_track(local_id).await?;
        }

        Ok(())
    }

    /// Partial update of a track's descriptive fields
    pub async fn update_track(&mut self, local_id: Uuid, patch: TrackPatch) -> Result<(), FlowError> {
        self.ensure_active()?;
        tracks::update_entry(&mut self.draft, local_id, patch)?;
        self.persist().await
    }

    /// Remove a track locally and renumber the remainder
    pub async fn remove_track(&mut self, local_id: Uuid) -> Result<(), FlowError> {
        self.ensure_active()?;
        let removed = tracks::remove_entry(&mut self.draft, local_id)?;
        self.staged_audio.remove(&local_id);
        if removed.is_attached() {
            // Local bookkeeping only; the remote record stays.
            tracing::warn!(
                draft_id = %self.draft.draft_id,
                remote_track_id = ?removed.remote_track_id,
                "Removed track was already attached remotely"
            );
        }
        self.persist().await
    }

    /// Run the upload/extract/attach sequence for every unattached entry,
    /// strictly in order, stopping at the first failure so partial failure
    /// leaves a well-defined prefix of attached tracks.
    pub async fn process_pending_tracks(&mut self) -> Result<(), FlowError> {
        let pending: Vec<Uuid> = self
            .draft
            .tracks
            .iter()
            .filter(|t| !t.is_attached())
            .map(|t| t.local_id)
            .collect();

        for local_id in pending {
            self.process_track(local_id).await?;
        }
        Ok(())
    }

    /// Advance to the next step if the current step's guard passes
    pub async fn advance(&mut self) -> Result<FlowStep, FlowError> {
        self.ensure_active()?;

        let current = self.draft.step;
        if current == FlowStep::Submit {
            return Err(FlowError::validation(
                None,
                "Submission advances this flow; call submit instead",
            ));
        }

        let spec = self.plan.spec(current).ok_or_else(|| {
            FlowError::validation(
                None,
                format!(
                    "Step {} is not part of the {} plan",
                    current.as_str(),
                    self.plan.name
                ),
            )
        })?;
        spec.guard.check(&self.plan, &self.draft)?;

        let next = self.plan.next_after(current).ok_or_else(|| {
            FlowError::validation(None, "Already at the final step")
        })?;
        let on_enter = self.plan.spec(next).map(|s| s.on_enter).unwrap_or(&[]);

        // Actions that must succeed before the step change commits
        if on_enter.contains(&EnterAction::EnsureRemoteRelease) {
            self.ensure_remote_release().await?;
        }

        let transition = self.draft.transition_to(next);
        self.persist().await?;
        tracing::info!(
            draft_id = %self.draft.draft_id,
            from = transition.old_step.as_str(),
            to = transition.new_step.as_str(),
            "Step advanced"
        );
        self.emit(FlowEvent::StepChanged {
            draft_id: self.draft.draft_id,
            old_step: transition.old_step,
            new_step: transition.new_step,
            timestamp: Utc::now(),
        });

        // Attachment failures are recorded on the failing entry and leave
        // the flow on the tracks step; they do not undo the transition.
        if on_enter.contains(&EnterAction::AttachStagedTracks) {
            if let Err(e) = self.process_pending_tracks().await {
                tracing::warn!(
                    draft_id = %self.draft.draft_id,
                    error = %e,
                    "Staged track processing stopped at first failure"
                );
            }
        }

        Ok(next)
    }

    /// Return to the immediately preceding step. Disallowed from complete.
    pub async fn back(&mut self) -> Result<FlowStep, FlowError> {
        if self.draft.step == FlowStep::Complete {
            return Err(FlowError::validation(
                None,
                "Cannot go back from a completed flow",
            ));
        }
        self.ensure_active()?;

        let prev = self
            .plan
            .prev_before(self.draft.step)
            .ok_or_else(|| FlowError::validation(None, "Already at the first step"))?;

        let transition = self.draft.transition_to(prev);
        self.persist().await?;
        self.emit(FlowEvent::StepChanged {
            draft_id: self.draft.draft_id,
            old_step: transition.old_step,
            new_step: transition.new_step,
            timestamp: Utc::now(),
        });

        Ok(prev)
    }

    /// Submit the release for review.
    ///
    /// Rejected locally, without a network call, unless the submit guard
    /// holds. A cancellation observed while the call is in flight stops the
    /// local wait and reconciles against the server's actual status rather
    /// than assuming the submission failed.
    pub async fn submit(&mut self, cancel: CancellationToken) -> Result<FlowStep, FlowError> {
        self.ensure_active()?;

        if self.draft.step != FlowStep::Submit {
            return Err(FlowError::validation(
                None,
                format!(
                    "Submission is only available from the submit step (currently {})",
                    self.draft.step.as_str()
                ),
            ));
        }

        let spec = self.plan.spec(FlowStep::Submit).ok_or_else(|| {
            FlowError::validation(None, "This plan has no submit step")
        })?;
        spec.guard.check(&self.plan, &self.draft)?;

        let Some(release_id) = self.draft.remote_release_id.clone() else {
            return Err(FlowError::validation(
                None,
                "The release has not been created yet",
            ));
        };

        tracing::info!(
            draft_id = %self.draft.draft_id,
            remote_release_id = %release_id,
            "Submitting release for review"
        );
        self.emit(FlowEvent::SubmitStarted {
            draft_id: self.draft.draft_id,
            remote_release_id: release_id.clone(),
            timestamp: Utc::now(),
        });

        let gateway = self.services.gateway.clone();
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(
                    draft_id = %self.draft.draft_id,
                    "Submission cancelled locally; reconciling with server state"
                );
                self.reconcile_after_cancel(&release_id).await
            }
            result = gateway.submit_for_review(&release_id) => match result {
                Ok(submission) => self.finish_submitted(submission.status.as_str()).await,
                Err(e) => {
                    let message = e.to_string();
                    self.draft.status = DraftStatus::Failed;
                    self.draft.last_error = Some(message.clone());
                    self.persist().await?;
                    tracing::warn!(
                        draft_id = %self.draft.draft_id,
                        error = %message,
                        "Submission rejected; draft kept for retry or correction"
                    );
                    self.emit(FlowEvent::SubmitFailed {
                        draft_id: self.draft.draft_id,
                        error: message,
                        timestamp: Utc::now(),
                    });
                    Err(e.into())
                }
            }
        }
    }

    /// Discard the draft and clear its stored copy
    pub async fn abandon(&mut self) -> Result<(), FlowError> {
        if self.draft.status == DraftStatus::Completed {
            return Err(FlowError::validation(None, "Flow already completed"));
        }

        self.draft.status = DraftStatus::Cancelled;
        self.staged_audio.clear();
        self.services.repo.clear(&self.draft.session_key).await?;

        tracing::info!(draft_id = %self.draft.draft_id, "Draft abandoned");
        self.emit(FlowEvent::DraftAbandoned {
            draft_id: self.draft.draft_id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    fn ensure_active(&self) -> Result<(), FlowError> {
        if self.draft.is_terminal() {
            return Err(FlowError::validation(
                None,
                "This flow has finished; start a new one",
            ));
        }
        Ok(())
    }

    async fn persist(&mut self) -> Result<(), FlowError> {
        self.draft.touch();
        self.services.repo.save(&self.draft).await?;
        Ok(())
    }

    fn emit(&self, event: FlowEvent) {
        let _ = self.services.events.emit(event);
    }

    /// Create the remote release if it does not exist yet.
    ///
    /// Must never issue a second create once `remote_release_id` is set;
    /// the engine lock serializes callers and `create_in_flight` rejects
    /// re-entry while a call is outstanding.
    async fn ensure_remote_release(&mut self) -> Result<(), FlowError> {
        if self.draft.remote_release_id.is_some() {
            return Ok(());
        }
        if self.create_in_flight {
            return Err(FlowError::validation(
                None,
                "Release creation is already in progress",
            ));
        }

        let release_type = self.draft.release_type.ok_or_else(|| {
            FlowError::validation(Some("release_type"), "Choose a release type before continuing")
        })?;

        let payload = CreateReleasePayload {
            title: self.draft.title.clone(),
            release_type,
            artist_id: self.draft.artist_id,
            artist_name: self.draft.artist_name.clone(),
            genre: self.draft.genre.clone(),
            language: self.draft.language.clone(),
            upc: self.draft.upc.clone(),
            record_label: self.draft.record_label.clone(),
            producer: self.draft.producer.clone(),
            writer: self.draft.writer.clone(),
            release_date: self.draft.release_date,
            cover_upload_id: self.draft.cover.as_ref().map(|c| c.upload_id.clone()),
            copyright_acknowledged: self.draft.copyright_acknowledged,
        };

        self.create_in_flight = true;
        let gateway = self.services.gateway.clone();
        let result = gateway.create_release(&payload).await;
        self.create_in_flight = false;

        match result {
            Ok(created) => {
                self.draft.remote_release_id = Some(created.release_id.clone());
                self.draft.last_error = None;
                self.persist().await?;
                tracing::info!(
                    draft_id = %self.draft.draft_id,
                    remote_release_id = %created.release_id,
                    "Remote release created"
                );
                self.emit(FlowEvent::ReleaseCreated {
                    draft_id: self.draft.draft_id,
                    remote_release_id: created.release_id,
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                self.draft.last_error = Some(e.to_string());
                self.persist().await?;
                tracing::warn!(
                    draft_id = %self.draft.draft_id,
                    error = %e,
                    "Release creation failed"
                );
                Err(e.into())
            }
        }
    }

    /// One track's full sequence: upload, best-effort metadata backfill,
    /// attach. On failure the entry records the error and keeps its place;
    /// earlier attached tracks are untouched.
    async fn process_track(&mut self, local_id: Uuid) -> Result<(), FlowError> {
        let Some(release_id) = self.draft.remote_release_id.clone() else {
            return Err(FlowError::validation(
                None,
                "The release must be created before tracks can attach",
            ));
        };

        match self.run_track_sequence(local_id, &release_id).await {
            Ok(()) => {
                self.staged_audio.remove(&local_id);
                self.persist().await?;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if let Some(entry) = self.draft.track_mut(local_id) {
                    entry.error = Some(message.clone());
                }
                self.draft.last_error = Some(message.clone());
                self.persist().await?;
                tracing::warn!(
                    draft_id = %self.draft.draft_id,
                    local_id = %local_id,
                    error = %message,
                    "Track sequence failed"
                );
                self.emit(FlowEvent::TrackFailed {
                    draft_id: self.draft.draft_id,
                    local_id,
                    error: message,
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn run_track_sequence(
        &mut self,
        local_id: Uuid,
        release_id: &str,
    ) -> Result<(), FlowError> {
        let needs_upload = self
            .draft
            .track(local_id)
            .ok_or(FlowError::UnknownTrack(local_id))?
            .audio_upload_id
            .is_none();

        if needs_upload {
            let file = self.staged_audio.get(&local_id).cloned().ok_or_else(|| {
                FlowError::validation(
                    Some("tracks"),
                    "Audio file missing; re-attach it to continue",
                )
            })?;

            // (a) upload with progress
            let draft_id = self.draft.draft_id;
            let events = self.services.events.clone();
            let high_water = Arc::new(AtomicU8::new(0));
            let sink: ProgressSink = {
                let high_water = high_water.clone();
                Arc::new(move |percent| {
                    let previous = high_water.fetch_max(percent, Ordering::Relaxed);
                    if percent > previous {
                        let _ = events.emit(FlowEvent::TrackUploadProgress {
                            draft_id,
                            local_id,
                            percent,
                            timestamp: Utc::now(),
                        });
                    }
                })
            };
            let stored = self
                .services
                .uploader
                .upload(&file, FileKind::Audio, sink)
                .await?;

            {
                let entry = self
                    .draft
                    .track_mut(local_id)
                    .ok_or(FlowError::UnknownTrack(local_id))?;
                entry.audio_upload_id = Some(stored.upload_id);
                entry.upload_progress = 100;
                if entry.duration_secs.is_none() {
                    entry.duration_secs = stored.duration_secs;
                }
            }
            self.persist().await?;

            // (b) best-effort tag backfill; only fills fields the user left
            // empty, and any failure degrades to the filename
            match self.extractor.extract(&file.bytes) {
                Ok(tags) => {
                    let entry = self
                        .draft
                        .track_mut(local_id)
                        .ok_or(FlowError::UnknownTrack(local_id))?;
                    if entry.title.trim().is_empty() {
                        if let Some(title) = tags.title {
                            entry.title = title;
                        }
                    }
                    if entry.lead_vocal.is_none() {
                        entry.lead_vocal = tags.artist;
                    }
                    if entry.duration_secs.is_none() {
                        entry.duration_secs = tags.duration_secs;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        draft_id = %self.draft.draft_id,
                        local_id = %local_id,
                        error = %e,
                        "Metadata extraction failed; using filename fallback"
                    );
                }
            }
            {
                let entry = self
                    .draft
                    .track_mut(local_id)
                    .ok_or(FlowError::UnknownTrack(local_id))?;
                if entry.title.trim().is_empty() {
                    entry.title = title_from_filename(&file.filename);
                }
            }
            self.persist().await?;
        }

        // (c) attach
        let entry = self
            .draft
            .track(local_id)
            .ok_or(FlowError::UnknownTrack(local_id))?
            .clone();
        let audio_upload_id = entry.audio_upload_id.clone().ok_or_else(|| {
            FlowError::validation(Some("tracks"), "Track has no uploaded audio")
        })?;
        let payload = AttachTrackPayload {
            title: entry.title.clone(),
            track_number: entry.track_number,
            audio_upload_id,
            duration_secs: entry.duration_secs,
            isrc: entry.isrc.clone(),
            explicit: entry.explicit,
            lead_vocal: entry.lead_vocal.clone(),
            featured: entry.featured.clone(),
            producer: entry.producer.clone(),
            writer: entry.writer.clone(),
            lyrics: entry.lyrics.clone(),
        };
        let gateway = self.services.gateway.clone();
        let attached = gateway.attach_track(release_id, &payload).await?;

        // (d) record the persisted values; server normalization wins
        {
            let entry = self
                .draft
                .track_mut(local_id)
                .ok_or(FlowError::UnknownTrack(local_id))?;
            entry.remote_track_id = Some(attached.track_id.clone());
            entry.title = attached.title;
            if attached.duration_secs.is_some() {
                entry.duration_secs = attached.duration_secs;
            }
            entry.error = None;
        }

        tracing::info!(
            draft_id = %self.draft.draft_id,
            local_id = %local_id,
            remote_track_id = %attached.track_id,
            "Track attached"
        );
        self.emit(FlowEvent::TrackAttached {
            draft_id: self.draft.draft_id,
            local_id,
            remote_track_id: attached.track_id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    async fn finish_submitted(&mut self, status: &str) -> Result<FlowStep, FlowError> {
        let transition = self.draft.transition_to(FlowStep::Complete);
        self.draft.last_error = None;
        // Completed drafts have nothing to resume; durable storage is cleared
        self.services.repo.clear(&self.draft.session_key).await?;

        tracing::info!(
            draft_id = %self.draft.draft_id,
            status = status,
            "Release submitted for review"
        );
        self.emit(FlowEvent::SubmitSucceeded {
            draft_id: self.draft.draft_id,
            status: status.to_string(),
            timestamp: Utc::now(),
        });
        self.emit(FlowEvent::StepChanged {
            draft_id: self.draft.draft_id,
            old_step: transition.old_step,
            new_step: FlowStep::Complete,
            timestamp: Utc::now(),
        });

        Ok(FlowStep::Complete)
    }

    /// After a local cancel the server may still have completed the
    /// submission; ask it rather than assume failure.
    async fn reconcile_after_cancel(&mut self, release_id: &str) -> Result<FlowStep, FlowError> {
        let gateway = self.services.gateway.clone();
        match gateway.release_status(release_id).await {
            Ok(status) if status.is_submitted() => {
                tracing::info!(
                    draft_id = %self.draft.draft_id,
                    status = status.as_str(),
                    "Server reports the release was submitted despite the local cancel"
                );
                self.emit(FlowEvent::SubmitReconciled {
                    draft_id: self.draft.draft_id,
                    submitted: true,
                    timestamp: Utc::now(),
                });
                self.finish_submitted(status.as_str()).await
            }
            Ok(status) => {
                self.draft.last_error = Some("Submission cancelled before completion".to_string());
                self.persist().await?;
                tracing::info!(
                    draft_id = %self.draft.draft_id,
                    status = status.as_str(),
                    "Submission cancelled; release remains unsubmitted"
                );
                self.emit(FlowEvent::SubmitReconciled {
                    draft_id: self.draft.draft_id,
                    submitted: false,
                    timestamp: Utc::now(),
                });
                Ok(FlowStep::Submit)
            }
            Err(e) => {
                // Server state unknown; keep the draft intact for a retry
                self.draft.last_error = Some(format!(
                    "Submission cancelled; status check failed: {}",
                    e
                ));
                self.persist().await?;
                tracing::warn!(
                    draft_id = %self.draft.draft_id,
                    error = %e,
                    "Post-cancel status reconciliation failed"
                );
                self.emit(FlowEvent::SubmitReconciled {
                    draft_id: self.draft.draft_id,
                    submitted: false,
                    timestamp: Utc::now(),
                });
                Ok(FlowStep::Submit)
            }
        }
    }
}
