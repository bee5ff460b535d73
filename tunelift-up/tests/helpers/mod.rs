//! Shared test helpers: in-memory fakes for the storage, gateway, and
//! draft-repository seams

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use tunelift_common::events::EventBus;
use tunelift_common::Result as CommonResult;
use tunelift_up::db::DraftRepository;
use tunelift_up::flow::{DraftPatch, FlowServices, NewTrackRequest, UploadFlowEngine};
use tunelift_up::models::{ReleaseDraft, ReleaseType};
use tunelift_up::services::{
    AttachTrackPayload, AttachedTrack, CreateReleasePayload, CreatedRelease, FileKind,
    FilePayload, GatewayError, ProgressSink, ReleaseGateway, ReleaseStatus, ReviewSubmission,
    StoredFile, UploadClient, UploadError,
};

/// In-memory draft repository. Stores the serialized form so tests exercise
/// the same round-trip the SQLite repository performs.
#[derive(Default)]
pub struct MemoryDraftRepository {
    drafts: Mutex<HashMap<String, String>>,
}

impl MemoryDraftRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, session_key: &str) -> bool {
        self.drafts.lock().unwrap().contains_key(session_key)
    }
}

#[async_trait]
impl DraftRepository for MemoryDraftRepository {
    async fn save(&self, draft: &ReleaseDraft) -> CommonResult<()> {
        let payload = serde_json::to_string(draft)
            .map_err(|e| tunelift_common::Error::Internal(e.to_string()))?;
        self.drafts
            .lock()
            .unwrap()
            .insert(draft.session_key.clone(), payload);
        Ok(())
    }

    async fn load(&self, session_key: &str) -> CommonResult<Option<ReleaseDraft>> {
        let stored = self.drafts.lock().unwrap().get(session_key).cloned();
        match stored {
            Some(payload) => {
                let draft = serde_json::from_str(&payload)
                    .map_err(|e| tunelift_common::Error::Internal(e.to_string()))?;
                Ok(Some(draft))
            }
            None => Ok(None),
        }
    }

    async fn clear(&self, session_key: &str) -> CommonResult<()> {
        self.drafts.lock().unwrap().remove(session_key);
        Ok(())
    }
}

/// Fake storage client. Counts uploads, reports 0/50/100 progress, and can
/// be scripted to fail the next call.
#[derive(Default)]
pub struct FakeUploadClient {
    pub uploads: AtomicUsize,
    pub fail_next: AtomicBool,
}

impl FakeUploadClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadClient for FakeUploadClient {
    async fn upload(
        &self,
        file: &FilePayload,
        kind: FileKind,
        progress: ProgressSink,
    ) -> Result<StoredFile, UploadError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(UploadError::Network("connection reset".to_string()));
        }

        progress(0);
        progress(50);
        progress(100);

        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StoredFile {
            upload_id: format!("up-{}", n),
            url: format!("https://files.test/{}/{}", kind.as_str(), file.filename),
            duration_secs: (kind == FileKind::Audio).then_some(212),
            width: (kind == FileKind::Cover).then_some(1400),
            height: (kind == FileKind::Cover).then_some(1400),
        })
    }
}

/// Fake release gateway with call counters and scripted failures
pub struct FakeReleaseGateway {
    pub create_calls: AtomicUsize,
    pub attach_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    /// 1-based attach call number that should fail
    pub fail_attach_at: Mutex<Option<usize>>,
    pub fail_submit: AtomicBool,
    /// Delay applied to submit, for cancellation tests
    pub submit_delay_ms: AtomicU64,
    /// Status returned by release_status
    pub status: Mutex<ReleaseStatus>,
}

impl FakeReleaseGateway {
    pub fn new() -> Self {
        Self {
            create_calls: AtomicUsize::new(0),
            attach_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fail_attach_at: Mutex::new(None),
            fail_submit: AtomicBool::new(false),
            submit_delay_ms: AtomicU64::new(0),
            status: Mutex::new(ReleaseStatus::Draft),
        }
    }

    pub fn set_status(&self, status: ReleaseStatus) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl ReleaseGateway for FakeReleaseGateway {
    async fn create_release(
        &self,
        _payload: &CreateReleasePayload,
    ) -> Result<CreatedRelease, GatewayError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreatedRelease {
            release_id: format!("rel-{}", n),
        })
    }

    async fn attach_track(
        &self,
        _release_id: &str,
        payload: &AttachTrackPayload,
    ) -> Result<AttachedTrack, GatewayError> {
        let n = self.attach_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_attach_at.lock().unwrap() == Some(n) {
            return Err(GatewayError::Rejected {
                status_code: 422,
                message: "audio file rejected".to_string(),
            });
        }
        Ok(AttachedTrack {
            track_id: format!("trk-{}", n),
            title: payload.title.clone(),
            track_number: payload.track_number,
            duration_secs: payload.duration_secs,
        })
    }

    async fn submit_for_review(
        &self,
        _release_id: &str,
    ) -> Result<ReviewSubmission, GatewayError> {
        let delay = self.submit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status_code: 422,
                message: "release incomplete: missing acknowledgment".to_string(),
            });
        }
        self.set_status(ReleaseStatus::PendingReview);
        Ok(ReviewSubmission {
            status: ReleaseStatus::PendingReview,
        })
    }

    async fn release_status(&self, _release_id: &str) -> Result<ReleaseStatus, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.status.lock().unwrap())
    }
}

/// Bundle of fakes plus the FlowServices built over them
pub struct TestHarness {
    pub uploader: Arc<FakeUploadClient>,
    pub gateway: Arc<FakeReleaseGateway>,
    pub repo: Arc<MemoryDraftRepository>,
    pub events: EventBus,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            uploader: Arc::new(FakeUploadClient::new()),
            gateway: Arc::new(FakeReleaseGateway::new()),
            repo: Arc::new(MemoryDraftRepository::new()),
            events: EventBus::new(64),
        }
    }

    pub fn services(&self) -> FlowServices {
        FlowServices {
            uploader: self.uploader.clone(),
            gateway: self.gateway.clone(),
            repo: self.repo.clone(),
            events: self.events.clone(),
        }
    }
}

/// MP3-looking bytes (ID3 magic) of the requested length
pub fn mp3_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"ID3\x03\x00\x00\x00\x00\x00\x00".to_vec();
    bytes.resize(len.max(10), 0);
    bytes
}

/// PNG-looking bytes (PNG magic)
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(256, 0);
    bytes
}

pub fn audio_payload(filename: &str) -> FilePayload {
    FilePayload {
        filename: filename.to_string(),
        bytes: mp3_bytes(2048),
    }
}

/// Stage a titled track
pub async fn add_titled_track(
    engine: &mut UploadFlowEngine,
    title: &str,
) -> Result<Uuid, tunelift_up::flow::FlowError> {
    engine
        .add_track(NewTrackRequest {
            title: Some(title.to_string()),
            file: audio_payload(&format!("{}.mp3", title)),
        })
        .await
}

/// Drive a full-plan engine from cover to the metadata step with the given
/// type and title filled in and copyright acknowledged
pub async fn to_metadata_ready(
    engine: &mut UploadFlowEngine,
    release_type: ReleaseType,
    title: &str,
) {
    engine.advance().await.unwrap(); // cover -> type_select
    engine
        .apply(DraftPatch {
            release_type: Some(release_type),
            copyright_acknowledged: Some(true),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    engine.advance().await.unwrap(); // type_select -> metadata
    engine
        .apply(DraftPatch {
            title: Some(title.to_string()),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
}
