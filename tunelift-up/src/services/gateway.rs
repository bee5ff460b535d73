//! Release gateway client
//!
//! The gateway persists releases and their tracks and performs the
//! review-submission transition. The wizard depends on it through four
//! operations: create, attach-track, submit, and a read-only status query
//! used to reconcile a locally cancelled submission.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExplicitFlag, ReleaseType};

const USER_AGENT: &str = concat!("tunelift-up/", env!("CARGO_PKG_VERSION"));

/// Gateway client errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure; retryable by re-issuing the same call
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway rejected the request (validation or business rule).
    /// Retryable only after the offending input is corrected.
    #[error("Release service rejected the request ({status_code}): {message}")]
    Rejected { status_code: u16, message: String },

    /// 2xx response whose body did not match the contract
    #[error("Malformed gateway response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Whether re-issuing the identical call can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Network(_))
    }
}

/// Create-release request payload
#[derive(Debug, Clone, Serialize)]
pub struct CreateReleasePayload {
    pub title: String,
    pub release_type: ReleaseType,
    pub artist_id: Uuid,
    pub artist_name: String,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub upc: Option<String>,
    pub record_label: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub release_date: Option<chrono::NaiveDate>,
    pub cover_upload_id: Option<String>,
    pub copyright_acknowledged: bool,
}

/// Create-release response
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRelease {
    pub release_id: String,
}

/// Attach-track request payload
#[derive(Debug, Clone, Serialize)]
pub struct AttachTrackPayload {
    pub title: String,
    pub track_number: u32,
    pub audio_upload_id: String,
    pub duration_secs: Option<u32>,
    pub isrc: Option<String>,
    pub explicit: ExplicitFlag,
    pub lead_vocal: Option<String>,
    pub featured: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub lyrics: Option<String>,
}

/// Attach-track response: the server id plus the persisted field values,
/// used to reconcile server-side normalization
#[derive(Debug, Clone, Deserialize)]
pub struct AttachedTrack {
    pub track_id: String,
    pub title: String,
    pub track_number: u32,
    pub duration_secs: Option<u32>,
}

/// Server-side release status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Draft,
    PendingReview,
    Approved,
    Rejected,
}

impl ReleaseStatus {
    /// True once the release has entered (or passed) review
    pub fn is_submitted(self) -> bool {
        matches!(self, ReleaseStatus::PendingReview | ReleaseStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseStatus::Draft => "draft",
            ReleaseStatus::PendingReview => "pending_review",
            ReleaseStatus::Approved => "approved",
            ReleaseStatus::Rejected => "rejected",
        }
    }
}

/// Submit-for-review response
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub status: ReleaseStatus,
}

#[derive(Debug, Clone, Deserialize)]
struct StatusResponse {
    status: ReleaseStatus,
}

/// Release gateway operations (trait seam so tests can substitute a fake)
#[async_trait]
pub trait ReleaseGateway: Send + Sync {
    async fn create_release(
        &self,
        payload: &CreateReleasePayload,
    ) -> Result<CreatedRelease, GatewayError>;

    async fn attach_track(
        &self,
        release_id: &str,
        payload: &AttachTrackPayload,
    ) -> Result<AttachedTrack, GatewayError>;

    async fn submit_for_review(&self, release_id: &str) -> Result<ReviewSubmission, GatewayError>;

    async fn release_status(&self, release_id: &str) -> Result<ReleaseStatus, GatewayError>;
}

/// HTTP gateway client
pub struct HttpReleaseGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpReleaseGateway {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    async fn read_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status_code: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ReleaseGateway for HttpReleaseGateway {
    async fn create_release(
        &self,
        payload: &CreateReleasePayload,
    ) -> Result<CreatedRelease, GatewayError> {
        let url = format!("{}/releases", self.base_url);
        tracing::debug!(url = %url, title = %payload.title, "Creating remote release");

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn attach_track(
        &self,
        release_id: &str,
        payload: &AttachTrackPayload,
    ) -> Result<AttachedTrack, GatewayError> {
        let url = format!("{}/releases/{}/tracks", self.base_url, release_id);
        tracing::debug!(
            url = %url,
            track_number = payload.track_number,
            "Attaching track to remote release"
        );

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn submit_for_review(&self, release_id: &str) -> Result<ReviewSubmission, GatewayError> {
        let url = format!("{}/releases/{}/submit", self.base_url, release_id);
        tracing::debug!(url = %url, "Submitting release for review");

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn release_status(&self, release_id: &str) -> Result<ReleaseStatus, GatewayError> {
        let url = format!("{}/releases/{}/status", self.base_url, release_id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let parsed: StatusResponse = Self::read_response(response).await?;
        Ok(parsed.status)
    }
}
