//! Storage upload client
//!
//! Wraps binary-file submission to the storage backend. Size and type are
//! checked before any bytes leave the process; progress is reported through a
//! caller-supplied sink as a monotonically non-decreasing 0-100 percentage.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::UploadLimits;

const USER_AGENT: &str = concat!("tunelift-up/", env!("CARGO_PKG_VERSION"));
const CHUNK_SIZE: usize = 64 * 1024;

/// Discriminator for what is being stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Cover,
    Audio,
    Document,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Cover => "cover",
            FileKind::Audio => "audio",
            FileKind::Document => "document",
        }
    }

    /// Configured size cap for this kind
    pub fn max_bytes(self, limits: &UploadLimits) -> u64 {
        match self {
            FileKind::Cover => limits.cover_max_bytes,
            FileKind::Audio => limits.audio_max_bytes,
            FileKind::Document => limits.document_max_bytes,
        }
    }
}

/// Upload client errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Rejected before transfer: file exceeds the per-kind cap
    #[error("File too large: {actual_bytes} bytes exceeds the {max_bytes} byte limit")]
    FileTooLarge { actual_bytes: u64, max_bytes: u64 },

    /// Rejected before transfer: content does not look like the declared kind
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Transport-level failure; retryable by re-issuing the same call
    #[error("Network error: {0}")]
    Network(String),

    /// The storage backend rejected the upload
    #[error("Upload rejected ({status_code}): {message}")]
    ServerRejected { status_code: u16, message: String },
}

/// A file handed to the upload client
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Result of a successful upload: storage identifier plus kind-specific
/// derived metadata (duration for audio, dimensions for covers)
#[derive(Debug, Clone, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "id")]
    pub upload_id: String,
    pub url: String,
    pub duration_secs: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Progress sink; receives 0-100, never decreasing
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// No-op sink for callers that do not surface progress
pub fn discard_progress() -> ProgressSink {
    Arc::new(|_| {})
}

/// Storage upload operations (trait seam so tests can substitute a fake)
#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload(
        &self,
        file: &FilePayload,
        kind: FileKind,
        progress: ProgressSink,
    ) -> Result<StoredFile, UploadError>;
}

/// HTTP upload client against the storage service
pub struct HttpUploadClient {
    http: reqwest::Client,
    base_url: String,
    limits: UploadLimits,
}

impl HttpUploadClient {
    pub fn new(
        base_url: String,
        limits: UploadLimits,
        timeout_secs: u64,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(Self { http, base_url, limits })
    }

    /// Pre-transfer checks: size cap, then content sniffing against the
    /// declared kind.
    fn check_payload(&self, file: &FilePayload, kind: FileKind) -> Result<(), UploadError> {
        let max_bytes = kind.max_bytes(&self.limits);
        let actual_bytes = file.bytes.len() as u64;
        if actual_bytes > max_bytes {
            return Err(UploadError::FileTooLarge { actual_bytes, max_bytes });
        }

        let detected = infer::get(&file.bytes)
            .ok_or_else(|| UploadError::UnsupportedFileType("unrecognized content".to_string()))?;
        let acceptable = match kind {
            FileKind::Cover => detected.matcher_type() == infer::MatcherType::Image,
            FileKind::Audio => detected.matcher_type() == infer::MatcherType::Audio,
            FileKind::Document => matches!(
                detected.matcher_type(),
                infer::MatcherType::Doc | infer::MatcherType::Archive | infer::MatcherType::Image
            ),
        };
        if !acceptable {
            return Err(UploadError::UnsupportedFileType(detected.mime_type().to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn upload(
        &self,
        file: &FilePayload,
        kind: FileKind,
        progress: ProgressSink,
    ) -> Result<StoredFile, UploadError> {
        self.check_payload(file, kind)?;

        let url = format!(
            "{}/upload?kind={}&filename={}",
            self.base_url,
            kind.as_str(),
            urlencoding::encode(&file.filename)
        );

        tracing::debug!(
            kind = kind.as_str(),
            filename = %file.filename,
            bytes = file.bytes.len(),
            "Uploading file to storage"
        );

        progress(0);

        // Chunked body so the sink tracks bytes handed to the transport.
        let total = file.bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = file.bytes.chunks(CHUNK_SIZE).map(|c| c.to_vec()).collect();
        let sink = progress.clone();
        let body_stream = async_stream::stream! {
            let mut sent: u64 = 0;
            for chunk in chunks {
                sent += chunk.len() as u64;
                let percent = ((sent.saturating_mul(100)) / total.max(1)).min(100) as u8;
                sink(percent);
                yield Ok::<Vec<u8>, std::io::Error>(chunk);
            }
        };

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::ServerRejected {
                status_code: status.as_u16(),
                message,
            });
        }

        let stored: StoredFile = response
            .json()
            .await
            .map_err(|e| UploadError::Network(format!("invalid storage response: {}", e)))?;

        // Terminal 100 regardless of how the transport chunked the body
        progress(100);

        tracing::debug!(
            upload_id = %stored.upload_id,
            kind = kind.as_str(),
            "File stored"
        );

        Ok(stored)
    }
}
