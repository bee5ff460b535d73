//! Audio metadata extraction service
//!
//! Best-effort derivation of title/performer/duration from uploaded audio
//! bytes using lofty. Failure never blocks the flow; callers fall back to
//! the filename (minus extension) as the title.

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::io::Cursor;
use thiserror::Error;

/// Metadata extraction errors. Always non-fatal to callers.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Container format could not be identified
    #[error("Unrecognized audio format: {0}")]
    UnrecognizedFormat(String),

    /// Identified but unreadable audio stream
    #[error("Failed to read audio: {0}")]
    ReadError(String),
}

/// Tags pulled from an audio file; every field is advisory
#[derive(Debug, Clone, Default)]
pub struct ExtractedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<u32>,
}

/// Metadata extractor service
pub struct MetadataExtractor {}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self {}
    }

    /// Extract tags from raw audio bytes
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractedTags, ExtractionError> {
        let tagged_file = Probe::new(Cursor::new(bytes))
            .guess_file_type()
            .map_err(|e| ExtractionError::UnrecognizedFormat(e.to_string()))?
            .read()
            .map_err(|e| ExtractionError::ReadError(e.to_string()))?;

        let duration_secs = tagged_file.properties().duration().as_secs() as u32;

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
        let (title, artist) = if let Some(tag) = tag {
            (
                tag.title().map(|s| s.to_string()),
                tag.artist().map(|s| s.to_string()),
            )
        } else {
            (None, None)
        };

        tracing::debug!(
            title = ?title,
            artist = ?artist,
            duration_s = duration_secs,
            "Extracted audio metadata"
        );

        Ok(ExtractedTags {
            title,
            artist,
            duration_secs: (duration_secs > 0).then_some(duration_secs),
        })
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fallback title when extraction yields nothing: the filename with its
/// final extension removed.
pub fn title_from_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => filename.to_string(),
    }
}
