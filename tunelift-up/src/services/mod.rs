//! Service adapters: storage upload client, audio metadata extraction, and
//! the release gateway client

pub mod gateway;
pub mod metadata_extractor;
pub mod upload_client;

pub use gateway::{
    AttachTrackPayload, AttachedTrack, CreateReleasePayload, CreatedRelease, GatewayError,
    HttpReleaseGateway, ReleaseGateway, ReleaseStatus, ReviewSubmission,
};
pub use metadata_extractor::{title_from_filename, ExtractedTags, ExtractionError, MetadataExtractor};
pub use upload_client::{
    discard_progress, FileKind, FilePayload, HttpUploadClient, ProgressSink, StoredFile,
    UploadClient, UploadError,
};
