//! SQLite draft repository tests

use tempfile::TempDir;
use tunelift_common::events::FlowStep;
use tunelift_up::db::{self, DraftRepository, SqliteDraftRepository};
use tunelift_up::models::{DraftStatus, ReleaseDraft, ReleaseType, TrackEntry};
use uuid::Uuid;

async fn repository() -> (TempDir, SqliteDraftRepository) {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("drafts.db"))
        .await
        .unwrap();
    (dir, SqliteDraftRepository::new(pool))
}

fn sample_draft(session_key: &str) -> ReleaseDraft {
    let mut draft = ReleaseDraft::new(
        session_key.to_string(),
        "full".to_string(),
        Uuid::new_v4(),
        "Test Artist".to_string(),
        FlowStep::Metadata,
    );
    draft.title = "Test Song".to_string();
    draft.release_type = Some(ReleaseType::Medley);
    draft.genre = Some("electronic".to_string());
    draft.copyright_acknowledged = true;
    draft.remote_release_id = Some("rel-9".to_string());

    let mut track = TrackEntry::new(1, "Part 1".to_string());
    track.audio_upload_id = Some("up-1".to_string());
    track.remote_track_id = Some("trk-1".to_string());
    track.duration_secs = Some(190);
    track.upload_progress = 100;
    draft.tracks.push(track);
    draft.tracks.push(TrackEntry::new(2, "Part 2".to_string()));

    draft
}

#[tokio::test]
async fn save_load_round_trip_reproduces_the_draft() {
    let (_dir, repo) = repository().await;
    let draft = sample_draft("round-trip");
    repo.save(&draft).await.unwrap();

    let loaded = repo.load("round-trip").await.unwrap().unwrap();

    // Field-for-field identical through the stored form
    assert_eq!(
        serde_json::to_value(&draft).unwrap(),
        serde_json::to_value(&loaded).unwrap()
    );
}

#[tokio::test]
async fn save_is_an_upsert_keyed_by_session() {
    let (_dir, repo) = repository().await;
    let mut draft = sample_draft("upsert");
    repo.save(&draft).await.unwrap();

    draft.title = "Renamed".to_string();
    draft.transition_to(FlowStep::Tracks);
    repo.save(&draft).await.unwrap();

    let loaded = repo.load("upsert").await.unwrap().unwrap();
    assert_eq!(loaded.title, "Renamed");
    assert_eq!(loaded.step, FlowStep::Tracks);
}

#[tokio::test]
async fn load_of_unknown_session_is_none() {
    let (_dir, repo) = repository().await;
    assert!(repo.load("nothing-here").await.unwrap().is_none());
}

#[tokio::test]
async fn clear_removes_the_stored_draft() {
    let (_dir, repo) = repository().await;
    repo.save(&sample_draft("clear-me")).await.unwrap();

    repo.clear("clear-me").await.unwrap();

    assert!(repo.load("clear-me").await.unwrap().is_none());
}

#[tokio::test]
async fn sweep_removes_only_terminal_drafts() {
    let (_dir, repo) = repository().await;

    let active = sample_draft("active");
    repo.save(&active).await.unwrap();

    let mut completed = sample_draft("completed");
    completed.status = DraftStatus::Completed;
    repo.save(&completed).await.unwrap();

    let mut cancelled = sample_draft("cancelled");
    cancelled.status = DraftStatus::Cancelled;
    repo.save(&cancelled).await.unwrap();

    let mut failed = sample_draft("failed");
    failed.status = DraftStatus::Failed;
    repo.save(&failed).await.unwrap();

    let swept = repo.sweep_terminal().await.unwrap();

    // Failed drafts stay: they are retryable, not terminal
    assert_eq!(swept, 2);
    assert!(repo.load("active").await.unwrap().is_some());
    assert!(repo.load("failed").await.unwrap().is_some());
    assert!(repo.load("completed").await.unwrap().is_none());
    assert!(repo.load("cancelled").await.unwrap().is_none());
}
