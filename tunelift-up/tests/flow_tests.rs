//! Flow state machine tests: step transitions, guard predicates, and the
//! draft mutations that feed them

mod helpers;

use helpers::{add_titled_track, to_metadata_ready, TestHarness};
use tokio_util::sync::CancellationToken;
use tunelift_common::events::FlowStep;
use tunelift_up::flow::{DraftPatch, FlowError, FlowPlan, UploadFlowEngine};
use tunelift_up::models::{DraftStatus, ReleaseType};
use tunelift_up::services::FilePayload;
use uuid::Uuid;

async fn start_full(harness: &TestHarness) -> UploadFlowEngine {
    UploadFlowEngine::start(
        FlowPlan::full(),
        "session-1".to_string(),
        Uuid::new_v4(),
        "Test Artist".to_string(),
        harness.services(),
    )
    .await
    .unwrap()
}

async fn start_express(harness: &TestHarness) -> UploadFlowEngine {
    UploadFlowEngine::start(
        FlowPlan::express(),
        "session-1".to_string(),
        Uuid::new_v4(),
        "Test Artist".to_string(),
        harness.services(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn full_flow_starts_at_cover_and_cover_is_optional() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;

    // Given: a fresh full-plan flow
    assert_eq!(engine.draft().step, FlowStep::Cover);

    // When: advancing without uploading cover art
    let step = engine.advance().await.unwrap();

    // Then: the flow moves on; cover is optional in the full plan
    assert_eq!(step, FlowStep::TypeSelect);
}

#[tokio::test]
async fn express_flow_requires_cover_before_advancing() {
    let harness = TestHarness::new();
    let mut engine = start_express(&harness).await;

    // When: advancing with no cover uploaded
    let err = engine.advance().await.unwrap_err();

    // Then: the cover guard blocks with the offending field named
    match err {
        FlowError::Validation { field, .. } => assert_eq!(field, Some("cover")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(engine.draft().step, FlowStep::Cover);

    // When: cover art is uploaded
    engine
        .upload_cover(FilePayload {
            filename: "cover.png".to_string(),
            bytes: helpers::png_bytes(),
        })
        .await
        .unwrap();

    // Then: the guard passes and express skips straight to metadata
    assert_eq!(engine.advance().await.unwrap(), FlowStep::Metadata);
}

#[tokio::test]
async fn type_select_guard_requires_type_and_acknowledgment() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    engine.advance().await.unwrap(); // cover -> type_select

    // No type chosen yet
    let err = engine.advance().await.unwrap_err();
    match err {
        FlowError::Validation { field, .. } => assert_eq!(field, Some("release_type")),
        other => panic!("expected validation error, got {:?}", other),
    }

    // Type chosen but copyright checkpoint unchecked
    engine
        .apply(DraftPatch {
            release_type: Some(ReleaseType::Single),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    let err = engine.advance().await.unwrap_err();
    match err {
        FlowError::Validation { field, .. } => {
            assert_eq!(field, Some("copyright_acknowledged"))
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    // Both present
    engine
        .apply(DraftPatch {
            copyright_acknowledged: Some(true),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    assert_eq!(engine.advance().await.unwrap(), FlowStep::Metadata);
}

#[tokio::test]
async fn metadata_guard_requires_nonblank_title() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    engine.advance().await.unwrap();
    engine
        .apply(DraftPatch {
            release_type: Some(ReleaseType::Single),
            copyright_acknowledged: Some(true),
            title: Some("   ".to_string()),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    engine.advance().await.unwrap(); // -> metadata

    // Whitespace-only title does not satisfy the guard
    let err = engine.advance().await.unwrap_err();
    match err {
        FlowError::Validation { field, .. } => assert_eq!(field, Some("title")),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn back_walks_one_step_and_is_blocked_at_the_first() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    engine.advance().await.unwrap(); // -> type_select

    assert_eq!(engine.back().await.unwrap(), FlowStep::Cover);
    assert!(engine.back().await.is_err());
}

#[tokio::test]
async fn back_is_disallowed_from_complete() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    to_metadata_ready(&mut engine, ReleaseType::Single, "Test Song").await;
    engine.advance().await.unwrap(); // -> tracks
    add_titled_track(&mut engine, "Test Song").await.unwrap();
    engine.advance().await.unwrap(); // -> review
    engine.advance().await.unwrap(); // -> submit
    engine
        .apply(DraftPatch {
            submit_confirmed: Some(true),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    engine.submit(CancellationToken::new()).await.unwrap();
    assert_eq!(engine.draft().step, FlowStep::Complete);

    // The flow may not skip backward past complete
    assert!(engine.back().await.is_err());
}

#[tokio::test]
async fn entering_tracks_creates_the_release_exactly_once() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    to_metadata_ready(&mut engine, ReleaseType::Single, "Test Song").await;

    // Given: no remote release yet
    assert!(engine.draft().remote_release_id.is_none());

    // When: entering the tracks step
    engine.advance().await.unwrap();

    // Then: exactly one create call fired and the id is recorded
    assert_eq!(harness.gateway.create_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(engine.draft().remote_release_id.as_deref(), Some("rel-1"));

    // When: leaving and re-entering the tracks step
    add_titled_track(&mut engine, "Test Song").await.unwrap();
    engine.advance().await.unwrap(); // -> review
    engine.back().await.unwrap(); // -> tracks again

    // Then: no second create call
    assert_eq!(harness.gateway.create_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn submission_is_rejected_locally_before_any_network_call() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    to_metadata_ready(&mut engine, ReleaseType::Single, "Test Song").await;
    engine.advance().await.unwrap(); // -> tracks
    engine.advance().await.unwrap_err(); // no tracks; stays

    // Submission from the wrong step never reaches the gateway
    let err = engine.submit(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, FlowError::Validation { .. }));
    assert_eq!(
        harness.gateway.submit_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn submit_without_final_confirmation_is_rejected_locally() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    to_metadata_ready(&mut engine, ReleaseType::Single, "Test Song").await;
    engine.advance().await.unwrap(); // -> tracks
    add_titled_track(&mut engine, "Test Song").await.unwrap();
    engine.advance().await.unwrap(); // -> review
    engine.advance().await.unwrap(); // -> submit

    // The full plan has a second checkpoint; without it nothing is sent
    let err = engine.submit(CancellationToken::new()).await.unwrap_err();
    match err {
        FlowError::Validation { field, .. } => assert_eq!(field, Some("submit_confirmed")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(
        harness.gateway.submit_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn type_change_with_tracks_requires_confirmed_reset() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    to_metadata_ready(&mut engine, ReleaseType::Medley, "Mixed Bag").await;
    engine.advance().await.unwrap(); // -> tracks
    add_titled_track(&mut engine, "Part 1").await.unwrap();
    add_titled_track(&mut engine, "Part 2").await.unwrap();

    // Without the reset confirmation the change is rejected
    let err = engine
        .apply(DraftPatch {
            release_type: Some(ReleaseType::Single),
            ..DraftPatch::default()
        })
        .await
        .unwrap_err();
    match err {
        FlowError::Validation { field, .. } => assert_eq!(field, Some("release_type")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(engine.draft().tracks.len(), 2);

    // With it, the track list resets
    engine
        .apply(DraftPatch {
            release_type: Some(ReleaseType::Single),
            confirm_track_reset: true,
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    assert_eq!(engine.draft().release_type, Some(ReleaseType::Single));
    assert!(engine.draft().tracks.is_empty());
}

#[tokio::test]
async fn same_type_reapplied_does_not_reset_tracks() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    to_metadata_ready(&mut engine, ReleaseType::Medley, "Mixed Bag").await;
    engine.advance().await.unwrap();
    add_titled_track(&mut engine, "Part 1").await.unwrap();

    engine
        .apply(DraftPatch {
            release_type: Some(ReleaseType::Medley),
            ..DraftPatch::default()
        })
        .await
        .unwrap();
    assert_eq!(engine.draft().tracks.len(), 1);
}

#[tokio::test]
async fn abandon_clears_durable_storage() {
    let harness = TestHarness::new();
    let mut engine = start_full(&harness).await;
    assert!(harness.repo.contains("session-1"));

    engine.abandon().await.unwrap();

    assert_eq!(engine.draft().status, DraftStatus::Cancelled);
    assert!(!harness.repo.contains("session-1"));

    // Terminal drafts reject further mutation
    assert!(engine.advance().await.is_err());
}

#[tokio::test]
async fn resume_restores_the_same_draft_for_the_same_artist() {
    let harness = TestHarness::new();
    let artist_id = Uuid::new_v4();
    let engine = UploadFlowEngine::start(
        FlowPlan::full(),
        "session-r".to_string(),
        artist_id,
        "Test Artist".to_string(),
        harness.services(),
    )
    .await
    .unwrap();
    let draft_id = engine.draft().draft_id;
    drop(engine);

    let resumed = UploadFlowEngine::resume("session-r", artist_id, harness.services())
        .await
        .unwrap()
        .expect("draft should be resumable");
    assert_eq!(resumed.draft().draft_id, draft_id);
    assert_eq!(resumed.draft().step, FlowStep::Cover);
}

#[tokio::test]
async fn resume_for_a_different_artist_invalidates_the_stored_draft() {
    let harness = TestHarness::new();
    let engine = UploadFlowEngine::start(
        FlowPlan::full(),
        "session-shared".to_string(),
        Uuid::new_v4(),
        "First Artist".to_string(),
        harness.services(),
    )
    .await
    .unwrap();
    drop(engine);
    assert!(harness.repo.contains("session-shared"));

    // A different artist on the same device must not inherit the draft
    let resumed =
        UploadFlowEngine::resume("session-shared", Uuid::new_v4(), harness.services())
            .await
            .unwrap();
    assert!(resumed.is_none());
    assert!(!harness.repo.contains("session-shared"));
}
