//! Upload flow API handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tunelift_common::events::FlowStep;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::flow::{DraftPatch, FlowPlan, FlowServices, NewTrackRequest, UploadFlowEngine};
use crate::models::{DraftStatus, ReleaseDraft, TrackPatch};
use crate::services::FilePayload;
use crate::AppState;

/// POST /flows request
#[derive(Debug, Deserialize)]
pub struct StartFlowRequest {
    pub session_key: String,
    pub artist_id: Uuid,
    pub artist_name: String,
    /// Flow variant name; defaults to "full"
    pub variant: Option<String>,
}

/// POST /flows/resume request
#[derive(Debug, Deserialize)]
pub struct ResumeFlowRequest {
    pub session_key: String,
    pub artist_id: Uuid,
}

/// Draft + step snapshot returned by most flow endpoints
#[derive(Debug, Serialize)]
pub struct FlowSnapshot {
    pub flow_id: Uuid,
    pub variant: String,
    pub step: FlowStep,
    pub status: DraftStatus,
    pub draft: ReleaseDraft,
}

/// POST /flows/{id}/tracks response
#[derive(Debug, Serialize)]
pub struct TrackAddedResponse {
    pub local_id: Uuid,
    pub snapshot: FlowSnapshot,
}

/// POST /flows/{id}/advance and /back response
#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub step: FlowStep,
}

/// POST /flows/{id}/cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Query parameters for raw-byte file uploads
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

/// Query parameters for staging a track
#[derive(Debug, Deserialize)]
pub struct TrackUploadParams {
    pub filename: String,
    pub title: Option<String>,
}

fn snapshot(engine: &UploadFlowEngine) -> FlowSnapshot {
    let draft = engine.draft().clone();
    FlowSnapshot {
        flow_id: draft.draft_id,
        variant: draft.variant.clone(),
        step: draft.step,
        status: draft.status,
        draft,
    }
}

fn flow_services(state: &AppState) -> FlowServices {
    FlowServices {
        uploader: state.uploader.clone(),
        gateway: state.gateway.clone(),
        repo: state.repo.clone(),
        events: state.events.clone(),
    }
}

async fn engine_for(
    state: &AppState,
    flow_id: Uuid,
) -> ApiResult<Arc<Mutex<UploadFlowEngine>>> {
    state
        .flows
        .read()
        .await
        .get(&flow_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Upload flow not found: {}", flow_id)))
}

/// POST /flows - start a new upload flow
pub async fn start_flow(
    State(state): State<AppState>,
    Json(request): Json<StartFlowRequest>,
) -> ApiResult<Json<FlowSnapshot>> {
    let variant = request.variant.as_deref().unwrap_or("full");
    let plan = FlowPlan::by_name(variant)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown flow variant: {}", variant)))?;

    // A resumable draft for the same artist blocks a fresh start; one for a
    // different artist is stale on this session and is invalidated.
    if let Some(stored) = state.repo.load(&request.session_key).await? {
        if stored.artist_id == request.artist_id && !stored.is_terminal() {
            return Err(ApiError::Conflict(
                "A draft is already in progress for this session; resume or abandon it"
                    .to_string(),
            ));
        }
        state.repo.clear(&request.session_key).await?;
    }

    let engine = UploadFlowEngine::start(
        plan,
        request.session_key,
        request.artist_id,
        request.artist_name,
        flow_services(&state),
    )
    .await?;

    let response = snapshot(&engine);
    state
        .flows
        .write()
        .await
        .insert(response.flow_id, Arc::new(Mutex::new(engine)));

    Ok(Json(response))
}

/// POST /flows/resume - restore the stored draft for a session key
pub async fn resume_flow(
    State(state): State<AppState>,
    Json(request): Json<ResumeFlowRequest>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine =
        UploadFlowEngine::resume(&request.session_key, request.artist_id, flow_services(&state))
            .await?
            .ok_or_else(|| {
                ApiError::NotFound("No resumable draft for this session".to_string())
            })?;

    let flow_id = engine.draft().draft_id;

    // Prefer an engine already live in memory: it may hold staged audio
    // that the stored form cannot carry.
    let mut flows = state.flows.write().await;
    if let Some(existing) = flows.get(&flow_id) {
        let existing = existing.lock().await;
        return Ok(Json(snapshot(&existing)));
    }
    let response = snapshot(&engine);
    flows.insert(flow_id, Arc::new(Mutex::new(engine)));

    Ok(Json(response))
}

/// GET /flows/{id} - current draft and step
pub async fn get_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let engine = engine.lock().await;
    Ok(Json(snapshot(&engine)))
}

/// PATCH /flows/{id}/draft - metadata and acknowledgment mutations
pub async fn update_draft(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    Json(patch): Json<DraftPatch>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine.apply(patch).await?;
    Ok(Json(snapshot(&engine)))
}

/// POST /flows/{id}/cover - upload cover art (raw bytes)
pub async fn upload_cover(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine
        .upload_cover(FilePayload {
            filename: params.filename,
            bytes: body.to_vec(),
        })
        .await?;
    Ok(Json(snapshot(&engine)))
}

/// POST /flows/{id}/tracks - stage a track (raw audio bytes)
pub async fn add_track(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    Query(params): Query<TrackUploadParams>,
    body: Bytes,
) -> ApiResult<Json<TrackAddedResponse>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    let local_id = engine
        .add_track(NewTrackRequest {
            title: params.title,
            file: FilePayload {
                filename: params.filename,
                bytes: body.to_vec(),
            },
        })
        .await?;
    Ok(Json(TrackAddedResponse {
        local_id,
        snapshot: snapshot(&engine),
    }))
}

/// POST /flows/{id}/tracks/{local_id}/audio - re-attach audio for a track
/// whose upload never completed (e.g. after a resume)
pub async fn attach_track_audio(
    State(state): State<AppState>,
    Path((flow_id, local_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine
        .attach_audio(
            local_id,
            FilePayload {
                filename: params.filename,
                bytes: body.to_vec(),
            },
        )
        .await?;
    Ok(Json(snapshot(&engine)))
}

/// POST /flows/{id}/tracks/process - retry pending track attachment
pub async fn process_tracks(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine.process_pending_tracks().await?;
    Ok(Json(snapshot(&engine)))
}

/// PATCH /flows/{id}/tracks/{local_id} - partial track update
pub async fn update_track(
    State(state): State<AppState>,
    Path((flow_id, local_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<TrackPatch>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine.update_track(local_id, patch).await?;
    Ok(Json(snapshot(&engine)))
}

/// DELETE /flows/{id}/tracks/{local_id} - local removal + renumbering
pub async fn remove_track(
    State(state): State<AppState>,
    Path((flow_id, local_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine.remove_track(local_id).await?;
    Ok(Json(snapshot(&engine)))
}

/// POST /flows/{id}/advance
pub async fn advance_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<StepResponse>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    let step = engine.advance().await?;
    Ok(Json(StepResponse { step }))
}

/// POST /flows/{id}/back
pub async fn back_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<StepResponse>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    let step = engine.back().await?;
    Ok(Json(StepResponse { step }))
}

/// POST /flows/{id}/submit - submit the release for review
pub async fn submit_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<StepResponse>> {
    let engine = engine_for(&state, flow_id).await?;

    let token = CancellationToken::new();
    state
        .submit_cancellations
        .write()
        .await
        .insert(flow_id, token.clone());

    let result = {
        let mut engine = engine.lock().await;
        engine.submit(token).await
    };

    state.submit_cancellations.write().await.remove(&flow_id);

    let step = result?;
    Ok(Json(StepResponse { step }))
}

/// POST /flows/{id}/cancel - advisory cancel of an in-flight submission
pub async fn cancel_submit(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    let token = state
        .submit_cancellations
        .read()
        .await
        .get(&flow_id)
        .cloned()
        .ok_or_else(|| {
            ApiError::Conflict("No submission in flight for this flow".to_string())
        })?;

    token.cancel();
    tracing::info!(flow_id = %flow_id, "Submission cancel requested");

    Ok(Json(CancelResponse { cancelled: true }))
}

/// POST /flows/{id}/abandon - discard the draft and clear stored state
pub async fn abandon_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> ApiResult<Json<FlowSnapshot>> {
    let engine = engine_for(&state, flow_id).await?;
    let mut engine = engine.lock().await;
    engine.abandon().await?;
    Ok(Json(snapshot(&engine)))
}

/// Build upload flow routes
pub fn flow_routes() -> Router<AppState> {
    Router::new()
        .route("/flows", post(start_flow))
        .route("/flows/resume", post(resume_flow))
        .route("/flows/:flow_id", get(get_flow))
        .route("/flows/:flow_id/draft", patch(update_draft))
        .route("/flows/:flow_id/cover", post(upload_cover))
        .route("/flows/:flow_id/tracks", post(add_track))
        .route("/flows/:flow_id/tracks/process", post(process_tracks))
        .route(
            "/flows/:flow_id/tracks/:local_id/audio",
            post(attach_track_audio),
        )
        .route(
            "/flows/:flow_id/tracks/:local_id",
            patch(update_track).delete(remove_track),
        )
        .route("/flows/:flow_id/advance", post(advance_flow))
        .route("/flows/:flow_id/back", post(back_flow))
        .route("/flows/:flow_id/submit", post(submit_flow))
        .route("/flows/:flow_id/cancel", post(cancel_submit))
        .route("/flows/:flow_id/abandon", post(abandon_flow))
}
