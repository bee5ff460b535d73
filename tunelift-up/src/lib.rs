//! tunelift-up library interface
//!
//! Exposes the flow engine, service adapters, and HTTP surface for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod flow;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tunelift_common::events::EventBus;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::db::DraftRepository;
use crate::flow::UploadFlowEngine;
use crate::services::{ReleaseGateway, UploadClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub events: EventBus,
    /// Active flow engines, one per draft. The per-flow mutex serializes
    /// all mutations and is the in-flight latch for remote calls.
    pub flows: Arc<RwLock<HashMap<Uuid, Arc<Mutex<UploadFlowEngine>>>>>,
    /// Cancellation tokens for in-flight submissions
    pub submit_cancellations: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Storage upload client
    pub uploader: Arc<dyn UploadClient>,
    /// Release gateway client
    pub gateway: Arc<dyn ReleaseGateway>,
    /// Durable draft storage
    pub repo: Arc<dyn DraftRepository>,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        events: EventBus,
        uploader: Arc<dyn UploadClient>,
        gateway: Arc<dyn ReleaseGateway>,
        repo: Arc<dyn DraftRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            events,
            flows: Arc::new(RwLock::new(HashMap::new())),
            submit_cancellations: Arc::new(RwLock::new(HashMap::new())),
            uploader,
            gateway,
            repo,
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    // Raw-byte uploads must clear the audio cap with room for headers
    let body_limit = state.config.limits.audio_max_bytes as usize + 64 * 1024;

    Router::new()
        .merge(api::flow_routes())
        .route("/flows/:flow_id/events", get(api::flow_event_stream))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
