//! Durable release-draft storage
//!
//! One row per session key. The full draft graph is serialized to JSON in
//! the row; a handful of columns are denormalized for queries and the
//! startup sweep. In-memory staged audio is never part of the stored form.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tunelift_common::Result;

use crate::models::ReleaseDraft;

/// Draft storage operations, injectable so tests can substitute an
/// in-memory fake
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Upsert the draft under its session key
    async fn save(&self, draft: &ReleaseDraft) -> Result<()>;

    /// Load the draft stored under a session key, if any
    async fn load(&self, session_key: &str) -> Result<Option<ReleaseDraft>>;

    /// Delete the draft stored under a session key
    async fn clear(&self, session_key: &str) -> Result<()>;
}

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteDraftRepository {
    pool: SqlitePool,
}

impl SqliteDraftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete drafts already in a terminal status. Run at startup; a
    /// completed or abandoned draft has nothing left to resume.
    pub async fn sweep_terminal(&self) -> Result<usize> {
        let result = sqlx::query(
            "DELETE FROM release_drafts WHERE status IN ('COMPLETED', 'CANCELLED')",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl DraftRepository for SqliteDraftRepository {
    async fn save(&self, draft: &ReleaseDraft) -> Result<()> {
        let payload = serde_json::to_string(draft).map_err(|e| {
            tunelift_common::Error::Internal(format!("Failed to serialize draft: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO release_drafts (
                session_key, draft_id, artist_id, status, step,
                payload, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_key) DO UPDATE SET
                draft_id = excluded.draft_id,
                artist_id = excluded.artist_id,
                status = excluded.status,
                step = excluded.step,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&draft.session_key)
        .bind(draft.draft_id.to_string())
        .bind(draft.artist_id.to_string())
        .bind(draft.status.as_str())
        .bind(draft.step.as_str())
        .bind(&payload)
        .bind(draft.created_at.to_rfc3339())
        .bind(draft.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, session_key: &str) -> Result<Option<ReleaseDraft>> {
        let row = sqlx::query("SELECT payload FROM release_drafts WHERE session_key = ?")
            .bind(session_key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.get("payload");
        match serde_json::from_str::<ReleaseDraft>(&payload) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                // An unreadable stored draft cannot be resumed; drop it
                // rather than blocking every future resume attempt.
                tracing::warn!(
                    session_key = session_key,
                    error = %e,
                    "Stored draft is unreadable; discarding"
                );
                self.clear(session_key).await?;
                Ok(None)
            }
        }
    }

    async fn clear(&self, session_key: &str) -> Result<()> {
        sqlx::query("DELETE FROM release_drafts WHERE session_key = ?")
            .bind(session_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
