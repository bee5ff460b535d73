//! Server-Sent Events (SSE) for upload flow progress streaming
//!
//! Streams the flow's events (step changes, upload progress, attachment
//! results, submission outcome) to the dashboard in real time.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::AppState;

/// GET /flows/{flow_id}/events - SSE event stream for one flow
pub async fn flow_event_stream(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(flow_id = %flow_id, "New SSE client connected to flow events");

    // Subscribe to the event broadcast
    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                // Heartbeat every 15 seconds
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    yield Ok(Event::default().comment("heartbeat"));
                }

                // Broadcast events, filtered to this flow
                Ok(event) = rx.recv() => {
                    if event.draft_id() != flow_id {
                        continue;
                    }
                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!(flow_id = %flow_id, event = event_type, "SSE: forwarding flow event");
                            yield Ok(Event::default().event(event_type).data(event_json));
                        }
                        Err(e) => {
                            debug!(flow_id = %flow_id, error = %e, "SSE: failed to serialize event");
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream)
}
