//! HTTP API handlers

pub mod flow;
pub mod health;
pub mod sse;

pub use flow::flow_routes;
pub use health::health_routes;
pub use sse::flow_event_stream;
