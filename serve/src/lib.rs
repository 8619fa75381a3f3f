//! Thin HTTP/SSE façade over `loom::AgentService` (component_design §4.11): agent,
//! session, and run CRUD plus a `POST /agents/:id/runs` endpoint that streams
//! `AgentEvent`s back as Server-Sent Events.

pub mod app;
pub mod error;
pub mod sse;

pub use app::router;
