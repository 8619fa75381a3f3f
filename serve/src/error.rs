//! Maps `loom::AgentError` onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use loom::AgentError;
use serde_json::json;

pub struct ApiError(pub AgentError);

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AgentError::NotFound(_) => StatusCode::NOT_FOUND,
            AgentError::Validation(_) => StatusCode::BAD_REQUEST,
            AgentError::ModelNotToolCapable(_) => StatusCode::BAD_REQUEST,
            AgentError::Aborted => StatusCode::CONFLICT,
            AgentError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AgentError::ContextOverflow(_)
            | AgentError::AllCandidatesExhausted(_)
            | AgentError::MaxRetriesExceeded(_)
            | AgentError::ExecutionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({"error": self.0.to_string()}));
        (status, body).into_response()
    }
}
