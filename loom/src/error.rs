//! Core error taxonomy (error_handling_design §7), by semantic kind rather than type name.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("context window exceeded: {0}")]
    ContextOverflow(String),
    #[error("model is not tool-capable: {0}")]
    ModelNotToolCapable(String),
    #[error("all candidates exhausted: {0}")]
    AllCandidatesExhausted(String),
    #[error("run aborted")]
    Aborted,
    #[error("timed out")]
    Timeout,
    #[error("max retries exceeded: {0}")]
    MaxRetriesExceeded(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl AgentError {
    /// `context_overflow`, or a message containing any of the known provider phrasings
    /// for an over-large request (turn_executor §4.9 "Context-overflow detection").
    pub fn is_context_overflow(&self) -> bool {
        if matches!(self, AgentError::ContextOverflow(_)) {
            return true;
        }
        let msg = self.to_string().to_lowercase();
        const NEEDLES: &[&str] = &[
            "context_length_exceeded",
            "maximum context length",
            "too many tokens",
            "request_too_large",
            "exceeds model context window",
            "413 request entity too large",
        ];
        NEEDLES.iter().any(|n| msg.contains(n))
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::ExecutionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_context_overflow_by_kind() {
        assert!(AgentError::ContextOverflow("x".into()).is_context_overflow());
    }

    #[test]
    fn detects_context_overflow_by_message_substring() {
        let e = AgentError::ExecutionFailed("error: context_length_exceeded for model".into());
        assert!(e.is_context_overflow());
    }

    #[test]
    fn unrelated_error_is_not_overflow() {
        let e = AgentError::ExecutionFailed("network reset".into());
        assert!(!e.is_context_overflow());
    }
}
