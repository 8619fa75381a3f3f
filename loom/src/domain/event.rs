//! AgentEvent: tagged-union value streamed from a run (data_model §AgentEvent).

use super::message::ToolCall;
use super::run::Usage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    TextDelta { delta: String },
    ToolCallStart { tool_call: ToolCall },
    ToolCallEnd { tool_result: ToolResultPayload },
    RunStatus { status: String, error: Option<String> },
    Error { message: String },
    Done { usage: Usage },
}

impl AgentEvent {
    pub fn run_status(status: impl Into<String>) -> Self {
        AgentEvent::RunStatus { status: status.into(), error: None }
    }

    pub fn run_status_with_error(status: impl Into<String>, error: impl Into<String>) -> Self {
        AgentEvent::RunStatus { status: status.into(), error: Some(error.into()) }
    }

    /// Whether this event ends the stream (§3: exactly one terminal event).
    pub fn is_terminal(&self) -> bool {
        match self {
            AgentEvent::Done { .. } => true,
            AgentEvent::RunStatus { status, .. } => status == "failed" || status == "cancelled",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_is_terminal() {
        assert!(AgentEvent::Done { usage: Usage::default() }.is_terminal());
    }

    #[test]
    fn in_progress_status_is_not_terminal() {
        assert!(!AgentEvent::run_status("in_progress").is_terminal());
    }

    #[test]
    fn failed_status_is_terminal() {
        assert!(AgentEvent::run_status_with_error("failed", "boom").is_terminal());
    }

    #[test]
    fn serializes_with_type_tag() {
        let ev = AgentEvent::TextDelta { delta: "hi".into() };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "text_delta");
        assert_eq!(v["delta"], "hi");
    }
}
