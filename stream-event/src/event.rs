//! Protocol-level event types: the wire shape of `AgentEvent` (data_model §AgentEvent).
//!
//! State-carrying variants use `serde_json::Value` so this crate never depends on
//! loom's domain types; the bridge in loom serializes its `AgentEvent` into these
//! before envelope injection.

use serde::Serialize;
use serde_json::Value;

/// One event in an agent run's stream. Matches `data_model::AgentEvent` one-to-one;
/// envelope fields (session_id, run_id, sequence) are injected separately.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    TextDelta { delta: String },
    ToolCallStart { tool_call: Value },
    ToolCallEnd { tool_result: Value },
    RunStatus { status: String, error: Option<String> },
    Error { message: String },
    Done { usage: Value },
}

impl ProtocolEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Whether this event ends the stream (exactly one terminal event per run).
    pub fn is_terminal(&self) -> bool {
        match self {
            ProtocolEvent::Done { .. } => true,
            ProtocolEvent::RunStatus { status, .. } => status == "failed" || status == "cancelled",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_serializes_with_type_tag() {
        let ev = ProtocolEvent::TextDelta { delta: "hi".into() };
        let v = ev.to_value().unwrap();
        assert_eq!(v["type"], "text_delta");
        assert_eq!(v["delta"], "hi");
    }

    #[test]
    fn done_is_terminal_run_status_failed_is_terminal_others_are_not() {
        assert!(ProtocolEvent::Done { usage: Value::Null }.is_terminal());
        assert!(ProtocolEvent::RunStatus { status: "failed".into(), error: Some("x".into()) }.is_terminal());
        assert!(!ProtocolEvent::RunStatus { status: "in_progress".into(), error: None }.is_terminal());
        assert!(!ProtocolEvent::TextDelta { delta: "x".into() }.is_terminal());
    }
}
