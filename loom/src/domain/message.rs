//! Message: one turn of conversation history (data_model §Message).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tool call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Arguments serialized as a JSON-object-shaped string, verbatim as produced by the model.
    pub arguments: String,
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a session's history.
///
/// Invariant: a `Tool` message only appears after an `Assistant` message whose
/// `tool_calls` include its `tool_call_id`; callers constructing history out of
/// order violate this silently (nothing here enforces it beyond construction site).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub name: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut m = Self::new(Role::Assistant, content);
        if !tool_calls.is_empty() {
            m.tool_calls = Some(tool_calls);
        }
        m
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut m = Self::new(Role::Tool, content);
        m.tool_call_id = Some(tool_call_id.into());
        m
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_expected_role() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        assert_eq!(Message::tool("c1", "r").role, Role::Tool);
    }

    #[test]
    fn tool_message_carries_call_id() {
        let m = Message::tool("c1", "hi");
        assert_eq!(m.tool_call_id.as_deref(), Some("c1"));
    }

    #[test]
    fn assistant_with_tool_calls_empty_list_is_none() {
        let m = Message::assistant_with_tool_calls("", vec![]);
        assert!(m.tool_calls.is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let m = Message::assistant_with_tool_calls(
            "calling",
            vec![ToolCall {
                id: "c1".into(),
                name: "echo".into(),
                arguments: "{\"text\":\"hi\"}".into(),
            }],
        );
        let json = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Assistant);
        assert_eq!(back.tool_calls.unwrap()[0].name, "echo");
    }
}
