//! Tool contract (external_interfaces §6): `{name, description, parameter schema}`
//! plus `invoke`. Plugin tools are registered through the Plugin Framework (C12);
//! MCP tools are discovered by the MCP collaborator at startup and are represented
//! here only by their declared summary (component_design §4.4 Tooling section).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    /// Invokes the tool; returns the result serialized as a JSON string
    /// (external_interfaces §6: "invoke(ctx, argument-object) -> (json-string result, error)").
    async fn invoke(&self, arguments: Value) -> Result<String, ToolError>;
}

/// A registry of plugin-provided tools, filtered by an agent's allowlist
/// (data_model §Agent: "empty = all").
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Tools allowed for an agent; `allowed` empty means "all registered tools".
    pub fn filtered(&self, allowed: &[String]) -> Vec<Arc<dyn Tool>> {
        if allowed.is_empty() {
            return self.tools.clone();
        }
        self.tools.iter().filter(|t| allowed.iter().any(|a| a == t.name())).cloned().collect()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }
}

/// Declared interface for an MCP server as a tool source (external_interfaces §6:
/// "MCP transport is an external collaborator, not reimplemented here"). A real
/// implementation lives outside this crate and is wired in via `ModelContextServer`;
/// this trait only fixes the shape the Agent Runner depends on.
#[async_trait]
pub trait ModelContextServer: Send + Sync {
    fn server_name(&self) -> &str;

    /// Tools currently advertised by the server, refreshed at connection time.
    async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes text back"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
            Ok(arguments.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string())
        }
    }

    #[tokio::test]
    async fn echo_tool_returns_argument() {
        let tool = EchoTool;
        let out = tool.invoke(serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, "hi");
    }

    #[test]
    fn empty_allowlist_returns_all_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.filtered(&[]).len(), 1);
    }

    #[test]
    fn allowlist_filters_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.filtered(&["other".to_string()]).len(), 0);
        assert_eq!(registry.filtered(&["echo".to_string()]).len(), 1);
    }

    #[test]
    fn find_looks_up_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.find("echo").is_some());
        assert!(registry.find("missing").is_none());
    }
}
