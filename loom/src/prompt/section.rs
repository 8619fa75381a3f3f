//! Section contract for the Prompt Pipeline (component_design §4.4).

use crate::domain::{PromptContext, PromptMode};
use async_trait::async_trait;

pub const PLUGIN_PRIORITY_FLOOR: u32 = 1000;

#[async_trait]
pub trait Section: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> u32;
    fn enabled(&self, ctx: &PromptContext) -> bool;
    async fn render(&self, ctx: &PromptContext) -> Result<String, String>;
}

/// `none` -> priority <= 100; `minimal` -> priority <= 500; `full` -> no cap.
pub fn passes_mode_filter(mode: PromptMode, priority: u32) -> bool {
    match mode {
        PromptMode::None => priority <= 100,
        PromptMode::Minimal => priority <= 500,
        PromptMode::Full => true,
    }
}

pub struct IdentitySection;

#[async_trait]
impl Section for IdentitySection {
    fn name(&self) -> &str {
        "identity"
    }
    fn priority(&self) -> u32 {
        100
    }
    fn enabled(&self, _ctx: &PromptContext) -> bool {
        true
    }
    async fn render(&self, ctx: &PromptContext) -> Result<String, String> {
        let identity = if ctx.agent_summary.is_empty() {
            "You are a helpful AI assistant.".to_string()
        } else {
            ctx.agent_summary.clone()
        };
        let mut out = identity;
        if ctx.has_cluster() {
            out.push_str("\n\nYou are one node in a distributed multi-agent cluster.");
        }
        Ok(out)
    }
}

pub struct ClusterAwarenessSection;

#[async_trait]
impl Section for ClusterAwarenessSection {
    fn name(&self) -> &str {
        "cluster_awareness"
    }
    fn priority(&self) -> u32 {
        150
    }
    fn enabled(&self, ctx: &PromptContext) -> bool {
        ctx.has_cluster()
    }
    async fn render(&self, ctx: &PromptContext) -> Result<String, String> {
        let lines: Vec<String> = ctx.worker_nodes.iter().map(|n| format!("- {n}")).collect();
        Ok(format!("Known worker nodes:\n{}", lines.join("\n")))
    }
}

pub struct ToolingSection;

#[async_trait]
impl Section for ToolingSection {
    fn name(&self) -> &str {
        "tooling"
    }
    fn priority(&self) -> u32 {
        200
    }
    fn enabled(&self, ctx: &PromptContext) -> bool {
        !ctx.tools.is_empty()
    }
    async fn render(&self, ctx: &PromptContext) -> Result<String, String> {
        use crate::domain::ToolSource;
        use std::fmt::Write;

        let mut plugin = String::new();
        let mut mcp = String::new();
        for t in &ctx.tools {
            let line = format!("- {}: {}\n", t.name, t.description);
            match t.source {
                ToolSource::Plugin => plugin.push_str(&line),
                ToolSource::Mcp => mcp.push_str(&line),
            }
        }
        let mut out = String::new();
        if !plugin.is_empty() {
            let _ = writeln!(out, "Available tools:\n{plugin}");
        }
        if !mcp.is_empty() {
            let _ = writeln!(out, "MCP tools:\n{mcp}");
        }
        Ok(out.trim_end().to_string())
    }
}

pub struct PersonaSection {
    pub system_prompt: String,
}

#[async_trait]
impl Section for PersonaSection {
    fn name(&self) -> &str {
        "persona"
    }
    fn priority(&self) -> u32 {
        300
    }
    fn enabled(&self, _ctx: &PromptContext) -> bool {
        !self.system_prompt.is_empty()
    }
    async fn render(&self, _ctx: &PromptContext) -> Result<String, String> {
        Ok(self.system_prompt.clone())
    }
}

pub struct RuntimeSection {
    pub version: String,
}

#[async_trait]
impl Section for RuntimeSection {
    fn name(&self) -> &str {
        "runtime"
    }
    fn priority(&self) -> u32 {
        900
    }
    fn enabled(&self, _ctx: &PromptContext) -> bool {
        true
    }
    async fn render(&self, ctx: &PromptContext) -> Result<String, String> {
        Ok(format!(
            "Current time: {} ({})\nModel: {}\nVersion: {}",
            ctx.now.to_rfc3339(),
            ctx.timezone,
            ctx.model_name,
            self.version
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_filter_none_only_allows_priority_100_or_below() {
        assert!(passes_mode_filter(PromptMode::None, 100));
        assert!(!passes_mode_filter(PromptMode::None, 101));
    }

    #[test]
    fn mode_filter_minimal_allows_up_to_500() {
        assert!(passes_mode_filter(PromptMode::Minimal, 500));
        assert!(!passes_mode_filter(PromptMode::Minimal, 501));
    }

    #[test]
    fn mode_filter_full_has_no_cap() {
        assert!(passes_mode_filter(PromptMode::Full, 999_999));
    }
}
