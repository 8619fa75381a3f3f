//! PromptContext: cycle-free data envelope passed to prompt sections (data_model §PromptContext).
//!
//! Kept deliberately free of `Agent`/`Session` references (design_notes: cyclic
//! references between prompt types and agent types) — the runner copies the
//! fields it needs out of the agent entity at assembly time.

use super::agent::PromptMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub source: ToolSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    Plugin,
    Mcp,
}

#[derive(Debug, Clone)]
pub struct PromptContext {
    pub agent_summary: String,
    pub session_id: String,
    pub prompt_mode: PromptMode,
    pub worker_nodes: Vec<String>,
    pub now: DateTime<Utc>,
    /// IANA timezone name (e.g. "UTC", "America/New_York"); defaults to server local.
    pub timezone: String,
    pub model_name: String,
    pub tools: Vec<ToolSummary>,
    pub extra: HashMap<String, String>,
}

impl PromptContext {
    pub fn has_cluster(&self) -> bool {
        !self.worker_nodes.is_empty()
    }
}
