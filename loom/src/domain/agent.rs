//! Agent: persona + model binding + tool allowlist (data_model §Agent).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How much of the prompt pipeline's builtin sections apply during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    None,
    Minimal,
    #[default]
    Full,
}

/// Persona attributes consumed by the prompt pipeline's Identity/Persona sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Persona {
    pub identity: Option<String>,
    pub style: Option<String>,
    pub prompt_mode: PromptMode,
    pub workspace_dir: Option<String>,
    #[serde(default)]
    pub extra_sections: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub persona: Persona,
    pub system_prompt: String,
    pub primary_model: String,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub allowed_mcp_servers: Vec<String>,
    pub max_turns: u32,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Primary model followed by declared fallbacks, deduplicated, order-preserving.
    ///
    /// Invariant: the returned list is never empty (the primary is always a candidate).
    pub fn fallback_candidates(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(1 + self.fallback_models.len());
        for m in std::iter::once(self.primary_model.clone()).chain(self.fallback_models.clone()) {
            if seen.insert(m.clone()) {
                out.push(m);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(primary: &str, fallbacks: &[&str]) -> Agent {
        Agent {
            id: "a".into(),
            name: "a".into(),
            description: String::new(),
            persona: Persona::default(),
            system_prompt: String::new(),
            primary_model: primary.into(),
            fallback_models: fallbacks.iter().map(|s| s.to_string()).collect(),
            allowed_tools: vec![],
            allowed_mcp_servers: vec![],
            max_turns: 0,
            temperature: 0.7,
            max_tokens: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn candidates_preserve_order_and_dedup() {
        let a = agent("gpt-4", &["gpt-4", "gpt-3.5", "gpt-3.5"]);
        assert_eq!(a.fallback_candidates(), vec!["gpt-4", "gpt-3.5"]);
    }

    #[test]
    fn candidates_never_empty() {
        let a = agent("only", &[]);
        assert_eq!(a.fallback_candidates(), vec!["only"]);
    }
}
