//! Token Estimator (component_design §4.1, "C1"): pure, stateless, deterministic.
//!
//! Used only for budget decisions inside the orchestrator — never for billing.

use crate::domain::Message;

const DEFAULT_CHARS_PER_TOKEN: f32 = 3.5;
const MIN_CHARS_PER_TOKEN: f32 = 0.1;
const MESSAGE_OVERHEAD: u32 = 4;
const TOOL_CALL_OVERHEAD: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    chars_per_token: f32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self { chars_per_token: DEFAULT_CHARS_PER_TOKEN }
    }
}

impl TokenEstimator {
    pub fn new(chars_per_token: f32) -> Self {
        Self { chars_per_token: chars_per_token.max(MIN_CHARS_PER_TOKEN) }
    }

    /// `ceil(rune_count / ratio) + 1`. Empty string still costs 1 token (the "+1").
    pub fn estimate_str(&self, s: &str) -> u32 {
        let runes = s.chars().count() as f32;
        (runes / self.chars_per_token).ceil() as u32 + 1
    }

    fn estimate_opt_str(&self, s: &Option<String>) -> u32 {
        s.as_deref().map(|s| self.estimate_str(s)).unwrap_or(0)
    }

    pub fn estimate_message(&self, message: &Message) -> u32 {
        let mut total = MESSAGE_OVERHEAD + self.estimate_str(&message.content) + self.estimate_opt_str(&message.name);
        if let Some(tool_calls) = &message.tool_calls {
            for call in tool_calls {
                total += self.estimate_str(&call.name) + self.estimate_str(&call.arguments) + TOOL_CALL_OVERHEAD;
            }
        }
        total
    }

    pub fn estimate_messages(&self, messages: &[Message]) -> u32 {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}
