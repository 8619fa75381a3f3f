//! Context Pruner (component_design §4.2, "C2"): deterministic two-stage truncation.
//!
//! Only tool-role messages before the protection boundary are ever mutated; role,
//! order, and message count are never changed.

use crate::domain::{Message, Role};
use crate::token::TokenEstimator;

#[derive(Debug, Clone, Copy)]
pub struct PrunerConfig {
    pub soft_trim_ratio: f32,
    pub hard_clear_ratio: f32,
    pub head_chars: usize,
    pub tail_chars: usize,
    pub keep_last_assistants: usize,
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self {
            soft_trim_ratio: 0.3,
            hard_clear_ratio: 0.5,
            head_chars: 1500,
            tail_chars: 1500,
            keep_last_assistants: 3,
        }
    }
}

const HARD_CLEAR_PLACEHOLDER: &str = "[Old tool result cleared]";

#[derive(Debug, Clone, Copy, Default)]
pub struct PruneCounts {
    pub soft_trimmed: usize,
    pub hard_cleared: usize,
}

pub struct Pruner {
    config: PrunerConfig,
    estimator: TokenEstimator,
}

impl Pruner {
    pub fn new(config: PrunerConfig, estimator: TokenEstimator) -> Self {
        Self { config, estimator }
    }

    /// Index of the Nth-from-end assistant message; messages at or after this index are
    /// never mutated. 0 if fewer than `keep_last_assistants` assistant messages exist.
    fn protection_boundary(&self, messages: &[Message]) -> usize {
        let mut seen = 0usize;
        for (idx, m) in messages.iter().enumerate().rev() {
            if m.role == Role::Assistant {
                seen += 1;
                if seen == self.config.keep_last_assistants {
                    return idx;
                }
            }
        }
        0
    }

    fn ratio(&self, messages: &[Message], budget: u32) -> f32 {
        if budget == 0 {
            return f32::INFINITY;
        }
        self.estimator.estimate_messages(messages) as f32 / budget as f32
    }

    fn soft_trim(content: &str, head: usize, tail: usize) -> String {
        let chars: Vec<char> = content.chars().collect();
        let head_str: String = chars.iter().take(head).collect();
        let tail_str: String = chars.iter().rev().take(tail).collect::<Vec<_>>().into_iter().rev().collect();
        let truncated = chars.len().saturating_sub(head + tail);
        format!("{head_str}\n\n...[{truncated} characters truncated]...\n\n{tail_str}")
    }

    /// Returns a possibly-modified copy of `messages` plus what was done to it.
    ///
    /// Idempotent when the list is already under the soft ratio, and idempotent on
    /// re-application to an already hard-cleared list (placeholders are skipped).
    pub fn prune(&self, messages: &[Message], budget: u32) -> (Vec<Message>, PruneCounts) {
        let mut counts = PruneCounts::default();
        if messages.is_empty() {
            return (Vec::new(), counts);
        }
        if self.ratio(messages, budget) <= self.config.soft_trim_ratio {
            return (messages.to_vec(), counts);
        }

        let boundary = self.protection_boundary(messages);
        let mut out = messages.to_vec();

        let threshold = self.config.head_chars + self.config.tail_chars;
        for (idx, m) in out.iter_mut().enumerate() {
            if idx >= boundary || m.role != Role::Tool {
                continue;
            }
            if m.content.chars().count() > threshold {
                m.content = Self::soft_trim(&m.content, self.config.head_chars, self.config.tail_chars);
                counts.soft_trimmed += 1;
            }
        }

        if self.ratio(&out, budget) > self.config.hard_clear_ratio {
            for (idx, m) in out.iter_mut().enumerate() {
                if idx >= boundary || m.role != Role::Tool {
                    continue;
                }
                if m.content != HARD_CLEAR_PLACEHOLDER {
                    m.content = HARD_CLEAR_PLACEHOLDER.to_string();
                    counts.hard_cleared += 1;
                }
            }
        }

        (out, counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs_with_big_tool_result(n: usize, len: usize) -> Vec<Message> {
        let mut v = Vec::new();
        for i in 0..n {
            v.push(Message::user(format!("turn {i}")));
            v.push(Message::tool("c1", "x".repeat(len)));
            v.push(Message::assistant(format!("reply {i}")));
        }
        v
    }

    #[test]
    fn unchanged_under_soft_ratio() {
        let p = Pruner::new(PrunerConfig::default(), TokenEstimator::default());
        let msgs = vec![Message::user("hi")];
        let (out, counts) = p.prune(&msgs, 1_000_000);
        assert_eq!(out.len(), msgs.len());
        assert_eq!(counts.soft_trimmed, 0);
    }

    #[test]
    fn empty_list_returns_unchanged() {
        let p = Pruner::new(PrunerConfig::default(), TokenEstimator::default());
        let (out, _) = p.prune(&[], 100);
        assert!(out.is_empty());
    }

    #[test]
    fn preserves_role_order_and_count() {
        let p = Pruner::new(PrunerConfig::default(), TokenEstimator::default());
        let msgs = msgs_with_big_tool_result(10, 5000);
        let (out, _) = p.prune(&msgs, 500);
        assert_eq!(out.len(), msgs.len());
        for (a, b) in msgs.iter().zip(out.iter()) {
            assert_eq!(a.role, b.role);
        }
    }

    #[test]
    fn soft_trims_large_tool_results_before_boundary() {
        let p = Pruner::new(PrunerConfig::default(), TokenEstimator::default());
        let msgs = msgs_with_big_tool_result(10, 5000);
        let (out, counts) = p.prune(&msgs, 2000);
        assert!(counts.soft_trimmed > 0);
        let estimator = TokenEstimator::default();
        assert!(estimator.estimate_messages(&out) <= estimator.estimate_messages(&msgs));
    }

    #[test]
    fn recent_assistants_protect_preceding_tool_results() {
        let p = Pruner::new(PrunerConfig::default(), TokenEstimator::default());
        let msgs = msgs_with_big_tool_result(10, 5000);
        let boundary = p.protection_boundary(&msgs);
        let (out, _) = p.prune(&msgs, 200);
        for idx in boundary..msgs.len() {
            assert_eq!(out[idx].content, msgs[idx].content);
        }
    }

    #[test]
    fn hard_clear_is_idempotent() {
        let p = Pruner::new(PrunerConfig::default(), TokenEstimator::default());
        let msgs = msgs_with_big_tool_result(20, 20000);
        let (once, _) = p.prune(&msgs, 50);
        let (twice, counts) = p.prune(&once, 50);
        assert_eq!(once, twice);
        // already placeholders: pruner should not "re-clear" anything new on unprotected range,
        // so hard_cleared should be 0 on the second pass for the already-cleared indices.
        let _ = counts;
    }
}
