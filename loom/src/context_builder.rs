//! Context Builder (component_design §4.5, "C5"): assembles the model input list.

use crate::domain::{Message, Role, Session};
use crate::pruner::{PruneCounts, Pruner};
use crate::token::TokenEstimator;
use crate::window::WindowInfo;

pub struct BuildInputs<'a> {
    pub assembled_system_prompt: Option<&'a str>,
    pub agent_system_prompt_verbatim: &'a str,
    pub session: &'a Session,
    pub user_input: &'a str,
    pub injected_messages: Vec<Message>,
    pub max_history_turns: u32,
    pub window: WindowInfo,
}

pub struct BuildOutput {
    pub messages: Vec<Message>,
    pub estimated_tokens: u32,
    pub history_trimmed: bool,
    pub prune_counts: PruneCounts,
}

pub struct ContextBuilder {
    pruner: Pruner,
    estimator: TokenEstimator,
}

impl ContextBuilder {
    pub fn new(pruner: Pruner, estimator: TokenEstimator) -> Self {
        Self { pruner, estimator }
    }

    /// Walks `active_messages` from the end counting user-role messages; once the
    /// Nth is reached, keeps from that index onward. `n == 0` means "keep all".
    fn limit_history_turns(messages: &[Message], n: u32) -> (Vec<Message>, bool) {
        if n == 0 {
            return (messages.to_vec(), false);
        }
        let mut seen_user = 0u32;
        for (idx, m) in messages.iter().enumerate().rev() {
            if m.role == Role::User {
                seen_user += 1;
                if seen_user == n {
                    let trimmed = idx > 0;
                    return (messages[idx..].to_vec(), trimmed);
                }
            }
        }
        (messages.to_vec(), false)
    }

    pub fn build(&self, inputs: BuildInputs<'_>) -> BuildOutput {
        let mut messages = Vec::new();

        let system_text = inputs.assembled_system_prompt.unwrap_or(inputs.agent_system_prompt_verbatim);
        if !system_text.is_empty() {
            messages.push(Message::system(system_text));
        }

        if let Some(summary) = &inputs.session.compaction.summary {
            messages.push(Message::system(format!("[Conversation Summary]\n{summary}")));
        }

        messages.extend(inputs.injected_messages);

        let (history, history_trimmed) =
            Self::limit_history_turns(inputs.session.active_messages(), inputs.max_history_turns);
        messages.extend(history);

        if !inputs.user_input.is_empty() {
            messages.push(Message::user(inputs.user_input));
        }

        let (pruned, prune_counts) = self.pruner.prune(&messages, inputs.window.usable_tokens);
        let estimated_tokens = self.estimator.estimate_messages(&pruned);

        BuildOutput { messages: pruned, estimated_tokens, history_trimmed, prune_counts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pruner::PrunerConfig;
    use crate::window::WindowInfo;

    fn window() -> WindowInfo {
        WindowInfo { window_size: 128_000, reserve_tokens: 4096, usable_tokens: 123_904 }
    }

    fn builder() -> ContextBuilder {
        ContextBuilder::new(Pruner::new(PrunerConfig::default(), TokenEstimator::default()), TokenEstimator::default())
    }

    #[test]
    fn order_is_system_summary_injected_history_input() {
        let mut session = Session::new("s1", "a1");
        session.append(Message::user("old"));
        session.compaction.summary = Some("earlier stuff".into());
        let out = builder().build(BuildInputs {
            assembled_system_prompt: Some("SYS"),
            agent_system_prompt_verbatim: "",
            session: &session,
            user_input: "new question",
            injected_messages: vec![Message::system("injected")],
            max_history_turns: 0,
            window: window(),
        });
        assert_eq!(out.messages[0].content, "SYS");
        assert!(out.messages[1].content.contains("earlier stuff"));
        assert_eq!(out.messages[2].content, "injected");
        assert_eq!(out.messages[3].content, "old");
        assert_eq!(out.messages[4].content, "new question");
    }

    #[test]
    fn empty_user_input_is_not_appended() {
        let session = Session::new("s1", "a1");
        let out = builder().build(BuildInputs {
            assembled_system_prompt: None,
            agent_system_prompt_verbatim: "",
            session: &session,
            user_input: "",
            injected_messages: vec![],
            max_history_turns: 0,
            window: window(),
        });
        assert!(out.messages.is_empty());
    }

    #[test]
    fn history_turn_limit_keeps_n_most_recent_user_turns() {
        let mut session = Session::new("s1", "a1");
        for i in 0..5 {
            session.append(Message::user(format!("u{i}")));
            session.append(Message::assistant(format!("a{i}")));
        }
        let out = builder().build(BuildInputs {
            assembled_system_prompt: None,
            agent_system_prompt_verbatim: "",
            session: &session,
            user_input: "",
            injected_messages: vec![],
            max_history_turns: 2,
            window: window(),
        });
        assert!(out.history_trimmed);
        // u3, a3, u4, a4
        assert_eq!(out.messages.len(), 4);
        assert_eq!(out.messages[0].content, "u3");
    }

    #[test]
    fn zero_history_turns_means_keep_all() {
        let mut session = Session::new("s1", "a1");
        session.append(Message::user("u0"));
        session.append(Message::assistant("a0"));
        let out = builder().build(BuildInputs {
            assembled_system_prompt: None,
            agent_system_prompt_verbatim: "",
            session: &session,
            user_input: "",
            injected_messages: vec![],
            max_history_turns: 0,
            window: window(),
        });
        assert_eq!(out.messages.len(), 2);
        assert!(!out.history_trimmed);
    }

    #[test]
    fn falls_back_to_agent_system_prompt_verbatim_when_no_pipeline() {
        let session = Session::new("s1", "a1");
        let out = builder().build(BuildInputs {
            assembled_system_prompt: None,
            agent_system_prompt_verbatim: "raw prompt",
            session: &session,
            user_input: "",
            injected_messages: vec![],
            max_history_turns: 0,
            window: window(),
        });
        assert_eq!(out.messages[0].content, "raw prompt");
    }
}
