//! Session: persistent message history for one agent conversation (data_model §Session).

use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Compaction state: summary text plus how much of the message list it covers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompactionState {
    pub summary: Option<String>,
    pub count: u32,
    pub first_kept_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub agent_id: String,
    pub parent_session_id: Option<String>,
    pub messages: Vec<Message>,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub compaction: CompactionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            parent_session_id: None,
            messages: Vec::new(),
            total_prompt_tokens: 0,
            total_completion_tokens: 0,
            metadata: HashMap::new(),
            compaction: CompactionState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Messages still in the active window, i.e. `messages[first_kept_index:]`.
    ///
    /// Invariant: `0 <= first_kept_index <= messages.len()`.
    pub fn active_messages(&self) -> &[Message] {
        let idx = self.compaction.first_kept_index.min(self.messages.len());
        &self.messages[idx..]
    }

    /// Appends a message, bumping `updated_at`. Never touches `first_kept_index`.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_messages_is_suffix() {
        let mut s = Session::new("s1", "a1");
        s.append(Message::user("one"));
        s.append(Message::assistant("two"));
        s.compaction.first_kept_index = 1;
        assert_eq!(s.active_messages().len(), 1);
    }

    #[test]
    fn first_kept_index_beyond_len_is_clamped() {
        let mut s = Session::new("s1", "a1");
        s.append(Message::user("one"));
        s.compaction.first_kept_index = 50;
        assert!(s.active_messages().is_empty());
    }

    #[test]
    fn append_updates_timestamp_not_first_kept_index() {
        let mut s = Session::new("s1", "a1");
        s.compaction.first_kept_index = 0;
        s.append(Message::user("hi"));
        assert_eq!(s.compaction.first_kept_index, 0);
    }

    #[test]
    fn compaction_summary_present_iff_count_positive() {
        let s = Session::new("s1", "a1");
        assert_eq!(s.compaction.count, 0);
        assert!(s.compaction.summary.is_none());
    }
}
