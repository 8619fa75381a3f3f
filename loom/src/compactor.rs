//! Compactor (component_design §4.6, "C6"): LLM-driven multi-stage summarization.

use crate::domain::{Message, Role, Session};
use crate::llm::LlmClient;
use crate::token::TokenEstimator;

const DEFAULT_KEEP_RECENT_TURNS: usize = 3;
const SUMMARY_BUDGET_DIVISOR: u32 = 5;
const MIN_SUMMARY_BUDGET: u32 = 1000;
const CHUNK_BUDGET_RATIO: f32 = 0.4;
const MIN_CHUNK_BUDGET: u32 = 2000;
const TRUNCATE_HEAD_RUNES: usize = 1000;
const TRUNCATE_TAIL_RUNES: usize = 500;
const CONTENT_TRUNCATE_THRESHOLD: usize = 2000;
const ARG_TRUNCATE_CHARS: usize = 200;

const SUMMARIZER_SYSTEM_PROMPT: &str = "You are a summarizer. Produce a concise plain-text summary of the conversation below, preserving decisions, open tasks, and file paths.";

#[derive(Debug, thiserror::Error)]
pub enum CompactionError {
    #[error("not enough messages to compact")]
    NotEnoughMessages,
}

pub struct CompactorConfig {
    pub keep_recent_turns: usize,
}

impl Default for CompactorConfig {
    fn default() -> Self {
        Self { keep_recent_turns: DEFAULT_KEEP_RECENT_TURNS }
    }
}

pub struct CompactionResult {
    pub summary: String,
    pub split_index: usize,
}

pub struct Compactor<'a> {
    config: CompactorConfig,
    llm: &'a dyn LlmClient,
    estimator: TokenEstimator,
}

impl<'a> Compactor<'a> {
    pub fn new(config: CompactorConfig, llm: &'a dyn LlmClient, estimator: TokenEstimator) -> Self {
        Self { config, llm, estimator }
    }

    /// Index, within `active_messages`, before which everything gets summarized.
    fn split_point(&self, active: &[Message]) -> Result<usize, CompactionError> {
        let mut seen_user = 0usize;
        for (idx, m) in active.iter().enumerate().rev() {
            if m.role == Role::User {
                seen_user += 1;
                if seen_user == self.config.keep_recent_turns {
                    return Ok(idx);
                }
            }
        }
        if active.len() > 1 {
            return Ok(active.len() - 1);
        }
        Err(CompactionError::NotEnoughMessages)
    }

    fn truncate_content(content: &str) -> String {
        let chars: Vec<char> = content.chars().collect();
        if chars.len() <= CONTENT_TRUNCATE_THRESHOLD {
            return content.to_string();
        }
        let head: String = chars.iter().take(TRUNCATE_HEAD_RUNES).collect();
        let tail: String = chars[chars.len() - TRUNCATE_TAIL_RUNES..].iter().collect();
        format!("{head}...[truncated]...{tail}")
    }

    fn serialize_message(m: &Message) -> String {
        let role = format!("{:?}", m.role).to_lowercase();
        let mut line = format!("[{role}]: {}", Self::truncate_content(&m.content));
        if let Some(calls) = &m.tool_calls {
            for call in calls {
                let args: String = call.arguments.chars().take(ARG_TRUNCATE_CHARS).collect();
                line.push_str(&format!("\n  {}({})", call.name, args));
            }
        }
        line
    }

    fn build_summary_prompt(prior_summary: Option<&str>, messages: &[Message]) -> Vec<Message> {
        let mut body = String::new();
        if let Some(prior) = prior_summary {
            body.push_str("Prior summary:\n");
            body.push_str(prior);
            body.push_str("\n\n");
        }
        body.push_str("Conversation:\n");
        for m in messages {
            body.push_str(&Self::serialize_message(m));
            body.push('\n');
        }
        vec![Message::system(SUMMARIZER_SYSTEM_PROMPT), Message::user(body)]
    }

    async fn summarize_single(&self, prior_summary: Option<&str>, messages: &[Message]) -> String {
        let prompt = Self::build_summary_prompt(prior_summary, messages);
        match self.llm.generate(&prompt).await {
            Ok(response) => response.content,
            Err(_) => "[Summary of messages could not be generated]".to_string(),
        }
    }

    fn chunk_by_budget(&self, messages: &[Message], chunk_budget: u32) -> Vec<Vec<Message>> {
        let mut chunks = Vec::new();
        let mut current = Vec::new();
        let mut current_tokens = 0u32;
        for m in messages {
            let cost = self.estimator.estimate_message(m);
            if !current.is_empty() && current_tokens + cost > chunk_budget {
                chunks.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            current_tokens += cost;
            current.push(m.clone());
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Binary-searches the longest prefix of `text` whose estimated token cost
    /// fits `budget`, so a verbose summarizer response can't blow past the
    /// summary budget spec.md §4.6 allots it.
    fn truncate_to_budget(&self, text: &str, budget: u32) -> String {
        if self.estimator.estimate_str(text) <= budget {
            return text.to_string();
        }
        let chars: Vec<char> = text.chars().collect();
        let mut lo = 0usize;
        let mut hi = chars.len();
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            let candidate: String = chars[..mid].iter().collect();
            if self.estimator.estimate_str(&candidate) <= budget {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let mut truncated: String = chars[..lo].iter().collect();
        truncated.push_str("...[truncated]");
        truncated
    }

    async fn merge_summaries(&self, partials: &[String]) -> String {
        let mut body = String::from("Merge the following partial summaries into one coherent summary:\n\n");
        for (i, p) in partials.iter().enumerate() {
            body.push_str(&format!("--- partial {} ---\n{}\n\n", i + 1, p));
        }
        let prompt = vec![Message::system(SUMMARIZER_SYSTEM_PROMPT), Message::user(body)];
        match self.llm.generate(&prompt).await {
            Ok(response) => response.content,
            Err(_) => partials.join("\n\n---\n\n"),
        }
    }

    /// Summarizes `session.active_messages()[..split]` into plain text, choosing the
    /// single-call or chunk-and-merge path by token budget.
    pub async fn compact(&self, session: &Session, usable_tokens: u32) -> Result<CompactionResult, CompactionError> {
        let active = session.active_messages();
        let split = self.split_point(active)?;
        let to_summarize = &active[..split];

        let summary_budget = (usable_tokens / SUMMARY_BUDGET_DIVISOR).max(MIN_SUMMARY_BUDGET);
        let chunk_budget = ((usable_tokens as f32 * CHUNK_BUDGET_RATIO) as u32).max(MIN_CHUNK_BUDGET);

        let total_tokens = self.estimator.estimate_messages(to_summarize);
        let prior = session.compaction.summary.clone();

        let summary = if total_tokens <= chunk_budget {
            self.summarize_single(prior.as_deref(), to_summarize).await
        } else {
            let chunks = self.chunk_by_budget(to_summarize, chunk_budget);
            let total = chunks.len();
            let mut partials = Vec::with_capacity(total);
            let mut running_prior = prior.clone();
            for (i, chunk) in chunks.iter().enumerate() {
                let partial = match self.llm.generate(&Self::build_summary_prompt(running_prior.as_deref(), chunk)).await {
                    Ok(response) => response.content,
                    Err(_) => format!("[Summary of {} messages in chunk {}/{} could not be generated]", chunk.len(), i + 1, total),
                };
                running_prior = Some(partial.clone());
                partials.push(partial);
            }
            self.merge_summaries(&partials).await
        };

        Ok(CompactionResult { summary: self.truncate_to_budget(&summary, summary_budget), split_index: split })
    }

    /// Applies a `CompactionResult` to `session`: summary, advanced `first_kept_index`,
    /// and an incremented `compaction_count`. Persistence is the caller's responsibility.
    pub fn apply(&self, session: &mut Session, result: CompactionResult) {
        session.compaction.summary = Some(result.summary);
        session.compaction.first_kept_index += result.split_index;
        session.compaction.count += 1;
    }
}
