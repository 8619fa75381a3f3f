//! Run: one user→agent interaction within a session (data_model §Run).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub session_id: String,
    pub agent_id: String,
    pub status: RunStatus,
    pub input: String,
    pub output: Option<String>,
    pub usage: Usage,
    pub error: Option<RunError>,
    pub served_by_model: Option<String>,
    pub tool_call_count: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Error returned by an invalid state-machine transition (§4.10).
#[derive(Debug, thiserror::Error)]
#[error("invalid run transition: {from:?} -> attempted terminal/in-progress transition")]
pub struct InvalidTransition {
    pub from: RunStatus,
}

impl Run {
    pub fn new(id: impl Into<String>, session_id: impl Into<String>, agent_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            agent_id: agent_id.into(),
            status: RunStatus::Created,
            input: input.into(),
            output: None,
            usage: Usage::default(),
            error: None,
            served_by_model: None,
            tool_call_count: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// created -> in-progress. Only legal from `Created`.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        if self.status != RunStatus::Created {
            return Err(InvalidTransition { from: self.status });
        }
        self.status = RunStatus::InProgress;
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition { from: self.status });
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self, output: impl Into<String>, usage: Usage) -> Result<(), InvalidTransition> {
        self.output = Some(output.into());
        self.usage = usage;
        self.finish(RunStatus::Completed)
    }

    pub fn fail(&mut self, code: impl Into<String>, message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.error = Some(RunError { code: code.into(), message: message.into() });
        self.finish(RunStatus::Failed)
    }

    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        self.finish(RunStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut r = Run::new("r1", "s1", "a1", "hi");
        r.start().unwrap();
        assert_eq!(r.status, RunStatus::InProgress);
        r.complete("done", Usage::default()).unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert!(r.completed_at.is_some());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut r = Run::new("r1", "s1", "a1", "hi");
        r.start().unwrap();
        r.cancel().unwrap();
        assert!(r.complete("x", Usage::default()).is_err());
        assert!(r.fail("x", "y").is_err());
        assert!(r.cancel().is_err());
    }

    #[test]
    fn start_requires_created() {
        let mut r = Run::new("r1", "s1", "a1", "hi");
        r.start().unwrap();
        assert!(r.start().is_err());
    }
}
