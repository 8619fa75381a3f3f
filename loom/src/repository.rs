//! Repositories (component_design §4.11, data access for the Agent Runner):
//! CRUD over `Agent`, `Session`, `Run`. Traits so the runner stays persistence
//! agnostic; in-memory implementations here are what `serve`/`cli` wire up for a
//! single-process deployment (external_interfaces: no storage collaborator is
//! mandated, only these shapes).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Agent, Run, Session};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn create(&self, agent: Agent) -> Result<Agent, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Agent, RepositoryError>;
    async fn update(&self, agent: Agent) -> Result<Agent, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
    async fn list(&self) -> Vec<Agent>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: Session) -> Result<Session, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Session, RepositoryError>;
    async fn save(&self, session: Session) -> Result<Session, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
    async fn list_by_agent(&self, agent_id: &str) -> Vec<Session>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn create(&self, run: Run) -> Result<Run, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Run, RepositoryError>;
    async fn save(&self, run: Run) -> Result<Run, RepositoryError>;
    async fn list_by_session(&self, session_id: &str) -> Vec<Run>;
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<String, Agent>>,
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn create(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(&agent.id) {
            return Err(RepositoryError::AlreadyExists { kind: "agent", id: agent.id });
        }
        agents.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    async fn get(&self, id: &str) -> Result<Agent, RepositoryError> {
        self.agents.read().await.get(id).cloned().ok_or_else(|| RepositoryError::NotFound { kind: "agent", id: id.to_string() })
    }

    async fn update(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let mut agents = self.agents.write().await;
        if !agents.contains_key(&agent.id) {
            return Err(RepositoryError::NotFound { kind: "agent", id: agent.id });
        }
        agents.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.agents.write().await.remove(id).map(|_| ()).ok_or_else(|| RepositoryError::NotFound { kind: "agent", id: id.to_string() })
    }

    async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: Session) -> Result<Session, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(RepositoryError::AlreadyExists { kind: "session", id: session.id });
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Session, RepositoryError> {
        self.sessions.read().await.get(id).cloned().ok_or_else(|| RepositoryError::NotFound { kind: "session", id: id.to_string() })
    }

    async fn save(&self, session: Session) -> Result<Session, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(RepositoryError::NotFound { kind: "session", id: session.id });
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.sessions.write().await.remove(id).map(|_| ()).ok_or_else(|| RepositoryError::NotFound { kind: "session", id: id.to_string() })
    }

    async fn list_by_agent(&self, agent_id: &str) -> Vec<Session> {
        self.sessions.read().await.values().filter(|s| s.agent_id == agent_id).cloned().collect()
    }
}

#[derive(Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<HashMap<String, Run>>,
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn create(&self, run: Run) -> Result<Run, RepositoryError> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&run.id) {
            return Err(RepositoryError::AlreadyExists { kind: "run", id: run.id });
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn get(&self, id: &str) -> Result<Run, RepositoryError> {
        self.runs.read().await.get(id).cloned().ok_or_else(|| RepositoryError::NotFound { kind: "run", id: id.to_string() })
    }

    async fn save(&self, run: Run) -> Result<Run, RepositoryError> {
        let mut runs = self.runs.write().await;
        if !runs.contains_key(&run.id) {
            return Err(RepositoryError::NotFound { kind: "run", id: run.id });
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn list_by_session(&self, session_id: &str) -> Vec<Run> {
        self.runs.read().await.values().filter(|r| r.session_id == session_id).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Agent, Persona};
    use chrono::Utc;

    fn agent(id: &str) -> Agent {
        Agent {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            persona: Persona::default(),
            system_prompt: String::new(),
            primary_model: "gpt-4".into(),
            fallback_models: vec![],
            allowed_tools: vec![],
            allowed_mcp_servers: vec![],
            max_turns: 10,
            temperature: 0.7,
            max_tokens: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = InMemoryAgentRepository::default();
        repo.create(agent("a1")).await.unwrap();
        assert_eq!(repo.get("a1").await.unwrap().id, "a1");
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let repo = InMemoryAgentRepository::default();
        repo.create(agent("a1")).await.unwrap();
        assert!(matches!(repo.create(agent("a1")).await, Err(RepositoryError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn update_missing_fails() {
        let repo = InMemoryAgentRepository::default();
        assert!(matches!(repo.update(agent("missing")).await, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_removes_from_list() {
        let repo = InMemoryAgentRepository::default();
        repo.create(agent("a1")).await.unwrap();
        repo.delete("a1").await.unwrap();
        assert!(repo.list().await.is_empty());
    }

    #[tokio::test]
    async fn session_list_by_agent_filters() {
        let repo = InMemorySessionRepository::default();
        repo.create(Session::new("s1", "a1")).await.unwrap();
        repo.create(Session::new("s2", "a2")).await.unwrap();
        assert_eq!(repo.list_by_agent("a1").await.len(), 1);
    }

    #[tokio::test]
    async fn run_list_by_session_filters() {
        let repo = InMemoryRunRepository::default();
        repo.create(Run::new("r1", "s1", "a1", "hi")).await.unwrap();
        repo.create(Run::new("r2", "s2", "a1", "hi")).await.unwrap();
        assert_eq!(repo.list_by_session("s1").await.len(), 1);
    }
}
