//! Agent Runner + `AgentService` facade (component_design §4.11, "C11"): the
//! single entry point `serve`/`cli` drive — agent/session/run CRUD plus
//! `start_run`, which wires C1-C10 and the Plugin Framework together and
//! streams `AgentEvent`s back over a bounded channel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use model_spec_core::ModelLimitResolver;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::abort::AbortController;
use crate::agent_flow::{AgentFlow, AgentFlowConfig};
use crate::compactor::{Compactor, CompactorConfig};
use crate::context_builder::ContextBuilder;
use crate::domain::{Agent, AgentEvent, Message, PromptContext, Run, Session, ToolSource, ToolSummary, Usage};
use crate::error::AgentError;
use crate::plugin::{HookEvent, PluginRegistry};
use crate::prompt::PromptPipeline;
use crate::pruner::{Pruner, PrunerConfig};
use crate::repository::{AgentRepository, RepositoryError, RunRepository, SessionRepository};
use crate::token::TokenEstimator;
use crate::tool::ToolRegistry;
use crate::turn_executor::{ModelProvider, TurnExecutor, TurnExecutorConfig};
use crate::window::WindowGuard;

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 20;
/// Fraction of usable context at which the next turn proactively compacts,
/// ahead of hitting the hard overflow path in the Turn Executor.
const PROACTIVE_COMPACTION_THRESHOLD: f32 = 0.8;

pub struct AgentServiceConfig {
    pub event_channel_capacity: usize,
    pub runtime_version: String,
    pub timezone: String,
}

impl Default for AgentServiceConfig {
    fn default() -> Self {
        Self { event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY, runtime_version: env!("CARGO_PKG_VERSION").to_string(), timezone: "UTC".to_string() }
    }
}

/// Splits a `provider/model` id; bare ids resolve under the `"default"` provider.
fn split_model_id(model_id: &str) -> (&str, &str) {
    match model_id.split_once('/') {
        Some((provider, model)) => (provider, model),
        None => ("default", model_id),
    }
}

impl From<RepositoryError> for AgentError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound { id, .. } => AgentError::NotFound(id),
            RepositoryError::AlreadyExists { id, .. } => AgentError::Validation(format!("already exists: {id}")),
        }
    }
}

pub struct AgentService {
    agents: Arc<dyn AgentRepository>,
    sessions: Arc<dyn SessionRepository>,
    runs: Arc<dyn RunRepository>,
    models: Arc<dyn ModelProvider>,
    window_resolver: Arc<dyn ModelLimitResolver>,
    plugins: Arc<PluginRegistry>,
    prompt_pipeline: Arc<PromptPipeline>,
    tools: ToolRegistry,
    config: AgentServiceConfig,
    active_aborts: RwLock<HashMap<String, AbortController>>,
}

impl AgentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        sessions: Arc<dyn SessionRepository>,
        runs: Arc<dyn RunRepository>,
        models: Arc<dyn ModelProvider>,
        window_resolver: Arc<dyn ModelLimitResolver>,
        plugins: Arc<PluginRegistry>,
        prompt_pipeline: Arc<PromptPipeline>,
        config: AgentServiceConfig,
    ) -> Arc<Self> {
        let mut tools = ToolRegistry::new();
        for tool in plugins.tools() {
            tools.register(tool);
        }
        Arc::new(Self { agents, sessions, runs, models, window_resolver, plugins, prompt_pipeline, tools, config, active_aborts: RwLock::new(HashMap::new()) })
    }

    pub async fn create_agent(&self, agent: Agent) -> Result<Agent, AgentError> {
        Ok(self.agents.create(agent).await?)
    }

    pub async fn get_agent(&self, id: &str) -> Result<Agent, AgentError> {
        Ok(self.agents.get(id).await?)
    }

    pub async fn update_agent(&self, mut agent: Agent) -> Result<Agent, AgentError> {
        agent.updated_at = Utc::now();
        Ok(self.agents.update(agent).await?)
    }

    pub async fn delete_agent(&self, id: &str) -> Result<(), AgentError> {
        Ok(self.agents.delete(id).await?)
    }

    pub async fn list_agents(&self) -> Vec<Agent> {
        self.agents.list().await
    }

    pub async fn create_session(&self, agent_id: &str) -> Result<Session, AgentError> {
        self.agents.get(agent_id).await?;
        let session = Session::new(Uuid::new_v4().to_string(), agent_id);
        Ok(self.sessions.create(session).await?)
    }

    pub async fn get_session(&self, id: &str) -> Result<Session, AgentError> {
        Ok(self.sessions.get(id).await?)
    }

    pub async fn delete_session(&self, id: &str) -> Result<(), AgentError> {
        Ok(self.sessions.delete(id).await?)
    }

    pub async fn list_sessions(&self, agent_id: &str) -> Vec<Session> {
        self.sessions.list_by_agent(agent_id).await
    }

    pub async fn get_run(&self, id: &str) -> Result<Run, AgentError> {
        Ok(self.runs.get(id).await?)
    }

    pub async fn list_runs(&self, session_id: &str) -> Vec<Run> {
        self.runs.list_by_session(session_id).await
    }

    /// Cancels an in-flight run by id; a no-op if the run already finished.
    pub async fn cancel_run(&self, run_id: &str) {
        if let Some(abort) = self.active_aborts.read().await.get(run_id) {
            abort.abort();
        }
    }

    /// Starts a run: loads agent/session, fires `before_agent_start`, and spawns
    /// the turn loop in the background. Returns the `Created` run immediately and
    /// a receiver that will carry exactly one terminal event before closing.
    pub async fn start_run(self: &Arc<Self>, agent_id: &str, session_id: Option<String>, input: String) -> Result<(Run, mpsc::Receiver<AgentEvent>), AgentError> {
        let agent = self.agents.get(agent_id).await?;

        let session = match session_id {
            Some(id) => self.sessions.get(&id).await?,
            None => self.sessions.create(Session::new(Uuid::new_v4().to_string(), agent_id)).await?,
        };

        let injected_messages = self.plugins.dispatch(HookEvent::BeforeAgentStart { agent: agent.clone() }).await;

        let mut run = Run::new(Uuid::new_v4().to_string(), session.id.clone(), agent.id.clone(), input.clone());
        run.start().map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
        let run = self.runs.create(run).await?;

        let (tx, rx) = mpsc::channel(self.config.event_channel_capacity);
        let abort = AbortController::new();
        self.active_aborts.write().await.insert(run.id.clone(), abort.clone());

        let service = Arc::clone(self);
        let run_id = run.id.clone();
        let cleanup_run_id = run_id.clone();
        let abort_for_task = abort.clone();
        tokio::spawn(async move {
            let cleanup_service = Arc::clone(&service);
            service.execute_run(agent, session, run_id, input, injected_messages, tx, abort_for_task).await;
            cleanup_service.active_aborts.write().await.remove(&cleanup_run_id);
        });

        Ok((run, rx))
    }

    fn tool_summaries(&self, agent: &Agent) -> Vec<ToolSummary> {
        self.tools
            .filtered(&agent.allowed_tools)
            .into_iter()
            .map(|t| ToolSummary { name: t.name().to_string(), description: t.description().to_string(), source: ToolSource::Plugin })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_run(
        self: Arc<Self>,
        agent: Agent,
        mut session: Session,
        run_id: String,
        input: String,
        injected_messages: Vec<Message>,
        tx: mpsc::Sender<AgentEvent>,
        abort: AbortController,
    ) {
        let _ = tx.send(AgentEvent::run_status("in_progress")).await;

        let (provider_id, model_id) = split_model_id(&agent.primary_model);
        let window = WindowGuard::new(&*self.window_resolver, None).resolve(provider_id, model_id, agent.max_tokens).await;

        let tools = self.tools.filtered(&agent.allowed_tools);
        let ctx = PromptContext {
            agent_summary: agent.system_prompt.clone(),
            session_id: session.id.clone(),
            prompt_mode: agent.persona.prompt_mode,
            worker_nodes: vec![],
            now: Utc::now(),
            timezone: self.config.timezone.clone(),
            model_name: agent.primary_model.clone(),
            tools: self.tool_summaries(&agent),
            extra: Default::default(),
        };
        let system_prompt = self.prompt_pipeline.assemble(&ctx).await;

        let flow = AgentFlow::new(AgentFlowConfig { max_steps: agent.max_turns.max(1) }, tools);
        let context_builder = ContextBuilder::new(Pruner::new(PrunerConfig::default(), TokenEstimator::default()), TokenEstimator::default());
        let executor = TurnExecutor::new(TurnExecutorConfig::default(), self.models.as_ref(), &flow, &context_builder, &abort);

        let result = executor
            .run_turn(&agent, &mut session, &system_prompt, &agent.system_prompt, &input, injected_messages, window, &tx)
            .await;

        let mut run = match self.runs.get(&run_id).await {
            Ok(run) => run,
            Err(_) => return,
        };

        match result {
            Ok(outcome) => {
                session.append(Message::user(input));
                session.append(outcome.final_message.clone());
                self.maybe_proactive_compact(&agent, &mut session, window).await;
                let _ = self.sessions.save(session).await;

                let _ = run.complete(outcome.final_message.content.clone(), Usage::default());
                let _ = self.runs.save(run).await;

                let _ = tx.send(AgentEvent::Done { usage: Usage::default() }).await;
                self.plugins.dispatch(HookEvent::AgentEnd { agent_id: agent.id.clone(), run_id: run_id.clone(), error: None }).await;
            }
            Err(err) => {
                let status = if matches!(err, AgentError::Aborted) { "cancelled" } else { "failed" };
                if status == "cancelled" {
                    let _ = run.cancel();
                } else {
                    let _ = run.fail(error_code(&err), err.to_string());
                }
                let _ = self.runs.save(run).await;

                let _ = tx.send(AgentEvent::run_status_with_error(status, err.to_string())).await;
                self.plugins
                    .dispatch(HookEvent::AgentEnd { agent_id: agent.id.clone(), run_id: run_id.clone(), error: Some(err.to_string()) })
                    .await;
            }
        }
    }

    async fn maybe_proactive_compact(&self, agent: &Agent, session: &mut Session, window: crate::window::WindowInfo) {
        let estimator = TokenEstimator::default();
        let used = estimator.estimate_messages(session.active_messages());
        if (used as f32) < window.usable_tokens as f32 * PROACTIVE_COMPACTION_THRESHOLD {
            return;
        }
        let Some(llm) = self.models.resolve(&agent.primary_model) else {
            return;
        };
        let compactor = Compactor::new(CompactorConfig::default(), &*llm, estimator);
        if let Ok(result) = compactor.compact(session, window.usable_tokens).await {
            compactor.apply(session, result);
        }
    }
}

fn error_code(err: &AgentError) -> &'static str {
    match err {
        AgentError::NotFound(_) => "not_found",
        AgentError::Validation(_) => "validation",
        AgentError::ContextOverflow(_) => "context_overflow",
        AgentError::ModelNotToolCapable(_) => "model_not_tool_capable",
        AgentError::AllCandidatesExhausted(_) => "all_candidates_exhausted",
        AgentError::Aborted => "aborted",
        AgentError::Timeout => "timeout",
        AgentError::MaxRetriesExceeded(_) => "max_retries_exceeded",
        AgentError::ExecutionFailed(_) => "execution_failed",
    }
}
