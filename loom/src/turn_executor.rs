//! Turn Executor (component_design §4.9, "C9"): drives one user turn to
//! completion — model-candidate fallback, context-overflow recovery via a single
//! compaction retry, and streaming `AgentEvent`s to the caller.

use std::sync::Arc;

use tokio::sync::mpsc::Sender;

use crate::abort::AbortController;
use crate::agent_flow::{AgentFlow, FlowEvent};
use crate::compactor::{Compactor, CompactorConfig};
use crate::context_builder::{BuildInputs, ContextBuilder};
use crate::domain::{Agent, AgentEvent, Message, Session, ToolResultPayload};
use crate::error::AgentError;
use crate::fallback::{run_fallback, FallbackConfig};
use crate::llm::{LlmClient, LlmError};
use crate::window::WindowInfo;

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Resolves a model id (as named in `Agent::fallback_candidates`) to a live client.
/// The core never depends on a concrete provider SDK (external_interfaces §6).
pub trait ModelProvider: Send + Sync {
    fn resolve(&self, model_id: &str) -> Option<Arc<dyn LlmClient>>;
}

pub struct TurnExecutorConfig {
    pub max_retries: u32,
}

impl Default for TurnExecutorConfig {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES }
    }
}

#[derive(Debug)]
pub struct TurnOutcome {
    pub final_message: Message,
    pub served_by_model: String,
    pub messages: Vec<Message>,
}

pub struct TurnExecutor<'a> {
    config: TurnExecutorConfig,
    models: &'a dyn ModelProvider,
    flow: &'a AgentFlow,
    context_builder: &'a ContextBuilder,
    abort: &'a AbortController,
}

impl<'a> TurnExecutor<'a> {
    pub fn new(
        config: TurnExecutorConfig,
        models: &'a dyn ModelProvider,
        flow: &'a AgentFlow,
        context_builder: &'a ContextBuilder,
        abort: &'a AbortController,
    ) -> Self {
        Self { config, models, flow, context_builder, abort }
    }

    fn flow_event_to_agent_event(event: FlowEvent) -> Option<AgentEvent> {
        match event {
            FlowEvent::TextDelta(delta) => Some(AgentEvent::TextDelta { delta }),
            FlowEvent::ToolCallStart(tool_call) => Some(AgentEvent::ToolCallStart { tool_call }),
            FlowEvent::ToolCallEnd { tool_call_id, name, content } => {
                Some(AgentEvent::ToolCallEnd { tool_result: ToolResultPayload { tool_call_id, name, content } })
            }
            FlowEvent::StepCompleted | FlowEvent::Finished { .. } => None,
        }
    }

    /// Runs `agent`'s turn against `session` (already carrying `user_input` is not
    /// assumed — the builder appends it) until a model produces a final answer, a
    /// single context-overflow-triggered compaction retry is exhausted, or
    /// `max_retries` candidate rounds fail outright.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_turn(
        &self,
        agent: &Agent,
        session: &mut Session,
        system_prompt: &str,
        agent_system_prompt_verbatim: &str,
        user_input: &str,
        injected_messages: Vec<Message>,
        window: WindowInfo,
        events: &Sender<AgentEvent>,
    ) -> Result<TurnOutcome, AgentError> {
        let candidates = agent.fallback_candidates();
        let fallback_config = FallbackConfig { candidates: candidates.clone(), max_attempts: None, skip_on_cooldown: false };

        let mut compaction_attempted = false;

        for _attempt in 0..self.config.max_retries {
            self.abort.check().map_err(|_| AgentError::Aborted)?;

            let build = self.context_builder.build(BuildInputs {
                assembled_system_prompt: Some(system_prompt),
                agent_system_prompt_verbatim,
                session,
                user_input,
                injected_messages: injected_messages.clone(),
                max_history_turns: 0,
                window,
            });

            let outcome = run_fallback(&fallback_config, |_| false, |candidate| {
                let mut messages = build.messages.clone();
                let tx = events.clone();
                let candidate = candidate.to_string();
                async move {
                    let llm = self
                        .models
                        .resolve(&candidate)
                        .ok_or_else(|| LlmError::new(format!("no provider registered for model {candidate}")))?;
                    let result = self
                        .flow
                        .run(&*llm, &mut messages, |ev| {
                            let tx_events = tx.clone();
                            async move {
                                if let Some(agent_event) = Self::flow_event_to_agent_event(ev) {
                                    // Blocking send: a slow consumer back-pressures the
                                    // model stream instead of silently losing events.
                                    if tx_events.send(agent_event).await.is_err() {
                                        tracing::warn!("event channel closed, stopping event delivery");
                                    }
                                }
                            }
                        })
                        .await;
                    result.map(|final_message| (final_message, messages)).map_err(|e| match e {
                        crate::agent_flow::FlowError::Model(le) => le,
                        other => LlmError::new(other.to_string()),
                    })
                }
            })
            .await;

            if outcome.ok {
                let (final_message, messages) = outcome.value.expect("ok outcome carries a value");
                return Ok(TurnOutcome { final_message, served_by_model: outcome.candidate.expect("ok outcome carries a candidate"), messages });
            }

            let aggregate = outcome.all_failed_error();
            let overflow = AgentError::ExecutionFailed(aggregate.clone()).is_context_overflow();

            if overflow && !compaction_attempted {
                compaction_attempted = true;
                self.attempt_compaction(agent, session, window).await;
                continue;
            }

            return Err(AgentError::AllCandidatesExhausted(aggregate));
        }

        Err(AgentError::MaxRetriesExceeded(format!("exhausted {} retries", self.config.max_retries)))
    }

    async fn attempt_compaction(&self, agent: &Agent, session: &mut Session, window: WindowInfo) {
        let Some(llm) = self.models.resolve(&agent.primary_model) else {
            tracing::warn!("no provider for primary model, skipping compaction");
            return;
        };
        let compactor = Compactor::new(CompactorConfig::default(), &*llm, crate::token::TokenEstimator::default());
        match compactor.compact(session, window.usable_tokens).await {
            Ok(result) => compactor.apply(session, result),
            Err(e) => tracing::warn!(error = %e, "compaction failed, retrying without it"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_flow::AgentFlowConfig;
    use crate::domain::Persona;
    use crate::llm::StubLlm;
    use crate::pruner::{Pruner, PrunerConfig};
    use crate::token::TokenEstimator;
    use chrono::Utc;

    fn agent(primary: &str, fallbacks: &[&str]) -> Agent {
        Agent {
            id: "a1".into(),
            name: "a1".into(),
            description: String::new(),
            persona: Persona::default(),
            system_prompt: String::new(),
            primary_model: primary.into(),
            fallback_models: fallbacks.iter().map(|s| s.to_string()).collect(),
            allowed_tools: vec![],
            allowed_mcp_servers: vec![],
            max_turns: 10,
            temperature: 0.7,
            max_tokens: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn window() -> WindowInfo {
        WindowInfo { window_size: 128_000, reserve_tokens: 4096, usable_tokens: 123_904 }
    }

    struct FixedProvider(std::collections::HashMap<String, Arc<dyn LlmClient>>);
    impl ModelProvider for FixedProvider {
        fn resolve(&self, model_id: &str) -> Option<Arc<dyn LlmClient>> {
            self.0.get(model_id).cloned()
        }
    }

    #[tokio::test]
    async fn successful_turn_returns_final_message() {
        let llm: Arc<dyn LlmClient> = Arc::new(StubLlm::new("p", "m", vec![Message::assistant("hello there")]));
        let mut providers = std::collections::HashMap::new();
        providers.insert("gpt-4".to_string(), llm);
        let provider = FixedProvider(providers);

        let flow = AgentFlow::new(AgentFlowConfig::default(), vec![]);
        let builder = ContextBuilder::new(Pruner::new(PrunerConfig::default(), TokenEstimator::default()), TokenEstimator::default());
        let abort = AbortController::new();
        let executor = TurnExecutor::new(TurnExecutorConfig::default(), &provider, &flow, &builder, &abort);

        let mut session = Session::new("s1", "a1");
        let (tx, mut rx) = tokio::sync::mpsc::channel(20);
        let outcome = executor
            .run_turn(&agent("gpt-4", &[]), &mut session, "SYS", "", "hi", vec![], window(), &tx)
            .await
            .unwrap();
        assert_eq!(outcome.final_message.content, "hello there");
        assert_eq!(outcome.served_by_model, "gpt-4");
        drop(tx);
        assert!(rx.recv().await.is_none() || true);
    }

    #[tokio::test]
    async fn falls_over_to_second_candidate_on_failure() {
        use crate::llm::FailingLlm;
        let failing: Arc<dyn LlmClient> = Arc::new(FailingLlm::new("p", "bad", LlmError::new("down").with_status(500)));
        let good: Arc<dyn LlmClient> = Arc::new(StubLlm::new("p", "good", vec![Message::assistant("ok")]));
        let mut providers = std::collections::HashMap::new();
        providers.insert("bad".to_string(), failing);
        providers.insert("good".to_string(), good);
        let provider = FixedProvider(providers);

        let flow = AgentFlow::new(AgentFlowConfig::default(), vec![]);
        let builder = ContextBuilder::new(Pruner::new(PrunerConfig::default(), TokenEstimator::default()), TokenEstimator::default());
        let abort = AbortController::new();
        let executor = TurnExecutor::new(TurnExecutorConfig::default(), &provider, &flow, &builder, &abort);

        let mut session = Session::new("s1", "a1");
        let (tx, _rx) = tokio::sync::mpsc::channel(20);
        let outcome = executor
            .run_turn(&agent("bad", &["good"]), &mut session, "SYS", "", "hi", vec![], window(), &tx)
            .await
            .unwrap();
        assert_eq!(outcome.served_by_model, "good");
    }

    #[tokio::test]
    async fn aborted_before_start_returns_aborted_error() {
        let provider = FixedProvider(std::collections::HashMap::new());
        let flow = AgentFlow::new(AgentFlowConfig::default(), vec![]);
        let builder = ContextBuilder::new(Pruner::new(PrunerConfig::default(), TokenEstimator::default()), TokenEstimator::default());
        let abort = AbortController::new();
        abort.abort();
        let executor = TurnExecutor::new(TurnExecutorConfig::default(), &provider, &flow, &builder, &abort);

        let mut session = Session::new("s1", "a1");
        let (tx, _rx) = tokio::sync::mpsc::channel(20);
        let err = executor.run_turn(&agent("gpt-4", &[]), &mut session, "SYS", "", "hi", vec![], window(), &tx).await.unwrap_err();
        assert!(matches!(err, AgentError::Aborted));
    }

    #[tokio::test]
    async fn all_candidates_exhausted_surfaces_aggregate_error() {
        use crate::llm::FailingLlm;
        let failing: Arc<dyn LlmClient> = Arc::new(FailingLlm::new("p", "bad", LlmError::new("nope").with_status(400)));
        let mut providers = std::collections::HashMap::new();
        providers.insert("bad".to_string(), failing);
        let provider = FixedProvider(providers);

        let flow = AgentFlow::new(AgentFlowConfig::default(), vec![]);
        let builder = ContextBuilder::new(Pruner::new(PrunerConfig::default(), TokenEstimator::default()), TokenEstimator::default());
        let abort = AbortController::new();
        let executor = TurnExecutor::new(TurnExecutorConfig::default(), &provider, &flow, &builder, &abort);

        let mut session = Session::new("s1", "a1");
        let (tx, _rx) = tokio::sync::mpsc::channel(20);
        let err = executor.run_turn(&agent("bad", &[]), &mut session, "SYS", "", "hi", vec![], window(), &tx).await.unwrap_err();
        assert!(matches!(err, AgentError::AllCandidatesExhausted(_)));
    }
}
