//! # Loom
//!
//! Loom is the Hivemind agent run orchestrator: it turns one user message plus
//! an agent definition into a streamed, retried, context-budgeted model run.
//!
//! ## Design principles
//!
//! - **Closed sum-type classification over reflection.** The Fallback Executor
//!   classifies provider failures into a fixed [`fallback::FailoverReason`] enum;
//!   the Plugin Framework probes capabilities via `as_*` methods instead of
//!   runtime type inspection.
//! - **Direct pipeline over graph/callback interop.** The Agent Flow drives the
//!   model and tools directly and streams [`agent_flow::FlowEvent`]s to its
//!   caller; there is no compiled-graph runtime between them.
//! - **Deterministic budget management.** The Context Pruner and Compactor are
//!   pure functions of message history and a token budget — no hidden state.
//!
//! ## Main modules
//!
//! - [`domain`]: [`Agent`], [`Session`], [`Message`], [`Run`], [`AgentEvent`], [`PromptContext`].
//! - [`token`]: [`token::TokenEstimator`] (C1).
//! - [`pruner`]: [`pruner::Pruner`] (C2).
//! - [`window`]: [`window::WindowGuard`] (C3), backed by `model_spec_core`.
//! - [`prompt`]: [`prompt::PromptPipeline`] and builtin [`prompt::Section`]s (C4).
//! - [`context_builder`]: [`context_builder::ContextBuilder`] (C5).
//! - [`compactor`]: [`compactor::Compactor`] (C6).
//! - [`fallback`]: [`fallback::run_fallback`], [`fallback::FailoverReason`] (C7).
//! - [`llm`]: [`llm::LlmClient`] contract.
//! - [`tool`]: [`tool::Tool`] contract and [`tool::ToolRegistry`].
//! - [`agent_flow`]: [`agent_flow::AgentFlow`] (C8).
//! - [`turn_executor`]: [`turn_executor::TurnExecutor`] (C9).
//! - [`abort`]: [`abort::AbortController`] (C10).
//! - [`repository`]: in-memory [`repository::AgentRepository`]/[`repository::SessionRepository`]/[`repository::RunRepository`].
//! - [`plugin`]: [`plugin::Plugin`], [`plugin::PluginRegistry`] (C12).
//! - [`agent_runner`]: [`agent_runner::AgentService`] (C11) — the facade `serve`/`cli` drive.
//!
//! Key types are re-exported at crate root: `use loom::{AgentService, Agent, Session, AgentEvent};`.

pub mod abort;
pub mod agent_flow;
pub mod agent_runner;
pub mod compactor;
pub mod context_builder;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod plugin;
pub mod prompt;
pub mod pruner;
pub mod repository;
pub mod token;
pub mod tool;
pub mod turn_executor;
pub mod window;

pub use abort::{AbortController, Aborted};
pub use agent_flow::{AgentFlow, AgentFlowConfig, FlowError, FlowEvent};
pub use agent_runner::{AgentService, AgentServiceConfig};
pub use compactor::{CompactionError, CompactionResult, Compactor, CompactorConfig};
pub use context_builder::{BuildInputs, BuildOutput, ContextBuilder};
pub use domain::{Agent, AgentEvent, Message, Persona, PromptContext, PromptMode, Role, Run, RunStatus, Session, ToolCall};
pub use error::AgentError;
pub use fallback::{run_fallback, FailoverReason, FallbackConfig, FallbackOutcome};
pub use llm::{LlmClient, LlmError, TokenUsage};
pub use plugin::{HookEvent, Plugin, PluginError, PluginRegistry};
pub use prompt::PromptPipeline;
pub use pruner::{PruneCounts, Pruner, PrunerConfig};
pub use repository::{
    AgentRepository, InMemoryAgentRepository, InMemoryRunRepository, InMemorySessionRepository, RepositoryError,
    RunRepository, SessionRepository,
};
pub use token::TokenEstimator;
pub use tool::{Tool, ToolError, ToolRegistry};
pub use turn_executor::{ModelProvider, TurnExecutor, TurnExecutorConfig, TurnOutcome};
pub use window::{WindowGuard, WindowInfo};

/// When running `cargo test -p loom`, initializes tracing from `RUST_LOG` so that
/// unit tests in `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
