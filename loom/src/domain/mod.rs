//! Data model: Agent, Session, Message, Run, AgentEvent, PromptContext (data_model).

pub mod agent;
pub mod event;
pub mod message;
pub mod prompt_context;
pub mod run;
pub mod session;

pub use agent::{Agent, Persona, PromptMode};
pub use event::{AgentEvent, ToolResultPayload};
pub use message::{Message, Role, ToolCall};
pub use prompt_context::{PromptContext, ToolSource, ToolSummary};
pub use run::{InvalidTransition, Run, RunError, RunStatus, Usage};
pub use session::{CompactionState, Session};
