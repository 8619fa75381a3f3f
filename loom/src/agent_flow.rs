//! Agent Flow (component_design §4.8, "C8"): the inner tool-calling loop for a
//! single model turn, independent of retry/fallback (that lives in the Turn
//! Executor, C9) and independent of abort/compaction (also the Turn Executor's job).
//!
//! design_notes ("Event streaming vs. callback interop") favors a direct
//! producer-consumer pipeline over a generic graph/node runtime: `AgentFlow` drives
//! the model and tools directly and emits `FlowEvent`s to its caller rather than
//! routing through a compiled graph.

use std::future::Future;
use std::sync::Arc;

use tokio_stream::StreamExt;

use crate::domain::{Message, ToolCall};
use crate::llm::{ChunkStream, LlmClient, LlmError, ToolSpec};
use crate::tool::{Tool, ToolError};

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("model does not support tool calling but tools were requested")]
    ModelNotToolCapable,
    #[error("model error: {0}")]
    Model(#[from] LlmError),
    #[error("exceeded max_steps ({0}) without a final answer")]
    MaxStepsExceeded(u32),
}

/// Events streamed out of one `AgentFlow::run` call.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    TextDelta(String),
    ToolCallStart(ToolCall),
    ToolCallEnd { tool_call_id: String, name: String, content: String },
    /// One full step (a model turn + any tool results) completed.
    StepCompleted,
    /// The flow reached a model response with no further tool calls.
    Finished { final_message: Message },
}

pub struct AgentFlowConfig {
    pub max_steps: u32,
}

impl Default for AgentFlowConfig {
    fn default() -> Self {
        Self { max_steps: 10 }
    }
}

/// Drives one model-turn's worth of tool-calling: stream the model, execute any
/// requested tool calls, feed results back, repeat until the model stops calling
/// tools or `max_steps` is exhausted.
pub struct AgentFlow {
    config: AgentFlowConfig,
    tools: Vec<Arc<dyn Tool>>,
}

impl AgentFlow {
    pub fn new(config: AgentFlowConfig, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { config, tools }
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec { name: t.name().to_string(), description: t.description().to_string(), input_schema: t.parameters_schema() })
            .collect()
    }

    async fn find_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Runs the tool-calling loop against `llm`, appending to `messages` in place
    /// and invoking `on_event` for every streamed event. `on_event` is awaited, so a
    /// caller backed by a bounded channel can block on a full channel instead of
    /// dropping events (design_notes §9: back-pressure throttles stream consumption
    /// rather than an unbounded buffer absorbing it). Returns the final assistant
    /// message once the model stops requesting tools.
    pub async fn run<F, Fut>(&self, llm: &dyn LlmClient, messages: &mut Vec<Message>, mut on_event: F) -> Result<Message, FlowError>
    where
        F: FnMut(FlowEvent) -> Fut,
        Fut: Future<Output = ()>,
    {
        if !self.tools.is_empty() && llm.as_tool_capable().is_none() {
            return Err(FlowError::ModelNotToolCapable);
        }

        for _ in 0..self.config.max_steps {
            let bound = if self.tools.is_empty() {
                None
            } else {
                llm.as_tool_capable().map(|tc| tc.bind_tools(self.tool_specs()))
            };
            let active: &dyn LlmClient = bound.as_deref().unwrap_or(llm);

            let (content, tool_calls) = self.stream_one_turn(active, messages, &mut on_event).await?;

            if tool_calls.is_empty() {
                let final_message = Message::assistant(content);
                on_event(FlowEvent::Finished { final_message: final_message.clone() }).await;
                return Ok(final_message);
            }

            messages.push(Message::assistant_with_tool_calls(content, tool_calls.clone()));

            for call in &tool_calls {
                on_event(FlowEvent::ToolCallStart(call.clone())).await;
                let result = self.execute_tool(call).await;
                on_event(FlowEvent::ToolCallEnd { tool_call_id: call.id.clone(), name: call.name.clone(), content: result.clone() }).await;
                messages.push(Message::tool(call.id.clone(), result));
            }

            on_event(FlowEvent::StepCompleted).await;
        }

        Err(FlowError::MaxStepsExceeded(self.config.max_steps))
    }

    async fn execute_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.find_tool(&call.name).await else {
            return format!("error: {}", ToolError::NotFound(call.name.clone()));
        };
        let args: serde_json::Value = serde_json::from_str(&call.arguments).unwrap_or(serde_json::Value::Null);
        match tool.invoke(args).await {
            Ok(result) => result,
            Err(err) => format!("error: {err}"),
        }
    }

    async fn stream_one_turn<F, Fut>(
        &self,
        llm: &dyn LlmClient,
        messages: &[Message],
        on_event: &mut F,
    ) -> Result<(String, Vec<ToolCall>), FlowError>
    where
        F: FnMut(FlowEvent) -> Fut,
        Fut: Future<Output = ()>,
    {
        let stream: ChunkStream = llm.stream(messages).await?;
        tokio::pin!(stream);

        let mut content = String::new();
        let mut pending: Vec<(Option<String>, Option<String>, String)> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.content_delta {
                if !delta.is_empty() {
                    on_event(FlowEvent::TextDelta(delta.clone())).await;
                }
                content.push_str(&delta);
            }
            for delta in chunk.tool_call_deltas {
                while pending.len() <= delta.index {
                    pending.push((None, None, String::new()));
                }
                let slot = &mut pending[delta.index];
                if let Some(id) = delta.id {
                    slot.0 = Some(id);
                }
                if let Some(name) = delta.name {
                    slot.1 = Some(name);
                }
                if let Some(args) = delta.arguments_delta {
                    slot.2.push_str(&args);
                }
            }
        }

        let tool_calls = pending
            .into_iter()
            .filter_map(|(id, name, arguments)| Some(ToolCall { id: id?, name: name?, arguments }))
            .collect();

        Ok((content, tool_calls))
    }
}
