//! Model provider contract (external_interfaces §6): the core depends on this trait,
//! never on a concrete provider SDK.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domain::{Message, ToolCall};

/// An error from a model provider: either an HTTP status/code, or a message the
/// Fallback Executor can classify by substring (component_design §4.7).
#[derive(Debug, Clone, thiserror::Error)]
#[error("llm error: {message}")]
pub struct LlmError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl LlmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: None, code: None, message: message.into() }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A streamed delta: partial assistant content and/or partial tool-call arguments.
#[derive(Debug, Clone, Default)]
pub struct MessageChunk {
    pub content_delta: Option<String>,
    pub tool_call_deltas: Vec<ToolCallDelta>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments_delta: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

pub type ChunkStream = BoxStream<'static, Result<MessageChunk, LlmError>>;

/// A chat model: `{provider_id, model_id}` bound to `generate`/`stream`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_id(&self) -> &str;
    fn model_id(&self) -> &str;

    async fn generate(&self, messages: &[Message]) -> Result<Message, LlmError>;

    /// Default implementation sends the whole response as one chunk; real providers override.
    async fn stream(&self, messages: &[Message]) -> Result<ChunkStream, LlmError> {
        let response = self.generate(messages).await?;
        let chunk = MessageChunk {
            content_delta: Some(response.content),
            tool_call_deltas: response
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(index, tc)| ToolCallDelta {
                    index,
                    id: Some(tc.id),
                    name: Some(tc.name),
                    arguments_delta: Some(tc.arguments),
                })
                .collect(),
            usage: None,
        };
        Ok(Box::pin(futures::stream::once(async move { Ok(chunk) })))
    }

    /// Capability probe (design_notes: avoid dynamic dispatch on reflection) for the
    /// tool-calling subtype (component_design §4.8).
    fn as_tool_capable(&self) -> Option<&dyn ToolCapable> {
        None
    }
}

/// Subtype supporting tool-schema binding, probed via `LlmClient::as_tool_capable`.
pub trait ToolCapable: LlmClient {
    fn bind_tools(&self, tools: Vec<ToolSpec>) -> Box<dyn LlmClient>;
}

/// Deterministic test double: returns canned responses in order, never errors.
pub struct StubLlm {
    provider: String,
    model: String,
    responses: std::sync::Mutex<std::collections::VecDeque<Message>>,
}

impl StubLlm {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, responses: Vec<Message>) -> Self {
        Self { provider: provider.into(), model: model.into(), responses: std::sync::Mutex::new(responses.into()) }
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    fn provider_id(&self) -> &str {
        &self.provider
    }
    fn model_id(&self) -> &str {
        &self.model
    }
    async fn generate(&self, _messages: &[Message]) -> Result<Message, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::new("StubLlm exhausted"))
    }
}

/// Test double that always fails, for fallback/error-classification tests.
pub struct FailingLlm {
    provider: String,
    model: String,
    error: LlmError,
}

impl FailingLlm {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, error: LlmError) -> Self {
        Self { provider: provider.into(), model: model.into(), error }
    }
}

#[async_trait]
impl LlmClient for FailingLlm {
    fn provider_id(&self) -> &str {
        &self.provider
    }
    fn model_id(&self) -> &str {
        &self.model
    }
    async fn generate(&self, _messages: &[Message]) -> Result<Message, LlmError> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn default_stream_emits_one_chunk_from_generate() {
        let llm = StubLlm::new("openai", "gpt-4", vec![Message::assistant("hello")]);
        let mut stream = llm.stream(&[]).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.content_delta.as_deref(), Some("hello"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stub_exhaustion_is_an_error() {
        let llm = StubLlm::new("openai", "gpt-4", vec![]);
        assert!(llm.generate(&[]).await.is_err());
    }

    #[tokio::test]
    async fn failing_llm_always_errors() {
        let llm = FailingLlm::new("openai", "gpt-4", LlmError::new("boom").with_status(500));
        let err = llm.generate(&[]).await.unwrap_err();
        assert_eq!(err.status, Some(500));
    }

    #[test]
    fn plain_llm_is_not_tool_capable_by_default() {
        let llm = StubLlm::new("openai", "gpt-4", vec![]);
        assert!(llm.as_tool_capable().is_none());
    }
}
