//! Plugin Framework (component_design §4.12, "C12"): capability-probed extension
//! points, per design_notes ("Dynamic dispatch on plugins") rather than runtime
//! reflection — a plugin exposes an `as_*` probe for each capability it supports
//! and callers check for `Some` instead of inspecting a type tag.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Agent, Message};
use crate::prompt::{Mutator, Section};
use crate::tool::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Init,
    Start,
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin {plugin} failed during {stage:?}: {message}")]
    LifecycleFailed { plugin: String, stage: LifecycleStage, message: String },
}

/// A hook event delivered to `HookProvider` plugins around the run lifecycle
/// (component_design §4.11: "before_agent_start" / "agent_end" hooks).
#[derive(Debug, Clone)]
pub enum HookEvent {
    BeforeAgentStart { agent: Agent },
    AgentEnd { agent_id: String, run_id: String, error: Option<String> },
}

/// Mutable data passed to hooks alongside an event (component_design §6 "hook
/// envelope"). `before_agent_start` handlers may append `injected_messages`,
/// which the Context Builder (C5) splices into the turn's message list.
#[derive(Debug, Default)]
pub struct HookEnvelope {
    pub injected_messages: Vec<Message>,
}

/// Base plugin identity and lifecycle; everything else is a capability probe.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&self) -> Result<(), PluginError> {
        Ok(())
    }
    async fn start(&self) -> Result<(), PluginError> {
        Ok(())
    }
    async fn stop(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn as_tool_provider(&self) -> Option<&dyn ToolProvider> {
        None
    }
    fn as_hook_provider(&self) -> Option<&dyn HookProvider> {
        None
    }
    fn as_prompt_provider(&self) -> Option<&dyn PromptProvider> {
        None
    }
    fn as_prompt_mutator_provider(&self) -> Option<&dyn PromptMutatorProvider> {
        None
    }
    fn as_service_provider(&self) -> Option<&dyn ServiceProvider> {
        None
    }
}

pub trait ToolProvider: Send + Sync {
    fn tools(&self) -> Vec<Arc<dyn Tool>>;
}

#[async_trait]
pub trait HookProvider: Send + Sync {
    async fn on_event(&self, event: &HookEvent, envelope: &mut HookEnvelope);
}

pub trait PromptProvider: Send + Sync {
    fn sections(&self) -> Vec<Arc<dyn Section>>;
}

pub trait PromptMutatorProvider: Send + Sync {
    fn mutators(&self) -> Vec<Arc<dyn Mutator>>;
}

/// A named, opaque service slot other plugins or the host can look up by name
/// (component_design §4.12: "service provider slot").
pub trait ServiceProvider: Send + Sync {
    fn service_name(&self) -> &str;
    fn call(&self, method: &str, args: Value) -> Result<Value, PluginError>;
}

/// Registry of loaded plugins, with capability-filtered accessors built by
/// probing each plugin once at registration instead of on every call.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        plugin.init().await.map_err(|e| lifecycle_err(plugin.name(), LifecycleStage::Init, e))?;
        plugin.start().await.map_err(|e| lifecycle_err(plugin.name(), LifecycleStage::Start, e))?;
        self.plugins.push(plugin);
        Ok(())
    }

    pub async fn shutdown(&self) {
        for plugin in &self.plugins {
            if let Err(err) = plugin.stop().await {
                tracing::warn!(plugin = plugin.name(), error = %err, "plugin failed to stop cleanly");
            }
        }
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.plugins.iter().filter_map(|p| p.as_tool_provider()).flat_map(|tp| tp.tools()).collect()
    }

    pub fn sections(&self) -> Vec<Arc<dyn Section>> {
        self.plugins.iter().filter_map(|p| p.as_prompt_provider()).flat_map(|pp| pp.sections()).collect()
    }

    pub fn mutators(&self) -> Vec<Arc<dyn Mutator>> {
        self.plugins.iter().filter_map(|p| p.as_prompt_mutator_provider()).flat_map(|mp| mp.mutators()).collect()
    }

    pub fn find_service(&self, name: &str) -> Option<&dyn ServiceProvider> {
        self.plugins.iter().filter_map(|p| p.as_service_provider()).find(|s| s.service_name() == name)
    }

    /// Dispatches `event` to every hook provider in registration order and
    /// returns whatever `injected_messages` they contributed to the envelope.
    pub async fn dispatch(&self, event: HookEvent) -> Vec<Message> {
        let mut envelope = HookEnvelope::default();
        for hook in self.plugins.iter().filter_map(|p| p.as_hook_provider()) {
            hook.on_event(&event, &mut envelope).await;
        }
        envelope.injected_messages
    }
}

fn lifecycle_err(plugin: &str, stage: LifecycleStage, err: PluginError) -> PluginError {
    match err {
        PluginError::LifecycleFailed { message, .. } => PluginError::LifecycleFailed { plugin: plugin.to_string(), stage, message },
    }
}
