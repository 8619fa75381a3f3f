//! Prompt Pipeline (component_design §4.4, "C4"): ordered, priority-based assembly.

use std::sync::Arc;

use crate::domain::PromptContext;

use super::mutator::Mutator;
use super::section::{passes_mode_filter, Section};
use super::workspace::{DynamicSection, WorkspaceLoader};

pub struct PromptPipeline {
    sections: Vec<Arc<dyn Section>>,
    mutators: Vec<Arc<dyn Mutator>>,
    workspace: Option<Arc<WorkspaceLoader>>,
}

impl Default for PromptPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptPipeline {
    pub fn new() -> Self {
        Self { sections: Vec::new(), mutators: Vec::new(), workspace: None }
    }

    pub fn with_section(mut self, section: Arc<dyn Section>) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_mutator(mut self, mutator: Arc<dyn Mutator>) -> Self {
        self.mutators.push(mutator);
        self
    }

    pub fn with_workspace(mut self, workspace: Arc<WorkspaceLoader>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Renders the final system prompt: builtin and workspace sections are merged
    /// into one priority-sorted list before rendering, so a workspace section
    /// (e.g. IDENTITY.md at 320) lands ahead of a high-priority builtin section
    /// (e.g. the runtime section at 900) rather than always trailing it. Failures
    /// are isolated — logged and skipped — joined with blank lines, trimmed, mutated.
    pub async fn assemble(&self, ctx: &PromptContext) -> String {
        let mut entries: Vec<(u32, String)> = Vec::new();

        for section in &self.sections {
            if !passes_mode_filter(ctx.prompt_mode, section.priority()) {
                continue;
            }
            if !section.enabled(ctx) {
                continue;
            }
            match section.render(ctx).await {
                Ok(text) if text.is_empty() => {}
                Ok(text) => entries.push((section.priority(), text)),
                Err(e) => tracing::warn!(section = section.name(), error = %e, "prompt section failed, skipping"),
            }
        }

        if let Some(workspace) = &self.workspace {
            let dynamic: Vec<DynamicSection> = workspace.sections().await;
            for d in dynamic {
                if passes_mode_filter(ctx.prompt_mode, d.priority) && !d.content.is_empty() {
                    entries.push((d.priority, d.content));
                }
            }
        }

        entries.sort_by_key(|(priority, _)| *priority);
        let pieces: Vec<String> = entries.into_iter().map(|(_, text)| text).collect();
        let mut text = pieces.join("\n\n").trim_end().to_string();

        let mut sorted_mutators: Vec<&Arc<dyn Mutator>> = self.mutators.iter().collect();
        sorted_mutators.sort_by_key(|m| m.priority());
        for mutator in sorted_mutators {
            match mutator.mutate(ctx, text.clone()).await {
                Ok(mutated) => text = mutated,
                Err(e) => tracing::warn!(mutator = mutator.name(), error = %e, "prompt mutator failed, keeping previous text"),
            }
        }

        text
    }
}
