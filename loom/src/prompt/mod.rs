//! Prompt Pipeline (component_design §4.4, "C4").

pub mod mutator;
pub mod pipeline;
pub mod section;
pub mod workspace;

pub use mutator::Mutator;
pub use pipeline::PromptPipeline;
pub use section::{
    passes_mode_filter, ClusterAwarenessSection, IdentitySection, PersonaSection, RuntimeSection, Section,
    ToolingSection,
};
pub use workspace::{DynamicSection, WorkspaceLoader};
