//! Mutator contract: post-assembly transforms applied in priority order (component_design §4.4).
//!
//! A mutator that errors is logged and the previous text is kept — assembly never aborts.

use async_trait::async_trait;

use crate::domain::PromptContext;

#[async_trait]
pub trait Mutator: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> u32;
    async fn mutate(&self, ctx: &PromptContext, text: String) -> Result<String, String>;
}
