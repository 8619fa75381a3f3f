//! Config-supplied override: highest priority in the resolver chain.

use async_trait::async_trait;

use crate::resolver::ModelLimitResolver;
use crate::spec::ModelSpec;

const DEFAULT_OUTPUT_LIMIT: u32 = 64_000;

/// A fixed model spec configured by the operator, bypassing lookup entirely.
pub struct ConfigOverride {
    context_limit: u32,
    output_limit: u32,
}

impl ConfigOverride {
    pub fn new(context_limit: u32) -> Self {
        Self { context_limit, output_limit: DEFAULT_OUTPUT_LIMIT }
    }

    pub fn with_output_limit(mut self, output_limit: u32) -> Self {
        self.output_limit = output_limit;
        self
    }
}

#[async_trait]
impl ModelLimitResolver for ConfigOverride {
    async fn resolve(&self, _provider_id: &str, _model_id: &str) -> Option<ModelSpec> {
        Some(ModelSpec::new(self.context_limit, self.output_limit))
    }
}
