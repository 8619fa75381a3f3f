//! Priority-ordered chain of resolvers: first non-`None` wins (context_window_guard §4.3).

use async_trait::async_trait;
use std::sync::Arc;

use crate::resolver::ModelLimitResolver;
use crate::spec::ModelSpec;

pub struct CompositeResolver {
    sources: Vec<Arc<dyn ModelLimitResolver>>,
}

impl CompositeResolver {
    pub fn new(sources: Vec<Arc<dyn ModelLimitResolver>>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: Arc<dyn ModelLimitResolver>) {
        self.sources.push(source);
    }
}

#[async_trait]
impl ModelLimitResolver for CompositeResolver {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        for source in &self.sources {
            if let Some(spec) = source.resolve(provider_id, model_id).await {
                return Some(spec);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_override::ConfigOverride;

    struct NoneResolver;
    #[async_trait]
    impl ModelLimitResolver for NoneResolver {
        async fn resolve(&self, _p: &str, _m: &str) -> Option<ModelSpec> {
            None
        }
    }

    #[tokio::test]
    async fn config_override_takes_priority() {
        let composite = CompositeResolver::new(vec![
            Arc::new(ConfigOverride::new(50_000)),
            Arc::new(NoneResolver),
        ]);
        let spec = composite.resolve("openai", "gpt-4").await.unwrap();
        assert_eq!(spec.context_limit, 50_000);
    }

    #[tokio::test]
    async fn falls_through_to_next_source() {
        let composite = CompositeResolver::new(vec![Arc::new(NoneResolver), Arc::new(ConfigOverride::new(8_000))]);
        let spec = composite.resolve("openai", "gpt-4").await.unwrap();
        assert_eq!(spec.context_limit, 8_000);
    }

    #[tokio::test]
    async fn empty_chain_resolves_to_none() {
        let composite = CompositeResolver::new(vec![]);
        assert!(composite.resolve("openai", "gpt-4").await.is_none());
    }
}
