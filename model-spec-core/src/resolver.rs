//! `ModelLimitResolver`: a source of model token limits, queried by provider + model id.

use async_trait::async_trait;

use crate::spec::ModelSpec;

#[async_trait]
pub trait ModelLimitResolver: Send + Sync {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec>;
}
