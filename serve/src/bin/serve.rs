//! Process entry point: loads config, wires up in-memory repositories and the
//! model-spec-core resolver chain, and serves `serve::router` over HTTP.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use loom::{
    AgentService, AgentServiceConfig, InMemoryAgentRepository, InMemoryRunRepository, InMemorySessionRepository,
    LlmClient, ModelProvider, PluginRegistry, PromptPipeline,
};
use model_spec_core::{CachedResolver, CompositeResolver, ConfigOverride, LocalFileResolver, ModelLimitResolver, ModelsDevResolver};

/// No provider SDK is wired in by default (external_interfaces §5: the core never
/// depends on a concrete provider SDK). A real deployment constructs its own
/// `ModelProvider` here, mapping agent `primary_model`/`fallback_models` ids to
/// whatever SDK clients it holds.
struct UnconfiguredModelProvider;

impl ModelProvider for UnconfiguredModelProvider {
    fn resolve(&self, model_id: &str) -> Option<Arc<dyn LlmClient>> {
        tracing::warn!(model_id, "no model provider configured; every run will fail over and exhaust");
        None
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// `ConfigOverride -> LocalFileResolver -> ModelsDevResolver` (the network
/// source wrapped in a cache so repeated runs don't refetch on every turn).
fn build_window_resolver() -> Arc<dyn ModelLimitResolver> {
    let mut sources: Vec<Arc<dyn ModelLimitResolver>> = Vec::new();
    if let Some(context_limit) = env::var("LOOM_CONTEXT_WINDOW_OVERRIDE").ok().and_then(|v| v.parse::<u32>().ok()) {
        sources.push(Arc::new(ConfigOverride::new(context_limit)));
    }
    if let Ok(path) = env::var("LOOM_MODEL_SPECS_FILE") {
        sources.push(Arc::new(LocalFileResolver::new(path)));
    }
    sources.push(Arc::new(CachedResolver::new(ModelsDevResolver::new())));
    Arc::new(CompositeResolver::new(sources))
}

fn default_prompt_pipeline() -> Arc<PromptPipeline> {
    use loom::prompt::{ClusterAwarenessSection, IdentitySection, RuntimeSection, ToolingSection};
    Arc::new(
        PromptPipeline::new()
            .with_section(Arc::new(IdentitySection))
            .with_section(Arc::new(ClusterAwarenessSection))
            .with_section(Arc::new(ToolingSection))
            .with_section(Arc::new(RuntimeSection { version: env!("CARGO_PKG_VERSION").to_string() })),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = config::load_and_apply("loom", None);
    init_tracing();

    let service = AgentService::new(
        Arc::new(InMemoryAgentRepository::default()),
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(InMemoryRunRepository::default()),
        Arc::new(UnconfiguredModelProvider),
        build_window_resolver(),
        Arc::new(PluginRegistry::new()),
        default_prompt_pipeline(),
        AgentServiceConfig::default(),
    );

    let app = serve::router(service);

    let port: u16 = env::var("LOOM_SERVE_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "loom-serve listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
