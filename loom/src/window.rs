//! Context Window Guard (component_design §4.3, "C3"): resolve a model's budget.

use model_spec_core::{ModelLimitResolver, ModelSpec};

const HARD_DEFAULT_WINDOW: u32 = 200_000;
const WINDOW_FLOOR: u32 = 16_000;
const LOW_WINDOW_WARNING: u32 = 32_000;
const DEFAULT_RESERVE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    pub window_size: u32,
    pub reserve_tokens: u32,
    pub usable_tokens: u32,
}

pub struct WindowGuard<'a> {
    resolver: &'a dyn ModelLimitResolver,
    configured_default_window: Option<u32>,
}

impl<'a> WindowGuard<'a> {
    pub fn new(resolver: &'a dyn ModelLimitResolver, configured_default_window: Option<u32>) -> Self {
        Self { resolver, configured_default_window }
    }

    /// Priority: model metadata window -> configured default -> hard default (200_000).
    /// Window is floored at 16_000 (clamped up, logged); below 32_000 warns.
    /// `reserve_tokens` defaults to 4096 or the model's configured max output,
    /// clamped to at most `window/2`.
    pub async fn resolve(&self, provider_id: &str, model_id: &str, configured_max_output: Option<u32>) -> WindowInfo {
        let spec: Option<ModelSpec> = self.resolver.resolve(provider_id, model_id).await;

        let mut window = spec
            .as_ref()
            .map(|s| s.context_limit)
            .or(self.configured_default_window)
            .unwrap_or(HARD_DEFAULT_WINDOW);

        if window < WINDOW_FLOOR {
            tracing::warn!(window, floor = WINDOW_FLOOR, "context window below floor, clamping up");
            window = WINDOW_FLOOR;
        } else if window < LOW_WINDOW_WARNING {
            tracing::warn!(window, "context window is unusually small");
        }

        let raw_reserve = configured_max_output.or_else(|| spec.as_ref().map(|s| s.output_limit)).unwrap_or(DEFAULT_RESERVE);
        let reserve_tokens = raw_reserve.min(window / 2);

        WindowInfo { window_size: window, reserve_tokens, usable_tokens: window.saturating_sub(reserve_tokens) }
    }
}
