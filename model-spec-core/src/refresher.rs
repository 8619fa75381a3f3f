//! Background refresher: periodically refetches models.dev into a `CachedResolver`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cached::CachedResolver;
use crate::models_dev::ModelsDevResolver;

pub struct ResolverRefresher {
    cached: Arc<CachedResolver<ModelsDevResolver>>,
    interval: Duration,
}

impl ResolverRefresher {
    pub fn new(cached: Arc<CachedResolver<ModelsDevResolver>>, interval: Duration) -> Self {
        Self { cached, interval }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Ok(specs) = self.cached.inner().fetch_all().await {
                    self.cached.refresh(specs).await;
                    tracing::debug!("model_spec cache refreshed from models.dev");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models_dev::HttpClient;
    use crate::resolver::ModelLimitResolver;

    struct CountingHttpClient {
        body: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for CountingHttpClient {
        async fn get(&self, _url: &str) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn spawn_refreshes_periodically_and_can_be_aborted() {
        let client = Arc::new(CountingHttpClient {
            body: r#"{"zai":{"models":{"glm-5":{"limit":{"context":204800,"output":131072}}}}}"#.into(),
            calls: AtomicUsize::new(0),
        });
        let resolver = ModelsDevResolver::with_client("https://example.com/models.json".into(), client.clone());
        let cached = Arc::new(CachedResolver::new(resolver));
        let refresher = ResolverRefresher::new(cached.clone(), Duration::from_millis(10));

        let handle = refresher.spawn();
        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.abort();
        let _ = handle.await;

        assert!(client.calls.load(Ordering::SeqCst) >= 1);
        let spec = cached.resolve("zai", "glm-5").await.unwrap();
        assert_eq!(spec.context_limit, 204_800);
    }
}
