//! Cached fetch client with shared rate limiting.

use super::cache::{CacheStats, ResponseCache};
use super::error::FetchError;
use super::rate_limiter::RateLimiter;
use super::transport::{ReqwestTransport, Transport};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Tuning knobs for [`CachedClient`]
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Age after which a cached response is refetched
    pub freshness: Duration,
    /// Whether responses are cached at all
    pub cache_enabled: bool,
    /// Average request rate and burst size; None disables the limiter
    pub rate_limit: Option<(f64, u32)>,
    /// Optional per-minute quota on top of the per-second rate
    pub requests_per_minute: Option<u32>,
    /// Fixed pause after each network fetch
    pub post_fetch_pause: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(300),
            cache_enabled: true,
            rate_limit: Some((3.0, 1)),
            requests_per_minute: None,
            post_fetch_pause: None,
        }
    }
}

impl FetchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            freshness: config.cache_freshness(),
            cache_enabled: config.cache.enabled,
            rate_limit: Some((config.rate_limit.requests_per_second, config.rate_limit.burst)),
            requests_per_minute: config.rate_limit.requests_per_minute,
            post_fetch_pause: config.post_fetch_pause(),
        }
    }
}

/// Fetches JSON from the upstream, serving repeated URLs from memory
///
/// A cache hit returns the stored payload immediately. A miss waits for the
/// shared rate limiter, performs the request, caches successful responses
/// and optionally pauses before returning. Failed responses are never cached
/// and nothing is retried.
pub struct CachedClient {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    rate_limiter: Option<RateLimiter>,
    post_fetch_pause: Option<Duration>,
}

impl CachedClient {
    /// Create a client over any transport
    pub fn new(transport: Arc<dyn Transport>, settings: FetchSettings) -> Self {
        let rate_limiter = settings.rate_limit.map(|(per_second, burst)| {
            let limiter = RateLimiter::new(per_second, burst);
            match settings.requests_per_minute {
                Some(per_minute) => limiter.with_per_minute(per_minute),
                None => limiter,
            }
        });

        Self {
            transport,
            cache: ResponseCache::new(settings.freshness, settings.cache_enabled),
            rate_limiter,
            post_fetch_pause: settings.post_fetch_pause,
        }
    }

    /// Create a client that talks to the network with settings from config
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.upstream.user_agent, config.request_timeout())
            .context("Failed to build HTTP transport")?;
        Ok(Self::new(Arc::new(transport), FetchSettings::from_config(config)))
    }

    /// Fetch a URL and return the parsed JSON payload
    pub async fn get_json(&self, url: &str) -> Result<Arc<Value>, FetchError> {
        if let Some(payload) = self.cache.get(url) {
            return Ok(payload);
        }

        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        debug!(url = %url, "Making API request");
        let response = self.transport.get(url).await.map_err(|e| {
            warn!(url = %url, error = %e, "Request error");
            e
        })?;

        if !response.is_success() {
            warn!(url = %url, status = response.status, "Request failed");
            return Err(FetchError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }

        let payload: Value = serde_json::from_slice(&response.body).map_err(|source| {
            warn!(url = %url, error = %source, "Failed to parse response");
            FetchError::Parse {
                url: url.to_string(),
                source,
            }
        })?;

        let payload = Arc::new(payload);
        self.cache.insert(url, Arc::clone(&payload));

        if let Some(pause) = self.post_fetch_pause {
            sleep(pause).await;
        }

        debug!(url = %url, "Request successful");
        Ok(payload)
    }

    /// Fetch a URL and decode it into `T`
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let payload = self.get_json(url).await?;
        T::deserialize(payload.as_ref()).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::transport::HttpResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Transport returning canned responses and counting calls per URL
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        routes: Mutex<HashMap<String, (u16, String)>>,
        calls: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
        latency: Option<Duration>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Transport whose responses take `latency` to arrive
        pub(crate) fn with_latency(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                latency: Some(latency),
                ..Self::default()
            })
        }

        pub(crate) fn respond(&self, url: &str, status: u16, body: impl Into<String>) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.into()));
        }

        pub(crate) fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

            if let Some(latency) = self.latency {
                sleep(latency).await;
            }

            let route = self.routes.lock().unwrap().get(url).cloned();
            match route {
                Some((status, body)) => Ok(HttpResponse {
                    status,
                    body: Bytes::from(body),
                }),
                None => Err(FetchError::network(url, "connection refused")),
            }
        }
    }

    /// Settings without any throttling, for tests that only care about caching
    pub(crate) fn unthrottled() -> FetchSettings {
        FetchSettings {
            rate_limit: None,
            ..FetchSettings::default()
        }
    }

    const TOP_URL: &str = "https://api.jikan.moe/v4/top/anime?page=1";

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_is_served_from_cache() {
        let transport = FakeTransport::new();
        transport.respond(TOP_URL, 200, r#"{"data":[{"mal_id":1}]}"#);
        let client = CachedClient::new(transport.clone(), unthrottled());

        let first = client.get_json(TOP_URL).await.unwrap();
        let second = client.get_json(TOP_URL).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.calls(TOP_URL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_refetched() {
        let transport = FakeTransport::new();
        transport.respond(TOP_URL, 200, r#"{"data":[]}"#);
        let client = CachedClient::new(transport.clone(), unthrottled());

        client.get_json(TOP_URL).await.unwrap();
        let first_capture = client.cache().fetched_at(TOP_URL).unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        client.get_json(TOP_URL).await.unwrap();

        assert_eq!(transport.calls(TOP_URL), 2);
        assert!(client.cache().fetched_at(TOP_URL).unwrap() > first_capture);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_is_not_cached() {
        let url = "https://api.jikan.moe/v4/anime/0/full";
        let transport = FakeTransport::new();
        transport.respond(url, 404, r#"{"status":404,"message":"Resource does not exist"}"#);
        let client = CachedClient::new(transport.clone(), unthrottled());

        let err = client.get_json(url).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(client.cache().fetched_at(url).is_none());

        // Not cached, so the next call goes to the network again
        let err = client.get_json(url).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.calls(url), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_surfaces_status() {
        let transport = FakeTransport::new();
        transport.respond(TOP_URL, 503, "Service Unavailable");
        let client = CachedClient::new(transport.clone(), unthrottled());

        let err = client.get_json(TOP_URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_and_parse_errors() {
        let transport = FakeTransport::new();
        transport.respond(TOP_URL, 200, "<html>maintenance</html>");
        let client = CachedClient::new(transport.clone(), unthrottled());

        let err = client.get_json(TOP_URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
        assert!(client.cache().fetched_at(TOP_URL).is_none());

        let err = client.get_json("https://unrouted.invalid/").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_fetch_pause_applies_only_to_misses() {
        let transport = FakeTransport::new();
        transport.respond(TOP_URL, 200, r#"{"data":[{"mal_id":1},{"mal_id":2}]}"#);
        let settings = FetchSettings {
            post_fetch_pause: Some(Duration::from_millis(350)),
            ..unthrottled()
        };
        let client = CachedClient::new(transport.clone(), settings);

        let start = Instant::now();
        let first = client.get_json(TOP_URL).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(350));
        assert_eq!(first["data"].as_array().unwrap().len(), 2);

        let start = Instant::now();
        let second = client.get_json(TOP_URL).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.total_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_misses_but_not_hits() {
        let transport = FakeTransport::new();
        let urls: Vec<String> = (1..=3)
            .map(|page| format!("https://api.jikan.moe/v4/top/anime?page={}", page))
            .collect();
        for url in &urls {
            transport.respond(url, 200, r#"{"data":[]}"#);
        }
        let client = CachedClient::new(transport.clone(), FetchSettings::default());

        let start = Instant::now();
        for url in &urls {
            client.get_json(url).await.unwrap();
        }
        // 3 per second with no burst: the third miss waits two intervals
        assert!(start.elapsed() >= Duration::from_millis(660));

        let start = Instant::now();
        for url in &urls {
            client.get_json(url).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(transport.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_misses_both_fetch() {
        let transport = FakeTransport::with_latency(Duration::from_millis(100));
        transport.respond(TOP_URL, 200, r#"{"data":[]}"#);
        let client = CachedClient::new(transport.clone(), unthrottled());

        let (a, b) = tokio::join!(client.get_json(TOP_URL), client.get_json(TOP_URL));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.calls(TOP_URL), 2);
    }

    #[derive(Debug, Deserialize)]
    struct Envelope {
        data: Vec<u32>,
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_get() {
        let transport = FakeTransport::new();
        transport.respond(TOP_URL, 200, r#"{"data":[1,2,3]}"#);
        let client = CachedClient::new(transport.clone(), unthrottled());

        let envelope: Envelope = client.get(TOP_URL).await.unwrap();
        assert_eq!(envelope.data, vec![1, 2, 3]);

        let err = client.get::<Vec<String>>(TOP_URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert_eq!(transport.calls(TOP_URL), 1);
    }

    #[test]
    fn test_client_from_config() {
        let client = CachedClient::from_config(&Config::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_settings_from_config_legacy_pause() {
        let settings = FetchSettings::from_config(&Config::default());
        assert_eq!(settings.post_fetch_pause, None);
        assert_eq!(settings.rate_limit, Some((3.0, 1)));

        let mut config = Config::default();
        config.rate_limit.post_fetch_pause_ms = Some(350);
        let settings = FetchSettings::from_config(&config);
        assert_eq!(settings.post_fetch_pause, Some(Duration::from_millis(350)));
    }

    #[test]
    fn test_client_from_config_rejects_zero_rate() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.0;

        let err = CachedClient::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("requests_per_second"));
    }
}
