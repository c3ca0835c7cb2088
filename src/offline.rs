//! Network-first offline cache in front of the canteen site.
//!
//! Same-origin GETs for static and navigational content go to the network
//! first; successful responses are stored under the request URL in the
//! current cache generation, and served from there when the network fails.
//! Dynamic paths are never cached.

use crate::errors::ClientError;
use async_trait::async_trait;
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Bumping the generation invalidates every older cache on activation.
pub const CACHE_GENERATION: &str = "campusbites-v4";
pub const OFFLINE_PAGE: &str = "/offline/";
pub const PRECACHE: [&str; 4] = ["/", "/static/css/style.css", "/static/manifest.json", OFFLINE_PAGE];

const DYNAMIC_PATHS: [&str; 4] = ["/chat/", "/place-order/", "/cart/", "/api/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = (status, self.body).into_response();
        if let Some(value) = self
            .content_type
            .and_then(|value| HeaderValue::from_str(&value).ok())
        {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        response
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    /// Top-level page load rather than a subresource.
    pub navigation: bool,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            navigation: false,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            navigation: true,
            ..Self::get(url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled here; the caller talks to the network directly.
    Bypass,
    Network(CachedResponse),
    Cache(CachedResponse),
    OfflinePage(CachedResponse),
    /// Network down and nothing cached.
    Unavailable,
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CachedResponse, ClientError>;
}

#[derive(Debug, Clone, Default)]
pub struct UpstreamNetwork {
    client: Client,
}

impl UpstreamNetwork {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for UpstreamNetwork {
    async fn fetch(&self, url: &str) -> Result<CachedResponse, ClientError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        Ok(CachedResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Named caches keyed by request URL.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: BTreeMap<String, HashMap<String, CachedResponse>>,
}

impl CacheStorage {
    pub fn put(&mut self, cache: &str, url: &str, response: CachedResponse) {
        self.caches
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response);
    }

    /// Looks `url` up across every cache, in name order.
    pub fn lookup(&self, url: &str) -> Option<&CachedResponse> {
        self.caches.values().find_map(|entries| entries.get(url))
    }

    pub fn names(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    pub fn delete(&mut self, cache: &str) -> bool {
        self.caches.remove(cache).is_some()
    }

    pub fn len(&self, cache: &str) -> usize {
        self.caches.get(cache).map_or(0, HashMap::len)
    }
}

/// Paths whose content changes per request and must always hit the network.
pub fn is_dynamic(url: &str) -> bool {
    DYNAMIC_PATHS.iter().any(|path| url.contains(path))
        || (url.contains("/menu/") && !url.contains("/static/"))
}

pub struct OfflineWorker<N> {
    origin: String,
    generation: String,
    network: N,
    storage: Mutex<CacheStorage>,
}

impl<N: Network> OfflineWorker<N> {
    pub fn new(origin: impl Into<String>, network: N) -> Self {
        Self::with_storage(origin, network, CacheStorage::default())
    }

    pub fn with_storage(origin: impl Into<String>, network: N, storage: CacheStorage) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            generation: CACHE_GENERATION.to_string(),
            network,
            storage: Mutex::new(storage),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn storage(&self) -> &Mutex<CacheStorage> {
        &self.storage
    }

    pub fn absolute(&self, path: &str) -> String {
        format!("{}{path}", self.origin)
    }

    pub fn handles(&self, request: &FetchRequest) -> bool {
        request.method == Method::GET
            && request.url.starts_with(&self.origin)
            && !is_dynamic(&request.url)
    }

    /// Pre-populates the current generation. Nothing is stored unless every
    /// asset was fetched successfully.
    pub async fn install(&self) -> Result<usize, ClientError> {
        let mut fetched = Vec::with_capacity(PRECACHE.len());
        for path in PRECACHE {
            let url = self.absolute(path);
            let response = self.network.fetch(&url).await.inspect_err(|err| {
                warn!(%url, "precache failed: {err}");
            })?;
            if !(200..300).contains(&response.status) {
                warn!(%url, status = response.status, "precache failed");
                return Err(ClientError::Status(response.status));
            }
            fetched.push((url, response));
        }

        let mut storage = self.storage.lock().await;
        let count = fetched.len();
        for (url, response) in fetched {
            storage.put(&self.generation, &url, response);
        }
        info!(cache = %self.generation, count, "static assets cached");
        Ok(count)
    }

    /// Drops every cache that is not the current generation.
    pub async fn activate(&self) -> Vec<String> {
        let mut storage = self.storage.lock().await;
        let stale: Vec<String> = storage
            .names()
            .into_iter()
            .filter(|name| *name != self.generation)
            .collect();
        for name in &stale {
            storage.delete(name);
            info!(cache = %name, "old cache deleted");
        }
        stale
    }

    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        if !self.handles(request) {
            return FetchOutcome::Bypass;
        }

        match self.network.fetch(&request.url).await {
            Ok(response) => {
                if response.status == 200 {
                    self.storage
                        .lock()
                        .await
                        .put(&self.generation, &request.url, response.clone());
                }
                FetchOutcome::Network(response)
            }
            Err(err) => {
                debug!(url = %request.url, "network failed, trying cache: {err}");
                let storage = self.storage.lock().await;
                if let Some(cached) = storage.lookup(&request.url) {
                    return FetchOutcome::Cache(cached.clone());
                }
                if request.navigation {
                    if let Some(page) = storage.lookup(&self.absolute(OFFLINE_PAGE)) {
                        return FetchOutcome::OfflinePage(page.clone());
                    }
                }
                FetchOutcome::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const ORIGIN: &str = "http://canteen.test";

    #[derive(Default)]
    struct FakeNetwork {
        offline: AtomicBool,
        fetches: AtomicUsize,
        pages: std::sync::Mutex<HashMap<String, CachedResponse>>,
    }

    impl FakeNetwork {
        fn serving(paths: &[&str]) -> Self {
            let network = Self::default();
            for path in paths {
                network.pages.lock().unwrap().insert(
                    format!("{ORIGIN}{path}"),
                    CachedResponse::ok("text/plain", format!("body of {path}")),
                );
            }
            network
        }
    }

    #[async_trait]
    impl Network for FakeNetwork {
        async fn fetch(&self, url: &str) -> Result<CachedResponse, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(ClientError::Transport("offline".to_string()));
            }
            Ok(self
                .pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or(CachedResponse {
                    status: 404,
                    content_type: None,
                    body: Vec::new(),
                }))
        }
    }

    fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    #[test]
    fn dynamic_paths_are_detected() {
        assert!(is_dynamic("/menu/42"));
        assert!(is_dynamic("/api/orders/"));
        assert!(is_dynamic("/cart/add/"));
        assert!(!is_dynamic("/static/menu/hero.png"));
        assert!(!is_dynamic("/static/css/style.css"));
        assert!(!is_dynamic("/offline/"));
    }

    #[tokio::test]
    async fn menu_requests_bypass_cache_online_and_offline() {
        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::serving(&["/menu/42"]));
        let request = FetchRequest::navigate(url("/menu/42"));

        assert_eq!(worker.fetch(&request).await, FetchOutcome::Bypass);
        worker.network.offline.store(true, Ordering::SeqCst);
        assert_eq!(worker.fetch(&request).await, FetchOutcome::Bypass);

        assert_eq!(worker.network.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(worker.storage.lock().await.len(CACHE_GENERATION), 0);
    }

    #[tokio::test]
    async fn cached_static_asset_served_when_offline() {
        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::serving(&["/static/css/style.css"]));
        let request = FetchRequest::get(url("/static/css/style.css"));

        let online = worker.fetch(&request).await;
        assert!(matches!(online, FetchOutcome::Network(_)));

        worker.network.offline.store(true, Ordering::SeqCst);
        match worker.fetch(&request).await {
            FetchOutcome::Cache(response) => {
                assert_eq!(response.body, b"body of /static/css/style.css".to_vec());
            }
            other => panic!("expected cached response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_get_and_cross_origin_are_bypassed() {
        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::default());
        let post = FetchRequest {
            method: Method::POST,
            ..FetchRequest::get(url("/static/app.js"))
        };
        let foreign = FetchRequest::get("https://cdn.example.com/chart.js");

        assert_eq!(worker.fetch(&post).await, FetchOutcome::Bypass);
        assert_eq!(worker.fetch(&foreign).await, FetchOutcome::Bypass);
    }

    #[tokio::test]
    async fn error_responses_are_not_cached() {
        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::default());
        let request = FetchRequest::get(url("/static/missing.js"));

        match worker.fetch(&request).await {
            FetchOutcome::Network(response) => assert_eq!(response.status, 404),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(worker.storage.lock().await.len(CACHE_GENERATION), 0);
    }

    #[tokio::test]
    async fn navigation_miss_falls_back_to_offline_page() {
        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::serving(&PRECACHE));
        worker.install().await.unwrap();
        worker.network.offline.store(true, Ordering::SeqCst);

        let page = worker.fetch(&FetchRequest::navigate(url("/orders/history/"))).await;
        assert!(matches!(page, FetchOutcome::OfflinePage(_)));

        let asset = worker.fetch(&FetchRequest::get(url("/static/js/app.js"))).await;
        assert_eq!(asset, FetchOutcome::Unavailable);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::serving(&["/", "/offline/"]));
        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, ClientError::Status(404)));
        assert_eq!(worker.storage.lock().await.len(CACHE_GENERATION), 0);

        let worker = OfflineWorker::new(ORIGIN, FakeNetwork::serving(&PRECACHE));
        assert_eq!(worker.install().await.unwrap(), PRECACHE.len());
    }

    #[test]
    fn lookup_searches_caches_in_name_order() {
        let mut storage = CacheStorage::default();
        storage.put("campusbites-v4", &url("/"), CachedResponse::ok("text/html", "v4"));
        storage.put("campusbites-v10", &url("/"), CachedResponse::ok("text/html", "v10"));

        assert_eq!(storage.lookup(&url("/")).unwrap().body, b"v10".to_vec());
        assert!(storage.lookup(&url("/missing")).is_none());
    }

    #[tokio::test]
    async fn activate_removes_other_generations() {
        let mut storage = CacheStorage::default();
        storage.put("campusbites-v3", &url("/"), CachedResponse::ok("text/html", "old"));
        storage.put(CACHE_GENERATION, &url("/"), CachedResponse::ok("text/html", "new"));
        let worker = OfflineWorker::with_storage(ORIGIN, FakeNetwork::default(), storage);

        let deleted = worker.activate().await;

        assert_eq!(deleted, vec!["campusbites-v3".to_string()]);
        let storage = worker.storage.lock().await;
        assert_eq!(storage.names(), vec![CACHE_GENERATION.to_string()]);
        assert_eq!(storage.lookup(&url("/")).unwrap().body, b"new".to_vec());
    }
}
