//! Network transport used by the strategies.
//!
//! ### Requests
//! - `InterceptRequest` carries method, absolute URL and request mode.
//! - Only the method and URL reach the wire; mode only drives classification.
//!
//! ### Responses
//! - The body is read once into `Bytes` and returned as a `ResponseSnapshot`.
//! - Non-2xx statuses are returned, not raised; callers decide whether to cache.
//! - Transport errors map to `NetworkFailure`, timeouts to `NetworkTimeout`.
//! - Max redirects: 5

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use reqwest::Method;

pub use self::url::{UrlError, canonicalize, resolve_path, same_origin};

use waystation_core::{Error, ResponseSnapshot};

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    #[default]
    SameOrigin,
    NoCors,
    Cors,
}

/// A read request leaving the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptRequest {
    pub method: Method,
    pub url: ::url::Url,
    pub mode: RequestMode,
}

impl InterceptRequest {
    pub fn new(method: Method, url: ::url::Url, mode: RequestMode) -> Self {
        Self { method, url, mode }
    }

    /// Plain GET, as issued for manifest and refresh fetches.
    pub fn get(url: ::url::Url) -> Self {
        Self::new(Method::GET, url, RequestMode::SameOrigin)
    }

    pub fn navigate(url: ::url::Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    /// Tier key for this request.
    pub fn key(&self) -> waystation_core::cache::hash::RequestKey {
        waystation_core::cache::hash::RequestKey::new(self.method.as_str(), &self.url)
    }
}

/// Something that can perform a network fetch.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "waystation/0.1")
    pub user_agent: String,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "waystation/0.1".to_string(), timeout: Duration::from_millis(10_000), max_redirects: 5 }
    }
}

impl From<&waystation_core::AppConfig> for FetchConfig {
    fn from(config: &waystation_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// `Network` backed by reqwest.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn map_transport_error(err: &reqwest::Error, url: &::url::Url) -> Error {
    if err.is_timeout() {
        Error::NetworkTimeout(format!("{url}: {err}"))
    } else {
        Error::NetworkFailure(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .send()
            .await
            .map_err(|e| map_transport_error(&e, &request.url))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(&e, &request.url))?;

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            content_type = headers
                .iter()
                .find(|(k, _)| k == header::CONTENT_TYPE.as_str())
                .map(|(_, v)| v.as_str())
                .unwrap_or(""),
            "fetched in {}ms",
            start.elapsed().as_millis()
        );

        Ok(ResponseSnapshot {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            stored_at: None,
        })
    }
}
