//! Fetch/cache strategies.
//!
//! | Classification | Strategy                     | Write tier |
//! |----------------|------------------------------|------------|
//! | `api`          | network first, cache on fail | api        |
//! | `navigation`   | network first, 3-level fallback | dynamic |
//! | `other`        | cache first, network on miss | dynamic    |
//! | `excluded`     | passthrough                  | none       |
//!
//! Every network attempt is bounded by the configured timeout; an elapsed
//! attempt is handled exactly like a transport failure.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use waystation_core::{CacheDb, Error, ResponseSnapshot, TierSet, cache::hash::RequestKey};

use crate::classify::{Classification, RouteTable};
use crate::fetch::{InterceptRequest, Network, resolve_path};

/// Body of the 503 returned when a navigation has nothing to fall back to.
pub const NAVIGATION_OFFLINE_BODY: &str = "Offline";

/// Body of the 503 returned when a static asset is neither cached nor reachable.
pub const ASSET_OFFLINE_BODY: &str = "Resource not available offline";

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The designated fallback page stood in for a missing navigation.
    Fallback,
    /// Synthesized 503.
    Offline,
}

/// A response produced by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
    pub classification: Classification,
}

/// Result of running a request through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// The engine declined the request; send it unmodified.
    Passthrough,
    Respond(Served),
}

/// Executes the three strategies against the tier store.
pub struct StrategyEngine {
    db: CacheDb,
    network: Arc<dyn Network>,
    tiers: TierSet,
    routes: RouteTable,
    fallback_url: Url,
    timeout: Duration,
}

impl StrategyEngine {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, tiers: TierSet, routes: RouteTable, fallback_url: Url,
        timeout: Duration,
    ) -> Self {
        Self { db, network, tiers, routes, fallback_url, timeout }
    }

    /// Build an engine from the application configuration.
    pub fn from_config(
        config: &waystation_core::AppConfig, db: CacheDb, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let routes = RouteTable::from_config(config).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let fallback_url =
            resolve_path(routes.origin(), &config.fallback_route).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(db, network, config.tier_set(), routes, fallback_url, config.timeout()))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    /// Classify a request and serve it with the matching strategy.
    ///
    /// # Errors
    ///
    /// Only `api` requests can fail: when the network is unreachable and no
    /// tier holds a copy, the network error is returned to the caller.
    pub async fn handle(&self, request: &InterceptRequest) -> Result<Interception, Error> {
        let classification = self.routes.classify_request(request);
        tracing::trace!(url = %request.url, %classification, "classified request");

        let (response, source) = match classification {
            Classification::Excluded => return Ok(Interception::Passthrough),
            Classification::Api => self.network_first_with_cache(request, self.tiers.api_tier()).await?,
            Classification::Navigation => self.network_first_with_fallback(request).await,
            Classification::Other => self.cache_first_with_network(request).await,
        };

        Ok(Interception::Respond(Served { response, source, classification }))
    }

    /// Network first; on transport failure serve any cached copy.
    pub async fn network_first_with_cache(
        &self, request: &InterceptRequest, tier: &str,
    ) -> Result<(ResponseSnapshot, ResponseSource), Error> {
        let key = request.key();
        match self.attempt(request).await {
            Ok(response) => {
                self.store_if_ok(tier, &key, &response).await;
                Ok((response, ResponseSource::Network))
            }
            Err(err) => match self.lookup(&key.key).await {
                Some(cached) => {
                    tracing::debug!(url = %request.url, error = %err, "network failed, serving cached copy");
                    Ok((cached, ResponseSource::Cache))
                }
                None => {
                    tracing::debug!(url = %request.url, error = %err, "network failed and no cached copy");
                    Err(err)
                }
            },
        }
    }

    /// Network first into the dynamic tier.
    ///
    /// On failure falls back to an exact cached match, then to the fallback
    /// page, then to a synthesized 503. Never fails.
    pub async fn network_first_with_fallback(&self, request: &InterceptRequest) -> (ResponseSnapshot, ResponseSource) {
        let key = request.key();
        let err = match self.attempt(request).await {
            Ok(response) => {
                self.store_if_ok(self.tiers.dynamic_tier(), &key, &response).await;
                return (response, ResponseSource::Network);
            }
            Err(err) => err,
        };

        if let Some(cached) = self.lookup(&key.key).await {
            tracing::debug!(url = %request.url, error = %err, "navigation served from cache");
            return (cached, ResponseSource::Cache);
        }

        let fallback_key = RequestKey::new("GET", &self.fallback_url);
        if let Some(fallback) = self.lookup(&fallback_key.key).await {
            tracing::debug!(url = %request.url, fallback = %self.fallback_url, "navigation served fallback page");
            return (fallback, ResponseSource::Fallback);
        }

        tracing::info!(url = %request.url, error = %err, "navigation offline with no fallback");
        (ResponseSnapshot::offline(request.url.as_str(), NAVIGATION_OFFLINE_BODY), ResponseSource::Offline)
    }

    /// Cache first; on miss fetch and store into the dynamic tier.
    ///
    /// A miss that also fails on the network yields a synthesized 503.
    pub async fn cache_first_with_network(&self, request: &InterceptRequest) -> (ResponseSnapshot, ResponseSource) {
        let key = request.key();
        if let Some(cached) = self.lookup(&key.key).await {
            return (cached, ResponseSource::Cache);
        }

        match self.attempt(request).await {
            Ok(response) => {
                self.store_if_ok(self.tiers.dynamic_tier(), &key, &response).await;
                (response, ResponseSource::Network)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "asset unavailable offline");
                (ResponseSnapshot::offline(request.url.as_str(), ASSET_OFFLINE_BODY), ResponseSource::Offline)
            }
        }
    }

    /// One bounded network attempt.
    pub(crate) async fn attempt(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error> {
        match tokio::time::timeout(self.timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::NetworkTimeout(format!("{} after {}ms", request.url, self.timeout.as_millis()))),
        }
    }

    /// Store a snapshot when its status qualifies.
    ///
    /// Write failures are logged; the live response is still returned.
    pub(crate) async fn store_if_ok(&self, tier: &str, key: &RequestKey, response: &ResponseSnapshot) -> bool {
        if !response.is_ok() {
            tracing::trace!(url = %key.url, status = response.status, "not caching non-ok response");
            return false;
        }
        match self.db.put_entry(tier, key, response).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(tier, url = %key.url, error = %e, "failed to store response");
                false
            }
        }
    }

    async fn lookup(&self, key: &str) -> Option<ResponseSnapshot> {
        match self.db.match_any(key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key, error = %e, "tier lookup failed, treating as miss");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockNetwork, config, url};
    use reqwest::Method;

    async fn engine() -> (StrategyEngine, Arc<MockNetwork>, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(MockNetwork::new());
        let engine = StrategyEngine::from_config(&config(), db.clone(), network.clone()).unwrap();
        (engine, network, db)
    }

    fn api(path: &str) -> InterceptRequest {
        InterceptRequest::new(Method::GET, url(path), crate::fetch::RequestMode::Cors)
    }

    fn asset(path: &str) -> InterceptRequest {
        InterceptRequest::new(Method::GET, url(path), crate::fetch::RequestMode::NoCors)
    }

    fn served(interception: Interception) -> Served {
        match interception {
            Interception::Respond(served) => served,
            Interception::Passthrough => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_excluded_passthrough_touches_nothing() {
        let (engine, network, db) = engine().await;
        let post = InterceptRequest::new(Method::POST, url("/api/merchants"), crate::fetch::RequestMode::Cors);
        let auth = api("/api/auth/login");
        let cross = InterceptRequest::get(Url::parse("https://cdn.example.com/lib.js").unwrap());

        for request in [post, auth, cross] {
            assert_eq!(engine.handle(&request).await.unwrap(), Interception::Passthrough);
        }
        assert_eq!(network.call_count(), 0);
        assert!(db.tier_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_success_stores_in_api_tier() {
        let (engine, network, db) = engine().await;
        network.respond("/api/merchants", 200, "[\"acme\"]");

        let served = served(engine.handle(&api("/api/merchants")).await.unwrap());
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.classification, Classification::Api);

        let stored = db
            .match_in_tier(engine.tiers().api_tier(), &api("/api/merchants").key().key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.body, served.response.body);
        assert_eq!(stored.headers, served.response.headers);
    }

    #[tokio::test]
    async fn test_api_non_ok_returned_but_not_stored() {
        let (engine, network, db) = engine().await;
        network.respond("/api/merchants", 500, "boom");

        let served = served(engine.handle(&api("/api/merchants")).await.unwrap());
        assert_eq!(served.response.status, 500);
        assert_eq!(db.entry_count(engine.tiers().api_tier()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_api_failure_serves_cached() {
        let (engine, network, _db) = engine().await;
        network.respond("/api/merchants", 200, "v1");
        engine.handle(&api("/api/merchants")).await.unwrap();

        network.go_offline();
        let served = served(engine.handle(&api("/api/merchants")).await.unwrap());
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "v1");
    }

    #[tokio::test]
    async fn test_api_failure_without_cache_propagates() {
        let (engine, _network, _db) = engine().await;
        let err = engine.handle(&api("/api/merchants")).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_api_timeout_falls_back_to_cache() {
        let (engine, network, _db) = engine().await;
        network.respond("/api/residuals", 200, "cached");
        engine.handle(&api("/api/residuals")).await.unwrap();

        network.hang("/api/residuals");
        let served = served(engine.handle(&api("/api/residuals")).await.unwrap());
        assert_eq!(served.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_api_timeout_without_cache_is_timeout_error() {
        let (engine, network, _db) = engine().await;
        network.hang("/api/residuals");
        let err = engine.handle(&api("/api/residuals")).await.unwrap_err();
        assert!(matches!(err, Error::NetworkTimeout(_)));
    }

    #[tokio::test]
    async fn test_navigation_success_stores_in_dynamic_tier() {
        let (engine, network, db) = engine().await;
        network.respond("/reports", 200, "<h1>reports</h1>");

        let served = served(engine.handle(&InterceptRequest::navigate(url("/reports"))).await.unwrap());
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.classification, Classification::Navigation);
        assert_eq!(db.entry_count(engine.tiers().dynamic_tier()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_navigation_offline_exact_match() {
        let (engine, network, _db) = engine().await;
        network.respond("/reports", 200, "reports page");
        engine.handle(&InterceptRequest::navigate(url("/reports"))).await.unwrap();

        network.go_offline();
        let served = served(engine.handle(&InterceptRequest::navigate(url("/reports"))).await.unwrap());
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "reports page");
    }

    #[tokio::test]
    async fn test_navigation_offline_dashboard_fallback() {
        let (engine, network, _db) = engine().await;
        network.respond("/dashboard", 200, "dashboard shell");
        engine.handle(&InterceptRequest::navigate(url("/dashboard"))).await.unwrap();

        network.go_offline();
        let served = served(engine.handle(&InterceptRequest::navigate(url("/merchants/42"))).await.unwrap());
        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(served.response.text(), "dashboard shell");
    }

    #[tokio::test]
    async fn test_navigation_offline_terminal_503() {
        let (engine, _network, _db) = engine().await;
        let served = served(engine.handle(&InterceptRequest::navigate(url("/merchants/42"))).await.unwrap());
        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.status, 503);
        assert_eq!(served.response.status_text, "Service Unavailable");
        assert_eq!(served.response.header("Content-Type"), Some("text/plain"));
        assert_eq!(served.response.text(), "Offline");
    }

    #[tokio::test]
    async fn test_asset_cache_hit_skips_network() {
        let (engine, network, _db) = engine().await;
        network.respond("/app.css", 200, "body{}");
        engine.handle(&asset("/app.css")).await.unwrap();
        assert_eq!(network.call_count(), 1);

        let served = served(engine.handle(&asset("/app.css")).await.unwrap());
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(network.call_count(), 1);
    }

    #[tokio::test]
    async fn test_asset_twice_keeps_one_entry() {
        let (engine, network, db) = engine().await;
        network.respond("/app.js", 200, "console.log(1)");
        let request = asset("/app.js");

        engine.cache_first_with_network(&request).await;
        engine.cache_first_with_network(&request).await;

        assert_eq!(db.entry_count(engine.tiers().dynamic_tier()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_navigation_refetch_overwrites() {
        let (engine, network, db) = engine().await;
        let request = InterceptRequest::navigate(url("/reports"));
        network.respond("/reports", 200, "first");
        engine.handle(&request).await.unwrap();
        network.respond("/reports", 200, "second");
        engine.handle(&request).await.unwrap();

        assert_eq!(db.entry_count(engine.tiers().dynamic_tier()).await.unwrap(), 1);
        let stored = db.match_any(&request.key().key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "second");
    }

    #[tokio::test]
    async fn test_asset_offline_503() {
        let (engine, _network, db) = engine().await;
        let served = served(engine.handle(&asset("/missing.png")).await.unwrap());
        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.status, 503);
        assert_eq!(served.response.text(), "Resource not available offline");
        assert!(db.tier_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_asset_non_ok_not_stored() {
        let (engine, network, db) = engine().await;
        network.respond("/gone.png", 404, "not found");
        let served = served(engine.handle(&asset("/gone.png")).await.unwrap());
        assert_eq!(served.response.status, 404);
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(db.entry_count(engine.tiers().dynamic_tier()).await.unwrap(), 0);
    }
}
