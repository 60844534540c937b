//! Background refresh of the API tier.
//!
//! The periodic clock lives outside the engine; this module only implements
//! one refresh pass over the configured routes.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use waystation_core::{CacheDb, Error};

use crate::fetch::{InterceptRequest, Network, resolve_path};

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    /// Routes that failed or returned a non-ok status.
    pub failed: Vec<String>,
}

pub struct Refresher {
    db: CacheDb,
    network: Arc<dyn Network>,
    api_tier: String,
    routes: Vec<Url>,
    timeout: Duration,
}

impl Refresher {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, api_tier: String, routes: Vec<Url>, timeout: Duration) -> Self {
        Self { db, network, api_tier, routes, timeout }
    }

    pub fn from_config(
        config: &waystation_core::AppConfig, db: CacheDb, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let routes = config
            .cacheable_api_routes
            .iter()
            .map(|path| resolve_path(&origin, path).map_err(|e| Error::InvalidUrl(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(db, network, config.tier_set().api_tier().to_string(), routes, config.timeout()))
    }

    /// Refetch every route and overwrite its API tier entry on success.
    ///
    /// Routes are independent: a failing route is logged and reported while
    /// the rest still refresh.
    pub async fn refresh(&self) -> RefreshReport {
        let results = join_all(self.routes.iter().map(|url| self.refresh_route(url))).await;

        let mut report = RefreshReport::default();
        for (url, result) in self.routes.iter().zip(results) {
            match result {
                Ok(()) => report.refreshed.push(url.path().to_string()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "background refresh failed for route");
                    report.failed.push(url.path().to_string());
                }
            }
        }
        tracing::info!(refreshed = report.refreshed.len(), failed = report.failed.len(), "background refresh finished");
        report
    }

    async fn refresh_route(&self, url: &Url) -> Result<(), Error> {
        let request = InterceptRequest::get(url.clone());
        let response = tokio::time::timeout(self.timeout, self.network.fetch(&request))
            .await
            .map_err(|_| Error::NetworkTimeout(url.to_string()))??;

        if !response.is_ok() {
            return Err(Error::NetworkFailure(format!("{url}: status {}", response.status)));
        }
        self.db.put_entry(&self.api_tier, &request.key(), &response).await
    }
}
