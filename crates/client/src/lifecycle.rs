//! Tier lifecycle: install, activation and takeover.
//!
//! ```text
//! uninitialized -> installing -> waiting -> active -> intercepting
//! ```
//!
//! Install pre-populates the static tier and asks for immediate activation.
//! Activation evicts every tier whose name is not in the current `TierSet`,
//! claims open pages, and only then reports `intercepting`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use url::Url;

use waystation_core::{CacheDb, Error, TierSet, cache::hash::RequestKey};

use crate::bridge::ClientPages;
use crate::fetch::{InterceptRequest, Network, resolve_path};

fn population_failure(err: Error) -> Error {
    match err {
        Error::PopulationFailure(_) => err,
        other => Error::PopulationFailure(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Uninitialized,
    Installing,
    /// Installed; a previous version may still be in control.
    Waiting,
    Active,
    Intercepting,
}

/// What install did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cached: usize,
    /// Set when pre-population failed; install still completes.
    pub population_error: Option<String>,
}

/// What activation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub evicted: Vec<String>,
    pub failed: Vec<String>,
    pub claimed: usize,
}

pub struct LifecycleManager {
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientPages>,
    tiers: TierSet,
    manifest: Vec<Url>,
    timeout: Duration,
    state: watch::Sender<LifecycleState>,
    skip_waiting: AtomicBool,
    /// Serializes install/activate so transitions never interleave.
    transition: Mutex<()>,
}

impl LifecycleManager {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn ClientPages>, tiers: TierSet, manifest: Vec<Url>,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Uninitialized);
        Self {
            db,
            network,
            clients,
            tiers,
            manifest,
            timeout,
            state,
            skip_waiting: AtomicBool::new(false),
            transition: Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &waystation_core::AppConfig, db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn ClientPages>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let manifest = config
            .static_manifest
            .iter()
            .map(|path| resolve_path(&origin, path).map_err(|e| Error::InvalidUrl(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(db, network, clients, config.tier_set(), manifest, config.timeout()))
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn is_intercepting(&self) -> bool {
        self.state() == LifecycleState::Intercepting
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Wait until activation has fully completed.
    pub async fn wait_intercepting(&self) {
        let mut rx = self.subscribe();
        // Only fails if the sender is dropped, which cannot happen while `self` lives.
        let _ = rx.wait_for(|s| *s == LifecycleState::Intercepting).await;
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Open the static tier and pre-populate it from the manifest.
    ///
    /// Population is all-or-nothing and its failure is logged, never
    /// returned. Install always ends in `waiting` with immediate activation
    /// requested.
    pub async fn install(&self) -> InstallReport {
        let _guard = self.transition.lock().await;
        self.state.send_replace(LifecycleState::Installing);
        tracing::info!(tier = self.tiers.static_tier(), entries = self.manifest.len(), "installing");

        let report = match self.populate_static().await {
            Ok(cached) => InstallReport { cached, population_error: None },
            Err(e) => {
                tracing::warn!(error = %e, "static pre-cache failed; continuing without it");
                InstallReport { cached: 0, population_error: Some(e.to_string()) }
            }
        };

        self.skip_waiting.store(true, Ordering::SeqCst);
        self.state.send_replace(LifecycleState::Waiting);
        report
    }

    async fn populate_static(&self) -> Result<usize, Error> {
        self.db.open_tier(self.tiers.static_tier()).await?;

        let fetches = self.manifest.iter().map(|url| async move {
            let request = InterceptRequest::get(url.clone());
            let response = tokio::time::timeout(self.timeout, self.network.fetch(&request))
                .await
                .map_err(|_| Error::NetworkTimeout(url.to_string()))??;
            if !response.is_ok() {
                return Err(Error::PopulationFailure(format!("{url}: status {}", response.status)));
            }
            Ok::<_, Error>((RequestKey::new("GET", url), response))
        });

        let entries = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, Error>>()
            .map_err(population_failure)?;

        let cached = entries.len();
        self.db
            .put_entries(self.tiers.static_tier(), entries)
            .await
            .map_err(population_failure)?;
        Ok(cached)
    }

    /// Request immediate takeover.
    ///
    /// Activates right away when installed and waiting; otherwise the
    /// request is remembered. Returns the activation report if it ran.
    pub async fn skip_waiting(&self) -> Option<ActivationReport> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        if self.state() == LifecycleState::Waiting {
            Some(self.activate().await)
        } else {
            None
        }
    }

    /// Evict stale tiers, claim open pages and begin intercepting.
    ///
    /// Deletions run concurrently and fail independently. Returns after all
    /// of them and the claim have finished.
    pub async fn activate(&self) -> ActivationReport {
        let _guard = self.transition.lock().await;
        if self.state() == LifecycleState::Intercepting {
            return ActivationReport::default();
        }
        self.state.send_replace(LifecycleState::Active);

        let mut report = ActivationReport::default();
        match self.db.tier_names().await {
            Ok(names) => {
                let stale: Vec<String> = names.into_iter().filter(|n| !self.tiers.is_current(n)).collect();
                let deletions = stale.iter().map(|name| self.evict(name));
                for (name, result) in stale.iter().zip(join_all(deletions).await) {
                    match result {
                        Ok(()) => report.evicted.push(name.clone()),
                        Err(e) => {
                            tracing::warn!(error = %e, "stale tier eviction failed");
                            report.failed.push(name.clone());
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not enumerate tiers; skipping eviction"),
        }

        match self.clients.claim().await {
            Ok(claimed) => report.claimed = claimed,
            Err(e) => tracing::warn!(error = %e, "failed to claim open clients"),
        }

        self.state.send_replace(LifecycleState::Intercepting);
        tracing::info!(
            evicted = report.evicted.len(),
            failed = report.failed.len(),
            claimed = report.claimed,
            "activated"
        );
        report
    }

    async fn evict(&self, name: &str) -> Result<(), Error> {
        self.db
            .delete_tier(name)
            .await
            .map(|_| ())
            .map_err(|e| Error::EvictionFailure { tier: name.to_string(), reason: e.to_string() })
    }
}
