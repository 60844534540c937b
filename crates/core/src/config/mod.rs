//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WAYSTATION_*)
//! 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::TierSet;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WAYSTATION_*)
/// 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// Fixed for the lifetime of the process. Changing `cache_version` and
/// redeploying is how old tiers get evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the application is served from.
    ///
    /// Requests to any other origin are never intercepted.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite tier database.
    ///
    /// Set via WAYSTATION_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on a single network attempt in milliseconds.
    ///
    /// Set via WAYSTATION_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Version suffix shared by all three tiers.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    #[serde(default = "default_static_tier_prefix")]
    pub static_tier_prefix: String,

    #[serde(default = "default_dynamic_tier_prefix")]
    pub dynamic_tier_prefix: String,

    #[serde(default = "default_api_tier_prefix")]
    pub api_tier_prefix: String,

    /// Shell paths pre-populated into the static tier at install.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Path prefix that marks API requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Sensitive path prefixes that bypass the engine entirely.
    #[serde(default = "default_no_cache_prefixes")]
    pub no_cache_prefixes: Vec<String>,

    /// API paths repopulated by background refresh.
    #[serde(default = "default_cacheable_api_routes")]
    pub cacheable_api_routes: Vec<String>,

    /// Known-good page served when a navigation misses the cache offline.
    ///
    /// Also the default target for notifications without a URL.
    #[serde(default = "default_fallback_route")]
    pub fallback_route: String,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_icon")]
    pub notification_badge: String,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./waystation-cache.sqlite")
}

fn default_user_agent() -> String {
    "waystation/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_static_tier_prefix() -> String {
    "iso-hub-static".into()
}

fn default_dynamic_tier_prefix() -> String {
    "iso-hub-dynamic".into()
}

fn default_api_tier_prefix() -> String {
    "iso-hub-api".into()
}

fn default_static_manifest() -> Vec<String> {
    ["/", "/dashboard", "/merchants", "/residuals", "/reports", "/manifest.json", "/logo.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_no_cache_prefixes() -> Vec<String> {
    ["/api/auth", "/api/users", "/api/pre-applications", "/api/secured"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cacheable_api_routes() -> Vec<String> {
    ["/api/dashboard/metrics", "/api/merchants", "/api/residuals"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fallback_route() -> String {
    "/dashboard".into()
}

fn default_notification_icon() -> String {
    "/logo.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            cache_version: default_cache_version(),
            static_tier_prefix: default_static_tier_prefix(),
            dynamic_tier_prefix: default_dynamic_tier_prefix(),
            api_tier_prefix: default_api_tier_prefix(),
            static_manifest: default_static_manifest(),
            api_prefix: default_api_prefix(),
            no_cache_prefixes: default_no_cache_prefixes(),
            cacheable_api_routes: default_cacheable_api_routes(),
            fallback_route: default_fallback_route(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The three tier names active for this deployment.
    pub fn tier_set(&self) -> TierSet {
        TierSet::new(
            &self.static_tier_prefix,
            &self.dynamic_tier_prefix,
            &self.api_tier_prefix,
            &self.cache_version,
        )
    }

    /// Serving origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WAYSTATION_`
    /// 2. TOML file from `WAYSTATION_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYSTATION_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("WAYSTATION_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}
