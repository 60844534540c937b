//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_paths(field: &str, paths: &[String]) -> Result<(), ConfigError> {
    match paths.iter().find(|p| !p.starts_with('/')) {
        Some(bad) => Err(invalid(field, format!("path '{bad}' must start with '/'"))),
        None => Ok(()),
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    /// - tier prefixes are empty or collide
    /// - any configured path does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_version.is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set WAYSTATION_CACHE_VERSION, e.g. v1".into(),
            });
        }

        let prefixes = [&self.static_tier_prefix, &self.dynamic_tier_prefix, &self.api_tier_prefix];
        if prefixes.iter().any(|p| p.is_empty()) {
            return Err(invalid("tier_prefix", "must not be empty"));
        }
        if prefixes[0] == prefixes[1] || prefixes[0] == prefixes[2] || prefixes[1] == prefixes[2] {
            return Err(invalid("tier_prefix", "static, dynamic and api tier prefixes must differ"));
        }

        check_paths("static_manifest", &self.static_manifest)?;
        check_paths("no_cache_prefixes", &self.no_cache_prefixes)?;
        check_paths("cacheable_api_routes", &self.cacheable_api_routes)?;
        check_paths("api_prefix", std::slice::from_ref(&self.api_prefix))?;
        check_paths("fallback_route", std::slice::from_ref(&self.fallback_route))?;

        for route in &self.cacheable_api_routes {
            if self.no_cache_prefixes.iter().any(|p| route.starts_with(p.as_str())) {
                tracing::warn!(
                    route = %route,
                    "cacheable API route matches a no-cache prefix; it will be refreshed but never served from cache"
                );
            }
        }

        Ok(())
    }
}
