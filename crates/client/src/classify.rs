//! Route classification.
//!
//! Every outgoing request is sorted into exactly one category, and the
//! category alone picks the strategy that serves it. Classification is pure:
//! no tier is touched and nothing is awaited.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::{InterceptRequest, RequestMode, same_origin};

/// Category assigned to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Bypasses the engine; the transport handles it unmodified.
    Excluded,
    /// Network first, cached copy on failure.
    Api,
    /// Network first, then cache, then the fallback page, then a 503.
    Navigation,
    /// Cache first, network on miss.
    Other,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Classification::Excluded => "excluded",
            Classification::Api => "api",
            Classification::Navigation => "navigation",
            Classification::Other => "other",
        };
        f.write_str(name)
    }
}

/// Prefix tables that drive classification.
#[derive(Debug, Clone)]
pub struct RouteTable {
    origin: Url,
    api_prefix: String,
    no_cache_prefixes: Vec<String>,
}

impl RouteTable {
    pub fn new(origin: Url, api_prefix: impl Into<String>, no_cache_prefixes: Vec<String>) -> Self {
        Self { origin, api_prefix: api_prefix.into(), no_cache_prefixes }
    }

    pub fn from_config(config: &waystation_core::AppConfig) -> Result<Self, waystation_core::ConfigError> {
        Ok(Self::new(config.origin_url()?, config.api_prefix.clone(), config.no_cache_prefixes.clone()))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Classify by URL, mode and method.
    ///
    /// Checks run in order: method, origin, no-cache prefixes, API prefix,
    /// navigation mode. The first match decides.
    pub fn classify(&self, url: &Url, mode: RequestMode, method: &Method) -> Classification {
        if *method != Method::GET {
            return Classification::Excluded;
        }

        if !same_origin(url, &self.origin) {
            return Classification::Excluded;
        }

        let path = url.path();
        if self.no_cache_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Classification::Excluded;
        }

        if path.starts_with(self.api_prefix.as_str()) {
            return Classification::Api;
        }

        if mode == RequestMode::Navigate {
            return Classification::Navigation;
        }

        Classification::Other
    }

    pub fn classify_request(&self, request: &InterceptRequest) -> Classification {
        self.classify(&request.url, request.mode, &request.method)
    }
}
