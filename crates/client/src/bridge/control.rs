//! App-to-engine control channel.

use serde::{Deserialize, Serialize};
use waystation_core::{CacheDb, Error};

/// Commands the application can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "action")]
pub enum ControlMessage {
    /// Leave the waiting state and activate now.
    #[serde(rename = "skipWaiting")]
    SkipWaiting,
    /// Delete every tier regardless of version.
    #[serde(rename = "clearCache")]
    ClearCache,
}

impl ControlMessage {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Full reset: enumerate and delete every tier, current ones included.
///
/// Returns the number of tiers deleted.
pub async fn clear_all_tiers(db: &CacheDb) -> Result<u64, Error> {
    let deleted = db.delete_all_tiers().await?;
    tracing::info!(deleted, "cleared all cache tiers");
    Ok(deleted)
}
