//! Tier naming and whole-tier operations.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// The three tier names that belong to the running deployment.
///
/// Any tier in the store whose name is not in this set is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSet {
    static_tier: String,
    dynamic_tier: String,
    api_tier: String,
}

impl TierSet {
    pub fn new(static_prefix: &str, dynamic_prefix: &str, api_prefix: &str, version: &str) -> Self {
        Self {
            static_tier: format!("{static_prefix}-{version}"),
            dynamic_tier: format!("{dynamic_prefix}-{version}"),
            api_tier: format!("{api_prefix}-{version}"),
        }
    }

    /// Immutable shell assets populated at install.
    pub fn static_tier(&self) -> &str {
        &self.static_tier
    }

    /// Opportunistically cached navigation and asset responses.
    pub fn dynamic_tier(&self) -> &str {
        &self.dynamic_tier
    }

    /// Network-first API responses.
    pub fn api_tier(&self) -> &str {
        &self.api_tier
    }

    pub fn names(&self) -> [&str; 3] {
        [&self.static_tier, &self.dynamic_tier, &self.api_tier]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.names().contains(&name)
    }
}

/// Entry count for a single tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TierStats {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

impl CacheDb {
    /// Open a tier, creating it if it does not exist yet.
    pub async fn open_tier(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO tiers (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_tier(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM tiers WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All tier names in creation order.
    pub async fn tier_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM tiers ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a tier and every entry in it.
    ///
    /// Returns whether the tier existed.
    pub async fn delete_tier(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM tiers WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every tier regardless of version.
    ///
    /// Returns the number of tiers removed.
    pub async fn delete_all_tiers(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries", [])?;
                let deleted = tx.execute("DELETE FROM tiers", [])?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Per-tier entry counts in creation order.
    pub async fn tier_stats(&self) -> Result<Vec<TierStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<TierStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT t.name, COUNT(e.key), t.created_at
                     FROM tiers t LEFT JOIN entries e ON e.tier = t.name
                     GROUP BY t.name
                     ORDER BY t.rowid",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(TierStats { name: row.get(0)?, entries: row.get::<_, i64>(1)? as u64, created_at: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}
