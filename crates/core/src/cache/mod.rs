//! SQLite-backed versioned cache tiers.
//!
//! This module provides named, versioned key→response containers using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request keys derived from method + URL via SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-tier deletion for version eviction and full resets

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod snapshot;
pub mod tiers;

pub use crate::Error;

pub use connection::CacheDb;
pub use snapshot::ResponseSnapshot;
pub use tiers::{TierSet, TierStats};
