//! Core types and shared functionality for waystation.
//!
//! This crate provides:
//! - Versioned cache tiers with a SQLite backend
//! - Response snapshots and request-key hashing
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, ResponseSnapshot, TierSet, TierStats};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
