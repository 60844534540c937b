//! Request-interception engine for waystation.
//!
//! This crate classifies outgoing read requests, serves them through one of
//! three fetch/cache strategies over the versioned tiers in `waystation-core`,
//! and drives the tier lifecycle, background refresh, and the notification
//! and sync boundary.

pub mod bridge;
pub mod classify;
pub mod fetch;
pub mod lifecycle;
pub mod refresh;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{Classification, RouteTable};
pub use fetch::{FetchConfig, HttpNetwork, InterceptRequest, Network, RequestMode};
pub use lifecycle::{ActivationReport, InstallReport, LifecycleManager, LifecycleState};
pub use refresh::{RefreshReport, Refresher};
pub use strategy::{Interception, ResponseSource, Served, StrategyEngine};
pub use worker::{EventOutcome, Worker, WorkerEvent, WorkerStatus};
