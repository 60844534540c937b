//! Background sync dispatch points.

use async_trait::async_trait;
use waystation_core::Error;

pub const TAG_SYNC_MESSAGES: &str = "sync-messages";
pub const TAG_SYNC_UPLOADS: &str = "sync-uploads";
pub const TAG_REFRESH_DATA: &str = "refresh-data";

/// Flushes work deferred while offline.
///
/// Both operations must be idempotent and safe to retry; the durable queue
/// behind them lives outside this crate.
#[async_trait]
pub trait SyncCollaborator: Send + Sync {
    async fn flush_pending_messages(&self) -> Result<(), Error>;

    async fn flush_pending_uploads(&self) -> Result<(), Error>;
}

/// Recognized sync tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTag {
    Messages,
    Uploads,
    RefreshData,
    Unknown(String),
}

impl SyncTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            TAG_SYNC_MESSAGES => SyncTag::Messages,
            TAG_SYNC_UPLOADS => SyncTag::Uploads,
            TAG_REFRESH_DATA => SyncTag::RefreshData,
            other => SyncTag::Unknown(other.to_string()),
        }
    }
}

/// Collaborator with no queue behind it: every flush finds nothing to send.
#[derive(Debug, Default)]
pub struct LoggingOutbox;

#[async_trait]
impl SyncCollaborator for LoggingOutbox {
    async fn flush_pending_messages(&self) -> Result<(), Error> {
        tracing::info!("flush requested for pending messages; no outbox configured");
        Ok(())
    }

    async fn flush_pending_uploads(&self) -> Result<(), Error> {
        tracing::info!("flush requested for pending uploads; no outbox configured");
        Ok(())
    }
}
