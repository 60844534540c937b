//! Platform capabilities for a headless host.
//!
//! There is no display attached to a stdio server, so notifications are
//! written to the log where the embedding shell can pick them up.

use async_trait::async_trait;
use waystation_client::bridge::{Notification, Notifier};
use waystation_core::Error;

pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn show_notification(&self, notification: Notification) -> Result<(), Error> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            url = %notification.data.url,
            icon = %notification.icon,
            "notification"
        );
        Ok(())
    }
}
