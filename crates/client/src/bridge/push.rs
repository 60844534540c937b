//! Push delivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use waystation_core::{AppConfig, Error};

pub const DEFAULT_TITLE: &str = "ISO Hub";
pub const DEFAULT_BODY: &str = "New notification from ISO Hub";

/// Action id that closes a notification without further effect.
pub const ACTION_DISMISS: &str = "dismiss";
pub const ACTION_VIEW: &str = "view";

/// Inbound push payload. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    /// Any other fields, carried through to the notification data.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PushPayload {
    /// Decode a raw payload.
    ///
    /// `None` means the push carried no data at all.
    pub fn parse(data: Option<&[u8]>) -> Result<Option<Self>, Error> {
        match data {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Notification handed to the presentation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// Platform capability that puts a notification on screen.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_notification(&self, notification: Notification) -> Result<(), Error>;
}

/// Fixed presentation settings shared by every notification.
#[derive(Debug, Clone)]
pub struct NotificationProfile {
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub default_url: String,
}

impl NotificationProfile {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            icon: config.notification_icon.clone(),
            badge: config.notification_badge.clone(),
            vibrate: vec![100, 50, 100],
            default_url: config.fallback_route.clone(),
        }
    }

    /// Fill defaults and attach the fixed profile.
    pub fn build(&self, payload: PushPayload) -> Notification {
        Notification {
            title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: self.icon.clone(),
            badge: self.badge.clone(),
            vibrate: self.vibrate.clone(),
            data: NotificationData { url: payload.url.unwrap_or_else(|| self.default_url.clone()), extra: payload.extra },
            actions: vec![
                NotificationAction { action: ACTION_VIEW.into(), title: "View".into() },
                NotificationAction { action: ACTION_DISMISS.into(), title: "Dismiss".into() },
            ],
        }
    }
}

/// Decode a push and present it.
///
/// Returns the notification that was shown, or `None` for an empty push.
pub async fn handle_push(
    profile: &NotificationProfile, notifier: &dyn Notifier, data: Option<&[u8]>,
) -> Result<Option<Notification>, Error> {
    let Some(payload) = PushPayload::parse(data)? else {
        tracing::debug!("push without payload ignored");
        return Ok(None);
    };

    let notification = profile.build(payload);
    notifier.show_notification(notification.clone()).await?;
    tracing::info!(title = %notification.title, url = %notification.data.url, "notification shown");
    Ok(Some(notification))
}
