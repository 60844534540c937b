//! Notification interaction.
//!
//! Resolution is split from execution: `resolve_click` decides the single
//! outcome from the click and the open pages, `handle_click` carries it out.

use serde::{Deserialize, Serialize};

use super::clients::{ClientPage, ClientPages};
use super::push::ACTION_DISMISS;
use waystation_core::Error;

/// A user interaction with a shown notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationClick {
    /// Action button id; `None` for a click on the notification body.
    pub action: Option<String>,
    /// URL stored in the notification data.
    pub url: Option<String>,
}

/// Exactly one of these happens per interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ClickOutcome {
    Dismissed,
    Focus { client_id: String, url: String },
    Open { url: String },
}

/// Decide what a click does.
pub fn resolve_click(click: &NotificationClick, open: &[ClientPage], default_url: &str) -> ClickOutcome {
    if click.action.as_deref() == Some(ACTION_DISMISS) {
        return ClickOutcome::Dismissed;
    }

    let target = click.url.as_deref().unwrap_or(default_url);
    match open.iter().find(|page| page.url.contains(target)) {
        Some(page) => ClickOutcome::Focus { client_id: page.id.clone(), url: page.url.clone() },
        None => ClickOutcome::Open { url: target.to_string() },
    }
}

/// Resolve a click against the open pages and carry it out.
pub async fn handle_click(
    click: &NotificationClick, clients: &dyn ClientPages, default_url: &str,
) -> Result<ClickOutcome, Error> {
    let open = clients.match_all().await?;
    let outcome = resolve_click(click, &open, default_url);
    match &outcome {
        ClickOutcome::Dismissed => {}
        ClickOutcome::Focus { client_id, .. } => clients.focus(client_id).await?,
        ClickOutcome::Open { url } => {
            clients.open_window(url).await?;
        }
    }
    tracing::debug!(?outcome, "notification click handled");
    Ok(outcome)
}
