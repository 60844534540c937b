//! push, notification_click and sync tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::bridge::{ClickOutcome, NotificationClick};
use waystation_client::{EventOutcome, RefreshReport, Worker, WorkerEvent};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Push payload, e.g. {"title": "...", "body": "...", "url": "/reports"}.
    /// Omit to simulate a push without data.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Output from the push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushOutput {
    pub shown: bool,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
}

/// Parameters for the sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag: "sync-messages", "sync-uploads" or "refresh-data".
    pub tag: String,

    /// Deliver as a periodic sync (required for "refresh-data").
    #[serde(default)]
    pub periodic: bool,
}

/// Output from the sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    pub handled: String,
    pub refresh: Option<RefreshReport>,
}

fn unexpected(outcome: &EventOutcome) -> ToolError {
    ToolError::OutputFailed(format!("unexpected outcome: {outcome:?}"))
}

/// Implementation of the push tool.
pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    let data = match params.payload {
        Some(value) => Some(
            serde_json::to_vec(&value).map_err(|e| ToolError::InvalidInput(format!("Invalid payload: {e}")))?,
        ),
        None => None,
    };

    let output = match worker.dispatch(WorkerEvent::Push(data)).await? {
        EventOutcome::Pushed(Some(n)) => {
            PushOutput { shown: true, title: Some(n.title), body: Some(n.body), url: Some(n.data.url) }
        }
        EventOutcome::Pushed(None) => PushOutput { shown: false, title: None, body: None, url: None },
        other => return Err(unexpected(&other).into()),
    };

    json_result(&output)
}

/// Implementation of the notification_click tool.
pub async fn click_impl(worker: &Worker, params: NotificationClick) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::NotificationClick(params)).await? {
        EventOutcome::Clicked(outcome) => json_result::<ClickOutcome>(&outcome),
        other => Err(unexpected(&other).into()),
    }
}

/// Implementation of the sync tool.
pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    let event = if params.periodic { WorkerEvent::PeriodicSync(params.tag) } else { WorkerEvent::Sync(params.tag) };

    let output = match worker.dispatch(event).await? {
        EventOutcome::MessagesFlushed => SyncOutput { handled: "messages".into(), refresh: None },
        EventOutcome::UploadsFlushed => SyncOutput { handled: "uploads".into(), refresh: None },
        EventOutcome::Refreshed(report) => SyncOutput { handled: "refresh".into(), refresh: Some(report) },
        EventOutcome::Ignored(reason) => SyncOutput { handled: format!("ignored ({reason})"), refresh: None },
        other => return Err(unexpected(&other).into()),
    };

    json_result(&output)
}
