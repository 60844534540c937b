//! control and status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::bridge::ControlMessage;
use waystation_client::{ActivationReport, EventOutcome, Worker, WorkerEvent, WorkerStatus};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlParams {
    /// "skipWaiting" or "clearCache".
    pub action: String,
}

/// Output from the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlOutput {
    pub action: String,
    /// Present when skipWaiting activated immediately.
    pub activation: Option<ActivationReport>,
    /// Present for clearCache.
    pub tiers_deleted: Option<u64>,
}

/// Implementation of the control tool.
pub async fn control_impl(worker: &Worker, params: ControlParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::parse(serde_json::json!({ "action": params.action }).to_string().as_bytes())?;

    let output = match worker.dispatch(WorkerEvent::Message(message)).await? {
        EventOutcome::SkippedWaiting(activation) => {
            ControlOutput { action: params.action, activation, tiers_deleted: None }
        }
        EventOutcome::Cleared { tiers } => ControlOutput { action: params.action, activation: None, tiers_deleted: Some(tiers) },
        other => return Err(ToolError::OutputFailed(format!("unexpected outcome: {other:?}")).into()),
    };

    json_result(&output)
}

/// Parameters for the status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StatusParams {
    /// Tier name whose cached request URLs should be listed.
    #[serde(default)]
    pub tier: Option<String>,
}

/// Output from the status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    #[serde(flatten)]
    pub status: WorkerStatus,
    /// Present when a tier was requested.
    pub urls: Option<Vec<String>>,
}

/// Implementation of the status tool.
pub async fn status_impl(worker: &Worker, params: StatusParams) -> Result<CallToolResult, McpError> {
    let urls = match params.tier {
        Some(tier) => Some(
            worker
                .tier_urls(&tier)
                .await?
                .ok_or_else(|| ToolError::InvalidInput(format!("unknown tier: {tier}")))?,
        ),
        None => None,
    };

    json_result(&StatusOutput { status: worker.status().await?, urls })
}
