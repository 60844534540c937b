//! MCP tool implementations.
//!
//! Each tool feeds one event category into the worker and returns the
//! outcome as pretty-printed JSON text.

pub mod clients;
pub mod control;
pub mod events;
pub mod intercept;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use clients::{ClientCloseParams, ClientRegisterParams};
pub use control::{ControlParams, StatusParams};
pub use events::{PushParams, SyncParams};
pub use intercept::{InterceptOutput, InterceptParams};

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
