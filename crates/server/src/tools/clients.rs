//! client_register and client_close tool implementations.
//!
//! Lets the application shell announce which pages are open so that
//! activation can claim them and notification clicks can focus them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::bridge::ClientRegistry;

use super::json_result;

/// Parameters for the client_register tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientRegisterParams {
    /// URL or origin-relative path of the open page.
    pub url: String,
}

/// Parameters for the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseOutput {
    pub closed: bool,
}

/// Implementation of the client_register tool.
pub async fn register_impl(clients: &ClientRegistry, params: ClientRegisterParams) -> Result<CallToolResult, McpError> {
    let page = clients.register(&params.url).await?;
    json_result(&page)
}

/// Implementation of the client_close tool.
pub async fn close_impl(clients: &ClientRegistry, params: ClientCloseParams) -> Result<CallToolResult, McpError> {
    json_result(&ClientCloseOutput { closed: clients.close(&params.id).await })
}
