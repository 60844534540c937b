//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use crate::tools::{
    ClientCloseParams, ClientRegisterParams, ControlParams, InterceptParams, PushParams, StatusParams, SyncParams, clients,
    control, events, intercept,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use waystation_client::Worker;
use waystation_client::bridge::{ClientRegistry, NotificationClick};

/// The main MCP server handler for waystation.
#[derive(Clone)]
pub struct WaystationServer {
    worker: Arc<Worker>,
    clients: Arc<ClientRegistry>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl WaystationServer {
    /// Create a new server handler around a started worker.
    pub fn new(worker: Arc<Worker>, clients: Arc<ClientRegistry>) -> Self {
        Self { worker, clients, tool_router: Self::tool_router() }
    }

    /// Serve one outgoing request through the cache strategies.
    #[tool(
        description = "Intercept an outgoing request. Returns the response and whether it came from network, cache, fallback or the offline placeholder; handled=false means send it directly."
    )]
    async fn intercept(&self, params: Parameters<InterceptParams>) -> Result<CallToolResult, McpError> {
        intercept::intercept_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Shows a notification with defaults filled in.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        events::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Handle a notification click: dismiss, focus an open page, or open a new one.")]
    async fn notification_click(&self, params: Parameters<NotificationClick>) -> Result<CallToolResult, McpError> {
        events::click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a sync event by tag. Use periodic=true for refresh-data.")]
    async fn sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        events::sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Send a control message: skipWaiting or clearCache.")]
    async fn control(&self, params: Parameters<ControlParams>) -> Result<CallToolResult, McpError> {
        control::control_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report lifecycle state, cache version and tier entry counts. Pass tier to list its cached URLs.")]
    async fn status(&self, params: Parameters<StatusParams>) -> Result<CallToolResult, McpError> {
        control::status_impl(&self.worker, params.0).await
    }

    #[tool(description = "Register an open application page so it can be claimed and focused.")]
    async fn client_register(&self, params: Parameters<ClientRegisterParams>) -> Result<CallToolResult, McpError> {
        clients::register_impl(&self.clients, params.0).await
    }

    #[tool(description = "Forget a previously registered page.")]
    async fn client_close(&self, params: Parameters<ClientCloseParams>) -> Result<CallToolResult, McpError> {
        clients::close_impl(&self.clients, params.0).await
    }
}

impl ServerHandler for WaystationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waystation".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
