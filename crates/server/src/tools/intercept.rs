//! intercept tool implementation.
//!
//! Runs one outgoing request through the engine. Excluded requests come back
//! with `handled: false`; the caller sends those itself.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use waystation_client::fetch::{Method, canonicalize};
use waystation_client::{Classification, InterceptRequest, Interception, RequestMode, ResponseSource, Worker};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptParams {
    /// Absolute URL, or a path relative to the serving origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode; "navigate" for top-level document loads.
    #[serde(default)]
    pub mode: RequestMode,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptOutput {
    /// False when the engine passed the request through untouched.
    pub handled: bool,
    pub classification: Option<Classification>,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
}

impl InterceptOutput {
    fn passthrough() -> Self {
        Self {
            handled: false,
            classification: None,
            source: None,
            status: None,
            status_text: None,
            headers: Vec::new(),
            body: None,
        }
    }
}

fn build_request(origin: &Url, params: &InterceptParams) -> Result<InterceptRequest, ToolError> {
    let url = canonicalize(&params.url, Some(origin)).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let method = parse_method(&params.method)?;
    Ok(InterceptRequest::new(method, url, params.mode))
}

fn parse_method(method: &str) -> Result<Method, ToolError> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidInput(format!("invalid method: {method}")))
}

/// Implementation of the intercept tool.
pub async fn intercept_impl(worker: &Worker, params: InterceptParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker.engine().routes().origin(), &params)?;

    let output = match worker.fetch(&request).await? {
        Interception::Passthrough => InterceptOutput::passthrough(),
        Interception::Respond(served) => InterceptOutput {
            handled: true,
            classification: Some(served.classification),
            source: Some(served.source),
            status: Some(served.response.status),
            status_text: Some(served.response.status_text.clone()),
            body: Some(served.response.text()),
            headers: served.response.headers,
        },
    };

    json_result(&output)
}
