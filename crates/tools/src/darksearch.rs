//! Authenticated HTTP search tool.

use crate::r#trait::{RunContext, ToolCall, ToolRunner};
use crate::ToolError;
use async_trait::async_trait;
use osintmaster_core::ToolName;
use tracing::{debug, error};

/// Default search API base URL.
pub const DEFAULT_BASE_URL: &str = "https://darksearch.io";

const MAX_ERROR_BODY: usize = 512;

/// Queries the darksearch REST API with a bearer token.
///
/// The parsed JSON response body is the tool's report.
pub struct DarkSearchRunner {
    client: reqwest::Client,
    base_url: String,
}

impl DarkSearchRunner {
    /// Runner against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn client_for(&self, call: &ToolCall) -> Result<reqwest::Client, ToolError> {
        match &call.proxy {
            Some(proxy) => Ok(reqwest::Client::builder()
                .proxy(reqwest::Proxy::all(proxy.as_str())?)
                .build()?),
            None => Ok(self.client.clone()),
        }
    }
}

impl Default for DarkSearchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl ToolRunner for DarkSearchRunner {
    fn name(&self) -> ToolName {
        ToolName::DarkSearch
    }

    async fn run(&self, _ctx: &RunContext, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let api_key = call.settings.api_key.trim();
        if api_key.is_empty() {
            error!("[{}] API key is not configured, skipping request", call.tool);
            return Err(ToolError::MissingApiKey);
        }

        let url = format!("{}/api/search", self.base_url);
        debug!("[{}] GET {}", call.tool, url);

        let mut request = self
            .client_for(call)?
            .get(&url)
            .query(&[("query", call.target.as_str())])
            .bearer_auth(api_key);
        if let Some(limit) = call.timeout {
            request = request.timeout(limit);
        }

        let response = request.send().await.map_err(|e| timeout_or_http(e, call))?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(ToolError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| timeout_or_http(e, call))
    }
}

fn timeout_or_http(e: reqwest::Error, call: &ToolCall) -> ToolError {
    match call.timeout {
        Some(limit) if e.is_timeout() => ToolError::Timeout(limit),
        _ => ToolError::Http(e),
    }
}
