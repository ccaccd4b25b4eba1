// SPDX-License-Identifier: MIT OR Apache-2.0
//! Talks to a remote AFD MCP server over plain JSON-RPC POSTs, for CLI
//! invocations issued after a `connect <url>`.
//!
//! The CLI never keeps an `/sse` connection open between invocations (each
//! subcommand is its own process), so it never observes `token`/`tool_end`
//! streaming frames — only the JSON-RPC reply, which the server always
//! produces synchronously regardless of whether a session is attached.

use afd_mcp::validate::SurfaceCommand;
use afd_result::CommandResult;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

/// A connection to a remote MCP server, addressed by base URL.
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

impl RemoteClient {
    /// Build a client for `base_url`, optionally correlated to a prior
    /// `connect`'s session id.
    #[must_use]
    pub fn new(base_url: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            session_id,
        }
    }

    /// `GET /health`, failing if the server does not answer `200 OK`.
    pub async fn check_health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let resp = self.http.get(&url).send().await.with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            bail!("server at {} is unhealthy: HTTP {}", self.base_url, resp.status());
        }
        Ok(())
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let mut url = format!("{}/message", self.base_url);
        if let Some(session_id) = &self.session_id {
            url = format!("{url}?session={session_id}");
        }

        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let envelope: Value = resp.json().await.context("decode JSON-RPC response")?;

        if let Some(error) = envelope.get("error") {
            bail!("JSON-RPC error {}: {}", error["code"], error["message"]);
        }
        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }

    /// `tools/list`, optionally filtered by category client-side (the
    /// protocol itself has no category filter).
    pub async fn list_tools(&self) -> Result<Vec<Value>> {
        let result = self.rpc("tools/list", Value::Null).await?;
        Ok(result.get("tools").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    /// `tools/call`, decoded as a [`CommandResult`] envelope.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<CommandResult<Value>> {
        let result = self
            .rpc("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        serde_json::from_value(result).context("decode command result envelope")
    }

    /// `initialize`, returning the server's advertised name — the prefix its
    /// bootstrap tools (`<name>-help`, `<name>-schema`) are registered under.
    pub async fn server_name(&self) -> Result<String> {
        let result = self.rpc("initialize", Value::Null).await?;
        result
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("server did not advertise a name")
    }

    /// Reconstruct the full [`SurfaceCommand`] set by calling the server's
    /// own `<name>-help` (full format, for category/tags/requires) and
    /// `<name>-schema` (for input schemas) bootstrap tools.
    pub async fn surface_commands(&self) -> Result<Vec<SurfaceCommand>> {
        let prefix = self.server_name().await?;

        let help = self.call(&format!("{prefix}-help"), json!({"format": "full"})).await?;
        let help_data = help.data.context("*-help returned no data")?;
        let commands = help_data.get("commands").and_then(Value::as_array).cloned().unwrap_or_default();

        let schema = self.call(&format!("{prefix}-schema"), Value::Null).await?;
        let schema_data = schema.data.context("*-schema returned no data")?;
        let schemas = schema_data.get("commands").cloned().unwrap_or(Value::Null);

        Ok(commands
            .into_iter()
            .map(|c| SurfaceCommand {
                name: c.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                description: c.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
                category: c.get("category").and_then(Value::as_str).map(str::to_string),
                tags: c
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                input_schema: schemas.get(c.get("name").and_then(Value::as_str).unwrap_or_default()).cloned().unwrap_or(Value::Null),
                requires: c
                    .get("requires")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stores_session_id() {
        let client = RemoteClient::new("http://localhost:3100", Some("abc".to_string()));
        assert_eq!(client.session_id.as_deref(), Some("abc"));
    }
}
