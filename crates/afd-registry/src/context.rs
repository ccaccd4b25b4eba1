// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-invocation context threaded through the middleware chain.

use crate::cancel::CancellationToken;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;

/// Which surface originated an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    /// Model Context Protocol (JSON-RPC/SSE) server.
    Mcp,
    /// Terminal CLI.
    Cli,
    /// Command palette (UI collaborator, outside the core).
    Palette,
    /// A non-MCP agent integration calling in-process.
    Agent,
    /// Direct in-process call with no surface attached.
    Direct,
}

impl Interface {
    /// Lowercase wire name, matching the `expose` map's keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcp => "mcp",
            Self::Cli => "cli",
            Self::Palette => "palette",
            Self::Agent => "agent",
            Self::Direct => "direct",
        }
    }
}

/// A single streamed progress event emitted by a handler via
/// [`Context::emit`] (`tool_start` / `token` / `tool_end` are framework
/// emitted; handlers typically only emit `token`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emission {
    /// Event type, e.g. `"token"`.
    pub event: String,
    /// Event payload.
    pub payload: serde_json::Value,
}

/// Per-invocation state, created fresh for each call and destroyed when the
/// middleware chain returns. Mutable through the chain; immutable once the
/// invoker has produced a result.
pub struct Context {
    /// Correlates logs, SSE frames, and the returned result.
    pub trace_id: String,
    /// Caller identity, if known. Never required.
    pub user_id: Option<String>,
    /// Which surface is calling.
    pub interface: Interface,
    /// Cooperative cancellation signal, raced by middleware and handlers
    /// against long-running work.
    pub cancellation: CancellationToken,
    /// Optional wall-clock deadline; enforced by a deadline middleware, not
    /// by the invoker itself.
    pub deadline: Option<Instant>,
    /// Open extension map for middleware to stash request-scoped state.
    pub extensions: HashMap<String, serde_json::Value>,
    emit_tx: Option<mpsc::UnboundedSender<Emission>>,
}

impl Context {
    /// Create a new context for the given interface with a fresh trace id.
    #[must_use]
    pub fn new(interface: Interface) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            interface,
            cancellation: CancellationToken::new(),
            deadline: None,
            extensions: HashMap::new(),
            emit_tx: None,
        }
    }

    /// Attach a channel that [`Context::emit`] forwards to; used by the MCP
    /// server to turn handler-driven progress into SSE `token` frames.
    #[must_use]
    pub fn with_emitter(mut self, tx: mpsc::UnboundedSender<Emission>) -> Self {
        self.emit_tx = Some(tx);
        self
    }

    /// Emit a progress event. A no-op (never an error) when no emitter is
    /// attached, e.g. for in-process or CLI invocations.
    pub fn emit(&self, event: impl Into<String>, payload: serde_json::Value) {
        if let Some(tx) = &self.emit_tx {
            let _ = tx.send(Emission {
                event: event.into(),
                payload,
            });
        }
    }

    /// `true` if an emitter is attached (i.e. streaming is possible).
    #[must_use]
    pub fn can_emit(&self) -> bool {
        self.emit_tx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_fresh_trace_id() {
        let a = Context::new(Interface::Mcp);
        let b = Context::new(Interface::Mcp);
        assert_ne!(a.trace_id, b.trace_id);
    }

    #[test]
    fn emit_without_emitter_is_noop() {
        let ctx = Context::new(Interface::Direct);
        assert!(!ctx.can_emit());
        ctx.emit("token", serde_json::json!({"text": "hi"}));
    }

    #[test]
    fn emit_with_emitter_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = Context::new(Interface::Mcp).with_emitter(tx);
        assert!(ctx.can_emit());
        ctx.emit("token", serde_json::json!({"text": "hi"}));
        let received = rx.try_recv().unwrap();
        assert_eq!(received.event, "token");
    }

    #[test]
    fn interface_as_str_matches_expose_map_keys() {
        assert_eq!(Interface::Mcp.as_str(), "mcp");
        assert_eq!(Interface::Cli.as_str(), "cli");
        assert_eq!(Interface::Palette.as_str(), "palette");
        assert_eq!(Interface::Agent.as_str(), "agent");
    }
}
