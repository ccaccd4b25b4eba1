// SPDX-License-Identifier: MIT OR Apache-2.0
//! OpenTelemetry-style span instrumentation via [`tracing`]. A real OTel
//! exporter layer can subscribe to these spans downstream; this crate only
//! produces them.

use crate::middleware::{Middleware, Next};
use afd_registry::Context;
use afd_result::CommandResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{field, Instrument};

/// Opens one `command.invoke` span per call, carrying the command name,
/// trace id, and interface as span fields, and records the outcome on
/// completion.
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        let command = ctx
            .extensions
            .get("commandName")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let span = tracing::info_span!(
            "command.invoke",
            otel.kind = "internal",
            command = %command,
            trace_id = %ctx.trace_id,
            interface = ctx.interface.as_str(),
            outcome = field::Empty,
        );

        async move {
            let result = next.run(ctx, input).await;
            tracing::Span::current().record("outcome", if result.is_success() { "success" } else { "error" });
            result
        }
        .instrument(span)
        .await
    }

    fn name(&self) -> &'static str {
        "otel-tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::{Handler, Interface};
    use afd_result::success;

    #[tokio::test]
    async fn wraps_handler_without_changing_result() {
        let handler: Handler =
            Arc::new(|input, _ctx| Box::pin(async move { success(input) }) as afd_registry::HandlerFuture);
        let chain: Arc<[Arc<dyn Middleware>]> =
            Arc::from(vec![Arc::new(TracingMiddleware) as Arc<dyn Middleware>]);
        let next = Next::new(chain, handler);
        let ctx = Arc::new(Context::new(Interface::Mcp));
        let result = next.run(ctx, serde_json::json!({"x": 1})).await;
        assert_eq!(result.data.unwrap(), serde_json::json!({"x": 1}));
    }
}
