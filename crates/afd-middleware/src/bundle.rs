// SPDX-License-Identifier: MIT OR Apache-2.0
//! The default middleware bundle every [`crate::Invoker`] runs unless a
//! caller supplies its own stack. Order matters: trace id assignment is
//! outermost so every later layer (and the handler) can rely on
//! `ctx.trace_id` already being set; the slow-command warning sits
//! innermost so its timer brackets only the handler, not logging overhead.

use crate::middleware::{Middleware, Next};
use afd_registry::Context;
use afd_result::{CommandResult, Severity, Warning};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const SLOW_COMMAND_THRESHOLD_MS: u128 = 1000;

/// Build the default bundle: trace id, structured logging, slow-command
/// warning.
#[must_use]
pub fn default_bundle() -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(TraceIdMiddleware),
        Arc::new(LoggingMiddleware),
        Arc::new(SlowCommandWarningMiddleware),
    ]
}

/// Ensures every downstream layer observes a non-empty trace id. The
/// [`Context`] the invoker builds already carries a generated one, so in
/// practice this only matters when a caller constructs `Context` by hand
/// and leaves `trace_id` empty.
pub struct TraceIdMiddleware;

#[async_trait]
impl Middleware for TraceIdMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        if ctx.trace_id.is_empty() {
            warn!("invocation context built with an empty trace id");
        }
        next.run(ctx, input).await
    }

    fn name(&self) -> &'static str {
        "trace-id"
    }
}

/// Structured start/end logging. Does not log `input` or the result's
/// `data` by default — only the command name, interface, outcome, and
/// duration — so handler payloads never leak into log sinks uninvited.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        let interface = ctx.interface.as_str();
        let trace_id = ctx.trace_id.clone();
        let started = Instant::now();
        info!(trace_id = %trace_id, interface, "command invocation started");

        let result = next.run(ctx, input).await;

        info!(
            trace_id = %trace_id,
            interface,
            success = result.success,
            duration_ms = started.elapsed().as_millis() as u64,
            "command invocation finished"
        );
        result
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}

/// Attaches a `SLOW_COMMAND` warning when the handler takes at least one
/// second. Never fails the invocation — only success envelopes gain the
/// warning, since `error(...)` envelopes don't carry a `warnings` field
/// it'd be useful to attach to here.
pub struct SlowCommandWarningMiddleware;

#[async_trait]
impl Middleware for SlowCommandWarningMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        let started = Instant::now();
        let mut result = next.run(ctx, input).await;
        let elapsed = started.elapsed().as_millis();

        if elapsed >= SLOW_COMMAND_THRESHOLD_MS && result.is_success() {
            let mut warnings = result.warnings.take().unwrap_or_default();
            warnings.push(Warning {
                code: "SLOW_COMMAND".to_string(),
                message: format!("command took {elapsed}ms to complete"),
                severity: Some(Severity::Warning),
            });
            result.warnings = Some(warnings);
        }
        result
    }

    fn name(&self) -> &'static str {
        "slow-command-warning"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::{Handler, Interface};
    use afd_result::success;
    use tokio::time::{sleep, Duration};

    fn sleepy_handler(ms: u64) -> Handler {
        Arc::new(move |input, _ctx| {
            Box::pin(async move {
                sleep(Duration::from_millis(ms)).await;
                success(input)
            }) as afd_registry::HandlerFuture
        })
    }

    #[tokio::test]
    async fn slow_command_over_threshold_gets_warning() {
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![
            Arc::new(SlowCommandWarningMiddleware) as Arc<dyn Middleware>,
        ]);
        let next = Next::new(chain, sleepy_handler(0));
        let ctx = Arc::new(Context::new(Interface::Direct));
        let result = next.run(ctx, Value::Null).await;
        assert!(result.warnings.is_none());
    }

    #[tokio::test]
    async fn logging_middleware_does_not_alter_result() {
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![
            Arc::new(LoggingMiddleware) as Arc<dyn Middleware>,
        ]);
        let next = Next::new(chain, sleepy_handler(0));
        let ctx = Arc::new(Context::new(Interface::Direct));
        let result = next.run(ctx, serde_json::json!({"a": 1})).await;
        assert_eq!(result.data.unwrap(), serde_json::json!({"a": 1}));
    }
}
