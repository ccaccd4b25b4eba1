// SPDX-License-Identifier: MIT OR Apache-2.0
//! The [`Invoker`]: the single point through which every command call
//! passes, regardless of which surface originated it.
//!
//! Call order is fixed and not configurable per-command: exposure gate,
//! schema parse, middleware chain (wrapping the handler), then metadata
//! enrichment. A handler panic is contained and reported as
//! `COMMAND_EXECUTION_ERROR` rather than unwinding into the caller.

use crate::middleware::{Middleware, Next};
use afd_error::CommandError;
use afd_registry::{CommandRegistry, Context, HandlerFuture};
use afd_result::{error, CommandResult};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Chains zero or more [`Middleware`] layers around the command registry's
/// handlers and enforces the fixed call order every invocation goes
/// through.
///
/// ```
/// use afd_middleware::Invoker;
/// use afd_registry::CommandRegistry;
/// use std::sync::Arc;
///
/// let registry = Arc::new(CommandRegistry::new());
/// let invoker = Invoker::new(registry);
/// ```
pub struct Invoker {
    registry: Arc<CommandRegistry>,
    chain: Arc<[Arc<dyn Middleware>]>,
}

impl Invoker {
    /// Build an invoker with the default middleware bundle (see
    /// [`crate::default_bundle`]).
    #[must_use]
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self::with_middleware(registry, crate::default_bundle())
    }

    /// Build an invoker with an explicit middleware stack, outermost layer
    /// first.
    #[must_use]
    pub fn with_middleware(registry: Arc<CommandRegistry>, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            registry,
            chain: Arc::from(middleware),
        }
    }

    /// Invoke a command by name.
    ///
    /// `ctx.interface` gates exposure before `raw_input` is parsed against
    /// the command's schema; a parse failure short-circuits before any
    /// middleware runs. Metadata (`executionTimeMs`, `commandVersion`,
    /// `traceId`) is attached to every envelope this returns, overwriting
    /// whatever the handler or middleware set. `executionTimeMs` measures
    /// the handler alone, not the exposure gate, schema parse, or
    /// middleware chain — the slow-command middleware is what observes
    /// that broader span.
    pub async fn invoke(&self, name: &str, raw_input: Value, ctx: Context) -> CommandResult<Value> {
        let trace_id = ctx.trace_id.clone();
        let interface = ctx.interface.as_str();

        let Some(def) = self.registry.get(name) else {
            return self.finish(error(CommandError::command_not_found(name)), Duration::ZERO, None, trace_id);
        };

        if !def.expose.allows(interface) {
            warn!(command = name, interface, "command not exposed on this interface");
            return self.finish(
                error(CommandError::command_not_exposed(name, interface)),
                Duration::ZERO,
                def.version.clone(),
                trace_id,
            );
        }

        if ctx.cancellation.is_cancelled() {
            return self.finish(error(CommandError::cancelled()), Duration::ZERO, def.version.clone(), trace_id);
        }

        let parsed = if def.input_schema.is_valid(&raw_input) {
            raw_input
        } else {
            let messages = match def.input_schema.parse::<Value>(&raw_input) {
                afd_schema::ParseOutcome::Err(messages) => messages,
                afd_schema::ParseOutcome::Ok(_) => Vec::new(),
            };
            let err = CommandError::validation(format!("input for '{name}' failed schema validation"))
                .with_details("validationErrors", messages);
            return self.finish(error(err), Duration::ZERO, def.version.clone(), trace_id);
        };

        debug!(command = name, interface, "invoking");

        let handler_elapsed: Arc<Mutex<Duration>> = Arc::new(Mutex::new(Duration::ZERO));
        let timed_handler = time_handler(def.handler.clone(), handler_elapsed.clone());
        let next = Next::new(self.chain.clone(), timed_handler);
        let ctx = Arc::new(ctx);

        let outcome = AssertUnwindSafe(next.run(ctx.clone(), parsed)).catch_unwind().await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&panic);
                warn!(command = name, panic = %message, "handler panicked");
                error(CommandError::execution_error(message))
            }
        };

        let result = if ctx.cancellation.is_cancelled() && result.is_success() {
            error(CommandError::cancelled())
        } else {
            result
        };

        let elapsed = *handler_elapsed.lock().unwrap();
        self.finish(result, elapsed, def.version.clone(), trace_id)
    }

    fn finish(
        &self,
        mut result: CommandResult<Value>,
        handler_elapsed: Duration,
        command_version: Option<String>,
        trace_id: String,
    ) -> CommandResult<Value> {
        let mut metadata = result.metadata.take().unwrap_or_default();
        metadata.execution_time_ms =
            Some(u64::try_from(handler_elapsed.as_millis()).unwrap_or(u64::MAX));
        metadata.command_version = command_version;
        metadata.trace_id = Some(trace_id);
        result.metadata = Some(metadata);
        result
    }
}

/// Wrap `handler` so its wall time alone — not the middleware around it —
/// lands in `elapsed` once it returns.
fn time_handler(handler: afd_registry::Handler, elapsed: Arc<Mutex<Duration>>) -> afd_registry::Handler {
    Arc::new(move |input: Value, ctx: Arc<Context>| {
        let handler = handler.clone();
        let elapsed = elapsed.clone();
        Box::pin(async move {
            let started = Instant::now();
            let result = handler(input, ctx).await;
            *elapsed.lock().unwrap() = started.elapsed();
            result
        }) as HandlerFuture
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "command handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::{CommandDefinition, Interface};
    use afd_result::success;
    use afd_schema::Schema;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_value(serde_json::json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"],
        })).unwrap())
    }

    fn registry_with_one() -> Arc<CommandRegistry> {
        let mut reg = CommandRegistry::new();
        let handler = Arc::new(|input: Value, _ctx: Arc<Context>| {
            Box::pin(async move { success(input) }) as afd_registry::HandlerFuture
        });
        reg.register(CommandDefinition::builder("todo-echo", "echo input", schema(), handler).build())
            .unwrap();
        Arc::new(reg)
    }

    #[tokio::test]
    async fn invoke_unknown_command_returns_command_not_found() {
        let invoker = Invoker::new(registry_with_one());
        let ctx = Context::new(Interface::Direct);
        let result = invoker.invoke("todo-missing", Value::Null, ctx).await;
        assert!(result.is_failure());
        assert_eq!(result.error.unwrap().code, "COMMAND_NOT_FOUND");
    }

    #[tokio::test]
    async fn invoke_not_exposed_on_interface_short_circuits_before_schema() {
        let invoker = Invoker::new(registry_with_one());
        let ctx = Context::new(Interface::Mcp);
        // Invalid against the schema too, but exposure is checked first.
        let result = invoker.invoke("todo-echo", Value::Null, ctx).await;
        assert_eq!(result.error.unwrap().code, "COMMAND_NOT_EXPOSED");
    }

    #[tokio::test]
    async fn invoke_invalid_input_returns_validation_error() {
        let invoker = Invoker::new(registry_with_one());
        let ctx = Context::new(Interface::Agent);
        let result = invoker.invoke("todo-echo", serde_json::json!({}), ctx).await;
        assert_eq!(result.error.unwrap().code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn invoke_success_populates_metadata() {
        let invoker = Invoker::new(registry_with_one());
        let ctx = Context::new(Interface::Agent);
        let result = invoker
            .invoke("todo-echo", serde_json::json!({"name": "a"}), ctx)
            .await;
        assert!(result.is_success());
        let metadata = result.metadata.unwrap();
        assert!(metadata.trace_id.is_some());
    }

    #[tokio::test]
    async fn invoke_contains_handler_panic() {
        let mut reg = CommandRegistry::new();
        let handler = Arc::new(|_input: Value, _ctx: Arc<Context>| {
            Box::pin(async move { panic!("boom") }) as afd_registry::HandlerFuture
        });
        reg.register(CommandDefinition::builder("todo-boom", "panics", schema(), handler).build())
            .unwrap();
        let invoker = Invoker::new(Arc::new(reg));
        let ctx = Context::new(Interface::Agent);
        let result = invoker
            .invoke("todo-boom", serde_json::json!({"name": "a"}), ctx)
            .await;
        assert_eq!(result.error.unwrap().code, "COMMAND_EXECUTION_ERROR");
    }
}
