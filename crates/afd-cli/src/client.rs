// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-process client (§4.7): the same invoker the MCP server runs, without
//! any JSON-RPC encode/decode in between.

use afd_middleware::Invoker;
use afd_registry::{CommandRegistry, Context, Interface};
use afd_result::CommandResult;
use serde_json::Value;
use std::sync::Arc;

/// Calls commands directly against a shared [`Invoker`], tagging every
/// invocation with [`Interface::Cli`] so `expose.cli == false` commands are
/// blocked exactly as they would be from the terminal.
pub struct Client {
    invoker: Arc<Invoker>,
    registry: Arc<CommandRegistry>,
}

impl Client {
    /// Build a client over an already-constructed registry and invoker.
    #[must_use]
    pub fn new(registry: Arc<CommandRegistry>, invoker: Arc<Invoker>) -> Self {
        Self { invoker, registry }
    }

    /// The registry this client calls through, for discovery (`tools`,
    /// `validate --surface`).
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Invoke one command by name, running the full middleware chain.
    pub async fn call(&self, name: &str, input: Value) -> CommandResult<Value> {
        let ctx = Context::new(Interface::Cli);
        self.invoker.invoke(name, input, ctx).await
    }

    /// Thread `input` through each command name in turn, feeding the
    /// previous step's `data` as the next step's input. Stops and returns
    /// immediately on the first failing step.
    pub async fn pipe(&self, names: &[&str], input: Value) -> CommandResult<Value> {
        let mut current = input;
        let mut result = afd_result::success(current.clone());
        for name in names {
            result = self.call(name, current).await;
            if !result.is_success() {
                return result;
            }
            current = result.data.clone().unwrap_or(Value::Null);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::{CommandDefinition, Exposure, HandlerFuture};
    use afd_result::success;
    use afd_schema::Schema;

    fn echo_registry() -> (Arc<CommandRegistry>, Arc<Invoker>) {
        let mut reg = CommandRegistry::new();
        let schema = Arc::new(Schema::from_value(serde_json::json!({"type": "object"})).unwrap());
        let handler: afd_registry::Handler = Arc::new(|input, _ctx| Box::pin(async move { success(input) }) as HandlerFuture);
        reg.register(
            CommandDefinition::builder("todo-echo", "echoes input", schema.clone(), handler.clone())
                .expose(Exposure { palette: false, agent: false, mcp: false, cli: true })
                .build(),
        )
        .unwrap();
        reg.register(
            CommandDefinition::builder("todo-hidden", "not exposed to cli", schema, handler)
                .expose(Exposure { palette: true, agent: true, mcp: true, cli: false })
                .build(),
        )
        .unwrap();
        let registry = Arc::new(reg);
        let invoker = Arc::new(Invoker::new(registry.clone()));
        (registry, invoker)
    }

    #[tokio::test]
    async fn call_invokes_cli_exposed_command() {
        let (registry, invoker) = echo_registry();
        let client = Client::new(registry, invoker);
        let result = client.call("todo-echo", serde_json::json!({"a": 1})).await;
        assert!(result.is_success());
        assert_eq!(result.data.unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn call_blocks_command_not_exposed_to_cli() {
        let (registry, invoker) = echo_registry();
        let client = Client::new(registry, invoker);
        let result = client.call("todo-hidden", Value::Null).await;
        assert_eq!(result.error.unwrap().code, "COMMAND_NOT_EXPOSED");
    }

    #[tokio::test]
    async fn pipe_threads_data_between_steps() {
        let (registry, invoker) = echo_registry();
        let client = Client::new(registry, invoker);
        let result = client.pipe(&["todo-echo", "todo-echo"], serde_json::json!({"n": 1})).await;
        assert!(result.is_success());
        assert_eq!(result.data.unwrap()["n"], 1);
    }

    #[tokio::test]
    async fn pipe_stops_on_first_failure() {
        let (registry, invoker) = echo_registry();
        let client = Client::new(registry, invoker);
        let result = client.pipe(&["todo-hidden", "todo-echo"], Value::Null).await;
        assert_eq!(result.error.unwrap().code, "COMMAND_NOT_EXPOSED");
    }
}
