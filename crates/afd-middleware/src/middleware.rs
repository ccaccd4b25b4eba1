// SPDX-License-Identifier: MIT OR Apache-2.0
//! The [`Middleware`] trait and the onion composition that chains
//! instances together around a command handler.

use afd_registry::{Context, Handler};
use afd_result::CommandResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// One layer of the onion. Implementations call `next.run(ctx, input)` to
/// continue the chain, or return a result directly to short-circuit —
/// neither choice requires touching the layers around it.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run this layer, then either continue via `next` or short-circuit.
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value>;

    /// Short name used in tracing spans and error details.
    fn name(&self) -> &'static str;
}

/// The remainder of the middleware chain plus the terminal handler, handed
/// to each [`Middleware::handle`] call. Cloning is cheap — the chain and
/// handler are both reference-counted.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    handler: Handler,
}

impl Next {
    /// Build a `Next` that starts at the first layer of `chain`.
    #[must_use]
    pub fn new(chain: Arc<[Arc<dyn Middleware>]>, handler: Handler) -> Self {
        Self {
            chain,
            index: 0,
            handler,
        }
    }

    /// Run the next layer, or the terminal handler once the chain is
    /// exhausted.
    pub async fn run(self, ctx: Arc<Context>, input: Value) -> CommandResult<Value> {
        match self.chain.get(self.index) {
            Some(layer) => {
                let layer = Arc::clone(layer);
                let next = Next {
                    chain: self.chain,
                    index: self.index + 1,
                    handler: self.handler,
                };
                layer.handle(ctx, input, next).await
            }
            None => (self.handler)(input, ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::Interface;
    use afd_result::success;

    struct Tagging(&'static str);

    #[async_trait]
    impl Middleware for Tagging {
        async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
            let mut result = next.run(ctx, input).await;
            if let Some(data) = result.data.as_mut() {
                if let Some(tags) = data.get_mut("tags").and_then(Value::as_array_mut) {
                    tags.push(Value::String(self.0.to_string()));
                }
            }
            result
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn echo_handler() -> Handler {
        Arc::new(|input, _ctx| {
            Box::pin(async move { success(serde_json::json!({"tags": [], "echo": input})) })
                as afd_registry::HandlerFuture
        })
    }

    #[tokio::test]
    async fn chain_runs_layers_outermost_first() {
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![
            Arc::new(Tagging("outer")) as Arc<dyn Middleware>,
            Arc::new(Tagging("inner")) as Arc<dyn Middleware>,
        ]);
        let next = Next::new(chain, echo_handler());
        let ctx = Arc::new(Context::new(Interface::Direct));
        let result = next.run(ctx, Value::Null).await;
        let tags = result.data.unwrap()["tags"].clone();
        // inner runs closer to the handler, so it appends first.
        assert_eq!(tags, serde_json::json!(["inner", "outer"]));
    }

    #[tokio::test]
    async fn empty_chain_calls_handler_directly() {
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(Vec::new());
        let next = Next::new(chain, echo_handler());
        let ctx = Arc::new(Context::new(Interface::Direct));
        let result = next.run(ctx, serde_json::json!(42)).await;
        assert_eq!(result.data.unwrap()["echo"], serde_json::json!(42));
    }
}
