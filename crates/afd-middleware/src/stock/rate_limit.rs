// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sliding-window rate limiting, keyed by command name.

use crate::middleware::{Middleware, Next};
use afd_error::CommandError;
use afd_registry::Context;
use afd_result::{error, CommandResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Rejects invocations once a command has been called `max_requests` times
/// within the trailing `window`, returning `RATE_LIMITED` (retryable).
pub struct RateLimiterMiddleware {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiterMiddleware {
    /// Allow up to `max_requests` calls to the same command within `window`.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    async fn check(&self, command: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.windows.lock().await;
        let timestamps = guard.entry(command.to_string()).or_default();

        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() as u32 >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }
}

#[async_trait]
impl Middleware for RateLimiterMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        let command = ctx
            .extensions
            .get("commandName")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        if !self.check(&command).await {
            return error(
                CommandError::rate_limited(format!("rate limit exceeded for '{command}'"))
                    .with_retryable(true),
            );
        }
        next.run(ctx, input).await
    }

    fn name(&self) -> &'static str {
        "rate-limiter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::{Handler, Interface};
    use afd_result::success;

    fn echo_handler() -> Handler {
        Arc::new(|input, _ctx| Box::pin(async move { success(input) }) as afd_registry::HandlerFuture)
    }

    fn ctx_for(command: &str) -> Arc<Context> {
        let mut ctx = Context::new(Interface::Mcp);
        ctx.extensions
            .insert("commandName".to_string(), Value::String(command.to_string()));
        Arc::new(ctx)
    }

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let limiter = RateLimiterMiddleware::new(2, Duration::from_secs(60));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![Arc::new(limiter) as Arc<dyn Middleware>]);
        for _ in 0..2 {
            let next = Next::new(chain.clone(), echo_handler());
            let result = next.run(ctx_for("todo-list"), Value::Null).await;
            assert!(result.is_success());
        }
    }

    #[tokio::test]
    async fn rejects_once_the_window_is_full() {
        let limiter = RateLimiterMiddleware::new(1, Duration::from_secs(60));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![Arc::new(limiter) as Arc<dyn Middleware>]);

        let next = Next::new(chain.clone(), echo_handler());
        assert!(next.run(ctx_for("todo-list"), Value::Null).await.is_success());

        let next = Next::new(chain.clone(), echo_handler());
        let result = next.run(ctx_for("todo-list"), Value::Null).await;
        assert_eq!(result.error.unwrap().code, "RATE_LIMITED");
    }

    #[tokio::test]
    async fn tracks_limits_per_command_independently() {
        let limiter = RateLimiterMiddleware::new(1, Duration::from_secs(60));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![Arc::new(limiter) as Arc<dyn Middleware>]);

        let next = Next::new(chain.clone(), echo_handler());
        assert!(next.run(ctx_for("todo-list"), Value::Null).await.is_success());

        let next = Next::new(chain.clone(), echo_handler());
        assert!(next.run(ctx_for("todo-create"), Value::Null).await.is_success());
    }
}
