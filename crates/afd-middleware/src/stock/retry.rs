// SPDX-License-Identifier: MIT OR Apache-2.0
//! Retry with exponential backoff and full jitter, for handlers that
//! report a retryable failure.

use crate::middleware::{Middleware, Next};
use afd_registry::Context;
use afd_result::CommandResult;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Retries a handler up to `max_attempts` times when it returns a
/// retryable error, sleeping an exponentially growing, jittered delay
/// between attempts. Does not retry on success, on a non-retryable error,
/// or once the context is cancelled.
pub struct RetryMiddleware {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryMiddleware {
    /// `max_attempts` includes the first try; `base_delay` is the delay
    /// before the second attempt, doubling (capped at `max_delay`) on each
    /// subsequent one.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let capped = exp.min(self.max_delay);
        let ceiling_ms = (capped.as_millis().max(1)) as u64;
        let jittered_ms = rand::thread_rng().gen_range(0..=ceiling_ms);
        Duration::from_millis(jittered_ms)
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        let mut attempt = 0;
        loop {
            let result = next.clone().run(ctx.clone(), input.clone()).await;

            let retryable = result
                .error
                .as_ref()
                .map(|e| e.retryable)
                .unwrap_or(false);

            attempt += 1;
            if result.is_success() || !retryable || attempt >= self.max_attempts || ctx.cancellation.is_cancelled() {
                return result;
            }

            let delay = self.backoff(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying command");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = ctx.cancellation.cancelled() => return result,
            }
        }
    }

    fn name(&self) -> &'static str {
        "retry"
    }
}
