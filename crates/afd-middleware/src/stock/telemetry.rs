// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fire-and-forget telemetry sink. A [`TelemetrySink`] implementation must
//! never fail the invocation it's observing — [`TelemetrySinkMiddleware`]
//! only calls it after the result is already decided and discards whatever
//! the sink does with it.

use crate::middleware::{Middleware, Next};
use afd_registry::Context;
use afd_result::CommandResult;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Arc;
use std::time::Instant;

/// One completed invocation, handed to every [`TelemetrySink::record`] call.
#[derive(Debug, Clone)]
pub struct InvocationEvent {
    /// Command name, or `"unknown"` if the invoker didn't stamp one.
    pub command: String,
    /// Which surface originated the call.
    pub interface: &'static str,
    /// Whether the envelope returned `success: true`.
    pub success: bool,
    /// Wall-clock handler duration.
    pub duration_ms: u64,
}

/// Receives [`InvocationEvent`]s. Implementations must not panic or block
/// indefinitely — [`TelemetrySinkMiddleware`] does not isolate slow sinks
/// from the invocation it instruments.
pub trait TelemetrySink: Send + Sync {
    /// Record one completed invocation.
    fn record(&self, event: InvocationEvent);
}

/// Wraps a [`TelemetrySink`], invoking it after every call completes.
pub struct TelemetrySinkMiddleware {
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetrySinkMiddleware {
    /// Wrap `sink` for use in a middleware chain.
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Middleware for TelemetrySinkMiddleware {
    async fn handle(&self, ctx: Arc<Context>, input: Value, next: Next) -> CommandResult<Value> {
        let command = ctx
            .extensions
            .get("commandName")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let interface = ctx.interface.as_str();
        let started = Instant::now();

        let result = next.run(ctx, input).await;

        let event = InvocationEvent {
            command,
            interface,
            success: result.is_success(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        // Fire-and-forget: a sink implementation must not panic, but we
        // don't let its return value (there isn't one) affect the result.
        self.sink.record(event);
        result
    }

    fn name(&self) -> &'static str {
        "telemetry-sink"
    }
}

/// Atomic, process-wide invocation counters. A minimal [`TelemetrySink`]
/// implementation useful for tests and simple deployments; production
/// deployments typically forward [`InvocationEvent`]s to an external metrics
/// backend instead.
#[derive(Default)]
pub struct CounterSink {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cumulative_duration_ms: AtomicU64,
}

impl CounterSink {
    /// Create a zero-initialised counter sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        let total = self.total.load(Relaxed);
        let cumulative = self.cumulative_duration_ms.load(Relaxed);
        CounterSnapshot {
            total,
            succeeded: self.succeeded.load(Relaxed),
            failed: self.failed.load(Relaxed),
            average_duration_ms: if total == 0 { 0 } else { cumulative / total },
        }
    }
}

impl TelemetrySink for CounterSink {
    fn record(&self, event: InvocationEvent) {
        self.total.fetch_add(1, Relaxed);
        if event.success {
            self.succeeded.fetch_add(1, Relaxed);
        } else {
            self.failed.fetch_add(1, Relaxed);
        }
        self.cumulative_duration_ms.fetch_add(event.duration_ms, Relaxed);
    }
}

/// Serialisable snapshot of [`CounterSink`].
#[derive(Debug, Clone, Serialize)]
pub struct CounterSnapshot {
    /// Total invocations recorded.
    pub total: u64,
    /// Invocations that returned `success: true`.
    pub succeeded: u64,
    /// Invocations that returned `success: false`.
    pub failed: u64,
    /// Running average handler duration in milliseconds.
    pub average_duration_ms: u64,
}
