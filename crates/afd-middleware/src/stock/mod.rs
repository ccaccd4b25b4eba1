// SPDX-License-Identifier: MIT OR Apache-2.0
//! Optional middleware beyond the default bundle. None of these run unless
//! a caller builds an [`crate::Invoker`] with them explicitly.

mod otel;
mod rate_limit;
mod retry;
mod telemetry;

pub use otel::TracingMiddleware;
pub use rate_limit::RateLimiterMiddleware;
pub use retry::RetryMiddleware;
pub use telemetry::{CounterSink, CounterSnapshot, InvocationEvent, TelemetrySink, TelemetrySinkMiddleware};
