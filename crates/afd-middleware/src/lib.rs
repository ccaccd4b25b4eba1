// SPDX-License-Identifier: MIT OR Apache-2.0
//! The middleware pipeline and invoker: the onion composition that sits
//! between a surface (MCP, CLI, in-process caller) and the command
//! registry's handlers.
//!
//! [`Invoker`] is the single entry point every surface calls through. It
//! enforces a fixed order — exposure gate, schema parse, middleware chain,
//! metadata enrichment — that no [`Middleware`] implementation can
//! reorder or skip.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bundle;
mod invoker;
mod middleware;

/// Rate limiting, retry, OTel-style tracing, and telemetry middleware —
/// opt-in, not part of the default bundle.
pub mod stock;

pub use bundle::{default_bundle, LoggingMiddleware, SlowCommandWarningMiddleware, TraceIdMiddleware};
pub use invoker::Invoker;
pub use middleware::{Middleware, Next};
