// SPDX-License-Identifier: MIT OR Apache-2.0
//! Thin collaborators (§4.7): an in-process client and the terminal CLI
//! built over it. Both surfaces share the same [`afd_middleware::Invoker`]
//! the MCP server runs — the CLI differs only in tagging every call
//! `context.interface = "cli"` and rendering the result envelope to stdout.

#![deny(unsafe_code)]

pub mod client;
pub mod format;
pub mod remote;
pub mod session;

pub use client::Client;
