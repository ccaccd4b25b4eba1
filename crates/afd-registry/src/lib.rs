// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command definitions and the registry that stores them.
//!
//! Commands are created via [`CommandDefinition::builder`] at program start
//! and registered into a [`CommandRegistry`]; once registered a definition
//! is immutable for the process lifetime. The registry is a singleton per
//! server: populated at startup, read-only during serving.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Cancellation primitives shared by the context and the invoker.
pub mod cancel;
/// Per-invocation context threaded through the middleware chain.
pub mod context;
/// Command definitions and their builder.
pub mod definition;
/// Prerequisite graph acyclicity and reference checks.
pub mod graph;
/// Command name grammar validation.
pub mod name;
/// The command registry itself.
pub mod registry;

pub use cancel::{CancellableRun, CancellationReason, CancellationToken};
pub use context::{Context, Emission, Interface};
pub use definition::{CommandDefinition, CommandDefinitionBuilder, Exposure, Handler, HandlerFuture};
pub use graph::{find_cycle, unresolved_prerequisites};
pub use name::validate_name;
pub use registry::{CommandMetadata, CommandRegistry, ListFilter, RegisterWarning, RegistryError};
