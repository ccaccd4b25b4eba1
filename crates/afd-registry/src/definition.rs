// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command definitions: the immutable records the registry stores.

use crate::context::Context;
use afd_result::CommandResult;
use afd_schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, type-erased handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = CommandResult<Value>> + Send>>;

/// A command's handler: takes already-schema-parsed input and the
/// invocation context, returns a result envelope. Handlers never throw on
/// expected failure paths — they return `error(...)`; a panic is contained
/// by the invoker, not the handler.
pub type Handler = Arc<dyn Fn(Value, Arc<Context>) -> HandlerFuture + Send + Sync>;

/// The four surfaces a command may opt into. Defaults match §3: `palette`
/// and `agent` on by default, `mcp` and `cli` require explicit opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    /// Exposed to a command-palette style UI collaborator.
    pub palette: bool,
    /// Exposed to in-process agent callers.
    pub agent: bool,
    /// Exposed via the MCP `tools/list` / `tools/call` surface.
    pub mcp: bool,
    /// Exposed via the terminal CLI.
    pub cli: bool,
}

impl Default for Exposure {
    fn default() -> Self {
        Self {
            palette: true,
            agent: true,
            mcp: false,
            cli: false,
        }
    }
}

impl Exposure {
    /// Look up exposure for a named interface string (`"mcp"`, `"cli"`,
    /// `"palette"`, `"agent"`). `"direct"` is always exposed — it bypasses
    /// the gate entirely (see [`crate::registry::CommandRegistry`]).
    #[must_use]
    pub fn allows(&self, interface: &str) -> bool {
        match interface {
            "palette" => self.palette,
            "agent" => self.agent,
            "mcp" => self.mcp,
            "cli" => self.cli,
            _ => true,
        }
    }
}

/// An immutable, registered command. Construct with [`CommandDefinition::builder`].
#[derive(Clone)]
pub struct CommandDefinition {
    /// Unique, kebab-case name (see [`crate::name::validate_name`]).
    pub name: String,
    /// Human-readable description, shown by the help/docs bootstrap tools.
    pub description: String,
    /// Input schema used by the invoker before any middleware runs.
    pub input_schema: Arc<Schema>,
    /// The handler invoked once input is parsed and exposure/middleware
    /// have cleared.
    pub handler: Handler,
    /// Grouping used by `listByCategory`, the `grouped` tool strategy, and
    /// the `orphaned-category`/`missing-category` validator rules.
    pub category: Option<String>,
    /// Free-form tags used by `listByTags` and the help bootstrap tool.
    pub tags: BTreeSet<String>,
    /// Whether this command mutates state (surfaced in `_meta` and to
    /// confirmation UIs).
    pub mutation: bool,
    /// Whether this command is destructive and should be confirmed before
    /// the race window described in §4.5 closes.
    pub destructive: bool,
    /// Prompt shown to confirm a destructive action, if any.
    pub confirm_prompt: Option<String>,
    /// Whether an `undoCommand` is expected on successful results.
    pub undoable: bool,
    /// Command version, propagated into `metadata.commandVersion`.
    pub version: Option<String>,
    /// Marks the command for removal; still callable, but flagged in
    /// discovery output.
    pub deprecated: bool,
    /// Whether this command can hand off to a protocol upgrade endpoint
    /// (outside the core; see design notes).
    pub handoff: bool,
    /// Ordered prerequisite command names. Planning metadata only — never
    /// enforced by the invoker, only checked by the surface validator.
    pub requires: Vec<String>,
    /// Per-interface opt-in.
    pub expose: Exposure,
    /// Example invocations, surfaced by the docs bootstrap tool.
    pub examples: Vec<Value>,
    /// Free-text notes on side effects, surfaced by the docs bootstrap tool.
    pub side_effects: Vec<String>,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("mutation", &self.mutation)
            .field("destructive", &self.destructive)
            .field("expose", &self.expose)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandDefinition`]; the only supported way to construct
/// one, matching §9's "replace decorator-based registration with an
/// explicit builder that returns an immutable record."
pub struct CommandDefinitionBuilder {
    name: String,
    description: String,
    input_schema: Arc<Schema>,
    handler: Handler,
    category: Option<String>,
    tags: BTreeSet<String>,
    mutation: bool,
    destructive: bool,
    confirm_prompt: Option<String>,
    undoable: bool,
    version: Option<String>,
    deprecated: bool,
    handoff: bool,
    requires: Vec<String>,
    expose: Exposure,
    examples: Vec<Value>,
    side_effects: Vec<String>,
}

impl CommandDefinition {
    /// Start building a command definition.
    pub fn builder(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Arc<Schema>,
        handler: Handler,
    ) -> CommandDefinitionBuilder {
        CommandDefinitionBuilder {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
            category: None,
            tags: BTreeSet::new(),
            mutation: false,
            destructive: false,
            confirm_prompt: None,
            undoable: false,
            version: None,
            deprecated: false,
            handoff: false,
            requires: Vec::new(),
            expose: Exposure::default(),
            examples: Vec::new(),
            side_effects: Vec::new(),
        }
    }
}

impl CommandDefinitionBuilder {
    /// Set the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add one tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Mark as a mutating command.
    #[must_use]
    pub fn mutation(mut self, mutation: bool) -> Self {
        self.mutation = mutation;
        self
    }

    /// Mark as destructive, with a confirmation prompt.
    #[must_use]
    pub fn destructive(mut self, confirm_prompt: impl Into<String>) -> Self {
        self.destructive = true;
        self.confirm_prompt = Some(confirm_prompt.into());
        self
    }

    /// Mark as undoable.
    #[must_use]
    pub fn undoable(mut self, undoable: bool) -> Self {
        self.undoable = undoable;
        self
    }

    /// Set the command version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Mark as deprecated.
    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Mark as a handoff command.
    #[must_use]
    pub fn handoff(mut self, handoff: bool) -> Self {
        self.handoff = handoff;
        self
    }

    /// Add a prerequisite command name.
    #[must_use]
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    /// Override the exposure map (defaults to palette+agent only).
    #[must_use]
    pub fn expose(mut self, expose: Exposure) -> Self {
        self.expose = expose;
        self
    }

    /// Add an example invocation.
    #[must_use]
    pub fn example(mut self, example: Value) -> Self {
        self.examples.push(example);
        self
    }

    /// Add a side-effect note.
    #[must_use]
    pub fn side_effect(mut self, note: impl Into<String>) -> Self {
        self.side_effects.push(note.into());
        self
    }

    /// Finish building. Does not validate the name or `requires` — that
    /// happens at [`crate::registry::CommandRegistry::register`] time.
    #[must_use]
    pub fn build(self) -> CommandDefinition {
        CommandDefinition {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            handler: self.handler,
            category: self.category,
            tags: self.tags,
            mutation: self.mutation,
            destructive: self.destructive,
            confirm_prompt: self.confirm_prompt,
            undoable: self.undoable,
            version: self.version,
            deprecated: self.deprecated,
            handoff: self.handoff,
            requires: self.requires,
            expose: self.expose,
            examples: self.examples,
            side_effects: self.side_effects,
        }
    }
}
