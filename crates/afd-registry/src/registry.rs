// SPDX-License-Identifier: MIT OR Apache-2.0
//! The command registry: stores immutable [`CommandDefinition`]s and
//! provides listing, filtering, and exposure checks.

use crate::definition::CommandDefinition;
use crate::name::validate_name;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Failure modes for [`CommandRegistry::register`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A command with this name is already registered.
    #[error("command '{0}' is already registered")]
    Duplicate(String),
    /// The name does not match the kebab-case grammar.
    #[error("command name '{0}' is invalid: {1}")]
    InvalidName(String, String),
}

/// Non-fatal issue surfaced by [`CommandRegistry::register`] without
/// rejecting the registration — hard failure on dangling `requires` is left
/// to the surface validator, per §4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterWarning {
    /// Name of the command that produced the warning.
    pub command: String,
    /// Human-readable description.
    pub message: String,
}

/// Lightweight metadata snapshot for discovery output, independent of the
/// handler closure.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    /// See [`CommandDefinition::name`].
    pub name: String,
    /// See [`CommandDefinition::description`].
    pub description: String,
    /// See [`CommandDefinition::category`].
    pub category: Option<String>,
    /// See [`CommandDefinition::tags`].
    pub tags: Vec<String>,
    /// See [`CommandDefinition::mutation`].
    pub mutation: bool,
    /// See [`CommandDefinition::requires`].
    pub requires: Vec<String>,
}

impl From<&CommandDefinition> for CommandMetadata {
    fn from(def: &CommandDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            category: def.category.clone(),
            tags: def.tags.iter().cloned().collect(),
            mutation: def.mutation,
            requires: def.requires.clone(),
        }
    }
}

/// A filter applied by [`CommandRegistry::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Restrict to one category.
    pub category: Option<String>,
    /// Restrict to commands carrying all of these tags.
    pub tags: Vec<String>,
    /// Restrict to commands exposed on this interface.
    pub exposure: Option<String>,
}

/// Stores registered command definitions. A singleton per server: populated
/// once at startup, read-only during serving.
#[derive(Default)]
pub struct CommandRegistry {
    order: Vec<CommandDefinition>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command definition, freezing it for the process lifetime.
    ///
    /// Rejects duplicate names and invalid name grammar. Dangling `requires`
    /// references are reported as [`RegisterWarning`]s, not rejected — hard
    /// failure on those is the surface validator's job (§4.3, §4.6).
    pub fn register(
        &mut self,
        def: CommandDefinition,
    ) -> Result<Vec<RegisterWarning>, RegistryError> {
        validate_name(&def.name)
            .map_err(|reason| RegistryError::InvalidName(def.name.clone(), reason))?;

        if self.index.contains_key(&def.name) {
            return Err(RegistryError::Duplicate(def.name.clone()));
        }

        let mut warnings = Vec::new();
        for req in &def.requires {
            if !self.index.contains_key(req) && req != &def.name {
                warnings.push(RegisterWarning {
                    command: def.name.clone(),
                    message: format!("requires unregistered command '{req}'"),
                });
            }
        }

        let idx = self.order.len();
        self.index.insert(def.name.clone(), idx);
        self.order.push(def);
        Ok(warnings)
    }

    /// Look up a command by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.index.get(name).map(|&idx| &self.order[idx])
    }

    /// List all commands, in registration order, optionally filtered.
    #[must_use]
    pub fn list(&self, filter: Option<&ListFilter>) -> Vec<&CommandDefinition> {
        self.order
            .iter()
            .filter(|def| match filter {
                None => true,
                Some(f) => {
                    let category_ok = f
                        .category
                        .as_ref()
                        .is_none_or(|c| def.category.as_deref() == Some(c.as_str()));
                    let tags_ok = f.tags.iter().all(|t| def.tags.contains(t));
                    let exposure_ok = f
                        .exposure
                        .as_ref()
                        .is_none_or(|iface| def.expose.allows(iface));
                    category_ok && tags_ok && exposure_ok
                }
            })
            .collect()
    }

    /// Commands exposed on the given interface, in registration order.
    #[must_use]
    pub fn list_by_exposure(&self, interface: &str) -> Vec<&CommandDefinition> {
        self.order
            .iter()
            .filter(|def| def.expose.allows(interface))
            .collect()
    }

    /// Commands in the given category, in registration order.
    #[must_use]
    pub fn list_by_category(&self, category: &str) -> Vec<&CommandDefinition> {
        self.order
            .iter()
            .filter(|def| def.category.as_deref() == Some(category))
            .collect()
    }

    /// Commands carrying every one of the given tags, in registration order.
    #[must_use]
    pub fn list_by_tags(&self, tags: &[&str]) -> Vec<&CommandDefinition> {
        self.order
            .iter()
            .filter(|def| tags.iter().all(|t| def.tags.contains(*t)))
            .collect()
    }

    /// All registered category names, without duplicates, in first-seen
    /// order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for def in &self.order {
            if let Some(cat) = &def.category {
                if seen.insert(cat.clone()) {
                    out.push(cat.clone());
                }
            }
        }
        out
    }

    /// Metadata for every registered command, in registration order.
    #[must_use]
    pub fn list_commands_with_metadata(&self) -> Vec<CommandMetadata> {
        self.order.iter().map(CommandMetadata::from).collect()
    }

    /// Metadata for one command, if registered.
    #[must_use]
    pub fn get_command_metadata(&self, name: &str) -> Option<CommandMetadata> {
        self.get(name).map(CommandMetadata::from)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// `true` if no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `true` if a command by this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::CommandDefinition;
    use afd_result::success;
    use afd_schema::Schema;
    use serde_json::Value;
    use std::sync::Arc;

    fn def(name: &str) -> CommandDefinition {
        let schema = Arc::new(Schema::from_value(serde_json::json!({"type": "object"})).unwrap());
        let handler = Arc::new(|_input, _ctx| {
            Box::pin(async { success(Value::Null) }) as crate::definition::HandlerFuture
        });
        CommandDefinition::builder(name, "desc", schema, handler).build()
    }

    #[test]
    fn register_and_get_round_trips() {
        let mut reg = CommandRegistry::new();
        reg.register(def("todo-list")).unwrap();
        assert!(reg.get("todo-list").is_some());
        assert_eq!(reg.get("todo-list").unwrap().name, "todo-list");
    }

    #[test]
    fn register_rejects_duplicate() {
        let mut reg = CommandRegistry::new();
        reg.register(def("todo-list")).unwrap();
        let err = reg.register(def("todo-list")).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("todo-list".to_string()));
    }

    #[test]
    fn register_rejects_invalid_name() {
        let mut reg = CommandRegistry::new();
        let err = reg.register(def("Todo.Create")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName(_, _)));
    }

    #[test]
    fn register_warns_on_dangling_requires_but_succeeds() {
        let mut reg = CommandRegistry::new();
        let mut d = def("todo-archive");
        d.requires = vec!["todo-create".to_string()];
        let warnings = reg.register(d).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(reg.contains("todo-archive"));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut reg = CommandRegistry::new();
        reg.register(def("todo-delete")).unwrap();
        reg.register(def("todo-create")).unwrap();
        reg.register(def("todo-list")).unwrap();
        let names: Vec<&str> = reg.list(None).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["todo-delete", "todo-create", "todo-list"]);
    }

    #[test]
    fn list_by_exposure_filters_correctly() {
        let mut reg = CommandRegistry::new();
        let mut exposed = def("todo-list");
        exposed.expose.mcp = true;
        reg.register(exposed).unwrap();
        reg.register(def("todo-internal")).unwrap();

        let mcp_commands = reg.list_by_exposure("mcp");
        assert_eq!(mcp_commands.len(), 1);
        assert_eq!(mcp_commands[0].name, "todo-list");
    }

    #[test]
    fn categories_deduplicates_in_first_seen_order() {
        let mut reg = CommandRegistry::new();
        let mut a = def("todo-create");
        a.category = Some("write".to_string());
        let mut b = def("todo-list");
        b.category = Some("read".to_string());
        let mut c = def("todo-delete");
        c.category = Some("write".to_string());
        reg.register(a).unwrap();
        reg.register(b).unwrap();
        reg.register(c).unwrap();
        assert_eq!(reg.categories(), vec!["write".to_string(), "read".to_string()]);
    }

    #[test]
    fn empty_registry_reports_empty() {
        let reg = CommandRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
    }
}
