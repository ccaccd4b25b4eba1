// SPDX-License-Identifier: MIT OR Apache-2.0
//! Projects the command registry onto MCP `tools/list` output, under either
//! tool strategy (§4.5).

use afd_registry::CommandRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How the registry is advertised to `tools/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStrategy {
    /// One tool per command. Default for small surfaces.
    Individual,
    /// One tool per category, discriminated by `{action, args}`.
    Grouped,
}

impl ToolStrategy {
    /// `individual` below this many exposed commands, `grouped` at or above
    /// it. Purely a default heuristic — servers may force either strategy.
    pub const AUTO_GROUPING_THRESHOLD: usize = 20;

    /// Pick a strategy from the number of MCP-exposed commands.
    #[must_use]
    pub fn auto(exposed_count: usize) -> Self {
        if exposed_count >= Self::AUTO_GROUPING_THRESHOLD {
            Self::Grouped
        } else {
            Self::Individual
        }
    }
}

/// One entry in a `tools/list` response.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Tool name: the command name under `individual`, the category under
    /// `grouped`.
    pub name: String,
    /// Description shown to the calling agent.
    pub description: String,
    #[serde(rename = "inputSchema")]
    /// JSON Schema 7, composition keywords intact.
    pub input_schema: Value,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    /// `{requires, mutation}` — only on `individual` tools, and only when
    /// non-empty.
    pub meta: Option<Value>,
}

/// Build the `tools/list` payload for `registry`'s MCP-exposed commands
/// under `strategy`.
#[must_use]
pub fn list_tools(registry: &CommandRegistry, strategy: ToolStrategy) -> Vec<Tool> {
    let exposed = registry.list_by_exposure("mcp");
    match strategy {
        ToolStrategy::Individual => exposed
            .into_iter()
            .map(|def| {
                let mut meta = serde_json::Map::new();
                if !def.requires.is_empty() {
                    meta.insert("requires".to_string(), json!(def.requires));
                }
                if def.mutation {
                    meta.insert("mutation".to_string(), json!(true));
                }
                Tool {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    input_schema: def.input_schema.json_schema().clone(),
                    meta: if meta.is_empty() { None } else { Some(Value::Object(meta)) },
                }
            })
            .collect(),
        ToolStrategy::Grouped => {
            let mut categories: Vec<String> = Vec::new();
            for def in &exposed {
                let cat = def.category.clone().unwrap_or_else(|| "uncategorized".to_string());
                if !categories.contains(&cat) {
                    categories.push(cat);
                }
            }
            categories
                .into_iter()
                .map(|category| {
                    let members: Vec<_> = exposed
                        .iter()
                        .filter(|def| def.category.as_deref().unwrap_or("uncategorized") == category)
                        .collect();
                    let action_names: Vec<&str> = members.iter().map(|d| d.name.as_str()).collect();
                    let description = format!(
                        "Commands in the '{category}' category: {}. Use tools/call with {{action, args}}.",
                        action_names.join(", ")
                    );
                    let input_schema = json!({
                        "type": "object",
                        "properties": {
                            "action": {"type": "string", "enum": action_names},
                            "args": {"type": "object"},
                        },
                        "required": ["action", "args"],
                    });
                    Tool {
                        name: category,
                        description,
                        input_schema,
                        meta: None,
                    }
                })
                .collect()
        }
    }
}

/// Resolve a `tools/call` invocation to an underlying command name and the
/// args that should be schema-parsed.
///
/// Under `individual`, `tool_name` already is the command name and `args` is
/// the command input verbatim. Under `grouped`, `args` must be a discriminated
/// `{action, args}` envelope naming a command within the `tool_name` category.
pub fn resolve_call(
    registry: &CommandRegistry,
    strategy: ToolStrategy,
    tool_name: &str,
    args: Value,
) -> Result<(String, Value), String> {
    match strategy {
        ToolStrategy::Individual => Ok((tool_name.to_string(), args)),
        ToolStrategy::Grouped => {
            let action = args
                .get("action")
                .and_then(Value::as_str)
                .ok_or_else(|| "grouped tool call requires a string 'action' field".to_string())?;
            let Some(def) = registry.get(action) else {
                return Err(format!("'{action}' is not a registered command"));
            };
            let def_category = def.category.as_deref().unwrap_or("uncategorized");
            if def_category != tool_name {
                return Err(format!(
                    "'{action}' belongs to category '{def_category}', not '{tool_name}'"
                ));
            }
            let inner_args = args.get("args").cloned().unwrap_or(Value::Null);
            Ok((action.to_string(), inner_args))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::{CommandDefinition, Exposure, HandlerFuture};
    use afd_schema::Schema;
    use afd_result::success;
    use std::sync::Arc;

    fn mcp_command(name: &str, category: &str, mutation: bool) -> CommandDefinition {
        let schema = Arc::new(Schema::from_value(serde_json::json!({"type": "object"})).unwrap());
        let handler = Arc::new(|_input, _ctx| Box::pin(async { success(Value::Null) }) as HandlerFuture);
        CommandDefinition::builder(name, "does a thing", schema, handler)
            .category(category)
            .mutation(mutation)
            .expose(Exposure { palette: true, agent: true, mcp: true, cli: false })
            .build()
    }

    fn registry_with(defs: Vec<CommandDefinition>) -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        for d in defs {
            reg.register(d).unwrap();
        }
        reg
    }

    #[test]
    fn individual_strategy_emits_one_tool_per_command() {
        let reg = registry_with(vec![mcp_command("todo-create", "todo", true), mcp_command("todo-list", "todo", false)]);
        let tools = list_tools(&reg, ToolStrategy::Individual);
        assert_eq!(tools.len(), 2);
        let create = tools.iter().find(|t| t.name == "todo-create").unwrap();
        assert_eq!(create.meta.as_ref().unwrap()["mutation"], true);
        let list = tools.iter().find(|t| t.name == "todo-list").unwrap();
        assert!(list.meta.is_none());
    }

    #[test]
    fn grouped_strategy_emits_one_tool_per_category() {
        let reg = registry_with(vec![mcp_command("todo-create", "todo", true), mcp_command("todo-list", "todo", false), mcp_command("note-create", "note", true)]);
        let tools = list_tools(&reg, ToolStrategy::Grouped);
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| t.meta.is_none()));
    }

    #[test]
    fn resolve_call_individual_passes_through() {
        let reg = registry_with(vec![mcp_command("todo-create", "todo", true)]);
        let (name, args) = resolve_call(&reg, ToolStrategy::Individual, "todo-create", serde_json::json!({"title": "x"})).unwrap();
        assert_eq!(name, "todo-create");
        assert_eq!(args["title"], "x");
    }

    #[test]
    fn resolve_call_grouped_extracts_action_and_args() {
        let reg = registry_with(vec![mcp_command("todo-create", "todo", true)]);
        let (name, args) = resolve_call(
            &reg,
            ToolStrategy::Grouped,
            "todo",
            serde_json::json!({"action": "todo-create", "args": {"title": "x"}}),
        )
        .unwrap();
        assert_eq!(name, "todo-create");
        assert_eq!(args["title"], "x");
    }

    #[test]
    fn resolve_call_grouped_rejects_wrong_category() {
        let reg = registry_with(vec![mcp_command("todo-create", "todo", true), mcp_command("note-create", "note", true)]);
        let err = resolve_call(&reg, ToolStrategy::Grouped, "note", serde_json::json!({"action": "todo-create", "args": {}})).unwrap_err();
        assert!(err.contains("belongs to category"));
    }

    #[test]
    fn auto_picks_grouped_above_threshold() {
        assert_eq!(ToolStrategy::auto(5), ToolStrategy::Individual);
        assert_eq!(ToolStrategy::auto(20), ToolStrategy::Grouped);
    }
}
