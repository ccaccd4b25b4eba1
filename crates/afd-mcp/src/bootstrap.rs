// SPDX-License-Identifier: MIT OR Apache-2.0
//! Auto-registered discovery tools (§4.6): `*-help`, `*-docs`, `*-schema`.
//!
//! These are ordinary commands, registered into the same registry as domain
//! commands, so they show up in `tools/list` like anything else. Their
//! handlers need to read the registry they're a member of — a classic
//! chicken-and-egg problem, solved with [`Arc::new_cyclic`]: the registry is
//! built once, and each bootstrap handler closes over a [`Weak`] reference
//! that resolves once construction is complete (see [`build_registry`]).

use afd_registry::{CommandDefinition, CommandRegistry, Context, Exposure, HandlerFuture};
use afd_result::success;
use afd_schema::Schema;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};

/// Hand-authored JSON Schema for the result envelope (§3). `CommandResult<T>`
/// is generic over the payload, so `data`'s shape is left as `true` (any
/// value) rather than re-deriving it per command.
fn envelope_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": {"type": "boolean"},
            "data": true,
            "error": {
                "type": "object",
                "properties": {
                    "code": {"type": "string"},
                    "message": {"type": "string"},
                    "suggestion": {"type": "string"},
                    "retryable": {"type": "boolean"},
                    "details": {"type": "object"},
                },
                "required": ["code", "message", "retryable"],
            },
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"},
            "warnings": {"type": "array"},
            "suggestions": {"type": "array", "items": {"type": "string"}},
            "undoCommand": {"type": "string"},
            "undoArgs": {"type": "object"},
            "metadata": {
                "type": "object",
                "properties": {
                    "executionTimeMs": {"type": "integer"},
                    "commandVersion": {"type": "string"},
                    "traceId": {"type": "string"},
                },
            },
        },
        "required": ["success"],
    })
}

/// Exposure shared by all three bootstrap tools: visible to MCP and in-process
/// agent callers, not to the CLI (which has its own `tools`/`validate`
/// subcommands) or the palette.
fn bootstrap_exposure() -> Exposure {
    Exposure {
        palette: false,
        agent: true,
        mcp: true,
        cli: false,
    }
}

/// Build the complete registry: domain commands registered first (via
/// `register_domain`), then the three bootstrap tools, all as members of the
/// same `Arc<CommandRegistry>` the bootstrap handlers can read from.
pub fn build_registry(
    server_name: &str,
    register_domain: impl FnOnce(&mut CommandRegistry),
) -> Arc<CommandRegistry> {
    let prefix = server_name.to_string();
    Arc::new_cyclic(move |weak: &Weak<CommandRegistry>| {
        let mut registry = CommandRegistry::new();
        register_domain(&mut registry);
        register_help(&mut registry, weak.clone(), &prefix);
        register_docs(&mut registry, weak.clone(), &prefix);
        register_schema(&mut registry, weak.clone(), &prefix);
        registry
    })
}

fn upgrade(weak: &Weak<CommandRegistry>) -> Arc<CommandRegistry> {
    weak.upgrade()
        .expect("bootstrap handler invoked before registry construction completed")
}

fn register_help(registry: &mut CommandRegistry, weak: Weak<CommandRegistry>, prefix: &str) {
    let schema = Arc::new(
        Schema::from_value(json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "excludeTags": {"type": "array", "items": {"type": "string"}},
                "category": {"type": "string"},
                "format": {"type": "string", "enum": ["brief", "full"]},
            },
        }))
        .unwrap(),
    );

    let handler: afd_registry::Handler = Arc::new(move |input, _ctx: Arc<Context>| {
        let weak = weak.clone();
        Box::pin(async move {
            let registry = upgrade(&weak);
            let tags: Vec<String> = input
                .get("tags")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            let exclude_tags: Vec<String> = input
                .get("excludeTags")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            let category = input.get("category").and_then(Value::as_str);
            let full = input.get("format").and_then(Value::as_str) == Some("full");

            let commands: Vec<Value> = registry
                .list_commands_with_metadata()
                .into_iter()
                .filter(|m| category.is_none_or(|c| m.category.as_deref() == Some(c)))
                .filter(|m| tags.iter().all(|t| m.tags.contains(t)))
                .filter(|m| !exclude_tags.iter().any(|t| m.tags.contains(t)))
                .map(|m| {
                    if full {
                        json!({
                            "name": m.name,
                            "description": m.description,
                            "category": m.category,
                            "tags": m.tags,
                            "mutation": m.mutation,
                            "requires": m.requires,
                        })
                    } else {
                        json!({"name": m.name, "description": m.description})
                    }
                })
                .collect();

            success(json!({"commands": commands}))
        }) as HandlerFuture
    });

    registry
        .register(
            CommandDefinition::builder(format!("{prefix}-help"), "List registered commands, optionally filtered by tag or category", schema, handler)
                .expose(bootstrap_exposure())
                .build(),
        )
        .expect("bootstrap tool names are well-formed and unique");
}

fn register_docs(registry: &mut CommandRegistry, weak: Weak<CommandRegistry>, prefix: &str) {
    let schema = Arc::new(
        Schema::from_value(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
        }))
        .unwrap(),
    );

    let handler: afd_registry::Handler = Arc::new(move |input, _ctx: Arc<Context>| {
        let weak = weak.clone();
        Box::pin(async move {
            let registry = upgrade(&weak);
            let name = input.get("name").and_then(Value::as_str);

            let targets: Vec<&CommandDefinition> = match name {
                Some(n) => match registry.get(n) {
                    Some(def) => vec![def],
                    None => return afd_result::error(afd_error::CommandError::not_found(format!("command '{n}' is not registered"))),
                },
                None => registry.list(None),
            };

            let markdown = render_docs(&targets);
            success(json!({"markdown": markdown}))
        }) as HandlerFuture
    });

    registry
        .register(
            CommandDefinition::builder(format!("{prefix}-docs"), "Render Markdown documentation for one or all commands", schema, handler)
                .expose(bootstrap_exposure())
                .build(),
        )
        .expect("bootstrap tool names are well-formed and unique");
}

fn render_docs(defs: &[&CommandDefinition]) -> String {
    let mut out = String::new();
    for def in defs {
        out.push_str(&format!("## {}\n\n{}\n\n", def.name, def.description));
        if let Some(category) = &def.category {
            out.push_str(&format!("- category: {category}\n"));
        }
        if !def.tags.is_empty() {
            out.push_str(&format!("- tags: {}\n", def.tags.iter().cloned().collect::<Vec<_>>().join(", ")));
        }
        out.push_str(&format!("- mutation: {}\n", def.mutation));
        if def.destructive {
            out.push_str(&format!(
                "- destructive: true (confirm: {})\n",
                def.confirm_prompt.as_deref().unwrap_or("")
            ));
        }
        if !def.requires.is_empty() {
            out.push_str(&format!("- requires: {}\n", def.requires.join(", ")));
        }
        out.push_str(&format!(
            "- input schema:\n\n```json\n{}\n```\n\n",
            serde_json::to_string_pretty(def.input_schema.json_schema()).unwrap_or_default()
        ));
        for example in &def.examples {
            out.push_str(&format!("- example: `{example}`\n"));
        }
        out.push('\n');
    }
    out
}

fn register_schema(registry: &mut CommandRegistry, weak: Weak<CommandRegistry>, prefix: &str) {
    let schema = Arc::new(
        Schema::from_value(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
        }))
        .unwrap(),
    );

    let handler: afd_registry::Handler = Arc::new(move |input, _ctx: Arc<Context>| {
        let weak = weak.clone();
        Box::pin(async move {
            let registry = upgrade(&weak);
            let name = input.get("name").and_then(Value::as_str);

            match name {
                Some(n) => match registry.get(n) {
                    Some(def) => success(json!({
                        "name": def.name,
                        "inputSchema": def.input_schema.json_schema(),
                        "resultEnvelopeSchema": envelope_schema(),
                    })),
                    None => afd_result::error(afd_error::CommandError::not_found(format!("command '{n}' is not registered"))),
                },
                None => {
                    let mut commands = serde_json::Map::new();
                    for def in registry.list(None) {
                        commands.insert(def.name.clone(), def.input_schema.json_schema().clone());
                    }
                    success(json!({
                        "commands": commands,
                        "resultEnvelopeSchema": envelope_schema(),
                    }))
                }
            }
        }) as HandlerFuture
    });

    registry
        .register(
            CommandDefinition::builder(format!("{prefix}-schema"), "Return the JSON Schema bundle for command inputs and the result envelope", schema, handler)
                .expose(bootstrap_exposure())
                .build(),
        )
        .expect("bootstrap tool names are well-formed and unique");
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_registry::Interface;

    fn empty_domain(_registry: &mut CommandRegistry) {}

    #[tokio::test]
    async fn registry_carries_three_bootstrap_tools() {
        let registry = build_registry("afd", empty_domain);
        assert!(registry.contains("afd-help"));
        assert!(registry.contains("afd-docs"));
        assert!(registry.contains("afd-schema"));
    }

    #[tokio::test]
    async fn help_lists_domain_commands() {
        let registry = build_registry("afd", |reg| {
            let schema = Arc::new(Schema::from_value(json!({"type": "object"})).unwrap());
            let handler: afd_registry::Handler =
                Arc::new(|_input, _ctx| Box::pin(async { success(Value::Null) }) as HandlerFuture);
            reg.register(CommandDefinition::builder("todo-list", "list todos", schema, handler).build())
                .unwrap();
        });

        let def = registry.get("afd-help").unwrap();
        let ctx = Arc::new(Context::new(Interface::Agent));
        let result = (def.handler)(Value::Null, ctx).await;
        let commands = result.data.unwrap()["commands"].as_array().unwrap().clone();
        assert!(commands.iter().any(|c| c["name"] == "todo-list"));
    }

    #[tokio::test]
    async fn docs_for_unknown_command_is_not_found() {
        let registry = build_registry("afd", empty_domain);
        let def = registry.get("afd-docs").unwrap();
        let ctx = Arc::new(Context::new(Interface::Agent));
        let result = (def.handler)(json!({"name": "no-such"}), ctx).await;
        assert_eq!(result.error.unwrap().code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn schema_returns_envelope_for_all_commands() {
        let registry = build_registry("afd", empty_domain);
        let def = registry.get("afd-schema").unwrap();
        let ctx = Arc::new(Context::new(Interface::Agent));
        let result = (def.handler)(Value::Null, ctx).await;
        let data = result.data.unwrap();
        assert!(data["resultEnvelopeSchema"]["properties"]["success"].is_object());
        assert!(data["commands"]["afd-help"].is_object());
    }
}
