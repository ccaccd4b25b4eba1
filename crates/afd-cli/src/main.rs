// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use afd_cli::client::Client;
use afd_cli::format::{render, render_result, OutputFormat};
use afd_cli::remote::RemoteClient;
use afd_cli::session::{self, Session};
use afd_mcp::bootstrap::build_registry;
use afd_mcp::validate::{validate, SurfaceCommand, ValidationOptions};
use afd_middleware::Invoker;
use afd_registry::CommandRegistry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code for a command or validation failure surfaced through the
/// result envelope, as opposed to a CLI usage error (clap exits 2 for those).
const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "afd", version, about = "Terminal CLI for AFD commands")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open and remember an SSE session against a remote MCP server.
    Connect {
        /// Base URL of the server, e.g. http://localhost:3100.
        url: String,
    },

    /// List available tools.
    Tools {
        /// Restrict to one category (in-process mode only).
        #[arg(long)]
        category: Option<String>,
    },

    /// Invoke a command by name with a JSON argument object.
    Call {
        /// Command name.
        name: String,
        /// JSON-encoded arguments.
        json: String,
        /// Pretty-print the result envelope.
        #[arg(long)]
        pretty: bool,
    },

    /// Interactive REPL: reads `<name> <json>` lines until EOF or `exit`.
    Shell,

    /// Run the static surface validator (§4.6) against the active target.
    Validate {
        /// Run the cross-command surface analyzer. Currently the only mode.
        #[arg(long)]
        surface: bool,

        /// Treat warnings as invalidating.
        #[arg(long)]
        strict: bool,

        /// Suppress a finding: `rule`, `rule:name`, or `rule:a:b`.
        #[arg(long = "suppress")]
        suppressions: Vec<String>,
    },
}

/// Where CLI subcommands send their calls: the process's own registry, or a
/// server reached over `connect`.
enum Target {
    InProcess { client: Client },
    Remote { client: RemoteClient },
}

impl Target {
    fn resolve() -> Self {
        match session::load() {
            Some(Session { url, session_id }) => Target::Remote {
                client: RemoteClient::new(url, Some(session_id)),
            },
            None => {
                let registry = build_registry("afd", register_domain);
                let invoker = Arc::new(Invoker::new(registry.clone()));
                Target::InProcess {
                    client: Client::new(registry, invoker),
                }
            }
        }
    }
}

/// No built-in domain commands ship with this binary; it exercises the
/// bootstrap tools against an otherwise empty registry. Embedders link
/// [`afd_cli::client::Client`] directly with their own registry instead of
/// running this binary as-is.
fn register_domain(_registry: &mut CommandRegistry) {}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("afd=debug")
    } else {
        EnvFilter::new("afd=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let exit_code = match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_FAILURE
        }
    };

    std::process::exit(exit_code);
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Connect { url } => cmd_connect(url).await,
        Commands::Tools { category } => cmd_tools(category).await,
        Commands::Call { name, json, pretty } => cmd_call(name, json, pretty).await,
        Commands::Shell => cmd_shell().await,
        Commands::Validate { surface, strict, suppressions } => cmd_validate(surface, strict, suppressions).await,
    }
}

async fn cmd_connect(url: String) -> Result<i32> {
    let url = url.trim_end_matches('/').to_string();
    let client = RemoteClient::new(url.clone(), None);
    client.check_health().await.with_context(|| format!("connect to {url}"))?;

    let session = Session {
        url,
        session_id: uuid::Uuid::new_v4().to_string(),
    };
    session::save(&session)?;
    println!("connected: {}", session.url);
    Ok(0)
}

async fn cmd_tools(category: Option<String>) -> Result<i32> {
    match Target::resolve() {
        Target::InProcess { client } => {
            let tools = afd_mcp::tools::list_tools(client.registry(), afd_mcp::tools::ToolStrategy::Individual);
            for tool in tools {
                if category.as_deref().is_some_and(|c| {
                    client.registry().get(&tool.name).and_then(|d| d.category.clone()).as_deref() != Some(c)
                }) {
                    continue;
                }
                println!("{:<30} {}", tool.name, tool.description);
            }
        }
        Target::Remote { client } => {
            let tools = client.list_tools().await?;
            for tool in tools {
                println!("{:<30} {}", tool["name"].as_str().unwrap_or(""), tool["description"].as_str().unwrap_or(""));
            }
        }
    }
    Ok(0)
}

async fn cmd_call(name: String, json: String, pretty: bool) -> Result<i32> {
    let arguments: serde_json::Value = serde_json::from_str(&json).with_context(|| format!("parse arguments as JSON: {json}"))?;
    let format = OutputFormat::from_pretty_flag(pretty);

    let (text, code) = match Target::resolve() {
        Target::InProcess { client } => {
            let result = client.call(&name, arguments).await;
            render_result(format, &result)
        }
        Target::Remote { client } => {
            let result = client.call(&name, arguments).await?;
            render_result(format, &result)
        }
    };

    println!("{text}");
    Ok(code)
}

async fn cmd_shell() -> Result<i32> {
    use std::io::{BufRead, Write};

    println!("afd shell — `<command> <json args>`, `tools`, `exit`");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        if line == "tools" {
            cmd_tools(None).await?;
            continue;
        }

        let Some((name, rest)) = line.split_once(' ') else {
            println!("usage: <command> <json args>");
            continue;
        };
        match cmd_call(name.to_string(), rest.trim().to_string(), false).await {
            Ok(_) => {}
            Err(e) => println!("error: {e:#}"),
        }
        stdout.flush()?;
    }
    Ok(0)
}

async fn cmd_validate(surface: bool, strict: bool, suppressions: Vec<String>) -> Result<i32> {
    if !surface {
        anyhow::bail!("validate currently only supports --surface");
    }

    let commands: Vec<SurfaceCommand> = match Target::resolve() {
        Target::InProcess { client } => client.registry().list(None).into_iter().map(SurfaceCommand::from).collect(),
        Target::Remote { client } => client.surface_commands().await?,
    };

    let options = ValidationOptions {
        strict,
        suppressions,
        ..ValidationOptions::default()
    };
    let report = validate(&commands, &options);
    println!("{}", render(OutputFormat::JsonPretty, &report));

    Ok(if report.valid { 0 } else { EXIT_FAILURE })
}
