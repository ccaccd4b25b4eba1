#![deny(unsafe_code)]
use afd_mcp::bootstrap::build_registry;
use afd_mcp::tools::ToolStrategy;
use afd_mcp::{build_app, AppState};
use afd_middleware::stock::RateLimiterMiddleware;
use afd_middleware::{Invoker, Middleware};
use afd_registry::CommandRegistry;
use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// AFD command surface, served over MCP (JSON-RPC 2.0 + SSE).
#[derive(Parser, Debug)]
#[command(name = "afd-mcp", version, about = "AFD MCP server")]
struct Args {
    /// Listen port. Overrides `PORT`.
    #[arg(long)]
    port: Option<u16>,

    /// Listen host. Overrides `HOST`.
    #[arg(long)]
    host: Option<String>,

    /// CORS origin allowed on `/message` and `/sse`. Overrides `CORS_ORIGIN`.
    #[arg(long)]
    cors_origin: Option<String>,

    /// Server name advertised in `initialize` and as the bootstrap tool prefix.
    #[arg(long, default_value = "afd")]
    name: String,

    /// Force a tool-listing strategy instead of picking one from the exposed
    /// command count.
    #[arg(long, value_enum)]
    tool_strategy: Option<ToolStrategyArg>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ToolStrategyArg {
    Individual,
    Grouped,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = std::env::var("LOG_LEVEL")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("afd=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let host = args.host.or_else(|| std::env::var("HOST").ok()).unwrap_or_else(|| "localhost".to_string());
    let port = args
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(3100);
    let cors_origin = args.cors_origin.or_else(|| std::env::var("CORS_ORIGIN").ok());

    let registry = build_registry(&args.name, register_domain);
    let exposed = registry.list_by_exposure("mcp").len();
    let strategy = match args.tool_strategy {
        Some(ToolStrategyArg::Individual) => ToolStrategy::Individual,
        Some(ToolStrategyArg::Grouped) => ToolStrategy::Grouped,
        None => ToolStrategy::auto(exposed),
    };

    let invoker = build_invoker(registry.clone());
    let state = AppState::new(args.name.clone(), env!("CARGO_PKG_VERSION"), registry, invoker, strategy);

    let mut app = build_app(state).layer(TraceLayer::new_for_http());
    app = match &cors_origin {
        Some(origin) => app.layer(CorsLayer::new().allow_origin(origin.parse::<axum::http::HeaderValue>()?)),
        None => app.layer(CorsLayer::permissive()),
    };

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    info!(%addr, tools = exposed, strategy = ?strategy, "afd-mcp listening");

    axum::serve(listener, app).await.context("serve")
}

/// No built-in domain commands ship with the server binary; embedders call
/// [`afd_mcp::bootstrap::build_registry`] directly with their own commands.
/// This binary exists to smoke-test the bootstrap tools and MCP transport
/// against an otherwise empty registry.
fn register_domain(_registry: &mut CommandRegistry) {}

/// Default bundle plus a per-command rate limiter (60 calls/minute). Domain
/// embedders needing a different stack should call
/// [`Invoker::with_middleware`] directly instead of this binary.
fn build_invoker(registry: std::sync::Arc<CommandRegistry>) -> std::sync::Arc<Invoker> {
    let mut chain = afd_middleware::default_bundle();
    chain.push(std::sync::Arc::new(RateLimiterMiddleware::new(60, std::time::Duration::from_secs(60))) as std::sync::Arc<dyn Middleware>);
    std::sync::Arc::new(Invoker::with_middleware(registry, chain))
}
