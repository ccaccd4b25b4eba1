// SPDX-License-Identifier: MIT OR Apache-2.0
//! MCP server: JSON-RPC 2.0 over HTTP POST `/message`, streaming progress
//! over SSE `GET /sse` (§4.5, §6).
//!
//! A session is opened by connecting to `/sse`; the server hands back a
//! session id as the stream's first frame. Subsequent `/message` POSTs carry
//! that id as a query parameter and are correlated to the open stream for
//! `tool_start`/`token`/`tool_end`/`done` events. A `/message` POST with no
//! matching session still completes synchronously — streaming is optional.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod rpc;
pub mod tools;
pub mod validate;

use afd_registry::{CancellationToken, CommandRegistry, Context, Emission, Interface};
use afd_middleware::Invoker;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, METHOD_NOT_FOUND};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tools::ToolStrategy;
use tracing::warn;

/// Per-session SSE state: the frame sender and a token that cancels every
/// in-flight invocation on that session when the stream is dropped.
struct Session {
    tx: mpsc::UnboundedSender<SseEvent>,
    cancellation: CancellationToken,
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

/// Shared server state, cloned cheaply into every handler.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<CommandRegistry>,
    invoker: Arc<Invoker>,
    tool_strategy: ToolStrategy,
    name: String,
    version: String,
    sessions: Sessions,
}

impl AppState {
    /// Build server state over an already-constructed registry (see
    /// [`bootstrap::build_registry`]) and its matching invoker.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, registry: Arc<CommandRegistry>, invoker: Arc<Invoker>, tool_strategy: ToolStrategy) -> Self {
        Self {
            registry,
            invoker,
            tool_strategy,
            name: name.into(),
            version: version.into(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// A failure that short-circuits before any JSON-RPC handling (bad body,
/// wrong content type). Distinct from a JSON-RPC protocol error, which still
/// returns `200 OK` with an `error` envelope per spec.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

/// Build the Axum router: `/health`, `/sse`, `/message`.
#[must_use]
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sse", get(open_sse))
        .route("/message", post(handle_message))
        .with_state(Arc::new(state))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({"status": "ok", "name": state.name, "version": state.version}))
}

#[derive(serde::Deserialize)]
struct SessionQuery {
    session: Option<String>,
}

async fn open_sse(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Sse<GuardedStream<UnboundedReceiverStream<SseEvent>>> {
    let session_id = query.session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let (tx, rx) = mpsc::unbounded_channel();
    let cancellation = CancellationToken::new();

    let endpoint = SseEvent::default().event("endpoint").data(json!({"sessionId": session_id}).to_string());
    let _ = tx.send(endpoint);

    state.sessions.lock().await.insert(session_id.clone(), Session { tx, cancellation });

    let guard = SessionGuard { sessions: state.sessions.clone(), id: session_id };
    let stream = GuardedStream { inner: UnboundedReceiverStream::new(rx), _guard: guard };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Drops the session from the shared map (and cancels in-flight calls via
/// the session's own token) once its SSE stream is no longer being polled —
/// covers both a clean client disconnect and the stream's own completion.
struct SessionGuard {
    sessions: Sessions,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            if let Some(session) = sessions.lock().await.remove(&id) {
                session.cancellation.cancel();
            }
        });
    }
}

/// Wraps an SSE frame stream with a value whose `Drop` runs only once the
/// stream itself is dropped (client disconnect, or `axum` tearing down the
/// response body).
struct GuardedStream<S> {
    inner: S,
    _guard: SessionGuard,
}

impl<S> Stream for GuardedStream<S>
where
    S: Stream<Item = SseEvent> + Unpin,
{
    type Item = Result<SseEvent, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx).map(|opt| opt.map(Ok))
    }
}

async fn handle_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    body: Result<Json<JsonRpcRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<JsonRpcResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("malformed JSON-RPC request: {e}")))?;

    let id = request.id.clone().unwrap_or(Value::Null);
    let session = match &query.session {
        Some(session_id) => state.sessions.lock().await.get(session_id).map(|s| (s.tx.clone(), s.cancellation.clone())),
        None => None,
    };

    let response = dispatch(&state, request, session).await;
    Ok(Json(response))
}

async fn dispatch(state: &AppState, request: JsonRpcRequest, session: Option<(mpsc::UnboundedSender<SseEvent>, CancellationToken)>) -> JsonRpcResponse {
    let id = request.id.unwrap_or(Value::Null);

    match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "name": state.name,
                "version": state.version,
                "capabilities": {"tools": {"listChanged": false}},
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "shutdown" => JsonRpcResponse::success(id, Value::Null),
        "tools/list" => {
            let tools = tools::list_tools(&state.registry, state.tool_strategy);
            JsonRpcResponse::success(id, json!({"tools": tools}))
        }
        "tools/call" => handle_tools_call(state, id, request.params, session).await,
        _ => JsonRpcResponse::failure(id, JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown method '{}'", request.method))),
    }
}

async fn handle_tools_call(
    state: &AppState,
    id: Value,
    params: Value,
    session: Option<(mpsc::UnboundedSender<SseEvent>, CancellationToken)>,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::failure(id, JsonRpcError::new(INVALID_PARAMS, "tools/call requires a string 'name'"));
    };
    let args = params.get("arguments").cloned().unwrap_or(Value::Null);

    let (command_name, command_args) = match tools::resolve_call(&state.registry, state.tool_strategy, tool_name, args) {
        Ok(resolved) => resolved,
        Err(message) => return JsonRpcResponse::failure(id, JsonRpcError::new(INVALID_PARAMS, message)),
    };

    let def = state.registry.get(&command_name).cloned_definition_fields();

    let mut ctx = Context::new(Interface::Mcp);
    if let Some((tx, cancellation)) = &session {
        ctx.cancellation = cancellation.clone();
        let (emit_tx, mut emit_rx) = mpsc::unbounded_channel::<Emission>();
        ctx = ctx.with_emitter(emit_tx);
        let forward_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(emission) = emit_rx.recv().await {
                let frame = SseEvent::default().event(emission.event).data(emission.payload.to_string());
                let _ = forward_tx.send(frame);
            }
        });
    }

    if let Some((tx, _)) = &session {
        let _ = tx.send(SseEvent::default().event("tool_start").data(json!({"name": command_name, "args": command_args}).to_string()));
    }

    let started = Instant::now();
    let result = state.invoker.invoke(&command_name, command_args, ctx).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if let Some((tx, _)) = &session {
        let metadata = def.as_ref().map(|d| {
            json!({
                "destructive": d.destructive,
                "confirmPrompt": d.confirm_prompt,
                "mutation": d.mutation,
                "tags": d.tags,
            })
        });
        let _ = tx.send(
            SseEvent::default()
                .event("tool_end")
                .data(json!({"name": command_name, "result": result, "latencyMs": latency_ms, "metadata": metadata}).to_string()),
        );
        let _ = tx.send(SseEvent::default().event("done").data(json!({"totalToolLatencyMs": latency_ms}).to_string()));
    }

    let result_json = serde_json::to_value(&result).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize command result");
        json!({"success": false, "error": {"code": "INTERNAL_ERROR", "message": "result serialization failed", "retryable": false}})
    });

    JsonRpcResponse::success(id, result_json)
}

/// Lightweight snapshot of the definition fields `tool_end` metadata needs,
/// decoupled from the handler closure so it can be cloned out of the
/// registry borrow before the `await` above.
struct DefSnapshot {
    destructive: bool,
    confirm_prompt: Option<String>,
    mutation: bool,
    tags: Vec<String>,
}

trait DefinitionLookup {
    fn cloned_definition_fields(&self) -> Option<DefSnapshot>;
}

impl DefinitionLookup for Option<&afd_registry::CommandDefinition> {
    fn cloned_definition_fields(&self) -> Option<DefSnapshot> {
        self.map(|def| DefSnapshot {
            destructive: def.destructive,
            confirm_prompt: def.confirm_prompt.clone(),
            mutation: def.mutation,
            tags: def.tags.iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_middleware::Invoker;
    use afd_registry::{CommandDefinition, Exposure, HandlerFuture};
    use afd_result::success;
    use afd_schema::Schema;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_registry() -> Arc<CommandRegistry> {
        let mut reg = CommandRegistry::new();
        let schema = Arc::new(Schema::from_value(json!({"type": "object", "properties": {"title": {"type": "string"}}, "required": ["title"]})).unwrap());
        let handler: afd_registry::Handler = Arc::new(|input, _ctx| Box::pin(async move { success(input) }) as HandlerFuture);
        reg.register(
            CommandDefinition::builder("todo-create", "create a new todo item for the user", schema, handler)
                .category("todo")
                .mutation(true)
                .expose(Exposure { palette: true, agent: true, mcp: true, cli: false })
                .build(),
        )
        .unwrap();
        Arc::new(reg)
    }

    fn test_state() -> AppState {
        let registry = test_registry();
        let invoker = Arc::new(Invoker::new(registry.clone()));
        AppState::new("afd", "0.1.0", registry, invoker, ToolStrategy::Individual)
    }

    async fn post_rpc(app: Router, body: Value) -> Value {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_server_identity() {
        let app = build_app(test_state());
        let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["name"], "afd");
    }

    #[tokio::test]
    async fn initialize_returns_server_identity() {
        let app = build_app(test_state());
        let body = post_rpc(app, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
        assert_eq!(body["result"]["name"], "afd");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn tools_list_reflects_registry() {
        let app = build_app(test_state());
        let body = post_rpc(app, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        let tools = body["result"]["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "todo-create"));
    }

    #[tokio::test]
    async fn tools_call_invokes_command_and_returns_envelope() {
        let app = build_app(test_state());
        let body = post_rpc(
            app,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "todo-create", "arguments": {"title": "Buy milk"}}}),
        )
        .await;
        assert_eq!(body["result"]["success"], true);
        assert_eq!(body["result"]["data"]["title"], "Buy milk");
    }

    #[tokio::test]
    async fn tools_call_failure_is_a_normal_result_not_a_protocol_error() {
        let app = build_app(test_state());
        let body = post_rpc(
            app,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "todo-create", "arguments": {}}}),
        )
        .await;
        assert!(body.get("error").is_none());
        assert_eq!(body["result"]["success"], false);
        assert_eq!(body["result"]["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_method_is_a_protocol_error() {
        let app = build_app(test_state());
        let body = post_rpc(app, json!({"jsonrpc": "2.0", "id": 1, "method": "nope"})).await;
        assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn ping_is_housekeeping() {
        let app = build_app(test_state());
        let body = post_rpc(app, json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).await;
        assert_eq!(body["result"], json!({}));
    }
}
