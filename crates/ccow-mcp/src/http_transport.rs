//! HTTP transport for the MCP server.
//!
//! `POST /mcp` carries one JSON-RPC message per request. `GET /mcp` opens
//! an SSE stream that announces a session id and then only keeps the
//! connection alive. `GET /health` reports liveness and the number of open
//! streams.
//!
//! Messages are handed to the server through a channel of
//! [`PendingRequest`]s; the HTTP layer never calls tools itself.

use crate::error::McpError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, codes};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

const STREAM_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// A message waiting for the server, with the slot its reply goes into.
///
/// The server answers `None` for notifications.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: JsonRpcRequest,
    pub reply: oneshot::Sender<Option<JsonRpcResponse>>,
}

/// Shared state behind the router.
#[derive(Debug)]
pub struct TransportState {
    requests: mpsc::Sender<PendingRequest>,
    open_streams: AtomicUsize,
}

impl TransportState {
    pub fn new(requests: mpsc::Sender<PendingRequest>) -> Self {
        Self {
            requests,
            open_streams: AtomicUsize::new(0),
        }
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::Relaxed)
    }
}

/// Counts an SSE stream as open until the stream is dropped.
struct StreamGuard {
    state: Arc<TransportState>,
    session_id: String,
}

impl StreamGuard {
    fn open(state: Arc<TransportState>, session_id: String) -> Self {
        state.open_streams.fetch_add(1, Ordering::Relaxed);
        debug!(session_id = %session_id, "SSE stream opened");
        Self { state, session_id }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.state.open_streams.fetch_sub(1, Ordering::Relaxed);
        debug!(session_id = %self.session_id, "SSE stream closed");
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    session_id: Option<String>,
}

pub fn router(state: Arc<TransportState>) -> Router {
    Router::new()
        .route("/mcp", post(post_message).get(open_stream))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn server_error(id: Option<Value>, message: &str) -> Response {
    let body = JsonRpcResponse::error(id, codes::INTERNAL_ERROR, message);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

async fn post_message(
    State(state): State<Arc<TransportState>>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let id = request.id.clone();
    let (reply, answer) = oneshot::channel();

    if state
        .requests
        .send(PendingRequest { request, reply })
        .await
        .is_err()
    {
        return server_error(id, "MCP server unavailable");
    }

    match answer.await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(_) => server_error(id, "No response from MCP server"),
    }
}

async fn open_stream(
    State(state): State<Arc<TransportState>>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    let session_id = query
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let guard = StreamGuard::open(state, session_id.clone());

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<_, Infallible>(Event::default().event("session").data(session_id));
        std::future::pending::<()>().await;
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(STREAM_KEEP_ALIVE).text("ping"))
}

async fn health(State(state): State<Arc<TransportState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "ccow-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "openStreams": state.open_streams(),
    }))
}

/// Binds the router to an address.
pub struct HttpServer {
    address: String,
    state: Arc<TransportState>,
}

impl HttpServer {
    pub fn new(address: impl Into<String>, requests: mpsc::Sender<PendingRequest>) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(TransportState::new(requests)),
        }
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), McpError> {
        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .map_err(|e| {
                McpError::StartupFailed(format!("failed to bind to {}: {}", self.address, e))
            })?;
        info!(address = %self.address, "MCP HTTP server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await
            .map_err(|e| McpError::Internal(e.into()))
    }
}
