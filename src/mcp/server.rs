//! MCP server: JSON-RPC dispatch and transports.
//!
//! One dispatch path serves both transports. HTTP reads the
//! `Authorization` header per request; stdio takes the bearer token from
//! `QUILT_ACCESS_TOKEN` at session establishment. Tool execution always
//! runs authenticate → bind context → authorize → handler, and the
//! result (success or failure) is serialized into the wire envelope.

use super::dispatch::McpMethod;
use super::resources::ResourceRegistry;
use super::tools::ToolRegistry;
use crate::auth::BearerAuthService;
use crate::config::ServerConfig;
use crate::runtime::{RequestContext, scope_request};
use crate::{Error, Result};
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

/// MCP protocol version advertised on initialize.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Process-wide dependencies shared by every request.
pub struct ServerState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Authentication/authorization service.
    pub auth: BearerAuthService,
}

impl ServerState {
    /// Creates the state, resolving the JWT secret.
    pub async fn new(config: ServerConfig) -> Self {
        let auth = BearerAuthService::new(&config).await;
        Self { config, auth }
    }

    /// Test-only state with a fixed secret.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let config = ServerConfig::default();
        let auth = BearerAuthService::with_secret(TEST_SECRET, &config);
        Self { config, auth }
    }
}

#[cfg(test)]
pub(crate) const TEST_SECRET: &str = "a-test-secret-key-that-is-long-enough";

/// Test-only authenticated identity.
#[cfg(test)]
pub(crate) fn test_auth() -> crate::auth::AuthResult {
    crate::auth::AuthResult {
        token: "test-token".to_string(),
        claims: crate::auth::Claims::default(),
        permissions: vec![
            "s3:GetObject".to_string(),
            "s3:ListBucket".to_string(),
            "quilt:BrowsePackages".to_string(),
            "quilt:UpdatePackage".to_string(),
        ],
        buckets: vec!["*".to_string()],
        roles: Vec::new(),
        aws_credentials: None,
        aws_role_arn: None,
        user_id: Some("test-user".to_string()),
        username: Some("tester".to_string()),
    }
}

/// The MCP server.
pub struct McpServer {
    state: ServerState,
    tools: ToolRegistry,
}

impl McpServer {
    /// Creates a server from configuration.
    pub async fn new(config: ServerConfig) -> Self {
        Self {
            state: ServerState::new(config).await,
            tools: ToolRegistry::new(),
        }
    }

    /// Creates a server over existing state.
    #[must_use]
    pub fn with_state(state: ServerState) -> Self {
        Self {
            state,
            tools: ToolRegistry::new(),
        }
    }

    /// Handles one JSON-RPC message.
    ///
    /// Returns `None` for notifications (no `id`), `Some(response)`
    /// otherwise.
    pub async fn handle_request(
        &self,
        request: &Value,
        auth_header: Option<&str>,
    ) -> Option<Value> {
        let id = request.get("id").cloned();
        let method = McpMethod::from(request.get("method").and_then(Value::as_str).unwrap_or(""));
        let params = request
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        if matches!(method, McpMethod::Notification(_)) {
            return None;
        }
        let id = id?;

        let response = match method {
            McpMethod::Initialize => jsonrpc_result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {},
                        "resources": {},
                    },
                    "serverInfo": {
                        "name": "quilt-mcp",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            McpMethod::Ping => jsonrpc_result(id, json!({})),
            McpMethod::ListTools => {
                jsonrpc_result(id, json!({"tools": self.tools.list_tools()}))
            }
            McpMethod::ListResources => {
                jsonrpc_result(id, json!({"resources": ResourceRegistry::list()}))
            }
            McpMethod::ReadResource => {
                let uri = params.get("uri").and_then(Value::as_str).unwrap_or_default();
                match ResourceRegistry::read(uri) {
                    Ok(text) => jsonrpc_result(
                        id,
                        json!({
                            "contents": [{"uri": uri, "text": text}],
                        }),
                    ),
                    Err(e) => jsonrpc_error(id, -32602, &e.to_string()),
                }
            }
            McpMethod::CallTool => {
                let envelope = self.call_tool(&params, auth_header).await;
                let is_error = envelope
                    .get("success")
                    .and_then(Value::as_bool)
                    .is_none_or(|ok| !ok);
                let text = serde_json::to_string(&envelope).unwrap_or_default();
                jsonrpc_result(
                    id,
                    json!({
                        "content": [{"type": "text", "text": text}],
                        "structuredContent": envelope,
                        "isError": is_error,
                    }),
                )
            }
            McpMethod::Notification(_) => return None,
            McpMethod::Unknown(name) => {
                jsonrpc_error(id, -32601, &format!("Method not found: {name}"))
            }
        };
        Some(response)
    }

    /// Executes one tool call and returns the wire envelope.
    ///
    /// Authentication failures short-circuit everything; authorization
    /// runs before the handler; the handler result is merged under
    /// `success: true`.
    async fn call_tool(&self, params: &Value, auth_header: Option<&str>) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Error::Validation("Tool name is required".to_string()).to_envelope();
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        // Authenticate first; nothing else runs without an identity.
        let auth = match self.state.auth.authenticate_header(auth_header) {
            Ok(auth) => auth,
            Err(e) => return e.to_envelope(),
        };

        let action = arguments.get("action").and_then(Value::as_str);
        if let Err(e) = self
            .state
            .auth
            .authorize_tool(&auth, name, action, &arguments)
            .into_result()
        {
            return e.to_envelope();
        }

        let ctx = RequestContext::new(auth);
        let result = scope_request(&ctx, async {
            self.tools
                .execute(&self.state, &ctx, name, &arguments)
                .await
        })
        .await;

        match result {
            Ok(payload) => success_envelope(payload),
            Err(e) => {
                tracing::debug!(tool = name, error = %e, "tool call failed");
                e.to_envelope()
            }
        }
    }

    /// Serves MCP over stdio.
    ///
    /// The bearer token comes from `QUILT_ACCESS_TOKEN`; log output goes
    /// to stderr so stdout stays pure JSON-RPC.
    ///
    /// # Errors
    ///
    /// `internal_error` on stdin/stdout I/O failures.
    pub async fn run_stdio(&self) -> Result<()> {
        let token_header = std::env::var("QUILT_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {t}"));
        if token_header.is_none() {
            tracing::warn!(
                "QUILT_ACCESS_TOKEN not set; stdio tool calls will fail authentication"
            );
        }

        let stdin = tokio::io::stdin();
        let mut lines = tokio::io::BufReader::new(stdin).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| Error::Internal(format!("stdin read failed: {e}")))?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let request: Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unparseable JSON-RPC frame");
                    continue;
                }
            };
            if let Some(response) = self.handle_request(&request, token_header.as_deref()).await {
                let mut frame = serde_json::to_vec(&response)
                    .map_err(|e| Error::Internal(format!("response encoding failed: {e}")))?;
                frame.push(b'\n');
                stdout
                    .write_all(&frame)
                    .await
                    .map_err(|e| Error::Internal(format!("stdout write failed: {e}")))?;
                stdout
                    .flush()
                    .await
                    .map_err(|e| Error::Internal(format!("stdout flush failed: {e}")))?;
            }
        }
        Ok(())
    }

    /// Serves MCP over HTTP (`POST /mcp`, plus `GET /healthz`).
    ///
    /// # Errors
    ///
    /// `internal_error` when the listener cannot bind or the server
    /// fails.
    pub async fn run_http(self, host: &str, port: u16) -> Result<()> {
        let shared = Arc::new(self);
        let app = axum::Router::new()
            .route("/mcp", post(http_rpc))
            .route("/healthz", get(http_health))
            .layer(tower_http::cors::CorsLayer::permissive())
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(shared);

        let addr = format!("{host}:{port}");
        tracing::info!(addr = %addr, "MCP HTTP transport listening");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            })
            .await
            .map_err(|e| Error::Internal(format!("HTTP server failed: {e}")))
    }
}

/// `POST /mcp` handler.
async fn http_rpc(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> axum::response::Response {
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    match server.handle_request(&request, auth_header.as_deref()).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// `GET /healthz` handler.
async fn http_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Merges a handler payload under `success: true`.
fn success_envelope(payload: Value) -> Value {
    let mut envelope = serde_json::Map::new();
    envelope.insert("success".to_string(), json!(true));
    match payload {
        Value::Object(map) => {
            for (key, value) in map {
                envelope.insert(key, value);
            }
        }
        other => {
            envelope.insert("result".to_string(), other);
        }
    }
    Value::Object(envelope)
}

fn jsonrpc_result(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn jsonrpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}
