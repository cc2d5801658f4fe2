//! MCP server end-to-end tests.
//!
//! Exercises the dispatcher through its public surface: protocol
//! methods, authentication short-circuits, per-tool authorization, the
//! wire envelope, and a full workflow lifecycle through tools/call.
//! No external services are required.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use jsonwebtoken::{EncodingKey, Header, encode};
use quilt_mcp::auth::BearerAuthService;
use quilt_mcp::config::ServerConfig;
use quilt_mcp::mcp::{McpServer, ServerState};
use serde_json::{Value, json};

const SECRET: &str = "integration-test-secret-key-0123456789";

fn server() -> McpServer {
    let config = ServerConfig::default();
    let auth = BearerAuthService::with_secret(SECRET, &config);
    McpServer::with_state(ServerState { config, auth })
}

fn now() -> u64 {
    quilt_mcp::current_timestamp()
}

fn sign(payload: &Value) -> String {
    let token = encode(
        &Header::default(),
        payload,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encodes");
    format!("Bearer {token}")
}

fn bearer(permissions: &[&str], buckets: &[&str]) -> String {
    sign(&json!({
        "sub": "it-user",
        "username": "integration",
        "exp": now() + 3600,
        "permissions": permissions,
        "buckets": buckets,
    }))
}

async fn call(
    server: &McpServer,
    header: Option<&str>,
    tool: &str,
    arguments: Value,
) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments},
    });
    let response = server
        .handle_request(&request, header)
        .await
        .expect("tools/call always answers");
    response["result"]["structuredContent"].clone()
}

// ============================================================================
// Protocol surface
// ============================================================================

#[tokio::test]
async fn initialize_advertises_capabilities() {
    let response = server()
        .handle_request(
            &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            None,
        )
        .await
        .expect("initialize answers");
    assert_eq!(response["jsonrpc"], json!("2.0"));
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(response["result"]["capabilities"]["resources"].is_object());
}

#[tokio::test]
async fn tools_list_exposes_descriptors_without_handlers() {
    let response = server()
        .handle_request(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}), None)
        .await
        .expect("tools/list answers");
    let tools = response["result"]["tools"].as_array().expect("tool array");
    assert_eq!(tools.len(), 6);
    for tool in tools {
        assert!(tool["name"].is_string());
        assert!(tool["inputSchema"].is_object());
        assert!(tool.get("handler").is_none());
    }
}

#[tokio::test]
async fn ping_and_unknown_method() {
    let server = server();
    let pong = server
        .handle_request(&json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}), None)
        .await
        .expect("ping answers");
    assert_eq!(pong["result"], json!({}));

    let unknown = server
        .handle_request(&json!({"jsonrpc": "2.0", "id": 4, "method": "prompts/list"}), None)
        .await
        .expect("unknown answers with error");
    assert_eq!(unknown["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn notifications_are_one_way() {
    let response = server()
        .handle_request(
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            None,
        )
        .await;
    assert!(response.is_none());
}

// ============================================================================
// Authentication short-circuits
// ============================================================================

#[tokio::test]
async fn missing_token_blocks_every_tool() {
    let server = server();
    for tool in ["search", "packaging", "buckets", "permissions", "governance", "workflow"] {
        let envelope = call(&server, None, tool, json!({"action": "list"})).await;
        assert_eq!(envelope["success"], json!(false), "tool {tool}");
        assert_eq!(envelope["error_type"], json!("authentication_error"));
    }
}

#[tokio::test]
async fn expired_token_reports_token_expired() {
    let header = sign(&json!({"sub": "u", "exp": now() - 1}));
    let envelope = call(
        &server(),
        Some(&header),
        "workflow",
        json!({"action": "list"}),
    )
    .await;
    assert_eq!(envelope["error_type"], json!("authentication_error"));
    assert_eq!(envelope["error"], json!("JWT token expired"));
}

#[tokio::test]
async fn tampered_token_reports_invalid() {
    let other_key = EncodingKey::from_secret(b"some-entirely-different-secret-key");
    let token = encode(&Header::default(), &json!({"sub": "u", "exp": now() + 60}), &other_key)
        .expect("token encodes");
    let envelope = call(
        &server(),
        Some(&format!("Bearer {token}")),
        "workflow",
        json!({"action": "list"}),
    )
    .await;
    assert_eq!(envelope["error_type"], json!("authentication_error"));
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn packaging_create_without_update_permission_is_denied() {
    let header = bearer(&["quilt:BrowsePackages", "s3:GetObject"], &["team-bucket"]);
    let envelope = call(
        &server(),
        Some(&header),
        "packaging",
        json!({
            "action": "create",
            "params": {
                "name": "team/pkg",
                "files": ["s3://team-bucket/data.csv"],
                "metadata": {"readme_content": "# hi"},
            },
        }),
    )
    .await;
    assert_eq!(envelope["success"], json!(false));
    assert_eq!(envelope["error_type"], json!("authorization_error"));
    assert_eq!(envelope["missing_permissions"], json!(["quilt:UpdatePackage"]));
}

#[tokio::test]
async fn wildcard_bucket_allow_list() {
    let server = server();
    let header = bearer(&["s3:ListBucket"], &["prod-*"]);

    let denied = call(
        &server,
        Some(&header),
        "buckets",
        json!({"action": "objects_list", "params": {"bucket": "staging-data"}}),
    )
    .await;
    assert_eq!(denied["error_type"], json!("authorization_error"));
    assert_eq!(denied["missing_buckets"], json!(["staging-data"]));
}

#[tokio::test]
async fn compressed_claims_authorize_like_expanded() {
    let server = server();
    let compressed = sign(&json!({
        "sub": "u",
        "exp": now() + 3600,
        "ec": {"v": 1, "p": ["l"], "b": [{"p": "prod-", "s": ["data"]}]},
    }));
    let expanded = bearer(&["s3:ListBucket"], &["prod-data"]);

    for header in [compressed, expanded] {
        // Authorization passes for the allowed bucket in both forms; the
        // failure that follows (no real AWS endpoint) is not an authz
        // denial.
        let envelope = call(
            &server,
            Some(&header),
            "buckets",
            json!({"action": "objects_list", "params": {"bucket": "staging"}}),
        )
        .await;
        assert_eq!(envelope["error_type"], json!("authorization_error"));
        assert_eq!(envelope["missing_buckets"], json!(["staging"]));
    }
}

#[tokio::test]
async fn tools_without_table_entry_are_allowed() {
    // workflow has no permission table entry; empty claims still pass.
    let header = bearer(&[], &[]);
    let envelope = call(
        &server(),
        Some(&header),
        "workflow",
        json!({"action": "list"}),
    )
    .await;
    assert_eq!(envelope["success"], json!(true));
}

// ============================================================================
// Tool behaviors that stay in-process
// ============================================================================

#[tokio::test]
async fn workflow_lifecycle_through_dispatcher() {
    let server = server();
    let header = bearer(&[], &[]);
    let id = format!("e2e-{}", quilt_mcp::current_timestamp());

    let created = call(
        &server,
        Some(&header),
        "workflow",
        json!({"action": "create", "params": {"workflow_id": id, "name": "E2E"}}),
    )
    .await;
    assert_eq!(created["success"], json!(true));

    call(
        &server,
        Some(&header),
        "workflow",
        json!({"action": "add_step", "params": {"workflow_id": id, "step_id": "fetch"}}),
    )
    .await;
    call(
        &server,
        Some(&header),
        "workflow",
        json!({
            "action": "add_step",
            "params": {"workflow_id": id, "step_id": "publish", "dependencies": ["fetch"]},
        }),
    )
    .await;

    // publish is blocked until fetch completes.
    let blocked = call(
        &server,
        Some(&header),
        "workflow",
        json!({
            "action": "update_step",
            "params": {"workflow_id": id, "step_id": "publish", "status": "in_progress"},
        }),
    )
    .await;
    assert_eq!(blocked["error_type"], json!("validation_error"));

    for (step, status) in [
        ("fetch", "in_progress"),
        ("fetch", "completed"),
        ("publish", "in_progress"),
        ("publish", "completed"),
    ] {
        let updated = call(
            &server,
            Some(&header),
            "workflow",
            json!({
                "action": "update_step",
                "params": {"workflow_id": id, "step_id": step, "status": status},
            }),
        )
        .await;
        assert_eq!(updated["success"], json!(true), "{step} -> {status}");
    }

    let status = call(
        &server,
        Some(&header),
        "workflow",
        json!({"action": "get_status", "params": {"workflow_id": id}}),
    )
    .await;
    assert_eq!(status["workflow"]["status"], json!("completed"));
    assert_eq!(status["progress"]["percentage"], json!(100.0));
}

#[tokio::test]
async fn duplicate_workflow_is_conflict() {
    let server = server();
    let header = bearer(&[], &[]);
    let id = format!("dup-{}", quilt_mcp::current_timestamp());
    let args = json!({"action": "create", "params": {"workflow_id": id, "name": "X"}});

    let first = call(&server, Some(&header), "workflow", args.clone()).await;
    assert_eq!(first["success"], json!(true));
    let second = call(&server, Some(&header), "workflow", args).await;
    assert_eq!(second["error_type"], json!("conflict"));
}

#[tokio::test]
async fn metadata_templates_reachable_without_network() {
    let header = bearer(&[], &[]);
    let envelope = call(
        &server(),
        Some(&header),
        "packaging",
        json!({"action": "metadata_templates"}),
    )
    .await;
    assert_eq!(envelope["success"], json!(true));
    assert!(envelope["templates"]["dataset"].is_object());
}

#[tokio::test]
async fn validation_errors_carry_no_remote_state() {
    // Bad package name fails before any catalog call.
    let header = bearer(&["quilt:UpdatePackage"], &["b"]);
    let envelope = call(
        &server(),
        Some(&header),
        "packaging",
        json!({
            "action": "create",
            "params": {"name": "NotAValidName", "files": ["s3://b/k.csv"]},
        }),
    )
    .await;
    assert_eq!(envelope["error_type"], json!("validation_error"));
}

#[tokio::test]
async fn empty_files_rejected() {
    let header = bearer(&["quilt:UpdatePackage"], &["b"]);
    let envelope = call(
        &server(),
        Some(&header),
        "packaging",
        json!({"action": "create", "params": {"name": "team/pkg", "files": []}}),
    )
    .await;
    assert_eq!(envelope["error_type"], json!("validation_error"));
}

#[tokio::test]
async fn unknown_search_action_lists_alternatives() {
    let header = bearer(&["quilt:BrowsePackages"], &[]);
    let envelope = call(
        &server(),
        Some(&header),
        "search",
        json!({"action": "teleport"}),
    )
    .await;
    assert_eq!(envelope["error_type"], json!("validation_error"));
    assert!(
        envelope["error"]
            .as_str()
            .is_some_and(|m| m.contains("unified_search"))
    );
}

#[tokio::test]
async fn search_size_filter_window_validated() {
    let header = bearer(&["quilt:BrowsePackages"], &[]);
    let envelope = call(
        &server(),
        Some(&header),
        "search",
        json!({
            "action": "unified_search",
            "params": {
                "query": "*.csv",
                "filters": {"size_min": 100, "size_max": 1},
            },
        }),
    )
    .await;
    assert_eq!(envelope["error_type"], json!("validation_error"));
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn resources_list_and_read() {
    let server = server();
    let listing = server
        .handle_request(&json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}), None)
        .await
        .expect("resources/list answers");
    let resources = listing["result"]["resources"].as_array().expect("array");
    assert!(resources.iter().any(|r| r["uri"] == json!("quilt://tools")));

    let read = server
        .handle_request(
            &json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "resources/read",
                "params": {"uri": "quilt://permissions/defaults"},
            }),
            None,
        )
        .await
        .expect("resources/read answers");
    let text = read["result"]["contents"][0]["text"].as_str().expect("text");
    assert!(text.contains("quilt:UpdatePackage"));
}
