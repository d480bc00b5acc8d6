//! The central Model Context Protocol engine
//!
//! Routes decoded envelopes by method, negotiates sessions on `initialize`, and wraps every
//! outcome (including handler panics) into a well-formed response envelope.

use std::{any::Any, panic::AssertUnwindSafe};

use futures::FutureExt;
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ListToolsResult, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::domain::tools::handle_tools_call;
use crate::mcp::rpc::{JsonRpcEnvelope, JsonRpcResponse, McpMethod, RequestId, RpcFailure};
use crate::AppState;

pub const LATEST_PROTOCOL_VERSION: &str = "2025-03-26";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 2] = [LATEST_PROTOCOL_VERSION, "2024-11-05"];

/// Handles one envelope. Returns `None` when no response may be sent.
pub async fn handle_envelope(
    state: &AppState,
    envelope: JsonRpcEnvelope,
) -> Option<JsonRpcResponse> {
    let JsonRpcEnvelope { id, method, params } = envelope;

    if method == McpMethod::Initialized {
        debug!("client reported initialization complete");
        return None;
    }

    let Some(id) = id else {
        debug!(method = %method.as_str(), "ignoring notification");
        return None;
    };

    Some(handle_request(state, id, method, params).await)
}

pub async fn handle_request(
    state: &AppState,
    id: RequestId,
    method: McpMethod,
    params: Map<String, Value>,
) -> JsonRpcResponse {
    let audit_params = redact_audit_params(&params);
    let method_name = method.as_str().to_string();

    let outcome = AssertUnwindSafe(dispatch(state, method, params))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(RpcFailure::Internal(panic_message(panic))));

    let response = match outcome {
        Ok(result) => JsonRpcResponse::result(id, result),
        Err(failure) => JsonRpcResponse::error(id, failure.into_error()),
    };

    info!(
        method = %method_name,
        params = %audit_params,
        outcome = if response.is_error() { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

async fn dispatch(
    state: &AppState,
    method: McpMethod,
    params: Map<String, Value>,
) -> Result<Value, RpcFailure> {
    match method {
        McpMethod::Initialize => initialize(state, &params).await,
        McpMethod::Initialized | McpMethod::Ping => Ok(json!({})),
        McpMethod::ListTools => Ok(serde_json::to_value(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: state.registry.list(),
        })?),
        McpMethod::CallTool => handle_tools_call(state, params).await,
        McpMethod::Unknown(method) => Err(RpcFailure::MethodNotFound(method)),
    }
}

async fn initialize(state: &AppState, params: &Map<String, Value>) -> Result<Value, RpcFailure> {
    let initialize_result = InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        protocol_version: negotiate_protocol_version(params).to_string(),
        instructions: None,
        meta: None,
    };
    let mut result = serde_json::to_value(initialize_result)?;

    let client_info = params
        .get("clientInfo")
        .filter(|value| value.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}));
    let session_id = state.sessions.create(client_info).await;

    if let Value::Object(fields) = &mut result {
        fields.insert("sessionId".to_string(), Value::String(session_id));
    }
    Ok(result)
}

/// Echoes the client's protocol version when supported, otherwise offers the latest.
pub fn negotiate_protocol_version(params: &Map<String, Value>) -> &'static str {
    params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .map(str::trim)
        .and_then(|offered| {
            SUPPORTED_PROTOCOL_VERSIONS
                .into_iter()
                .find(|supported| *supported == offered)
        })
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

pub fn redact_audit_params(params: &Map<String, Value>) -> Value {
    redact_audit_value(&Value::Object(params.clone()))
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else if let (true, Some(text)) = (is_bulky_key(key), item.as_str()) {
                        (
                            key.clone(),
                            Value::String(format!("[{} chars]", text.chars().count())),
                        )
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}

// User payloads are logged by size only.
fn is_bulky_key(key: &str) -> bool {
    matches!(key, "content" | "prompt")
}
