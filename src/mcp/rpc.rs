//! JSON-RPC envelope decoding and response formatting
//!
//! Request bodies are decoded into typed envelopes before anything is dispatched, so a
//! malformed body is rejected at the transport boundary. Responses are built so that a
//! `result` and an `error` can never appear together.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::errors::AppError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl RequestId {
    fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::String(id) => Ok(Self::String(id)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Number)
                .ok_or(EnvelopeError::InvalidId),
            _ => Err(EnvelopeError::InvalidId),
        }
    }
}

/// Methods understood by the dispatcher. Anything else lands in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Initialized,
    Ping,
    ListTools,
    CallTool,
    Unknown(String),
}

impl McpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::Ping => "ping",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::Unknown(method) => method,
        }
    }
}

impl From<String> for McpMethod {
    fn from(method: String) -> Self {
        match method.as_str() {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            _ => Self::Unknown(method),
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Invalid request format")]
    InvalidShape,
    #[error("batch must contain at least one request")]
    EmptyBatch,
    #[error("{0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unsupported jsonrpc version {0:?}")]
    UnsupportedVersion(String),
    #[error("id must be a string, an integer, or null")]
    InvalidId,
    #[error("params must be an object")]
    InvalidParams,
}

impl EnvelopeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "invalid_json",
            Self::InvalidShape | Self::EmptyBatch => "invalid_request_format",
            Self::Malformed(_) | Self::InvalidId | Self::InvalidParams => "invalid_envelope",
            Self::UnsupportedVersion(_) => "unsupported_jsonrpc_version",
        }
    }
}

impl From<EnvelopeError> for AppError {
    fn from(err: EnvelopeError) -> Self {
        AppError::bad_request(err.code(), format!("Bad request: {err}"))
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    jsonrpc: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

// Keeps an explicit `"id": null` distinct from an absent id.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcEnvelope {
    /// `None` marks a notification.
    pub id: Option<RequestId>,
    pub method: McpMethod,
    pub params: Map<String, Value>,
}

impl JsonRpcEnvelope {
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        if !value.is_object() {
            return Err(EnvelopeError::InvalidShape);
        }

        let raw: RawEnvelope = serde_json::from_value(value).map_err(EnvelopeError::Malformed)?;
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(raw.jsonrpc));
        }

        let id = raw.id.map(RequestId::from_value).transpose()?;
        let params = match raw.params {
            None => Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => return Err(EnvelopeError::InvalidParams),
        };

        Ok(Self {
            id,
            method: McpMethod::from(raw.method),
            params,
        })
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A decoded `POST /mcp` body.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcBody {
    Single(JsonRpcEnvelope),
    Batch(Vec<JsonRpcEnvelope>),
}

impl RpcBody {
    pub fn parse(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let payload: Value = serde_json::from_slice(bytes).map_err(EnvelopeError::Parse)?;

        match payload {
            Value::Object(_) => JsonRpcEnvelope::from_value(payload).map(Self::Single),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(EnvelopeError::EmptyBatch);
                }
                items
                    .into_iter()
                    .map(JsonRpcEnvelope::from_value)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Batch)
            }
            _ => Err(EnvelopeError::InvalidShape),
        }
    }

    pub fn envelopes(&self) -> &[JsonRpcEnvelope] {
        match self {
            Self::Single(envelope) => std::slice::from_ref(envelope),
            Self::Batch(envelopes) => envelopes,
        }
    }

    /// True when any envelope needs an existing session; only `initialize` does not.
    pub fn requires_session(&self) -> bool {
        self.envelopes()
            .iter()
            .any(|envelope| envelope.method != McpMethod::Initialize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(JsonRpcError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl JsonRpcResponse {
    pub fn result(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn result_value(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }
}

/// Dispatch failures that still produce a well-formed error envelope.
#[derive(Debug, Error)]
pub enum RpcFailure {
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),
    #[error("Invalid params: {0}")]
    InvalidParams(&'static str),
    #[error("{0}")]
    Internal(String),
}

impl From<serde_json::Error> for RpcFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {err}"))
    }
}

impl RpcFailure {
    pub fn into_error(self) -> JsonRpcError {
        match self {
            Self::MethodNotFound(_) => JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: self.to_string(),
                data: None,
            },
            Self::ToolNotFound(ref name) => JsonRpcError {
                code: METHOD_NOT_FOUND,
                data: Some(json!({
                    "code": "tool_not_found",
                    "message": "unknown tool name",
                    "details": { "name": name },
                })),
                message: self.to_string(),
            },
            Self::InvalidParams(reason) => JsonRpcError {
                code: INVALID_PARAMS,
                message: "Invalid params".to_string(),
                data: Some(json!({
                    "code": "invalid_params",
                    "message": reason,
                    "details": {},
                })),
            },
            Self::Internal(detail) => JsonRpcError {
                code: INTERNAL_ERROR,
                message: "Internal error".to_string(),
                data: Some(Value::String(detail)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_request_with_integer_id() {
        let envelope = JsonRpcEnvelope::from_value(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/list"
        }))
        .expect("valid envelope");

        assert_eq!(envelope.id, Some(RequestId::Number(7)));
        assert_eq!(envelope.method, McpMethod::ListTools);
        assert!(envelope.params.is_empty());
    }

    #[test]
    fn absent_id_is_notification_but_null_id_is_not() {
        let notification = JsonRpcEnvelope::from_value(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .expect("valid notification");
        assert!(notification.is_notification());
        assert_eq!(notification.method, McpMethod::Initialized);

        let null_id = JsonRpcEnvelope::from_value(json!({
            "jsonrpc": "2.0",
            "id": null,
            "method": "ping"
        }))
        .expect("valid request");
        assert_eq!(null_id.id, Some(RequestId::Null));
    }

    #[test]
    fn unknown_method_is_preserved() {
        let envelope = JsonRpcEnvelope::from_value(json!({
            "jsonrpc": "2.0",
            "id": "a",
            "method": "foo/bar"
        }))
        .expect("valid envelope");
        assert_eq!(envelope.method, McpMethod::Unknown("foo/bar".to_string()));
        assert_eq!(envelope.method.as_str(), "foo/bar");
    }

    #[test]
    fn rejects_wrong_version_and_bad_fields() {
        let wrong_version =
            JsonRpcEnvelope::from_value(json!({"jsonrpc": "1.0", "id": 1, "method": "ping"}));
        assert!(matches!(
            wrong_version,
            Err(EnvelopeError::UnsupportedVersion(_))
        ));

        let fractional_id =
            JsonRpcEnvelope::from_value(json!({"jsonrpc": "2.0", "id": 1.5, "method": "ping"}));
        assert!(matches!(fractional_id, Err(EnvelopeError::InvalidId)));

        let array_params = JsonRpcEnvelope::from_value(
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "params": [1, 2]}),
        );
        assert!(matches!(array_params, Err(EnvelopeError::InvalidParams)));

        let missing_method = JsonRpcEnvelope::from_value(json!({"jsonrpc": "2.0", "id": 1}));
        assert!(matches!(missing_method, Err(EnvelopeError::Malformed(_))));
    }

    #[test]
    fn null_params_default_to_empty_object() {
        let envelope = JsonRpcEnvelope::from_value(
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": null}),
        )
        .expect("valid envelope");
        assert!(envelope.params.is_empty());
    }

    #[test]
    fn body_parse_distinguishes_single_batch_and_garbage() {
        let single = RpcBody::parse(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .expect("single body");
        assert!(matches!(single, RpcBody::Single(_)));

        let batch = RpcBody::parse(
            br#"[{"jsonrpc":"2.0","id":1,"method":"ping"},{"jsonrpc":"2.0","method":"notifications/initialized"}]"#,
        )
        .expect("batch body");
        assert_eq!(batch.envelopes().len(), 2);

        assert!(matches!(RpcBody::parse(b"{"), Err(EnvelopeError::Parse(_))));
        assert!(matches!(RpcBody::parse(b"42"), Err(EnvelopeError::InvalidShape)));
        assert!(matches!(RpcBody::parse(b"[]"), Err(EnvelopeError::EmptyBatch)));
        assert!(matches!(
            RpcBody::parse(br#"[{"jsonrpc":"2.0","id":1,"method":"ping"}, 3]"#),
            Err(EnvelopeError::InvalidShape)
        ));
    }

    #[test]
    fn initialize_only_bodies_do_not_require_session() {
        let init = RpcBody::parse(br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .expect("valid body");
        assert!(!init.requires_session());

        let mixed = RpcBody::parse(
            br#"[{"jsonrpc":"2.0","id":1,"method":"initialize"},{"jsonrpc":"2.0","id":2,"method":"tools/list"}]"#,
        )
        .expect("valid body");
        assert!(mixed.requires_session());
    }

    #[test]
    fn responses_serialize_result_or_error_exclusively() {
        let ok = JsonRpcResponse::result(RequestId::Number(1), json!({"tools": []}));
        assert_eq!(
            serde_json::to_value(&ok).expect("serializes"),
            json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}})
        );

        let failed = JsonRpcResponse::error(
            RequestId::Null,
            RpcFailure::MethodNotFound("foo/bar".to_string()).into_error(),
        );
        assert_eq!(
            serde_json::to_value(&failed).expect("serializes"),
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32601, "message": "Method not found: foo/bar"}
            })
        );
    }

    #[test]
    fn internal_failure_carries_detail_as_data() {
        let error = RpcFailure::Internal("boom".to_string()).into_error();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.message, "Internal error");
        assert_eq!(error.data, Some(json!("boom")));
    }
}
