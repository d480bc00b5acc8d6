//! Static discovery documents for an authentication-free deployment
//!
//! Clients that probe for OAuth metadata get documents that advertise no authentication;
//! registration and token requests always succeed with placeholder credentials.

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{errors::AppError, mcp::server::LATEST_PROTOCOL_VERSION, AppState};

#[derive(Debug, Serialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub registration_endpoint: String,
    pub token_endpoint: String,
    pub authorization_endpoint: String,
    pub grant_types_supported: [&'static str; 1],
    pub response_types_supported: [&'static str; 1],
    pub token_endpoint_auth_methods_supported: [&'static str; 1],
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: &'static str,
    pub client_id_issued_at: i64,
    pub grant_types: [&'static str; 1],
    pub response_types: [&'static str; 1],
    pub token_endpoint_auth_method: &'static str,
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: &'static str,
    pub token_type: &'static str,
    pub expires_in: u32,
}

#[derive(Debug, Serialize)]
pub struct LegacyManifest {
    pub name: &'static str,
    pub description: &'static str,
    pub mcp_version: &'static str,
    pub transport: &'static str,
    pub endpoint: String,
}

pub const SERVER_DESCRIPTION: &str = "MCP server with hello_claude, ask_claude and compress_file tools";

pub async fn oauth_authorization_server(
    State(state): State<AppState>,
) -> Json<AuthorizationServerMetadata> {
    let base = state.public_base_url.as_ref();
    Json(AuthorizationServerMetadata {
        issuer: base.to_string(),
        registration_endpoint: format!("{base}/register"),
        token_endpoint: format!("{base}/token"),
        authorization_endpoint: format!("{base}/authorize"),
        grant_types_supported: ["client_credentials"],
        response_types_supported: ["token"],
        token_endpoint_auth_methods_supported: ["none"],
    })
}

pub async fn register_client(body: Bytes) -> Result<Json<ClientRegistration>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RegistrationRequest::default()
    } else {
        serde_json::from_slice::<RegistrationRequest>(&body).map_err(|err| {
            AppError::bad_request("invalid_registration", format!("Bad request: {err}"))
        })?
    };

    Ok(Json(ClientRegistration {
        client_id: Uuid::new_v4().to_string(),
        client_secret: "",
        client_id_issued_at: Utc::now().timestamp(),
        grant_types: ["client_credentials"],
        response_types: ["token"],
        token_endpoint_auth_method: "none",
        redirect_uris: request.redirect_uris,
    }))
}

pub async fn issue_token() -> Json<TokenResponse> {
    Json(TokenResponse {
        access_token: "dummy-token-no-auth-required",
        token_type: "Bearer",
        expires_in: 3600,
    })
}

pub async fn legacy_manifest(State(state): State<AppState>) -> Json<LegacyManifest> {
    Json(LegacyManifest {
        name: env!("CARGO_PKG_NAME"),
        description: SERVER_DESCRIPTION,
        mcp_version: LATEST_PROTOCOL_VERSION,
        transport: "http",
        endpoint: format!("{}/mcp", state.public_base_url),
    })
}

pub async fn openapi_spec(State(state): State<AppState>) -> Json<Value> {
    let id_schema = json!({
        "oneOf": [{"type": "string"}, {"type": "integer"}, {"type": "null"}]
    });

    Json(json!({
        "openapi": "3.0.0",
        "info": {
            "title": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": SERVER_DESCRIPTION
        },
        "servers": [{"url": state.public_base_url.as_ref()}],
        "paths": {
            "/mcp": {
                "post": {
                    "summary": "MCP JSON-RPC endpoint",
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "properties": {
                                        "jsonrpc": {"type": "string", "enum": ["2.0"]},
                                        "id": id_schema.clone(),
                                        "method": {"type": "string"},
                                        "params": {"type": "object"}
                                    },
                                    "required": ["jsonrpc", "method"]
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Successful response",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "jsonrpc": {"type": "string", "enum": ["2.0"]},
                                            "id": id_schema,
                                            "result": {"type": "object"}
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }))
}
