//! Axum HTTP handlers for the web server
//!
//! Provides the streamable MCP endpoint (`POST`, `GET`, `DELETE /mcp`) and general metadata
//! endpoints. Malformed bodies and session failures are rejected here, before dispatch.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use axum_extra::TypedHeader;
use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::http::{
    headers::{LastEventId, McpSessionId, OptionalHeader},
    sse::keepalive_stream,
};
use crate::mcp::{
    rpc::{McpMethod, RpcBody},
    server::handle_envelope,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct TerminateResponse {
    pub message: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        msg: format!(
            "🚀 {} - Use /mcp endpoint for MCP protocol",
            env!("CARGO_PKG_NAME")
        ),
    })
}

pub async fn mcp_post(
    State(state): State<AppState>,
    OptionalHeader(session): OptionalHeader<McpSessionId>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = RpcBody::parse(&body)?;

    // Checked once per HTTP call, not per batch entry.
    if let Some(McpSessionId(session_id)) = session.as_ref() {
        if body.requires_session() && !state.sessions.exists(session_id).await {
            return Err(AppError::SessionNotFound);
        }
    }

    match body {
        RpcBody::Single(envelope) => {
            let is_initialize = envelope.method == McpMethod::Initialize;
            let Some(response) = handle_envelope(&state, envelope).await else {
                return Ok(StatusCode::NO_CONTENT.into_response());
            };

            let new_session = response
                .result_value()
                .filter(|_| is_initialize)
                .and_then(|result| result.get("sessionId"))
                .and_then(Value::as_str)
                .map(str::to_string);

            Ok(match new_session {
                Some(session_id) => {
                    (TypedHeader(McpSessionId(session_id)), Json(response)).into_response()
                }
                None => Json(response).into_response(),
            })
        }
        RpcBody::Batch(envelopes) => {
            let mut responses = Vec::with_capacity(envelopes.len());
            for envelope in envelopes {
                if let Some(response) = handle_envelope(&state, envelope).await {
                    responses.push(response);
                }
            }

            if responses.is_empty() {
                return Ok(StatusCode::NO_CONTENT.into_response());
            }
            Ok(Json(responses).into_response())
        }
    }
}

pub async fn mcp_get(
    State(state): State<AppState>,
    OptionalHeader(session): OptionalHeader<McpSessionId>,
    OptionalHeader(last_event_id): OptionalHeader<LastEventId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session_id = session.map(|McpSessionId(session_id)| session_id);
    if let Some(session_id) = session_id.as_deref() {
        if !state.sessions.exists(session_id).await {
            return Err(AppError::SessionNotFound);
        }
    }

    if let Some(LastEventId(last_event_id)) = last_event_id {
        debug!(last_event_id = %last_event_id, "stream resumption requested; replay not supported");
    }

    info!(
        session_id = session_id.as_deref().unwrap_or("-"),
        "keep-alive stream opened"
    );

    Ok(Sse::new(keepalive_stream(
        state.keepalive_interval,
        state.shutdown.child_token(),
        session_id,
    )))
}

pub async fn mcp_delete(
    State(state): State<AppState>,
    OptionalHeader(session): OptionalHeader<McpSessionId>,
) -> Result<Json<TerminateResponse>, AppError> {
    let Some(McpSessionId(session_id)) = session else {
        return Err(AppError::missing_session_id());
    };

    if !state.sessions.delete(&session_id).await {
        return Err(AppError::SessionNotFound);
    }

    Ok(Json(TerminateResponse {
        message: "Session terminated",
    }))
}
