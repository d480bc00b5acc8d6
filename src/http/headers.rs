//! Typed MCP transport headers

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName, HeaderValue},
};
use axum_extra::headers::{Error, Header};

use crate::errors::AppError;

pub static MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");
pub static LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// `Mcp-Session-Id`: sent by clients after `initialize`, returned by the server on `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpSessionId(pub String);

/// `Last-Event-ID`: accepted on the keep-alive stream; replay is not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastEventId(pub String);

fn decode_token<'i, I>(values: &mut I) -> Result<String, Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    values
        .next()
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(Error::invalid)
}

fn encode_token<E: Extend<HeaderValue>>(token: &str, values: &mut E) {
    if let Ok(value) = HeaderValue::from_str(token) {
        values.extend(std::iter::once(value));
    }
}

impl Header for McpSessionId {
    fn name() -> &'static HeaderName {
        &MCP_SESSION_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_token(values).map(Self)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_token(&self.0, values);
    }
}

impl Header for LastEventId {
    fn name() -> &'static HeaderName {
        &LAST_EVENT_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_token(values).map(Self)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_token(&self.0, values);
    }
}

/// Optional typed header where a blank value counts as absent and an undecodable
/// value is rejected with a JSON 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalHeader<H>(pub Option<H>);

fn is_blank(value: &HeaderValue) -> bool {
    value.as_bytes().iter().all(u8::is_ascii_whitespace)
}

impl<S, H> FromRequestParts<S> for OptionalHeader<H>
where
    S: Send + Sync,
    H: Header + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = H::name();
        let mut values = parts
            .headers
            .get_all(name)
            .iter()
            .filter(|value| !is_blank(value))
            .peekable();

        if values.peek().is_none() {
            return Ok(Self(None));
        }

        H::decode(&mut values).map(|header| Self(Some(header))).map_err(|_| {
            AppError::bad_request("invalid_header", format!("Invalid {name} header"))
        })
    }
}
