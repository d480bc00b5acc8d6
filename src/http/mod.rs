//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the external API routing: the `/mcp` endpoint, its keep-alive stream, and the
//! discovery documents.

pub mod cors;
pub mod discovery;
pub mod handlers;
pub mod headers;
pub mod sse;
