//! Model Context Protocol server handling and JSON-RPC implementations
//!
//! Provides envelope decoding, method routing, session negotiation, and response formatting.

pub mod rpc;
pub mod server;
