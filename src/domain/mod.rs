//! Tool catalog and tool implementations
//!
//! Provides the greeting, language-model relay, and file compression tools exposed over MCP.

pub mod compress;
pub mod tools;
pub mod utils;
