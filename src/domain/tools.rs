//! Tools exposed via Model Context Protocol
//!
//! The registry is a closed set of `ToolKind`s. Each tool declares a typed input struct;
//! arguments are checked against the declared schema before the handler runs, and every
//! handler failure becomes an `isError` result rather than a protocol error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, Tool},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::domain::{
    compress::{compress, CompressionFormat},
    utils::{error_result, first_missing_argument, required_arguments, text_result},
};
use crate::mcp::rpc::RpcFailure;
use crate::AppState;

#[macros::mcp_tool(
    name = "hello_claude",
    description = "Returns a greeting from the MCP server"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct HelloClaudeTool {}

#[macros::mcp_tool(
    name = "ask_claude",
    description = "Ask Claude a question and get a response"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AskClaudeTool {
    /// The prompt to send to Claude
    pub prompt: String,
}

#[macros::mcp_tool(
    name = "compress_file",
    description = "Compress file content using gzip or zip format"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CompressFileTool {
    /// The base64-encoded content to compress
    pub content: String,
    /// The filename for the compressed content
    pub filename: String,
    /// The compression format to use: gzip (default) or zip
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    HelloClaude,
    AskClaude,
    CompressFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [Self::HelloClaude, Self::AskClaude, Self::CompressFile];

    pub fn name(self) -> &'static str {
        match self {
            Self::HelloClaude => "hello_claude",
            Self::AskClaude => "ask_claude",
            Self::CompressFile => "compress_file",
        }
    }

    fn descriptor(self) -> Tool {
        match self {
            Self::HelloClaude => HelloClaudeTool::tool(),
            Self::AskClaude => AskClaudeTool::tool(),
            Self::CompressFile => with_format_choices(CompressFileTool::tool()),
        }
    }
}

/// Advertises the accepted values and the default for `compress_file.format`.
fn with_format_choices(tool: Tool) -> Tool {
    let Ok(mut value) = serde_json::to_value(&tool) else {
        return tool;
    };
    let Some(format) = value
        .pointer_mut("/inputSchema/properties/format")
        .and_then(Value::as_object_mut)
    else {
        return tool;
    };

    format.insert(
        "enum".to_string(),
        json!(CompressionFormat::ALL.map(CompressionFormat::as_str)),
    );
    format.insert(
        "default".to_string(),
        json!(CompressionFormat::Gzip.as_str()),
    );
    serde_json::from_value(value).unwrap_or(tool)
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub tool: Tool,
    pub required: Vec<String>,
}

/// Static tool catalog, identical for every session.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let descriptors = ToolKind::ALL
            .into_iter()
            .map(|kind| {
                let tool = kind.descriptor();
                let required = serde_json::to_value(&tool)
                    .ok()
                    .and_then(|value| value.get("inputSchema").map(required_arguments))
                    .unwrap_or_default();
                ToolDescriptor {
                    kind,
                    tool,
                    required,
                }
            })
            .collect();

        Self { descriptors }
    }

    pub fn list(&self) -> Vec<Tool> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.tool.clone())
            .collect()
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, RpcFailure> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.kind.name() == name)
            .ok_or_else(|| RpcFailure::ToolNotFound(name.to_string()))
    }
}

pub async fn handle_tools_call(
    state: &AppState,
    params: Map<String, Value>,
) -> Result<Value, RpcFailure> {
    let tool_call: CallToolRequestParams = serde_json::from_value(Value::Object(params))
        .map_err(|_| RpcFailure::InvalidParams("params must carry a tool name and object arguments"))?;

    let descriptor = state.registry.resolve(&tool_call.name)?;
    let arguments = match json!(tool_call.arguments.unwrap_or_default()) {
        Value::Object(arguments) => arguments,
        _ => Map::new(),
    };

    let result = call_tool(state, descriptor, arguments).await;
    Ok(serde_json::to_value(result)?)
}

/// Argument problems reported back to the caller as an `isError` result.
#[derive(Debug, thiserror::Error)]
pub enum ToolInputError {
    #[error("Missing '{0}' argument")]
    Missing(String),
    #[error("Invalid arguments for '{tool}': {source}")]
    Invalid {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub async fn call_tool(
    state: &AppState,
    descriptor: &ToolDescriptor,
    arguments: Map<String, Value>,
) -> CallToolResult {
    match run_tool(state, descriptor, arguments).await {
        Ok(result) => result,
        Err(err) => {
            debug!(tool = descriptor.kind.name(), error = %err, "tool arguments rejected");
            error_result(err.to_string())
        }
    }
}

async fn run_tool(
    state: &AppState,
    descriptor: &ToolDescriptor,
    arguments: Map<String, Value>,
) -> Result<CallToolResult, ToolInputError> {
    match descriptor.kind {
        ToolKind::HelloClaude => {
            validate_arguments::<HelloClaudeTool>(descriptor, arguments)?;
            Ok(hello_claude())
        }
        ToolKind::AskClaude => {
            let input = validate_arguments::<AskClaudeTool>(descriptor, arguments)?;
            Ok(ask_claude(state, input).await)
        }
        ToolKind::CompressFile => {
            let input = validate_arguments::<CompressFileTool>(descriptor, arguments)?;
            Ok(compress_file(input).await)
        }
    }
}

/// Checks the declared `required` list, then decodes into the tool's input struct.
fn validate_arguments<T: DeserializeOwned>(
    descriptor: &ToolDescriptor,
    arguments: Map<String, Value>,
) -> Result<T, ToolInputError> {
    if let Some(missing) = first_missing_argument(&descriptor.required, &arguments) {
        return Err(ToolInputError::Missing(missing.to_string()));
    }

    serde_json::from_value(Value::Object(arguments)).map_err(|source| ToolInputError::Invalid {
        tool: descriptor.kind.name(),
        source,
    })
}

fn hello_claude() -> CallToolResult {
    text_result(format!(
        "🚀 Hello from {}! I'm alive and well!",
        env!("CARGO_PKG_NAME")
    ))
}

async fn ask_claude(state: &AppState, input: AskClaudeTool) -> CallToolResult {
    let Some(model) = state.language_model.as_ref() else {
        return error_result("Claude API key not configured");
    };

    match model.complete(&input.prompt).await {
        Ok(reply) => text_result(reply),
        Err(err) => error_result(format!("Error calling Claude: {err}")),
    }
}

async fn compress_file(input: CompressFileTool) -> CallToolResult {
    let format = match input
        .format
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        None => CompressionFormat::Gzip,
        Some(raw) => match raw.parse::<CompressionFormat>() {
            Ok(format) => format,
            Err(err) => return error_result(err.to_string()),
        },
    };

    // Line-wrapped (MIME style) input is accepted.
    let packed: Vec<u8> = input
        .content
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    let decoded = match BASE64.decode(&packed) {
        Ok(bytes) => bytes,
        Err(err) => {
            return error_result(format!(
                "Error compressing file: content is not valid base64: {err}"
            ))
        }
    };

    let filename = input.filename;
    let compressed =
        match tokio::task::spawn_blocking(move || compress(format, &filename, &decoded)).await {
            Ok(Ok(compressed)) => compressed,
            Ok(Err(err)) => return error_result(format!("Error compressing file: {err}")),
            Err(err) => return error_result(format!("Error compressing file: {err}")),
        };

    let encoded = BASE64.encode(&compressed.data);
    let text = format!(
        "File compressed successfully!\n\n\
         Format: {format}\n\
         Original size: {original} bytes\n\
         Compressed size: {size} bytes\n\
         Compression ratio: {ratio:.1}%\n\
         Output filename: {output}\n\n\
         Compressed content (base64):\n{encoded}",
        format = compressed.format,
        original = compressed.original_size,
        size = compressed.compressed_size(),
        ratio = compressed.ratio_percent(),
        output = compressed.output_filename,
    );

    CallToolResult {
        structured_content: Some(Map::from_iter([
            ("format".to_string(), json!(compressed.format.as_str())),
            ("original_size".to_string(), json!(compressed.original_size)),
            (
                "compressed_size".to_string(),
                json!(compressed.compressed_size()),
            ),
            (
                "output_filename".to_string(),
                json!(compressed.output_filename),
            ),
        ])),
        ..text_result(text)
    }
}
