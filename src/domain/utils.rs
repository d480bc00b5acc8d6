//! Shared tool result builders and argument validation

use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent};
use serde_json::{Map, Value};

pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text.into(), None, None))],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

pub fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        is_error: Some(true),
        ..text_result(text)
    }
}

/// Reads the `required` list out of a tool's declared input schema.
pub fn required_arguments(input_schema: &Value) -> Vec<String> {
    input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the first required argument that is absent, null, or a blank string.
pub fn first_missing_argument<'a>(
    required: &'a [String],
    arguments: &Map<String, Value>,
) -> Option<&'a str> {
    required
        .iter()
        .find(|name| match arguments.get(name.as_str()) {
            None | Some(Value::Null) => true,
            Some(Value::String(value)) => value.trim().is_empty(),
            Some(_) => false,
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::{error_result, first_missing_argument, required_arguments, text_result};
    use serde_json::{json, Map, Value};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object arguments")
    }

    #[test]
    fn reads_required_list_from_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"content": {"type": "string"}, "filename": {"type": "string"}},
            "required": ["content", "filename"]
        });
        assert_eq!(required_arguments(&schema), vec!["content", "filename"]);
        assert!(required_arguments(&json!({"type": "object"})).is_empty());
    }

    #[test]
    fn detects_absent_null_and_blank_arguments() {
        let required = vec!["prompt".to_string()];
        assert_eq!(first_missing_argument(&required, &args(json!({}))), Some("prompt"));
        assert_eq!(
            first_missing_argument(&required, &args(json!({"prompt": null}))),
            Some("prompt")
        );
        assert_eq!(
            first_missing_argument(&required, &args(json!({"prompt": "  "}))),
            Some("prompt")
        );
        assert_eq!(
            first_missing_argument(&required, &args(json!({"prompt": "hi"}))),
            None
        );
    }

    #[test]
    fn reports_first_missing_in_declared_order() {
        let required = vec!["content".to_string(), "filename".to_string()];
        assert_eq!(
            first_missing_argument(&required, &args(json!({"filename": "a.txt"}))),
            Some("content")
        );
    }

    #[test]
    fn error_result_sets_flag_and_text_result_does_not() {
        let ok = serde_json::to_value(text_result("fine")).expect("serializes");
        assert_eq!(ok["content"][0]["type"], "text");
        assert_eq!(ok["content"][0]["text"], "fine");
        assert!(ok.get("isError").map_or(true, Value::is_null));

        let failed = serde_json::to_value(error_result("broken")).expect("serializes");
        assert_eq!(failed["isError"], true);
        assert_eq!(failed["content"][0]["text"], "broken");
    }
}
