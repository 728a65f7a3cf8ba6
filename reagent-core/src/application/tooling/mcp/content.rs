use super::error::McpError;
use crate::application::tooling::function::ToolOutput;
use serde_json::Value;

/// Turns a `tools/call` result into the text (and optional image) a step
/// records as its observation.
///
/// Text blocks are kept verbatim, an image block contributes its raw payload,
/// an embedded resource contributes its inner text. Any other block type is
/// rejected. A result flagged `isError` becomes [`McpError::ToolReported`].
pub fn normalize_call_result(server: &str, result: &Value) -> Result<ToolOutput, McpError> {
    let blocks = result
        .get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut texts = Vec::new();
    let mut image = None;
    for block in blocks {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or_default();
        match kind {
            "text" => texts.push(string_field(block, "text")),
            "image" => {
                if image.is_none() {
                    image = Some(string_field(block, "data"));
                }
            }
            "resource" => {
                let resource = block.get("resource").unwrap_or(&Value::Null);
                match resource.get("text").and_then(Value::as_str) {
                    Some(text) => texts.push(text.to_string()),
                    None => {
                        return Err(McpError::UnsupportedContent {
                            server: server.to_string(),
                            kind: "resource without text".to_string(),
                        });
                    }
                }
            }
            other => {
                return Err(McpError::UnsupportedContent {
                    server: server.to_string(),
                    kind: if other.is_empty() {
                        "<missing>".to_string()
                    } else {
                        other.to_string()
                    },
                });
            }
        }
    }

    let text = texts.join("\n");
    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(McpError::ToolReported {
            server: server.to_string(),
            message: if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            },
        });
    }

    Ok(ToolOutput { text, image })
}

fn string_field(block: &Value, key: &str) -> String {
    block
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
