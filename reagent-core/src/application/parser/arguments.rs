use super::ParseError;
use crate::domain::ToolArgs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// A block made of `<key>...</key>` pairs: starts with an opening tag and
/// contains at least one closing tag.
static XML_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^<[A-Za-z_][\w.\-]*>.*</[A-Za-z_][\w.\-]*>").expect("literal regex")
});
static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Za-z_][\w.\-]*)>").expect("literal regex"));
static CLOSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</([A-Za-z_][\w.\-]*)>").expect("literal regex"));

/// Parses an `Action Input` block: XML-style tags first, a JSON object second.
pub fn parse_arguments(raw: &str) -> Result<ToolArgs, ParseError> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Ok(ToolArgs::new());
    }

    if !text.starts_with('{') && XML_BLOCK.is_match(text) {
        return parse_tag_pairs(text);
    }

    match extract_json(text) {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ParseError::MalformedArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        None => Err(ParseError::MalformedArguments(format!(
            "neither <key>value</key> tags nor a JSON object: {}",
            preview(text)
        ))),
    }
}

fn parse_tag_pairs(text: &str) -> Result<ToolArgs, ParseError> {
    let mut args = ToolArgs::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some(open) = OPEN_TAG.captures(rest) else {
            return Err(ParseError::MalformedArguments(format!(
                "expected an opening tag near '{}'",
                preview(rest)
            )));
        };
        let name = open[1].to_string();
        let body = &rest[open[0].len()..];
        let closing = format!("</{name}>");

        let Some(end) = body.find(&closing) else {
            return Err(match CLOSE_TAG.captures(body) {
                Some(close) => ParseError::MismatchedTag {
                    open: name,
                    close: close[1].to_string(),
                },
                None => ParseError::UnclosedTag(name),
            });
        };

        args.insert(name, Value::String(tag_value(&body[..end]).to_string()));
        rest = body[end + closing.len()..].trim_start();
    }

    Ok(args)
}

/// Tag bodies are kept verbatim apart from the one newline that wraps a
/// value written on its own lines.
fn tag_value(body: &str) -> &str {
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    body.strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return text;
    };
    // Drop an info string such as ```json or ```xml.
    match inner.find('\n') {
        Some(newline)
            if inner[..newline]
                .chars()
                .all(|c| c.is_ascii_alphanumeric()) =>
        {
            inner[newline + 1..].trim()
        }
        _ => inner.trim(),
    }
}

/// Finds a JSON value in model output: the whole text, or the outermost
/// `{...}` span.
pub(crate) fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let stripped = strip_code_fence(trimmed);
    if stripped.len() != trimmed.len() {
        if let Ok(value) = serde_json::from_str::<Value>(stripped) {
            return Some(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 40;
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
