//! Tool descriptors and their derivation from a signature plus doc text.

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// The registry's public view of a callable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON-Schema object describing the keyword arguments.
    pub args_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, args_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args_schema,
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Names listed under `required` in the schema.
    pub fn required_args(&self) -> Vec<String> {
        self.args_schema
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ParamType {
    fn json_type(self) -> Option<&'static str> {
        match self {
            ParamType::String => Some("string"),
            ParamType::Integer => Some("integer"),
            ParamType::Number => Some("number"),
            ParamType::Boolean => Some("boolean"),
            ParamType::Array => Some("array"),
            ParamType::Object => Some("object"),
            ParamType::Any => None,
        }
    }
}

/// One parameter of a tool signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
    pub has_default: bool,
    pub description: Option<String>,
}

impl Param {
    pub fn required(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            has_default: false,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            has_default: true,
            ..Self::required(name, kind)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Summary and per-parameter descriptions pulled out of doc text.
///
/// Understands a Google-style `Args:` section (`name (type): text`) and a
/// rustdoc-style `# Arguments` section (``* `name` - text``). Continuation
/// lines that are indented deeper than the entry are appended to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub summary: String,
    pub params: HashMap<String, String>,
}

impl DocComment {
    pub fn parse(doc: &str) -> Self {
        let mut summary_lines = Vec::new();
        let mut params: HashMap<String, String> = HashMap::new();
        let mut section = Section::Summary;
        let mut current: Option<(String, usize)> = None;

        for line in doc.lines() {
            let trimmed = line.trim();
            if let Some(next) = Section::header(trimmed) {
                section = next;
                current = None;
                continue;
            }

            match section {
                Section::Summary => summary_lines.push(trimmed),
                Section::Args => {
                    if trimmed.is_empty() {
                        current = None;
                        continue;
                    }
                    let indent = line.len() - line.trim_start().len();
                    if let Some((name, text)) = parse_param_line(trimmed) {
                        params.insert(name.clone(), text);
                        current = Some((name, indent));
                    } else if let Some((name, entry_indent)) = &current {
                        if indent > *entry_indent {
                            if let Some(text) = params.get_mut(name) {
                                if !text.is_empty() {
                                    text.push(' ');
                                }
                                text.push_str(trimmed);
                            }
                        }
                    }
                }
                Section::Other => {}
            }
        }

        Self {
            summary: join_paragraph(&summary_lines),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Args,
    Other,
}

impl Section {
    fn header(line: &str) -> Option<Self> {
        let lowered = line.to_ascii_lowercase();
        let label = lowered.trim_start_matches('#').trim().trim_end_matches(':');
        let is_header = line.ends_with(':') || line.starts_with('#');
        if !is_header {
            return None;
        }
        match label {
            "args" | "arguments" | "parameters" | "params" => Some(Section::Args),
            "returns" | "return" | "raises" | "errors" | "examples" | "example" | "panics"
            | "yields" | "notes" | "note" => Some(Section::Other),
            _ => None,
        }
    }
}

fn parse_param_line(line: &str) -> Option<(String, String)> {
    // rustdoc: * `name` - text
    if let Some(rest) = line.strip_prefix("* `").or_else(|| line.strip_prefix("- `")) {
        let (name, tail) = rest.split_once('`')?;
        let text = tail.trim_start().trim_start_matches(['-', ':']).trim();
        return Some((name.to_string(), text.to_string()));
    }

    // google: name (type): text   or   name: text
    let (head, text) = line.split_once(':')?;
    let name = head.split_once('(').map(|(n, _)| n).unwrap_or(head).trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_string(), text.trim().to_string()))
}

fn join_paragraph(lines: &[&str]) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in lines {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs.join("\n")
}

/// Builds `{name, description, parameters}` for a callable.
///
/// Parameters without a default are required. Descriptions come from the
/// parameter itself, falling back to the doc text. Pure: nothing is called.
pub fn function_schema(name: &str, doc: &str, params: &[Param]) -> ToolDescriptor {
    let parsed = DocComment::parse(doc);
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut property = Map::new();
        if let Some(kind) = param.kind.json_type() {
            property.insert("type".to_string(), json!(kind));
        }
        let description = param
            .description
            .clone()
            .or_else(|| parsed.params.get(&param.name).cloned());
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            property.insert("description".to_string(), json!(description));
        }
        properties.insert(param.name.clone(), Value::Object(property));
        if !param.has_default {
            required.push(json!(param.name));
        }
    }

    ToolDescriptor::new(
        name,
        parsed.summary,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    )
}
