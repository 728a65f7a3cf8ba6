use super::error::ToolError;
use super::schema::{Param, ToolDescriptor, function_schema};
use crate::domain::ToolArgs;
use serde_json::Value;
use std::fmt::{self, Display};
use std::sync::Arc;

/// What a tool hands back: primary text plus an optional auxiliary payload
/// such as a screenshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub image: Option<String>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(text: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: Some(image.into()),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(value: String) -> Self {
        ToolOutput::text(value)
    }
}

impl From<&str> for ToolOutput {
    fn from(value: &str) -> Self {
        ToolOutput::text(value)
    }
}

impl From<(String, String)> for ToolOutput {
    fn from((text, image): (String, String)) -> Self {
        ToolOutput::with_image(text, image)
    }
}

/// A callable the model may request by name.
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    fn call(&self, args: &ToolArgs) -> Result<ToolOutput, ToolError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

type Handler = dyn Fn(&ToolArgs) -> Result<ToolOutput, ToolError> + Send + Sync;

/// A plain function registered as a tool.
pub struct FunctionTool {
    descriptor: ToolDescriptor,
    handler: Arc<Handler>,
}

impl FunctionTool {
    /// Derives the descriptor from `doc` and `params`, then wraps `handler`.
    ///
    /// Handler errors are rendered with `Display` and surface as
    /// [`ToolError::Execution`].
    pub fn new<F, O, E>(name: &str, doc: &str, params: &[Param], handler: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<O, E> + Send + Sync + 'static,
        O: Into<ToolOutput>,
        E: Display,
    {
        Self::from_descriptor(function_schema(name, doc, params), handler)
    }

    pub fn from_descriptor<F, O, E>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<O, E> + Send + Sync + 'static,
        O: Into<ToolOutput>,
        E: Display,
    {
        Self {
            descriptor,
            handler: Arc::new(move |args: &ToolArgs| {
                handler(args).map(Into::into).map_err(ToolError::execution)
            }),
        }
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Tool for FunctionTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn call(&self, args: &ToolArgs) -> Result<ToolOutput, ToolError> {
        for argument in self.descriptor.required_args() {
            if !args.contains_key(&argument) {
                return Err(ToolError::MissingArgument {
                    tool: self.descriptor.name.clone(),
                    argument,
                });
            }
        }
        (self.handler)(args)
    }
}

/// Reads a string argument, accepting non-string values by their JSON text.
pub fn arg_str<'a>(args: &'a ToolArgs, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    match args.get(key)? {
        Value::String(text) => Some(std::borrow::Cow::Borrowed(text.as_str())),
        Value::Null => None,
        other => Some(std::borrow::Cow::Owned(other.to_string())),
    }
}

/// Reads an integer argument, parsing it out of a string when tags were used.
pub fn arg_i64(args: &ToolArgs, key: &str) -> Option<i64> {
    match args.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
