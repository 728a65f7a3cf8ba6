use super::error::ToolError;
use super::function::{FunctionTool, Tool, ToolOutput};
use super::schema::{Param, ToolDescriptor};
use crate::domain::ToolArgs;
use std::fmt::Display;
use std::sync::Arc;

/// A named bundle of tools registered together.
///
/// Members are listed with their bare method names; the registry exposes each
/// one as `"<group>:<method>"`.
pub trait ToolGroup: Send + Sync {
    fn group_name(&self) -> &str;

    fn members(&self) -> Vec<Arc<dyn Tool>>;
}

/// Builder-style [`ToolGroup`] made of plain functions.
pub struct ToolSet {
    name: String,
    members: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn method<F, O, E>(mut self, name: &str, doc: &str, params: &[Param], handler: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<O, E> + Send + Sync + 'static,
        O: Into<ToolOutput>,
        E: Display,
    {
        self.members
            .push(Arc::new(FunctionTool::new(name, doc, params, handler)));
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.members.push(tool);
        self
    }
}

impl ToolGroup for ToolSet {
    fn group_name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> Vec<Arc<dyn Tool>> {
        self.members.clone()
    }
}

pub fn qualified_name(group: &str, method: &str) -> String {
    format!("{group}:{method}")
}

/// A group member exposed under its qualified name.
pub(crate) struct NamespacedTool {
    descriptor: ToolDescriptor,
    inner: Arc<dyn Tool>,
}

impl NamespacedTool {
    pub(crate) fn new(group: &str, inner: Arc<dyn Tool>) -> Self {
        let descriptor = inner
            .descriptor()
            .renamed(qualified_name(group, inner.name()));
        Self { descriptor, inner }
    }
}

impl Tool for NamespacedTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn call(&self, args: &ToolArgs) -> Result<ToolOutput, ToolError> {
        self.inner.call(args)
    }
}
