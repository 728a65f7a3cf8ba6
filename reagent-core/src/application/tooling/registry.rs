use super::error::{RegistryError, ToolError};
use super::function::{FunctionTool, Tool, ToolOutput};
use super::group::{NamespacedTool, ToolGroup};
use super::mcp::{McpTool, McpToolGroup};
use super::schema::{Param, ToolDescriptor};
use crate::domain::ToolArgs;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Catalogue {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    mcp_tools: BTreeMap<String, Arc<McpTool>>,
    mcp_servers: HashSet<String>,
    mcp_groups: Vec<Arc<McpToolGroup>>,
}

/// Name-to-handler catalogue consulted by the step controller.
///
/// Plain tools and MCP tools live in separate namespaces; a name can be
/// registered once per namespace. Lookups check plain tools first.
/// Registration is expected to finish before concurrent calls begin.
#[derive(Default)]
pub struct ToolRegistry {
    catalogue: RwLock<Catalogue>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<ToolDescriptor, RegistryError> {
        let descriptor = tool.descriptor().clone();
        let mut catalogue = self.catalogue.write();
        if catalogue.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::ToolConflict(descriptor.name));
        }
        catalogue.tools.insert(descriptor.name.clone(), tool);
        debug!(tool = %descriptor.name, "registered tool");
        Ok(descriptor)
    }

    /// Wraps a plain function and registers it.
    pub fn register_function<F, O, E>(
        &self,
        name: &str,
        doc: &str,
        params: &[Param],
        handler: F,
    ) -> Result<ToolDescriptor, RegistryError>
    where
        F: Fn(&ToolArgs) -> Result<O, E> + Send + Sync + 'static,
        O: Into<ToolOutput>,
        E: Display,
    {
        self.register_tool(Arc::new(FunctionTool::new(name, doc, params, handler)))
    }

    /// Registers every member as `"<group>:<member>"`. Either all members are
    /// registered or, on a name conflict, none are.
    pub fn register_group(&self, group: &dyn ToolGroup) -> Result<Vec<ToolDescriptor>, RegistryError> {
        let wrapped: Vec<Arc<dyn Tool>> = group
            .members()
            .into_iter()
            .map(|member| Arc::new(NamespacedTool::new(group.group_name(), member)) as Arc<dyn Tool>)
            .collect();

        let mut catalogue = self.catalogue.write();
        let mut seen = HashSet::new();
        for tool in &wrapped {
            let name = tool.name();
            if catalogue.tools.contains_key(name) || !seen.insert(name.to_string()) {
                return Err(RegistryError::ToolConflict(name.to_string()));
            }
        }

        let descriptors = wrapped
            .into_iter()
            .map(|tool| {
                let descriptor = tool.descriptor().clone();
                catalogue.tools.insert(descriptor.name.clone(), tool);
                descriptor
            })
            .collect::<Vec<_>>();
        info!(
            group = group.group_name(),
            tools = descriptors.len(),
            "registered tool group"
        );
        Ok(descriptors)
    }

    /// Reserves an MCP server name.
    pub fn register_mcp_group(&self, name: &str) -> Result<(), RegistryError> {
        let mut catalogue = self.catalogue.write();
        if !catalogue.mcp_servers.insert(name.to_string()) {
            return Err(RegistryError::ServerConflict(name.to_string()));
        }
        Ok(())
    }

    pub fn register_mcp_tool(&self, tool: Arc<McpTool>) -> Result<ToolDescriptor, RegistryError> {
        let descriptor = tool.descriptor().clone();
        let mut catalogue = self.catalogue.write();
        if catalogue.mcp_tools.contains_key(&descriptor.name) {
            return Err(RegistryError::McpToolConflict(descriptor.name));
        }
        catalogue.mcp_tools.insert(descriptor.name.clone(), tool);
        Ok(descriptor)
    }

    /// Reserves the server name, connects, lists the remote tools and
    /// registers each as `"<server>:<tool>"`.
    ///
    /// A server that cannot be initialised is not registered at all: its name
    /// is released and the failure is returned.
    pub fn register_mcp_server(
        &self,
        group: McpToolGroup,
    ) -> Result<Arc<McpToolGroup>, RegistryError> {
        let server = group.name().to_string();
        self.register_mcp_group(&server)?;
        let group = Arc::new(group);

        let remote = match group.tools() {
            Ok(remote) => remote,
            Err(source) => {
                self.catalogue.write().mcp_servers.remove(&server);
                return Err(RegistryError::McpInit { server, source });
            }
        };

        let proxies: Vec<Arc<McpTool>> = remote
            .iter()
            .map(|tool| Arc::new(McpTool::new(Arc::clone(&group), tool)))
            .collect();

        let mut catalogue = self.catalogue.write();
        let taken = proxies
            .iter()
            .map(|proxy| proxy.name())
            .find(|name| catalogue.mcp_tools.contains_key(*name))
            .map(str::to_string);
        if let Some(taken) = taken {
            catalogue.mcp_servers.remove(&server);
            return Err(RegistryError::McpToolConflict(taken));
        }
        for proxy in proxies {
            catalogue
                .mcp_tools
                .insert(proxy.name().to_string(), proxy);
        }
        catalogue.mcp_groups.push(Arc::clone(&group));
        info!(server = %server, tools = remote.len(), "registered MCP server");
        Ok(group)
    }

    pub fn contains(&self, name: &str) -> bool {
        let catalogue = self.catalogue.read();
        catalogue.tools.contains_key(name) || catalogue.mcp_tools.contains_key(name)
    }

    /// Resolves `name`, plain tools first, and runs it outside the lock.
    pub fn call(&self, name: &str, args: &ToolArgs) -> Result<ToolOutput, ToolError> {
        let tool: Arc<dyn Tool> = {
            let catalogue = self.catalogue.read();
            if let Some(tool) = catalogue.tools.get(name) {
                Arc::clone(tool)
            } else if let Some(tool) = catalogue.mcp_tools.get(name) {
                Arc::clone(tool) as Arc<dyn Tool>
            } else {
                return Err(ToolError::NotFound(name.to_string()));
            }
        };
        debug!(tool = name, "calling tool");
        tool.call(args)
    }

    /// Plain tools followed by MCP tools, each in name order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let catalogue = self.catalogue.read();
        catalogue
            .tools
            .values()
            .map(|tool| tool.descriptor().clone())
            .chain(
                catalogue
                    .mcp_tools
                    .values()
                    .map(|tool| tool.descriptor().clone()),
            )
            .collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.descriptors().into_iter().map(|d| d.name).collect()
    }

    /// Closes every distinct MCP connection once. Failures are logged.
    pub fn cleanup_all_clients(&self) {
        let groups: Vec<Arc<McpToolGroup>> = {
            let catalogue = self.catalogue.read();
            let mut seen = HashSet::new();
            catalogue
                .mcp_groups
                .iter()
                .cloned()
                .chain(catalogue.mcp_tools.values().map(|tool| Arc::clone(tool.group())))
                .filter(|group| seen.insert(Arc::as_ptr(group)))
                .collect()
        };

        for group in groups {
            match group.close() {
                Ok(()) => debug!(server = group.name(), "closed MCP client"),
                Err(err) => warn!(server = group.name(), %err, "failed to close MCP client"),
            }
        }
    }
}
