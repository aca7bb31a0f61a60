//! Unified tool namespace across all connected servers.

use std::collections::HashMap;
use std::sync::Arc;

use mcp::{ToolDescriptor, ToolServer};
use tracing::{debug, warn};

/// A tool with its source server.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    /// Name of the server providing this tool.
    pub server_name: String,
}

/// A tool hidden because an earlier server already registered its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedTool {
    pub tool: String,
    /// Server whose tool is used.
    pub kept: String,
    /// Server whose tool is hidden.
    pub shadowed: String,
}

/// Maps tool names to the server that owns them.
///
/// The mapping is a pure function of the last [`rebuild`](Self::rebuild).
/// When several servers expose the same tool name, the server that comes
/// first in the rebuild order wins and the others are recorded as shadowed.
pub struct ToolRegistry<S> {
    servers: Vec<Arc<S>>,
    tools: Vec<RegisteredTool>,
    // tool name -> (index into `tools`, index into `servers`)
    index: HashMap<String, (usize, usize)>,
    shadowed: Vec<ShadowedTool>,
}

impl<S> ToolRegistry<S> {
    pub fn new() -> Self {
        Self {
            servers: Vec::new(),
            tools: Vec::new(),
            index: HashMap::new(),
            shadowed: Vec::new(),
        }
    }

    /// Registered tools in catalog order.
    pub fn tools(&self) -> &[RegisteredTool] {
        &self.tools
    }

    /// The flattened, order-preserving tool catalog.
    pub fn catalog(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Get a registered tool by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&(tool, _)| &self.tools[tool])
    }

    /// The server that owns `name`.
    pub fn resolve(&self, name: &str) -> Option<&Arc<S>> {
        self.index.get(name).map(|&(_, server)| &self.servers[server])
    }

    /// Name of the server that owns `name`.
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.get(name).map(|t| t.server_name.as_str())
    }

    pub fn shadowed(&self) -> &[ShadowedTool] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl<S: ToolServer> ToolRegistry<S> {
    /// Query every server's catalog and replace the mapping.
    ///
    /// Servers whose catalog cannot be fetched are skipped.
    pub async fn rebuild(&mut self, servers: &[Arc<S>]) {
        let mut tools = Vec::new();
        let mut index = HashMap::new();
        let mut shadowed = Vec::new();

        for (server_idx, server) in servers.iter().enumerate() {
            let listed = match server.list_tools().await {
                Ok(listed) => listed,
                Err(e) => {
                    warn!(server = %server.name(), error = %e, "skipping server, cannot list tools");
                    continue;
                }
            };

            for descriptor in listed {
                if let Some(&(existing, _)) = index.get(&descriptor.name) {
                    let kept: &RegisteredTool = &tools[existing];
                    warn!(
                        tool = %descriptor.name,
                        kept = %kept.server_name,
                        shadowed = %server.name(),
                        "tool name collision, keeping first registration"
                    );
                    shadowed.push(ShadowedTool {
                        tool: descriptor.name,
                        kept: kept.server_name.clone(),
                        shadowed: server.name().to_string(),
                    });
                    continue;
                }

                index.insert(descriptor.name.clone(), (tools.len(), server_idx));
                tools.push(RegisteredTool {
                    descriptor,
                    server_name: server.name().to_string(),
                });
            }
        }

        debug!(tools = tools.len(), servers = servers.len(), "rebuilt tool registry");

        self.servers = servers.to_vec();
        self.tools = tools;
        self.index = index;
        self.shadowed = shadowed;
    }
}

impl<S> Default for ToolRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
