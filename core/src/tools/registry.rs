use super::definition::ToolDefinition;
use super::traits::Tool;
use crate::{GatewayError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    tool: Arc<dyn Tool>,
}

/// Append-only table of the tools available to every session
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool under its definition's name.
    /// The definition is captured once here and never re-read.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let definition = tool.definition();
        let name = definition.name.clone();

        match self.tools.entry(name.clone()) {
            Entry::Occupied(_) => Err(GatewayError::DuplicateTool(name)),
            Entry::Vacant(slot) => {
                info!(target: "tool_registry", tool = %name, "Registering tool");
                slot.insert(RegisteredTool { definition, tool });
                Ok(())
            }
        }
    }

    /// Get the handler registered for `name`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;
        debug!(target: "tool_registry", tool = %name, "Resolved tool");
        Ok(Arc::clone(&entry.tool))
    }

    /// Get the definition captured at registration time
    pub fn definition(&self, name: &str) -> Option<ToolDefinition> {
        self.tools.get(name).map(|t| t.definition.clone())
    }

    /// All definitions, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.iter().map(|t| t.definition.clone()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions().into_iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
