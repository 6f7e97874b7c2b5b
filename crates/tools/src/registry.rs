//! Tool name → launch procedure.

use crate::darksearch::DarkSearchRunner;
use crate::launch::ProcessToolRunner;
use crate::r#trait::{CommandRunner, ToolRunner};
use osintmaster_core::{Launch, ToolName, CATALOG};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of tool runners.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    runners: HashMap<ToolName, Arc<dyn ToolRunner>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a runner for every catalogued tool.
    ///
    /// Process-based tools spawn through `commands`; the search tool talks
    /// to `search_base_url`.
    pub fn with_defaults(commands: Arc<dyn CommandRunner>, search_base_url: impl Into<String>) -> Self {
        let mut registry = Self::new();
        for descriptor in CATALOG.iter() {
            match descriptor.launch {
                Launch::Process { .. } => {
                    registry.register(Arc::new(ProcessToolRunner::new(descriptor.name, commands.clone())));
                }
                Launch::HttpSearch => {}
            }
        }
        registry.register(Arc::new(DarkSearchRunner::new(search_base_url)));
        registry
    }

    /// Register (or replace) a runner.
    pub fn register(&mut self, runner: Arc<dyn ToolRunner>) {
        self.runners.insert(runner.name(), runner);
    }

    /// Runner for `tool`.
    pub fn get(&self, tool: ToolName) -> Option<Arc<dyn ToolRunner>> {
        self.runners.get(&tool).cloned()
    }

    /// Registered tools in catalog order.
    pub fn tools(&self) -> Vec<ToolName> {
        ToolName::ALL
            .into_iter()
            .filter(|t| self.runners.contains_key(t))
            .collect()
    }
}
