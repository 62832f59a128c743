//! Object-safe [`Tool`] trait and the [`ToolRegistry`] that holds named
//! implementations, grounded in `neuron-tool`'s `ToolDyn`/`ToolRegistry`
//! pair but specialized to argo's text-in/text-out tool surface (§4.3).

use std::collections::BTreeMap;
use std::sync::Arc;

use argo_types::{ToolProposal, ToolResult};
use async_trait::async_trait;

/// One named parameter a tool accepts, used to render both the XML and JSON
/// manifests (§4.3).
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// The parameter's name.
    pub name: &'static str,
    /// A short human description, shown to the model in the manifest.
    pub description: &'static str,
    /// Whether the model must supply this parameter.
    pub required: bool,
}

impl ParamSpec {
    /// Construct a required parameter spec.
    #[must_use]
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
        }
    }

    /// Construct an optional parameter spec.
    #[must_use]
    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
        }
    }
}

/// Object-safe trait for tool implementations. Any concrete tool (a web
/// search client, a memory query against the vector store, ...) implements
/// this; `ToolExecutor` (`argo-executor`) only ever sees `Arc<dyn Tool>`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique registered name, e.g. `"web_search"`.
    fn name(&self) -> &'static str;

    /// A one-line description shown in the rendered manifest.
    fn description(&self) -> &'static str;

    /// The named parameters this tool accepts.
    fn params(&self) -> &'static [ParamSpec];

    /// Execute the tool against an approved proposal's parameters. Tools
    /// never panic or return a Rust `Err` across this boundary — a failed
    /// tool call is represented as `ToolResult { status: Error, .. }` (§4.6).
    async fn run(&self, proposal: &ToolProposal) -> ToolResult;
}

/// Holds named tool implementations, keyed by [`Tool::name`].
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Overwrites any existing tool registered under the
    /// same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Iterate over all registered tools, in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry has no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The subset of registered tools named in `names`, preserving `names`'
    /// order. Unknown names are silently skipped (the manifest renderer
    /// never references a tool that wasn't registered).
    #[must_use]
    pub fn subset(&self, names: &[&str]) -> Vec<Arc<dyn Tool>> {
        names.iter().filter_map(|n| self.get(n)).collect()
    }
}
