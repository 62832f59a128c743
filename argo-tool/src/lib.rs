#![deny(missing_docs)]
//! Tool registry and per-mode manifest rendering (§4.3 of the spec).
//!
//! Holds named tool implementations and renders the tool manifest the model
//! sees, in either XML or JSON wire format depending on the configured model
//! family. The five built-in tools (`web_search`, `web_access`,
//! `memory_query`, `memory_write`, `retrieve_context`) are thin adapters
//! over injected external-collaborator seams.

pub mod builtin;
pub mod manifest;
pub mod registry;

pub use builtin::{
    FetchedPage, MemoryQueryTool, MemoryWriteTool, RetrieveContextTool, SearchHit, WebAccessTool,
    WebFetchClient, WebSearchClient, WebSearchTool,
};
pub use manifest::{manifest_tool_names, render_manifest, resolve_manifest, ModelFamily};
pub use registry::{ParamSpec, Tool, ToolRegistry};
