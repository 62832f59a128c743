//! Per-mode/phase tool manifest selection and rendering (§4.3).

use std::sync::Arc;

use argo_types::{Mode, Phase};
use serde::Deserialize;
use serde_json::json;

use crate::registry::{Tool, ToolRegistry};

/// Which wire format the configured model family expects tool-call
/// instructions and invocations to be rendered/parsed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// `<tool_call><function=name>...` style.
    Xml,
    /// `{"tool_calls": [...]}` style.
    Json,
}

/// The tool names the manifest exposes for `(mode, phase)`, before the
/// caller's `filter_tools` exclusion list (e.g. offline-phrased Quick
/// removing web tools) is applied.
#[must_use]
pub fn manifest_tool_names(mode: Mode, phase: Phase) -> &'static [&'static str] {
    match (mode, phase) {
        (Mode::Quick, _) => &["web_search", "web_access", "memory_query", "retrieve_context"],
        (Mode::Research, Phase::ResearchPlanning) => &[],
        (Mode::Research, Phase::ResearchExploration) => {
            &["web_search", "web_access", "retrieve_context"]
        }
        (Mode::Research, Phase::ResearchSynthesis) => {
            &["memory_write", "memory_query", "retrieve_context"]
        }
        (Mode::Research, _) => &[],
        (Mode::Ingest, _) => &["web_access", "memory_write", "memory_query", "retrieve_context"],
    }
}

/// Resolve the manifest's tools from the registry for `(mode, phase)`,
/// dropping any name in `filter_tools` (§4.1 Quick offline-phrased rule).
#[must_use]
pub fn resolve_manifest(
    registry: &ToolRegistry,
    mode: Mode,
    phase: Phase,
    filter_tools: &[&str],
) -> Vec<Arc<dyn Tool>> {
    let names: Vec<&str> = manifest_tool_names(mode, phase)
        .iter()
        .copied()
        .filter(|n| !filter_tools.contains(n))
        .collect();
    registry.subset(&names)
}

/// Render the manifest as model-facing instructions in the given family's
/// wire format (§4.3). This text is embedded in the mode description system
/// message — tool instructions live only there (§4.2).
#[must_use]
pub fn render_manifest(tools: &[Arc<dyn Tool>], family: ModelFamily) -> String {
    if tools.is_empty() {
        return String::new();
    }
    match family {
        ModelFamily::Xml => render_manifest_xml(tools),
        ModelFamily::Json => render_manifest_json(tools),
    }
}

fn render_manifest_xml(tools: &[Arc<dyn Tool>]) -> String {
    let mut out = String::from("Available tools:\n");
    for tool in tools {
        out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
        for p in tool.params() {
            let req = if p.required { "required" } else { "optional" };
            out.push_str(&format!("    {} ({}): {}\n", p.name, req, p.description));
        }
    }
    out.push_str(
        "To call a tool, emit exactly:\n\
         <tool_call><function=TOOL_NAME><parameter=PARAM_NAME>VALUE</parameter></tool_call>\n",
    );
    out
}

fn render_manifest_json(tools: &[Arc<dyn Tool>]) -> String {
    let schema: Vec<_> = tools
        .iter()
        .map(|tool| {
            let params: Vec<_> = tool
                .params()
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "description": p.description,
                        "required": p.required,
                    })
                })
                .collect();
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "params": params,
            })
        })
        .collect();
    let schema = json!({ "tools": schema });
    format!(
        "Available tools (JSON): {}\n\
         To call one, emit: {{\"tool_calls\": [{{\"tool\": \"TOOL_NAME\", \"args\": {{...}}}}]}}\n",
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    )
}
