#![deny(missing_docs)]
//! Tolerant extraction of tool proposals and reasoning tags from raw model
//! output (§4.7 of the spec).
//!
//! Tool calling here is prompt-based, not a provider structured-call API:
//! the model writes its intentions as text and `argo-parser` recovers
//! them. Two wire variants exist, matching `argo_tool::ModelFamily`'s
//! renderer choice, and the parser used for a turn must match whichever
//! variant was rendered into that turn's manifest.

mod common;
pub mod json;
pub mod xml;

use argo_types::ToolProposal;

/// Everything recoverable from one raw model response: zero or more tool
/// proposals, plus the five top-level reasoning tags the orchestrator
/// tracks (`research_plan` feeds `argo-memory`'s research tracker;
/// `think` is stripped before the user-visible answer; `synthesis`,
/// `confidence`, `gaps` drive research-mode finalization).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Tool invocations the model proposed this iteration.
    pub tool_proposals: Vec<ToolProposal>,
    /// Contents of a `<research_plan>` block, if one appeared.
    pub research_plan: Option<String>,
    /// Contents of a `<think>` block, if one appeared.
    pub think: Option<String>,
    /// Contents of a `<synthesis>` block, if one appeared.
    pub synthesis: Option<String>,
    /// Contents of a `<confidence>` block, if one appeared.
    pub confidence: Option<String>,
    /// Contents of a `<gaps>` block, if one appeared.
    pub gaps: Option<String>,
}

impl ParsedOutput {
    /// Whether the model produced a final-answer signal this iteration:
    /// no tool call was proposed. The orchestrator additionally checks for
    /// plain prose (QUICK/INGEST) or a `<synthesis>` tag (RESEARCH) before
    /// treating this as a stop condition (§4.1 S6 rule 2).
    #[must_use]
    pub fn has_no_tool_calls(&self) -> bool {
        self.tool_proposals.is_empty()
    }
}

/// Parses raw model output according to a configured wire variant.
pub trait ToolCallParser: Send + Sync {
    /// Parse one raw response.
    fn parse(&self, raw: &str) -> ParsedOutput;
}

/// XML wire variant: `<tool_call><function=name>…</function></tool_call>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlToolCallParser;

impl ToolCallParser for XmlToolCallParser {
    fn parse(&self, raw: &str) -> ParsedOutput {
        xml::parse(raw)
    }
}

/// JSON wire variant: `{"plan": …, "tool_calls": [{"tool": …, "args": …}]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonToolCallParser;

impl ToolCallParser for JsonToolCallParser {
    fn parse(&self, raw: &str) -> ParsedOutput {
        json::parse(raw)
    }
}
