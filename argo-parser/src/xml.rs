//! XML-variant tool-call and semantic-tag parser (§4.7).
//!
//! Matches the renderer in `argo-tool::manifest::render_manifest` for the
//! XML model family: `<tool_call><function=name><parameter=key>value
//! </parameter></function></tool_call>`, plus the five top-level reasoning
//! tags.

use std::collections::BTreeMap;

use argo_types::ToolProposal;

use crate::common::{self, trim_trailing_partial};
use crate::ParsedOutput;

struct AttrTag {
    name: String,
    content: String,
    consumed_end: usize,
}

/// Find the next `<prefix...>` occurrence (e.g. `<function=`) in `text`,
/// read its attribute value up to the next `>`, then its content up to
/// `close_tag` (tolerating truncation the same way [`common::extract_all`]
/// does).
fn extract_attr_tag(text: &str, prefix: &str, close_tag: &str) -> Option<AttrTag> {
    let start = text.find(prefix)?;
    let after_prefix = start + prefix.len();
    let gt_rel = text[after_prefix..].find('>')?;
    let name = text[after_prefix..after_prefix + gt_rel].trim().to_string();
    let content_start = after_prefix + gt_rel + 1;
    let (content_end, consumed_end, truncated) = match text[content_start..].find(close_tag) {
        Some(rel) => {
            let close_start = content_start + rel;
            (close_start, close_start + close_tag.len(), false)
        }
        None => (text.len(), text.len(), true),
    };
    let mut content = text[content_start..content_end].to_string();
    if truncated {
        content = trim_trailing_partial(&content, close_tag);
    }
    Some(AttrTag {
        name,
        content,
        consumed_end,
    })
}

fn parse_function_block(content: &str) -> Option<ToolProposal> {
    let func = extract_attr_tag(content, "<function=", "</function>")?;
    if func.name.is_empty() {
        return None;
    }
    let mut params = BTreeMap::new();
    let mut cursor = 0usize;
    while cursor < func.content.len() {
        match extract_attr_tag(&func.content[cursor..], "<parameter=", "</parameter>") {
            Some(param) if !param.name.is_empty() => {
                params.insert(param.name.clone(), param.content.trim().to_string());
                cursor += param.consumed_end.max(1);
            }
            _ => break,
        }
    }
    Some(ToolProposal {
        tool_name: func.name,
        params,
    })
}

/// Parse a raw model response rendered in the XML tool-call family.
pub fn parse(raw: &str) -> ParsedOutput {
    let research_plan_spans = common::extract_all(raw, "research_plan");
    let research_plan = research_plan_spans.first().map(|s| s.content.clone());
    let think = common::extract_first(raw, "think").map(|s| s.content);
    let synthesis = common::extract_first(raw, "synthesis").map(|s| s.content);
    let confidence = common::extract_first(raw, "confidence").map(|s| s.content);
    let gaps = common::extract_first(raw, "gaps").map(|s| s.content);

    let mut tool_proposals = Vec::new();
    for call in common::extract_all(raw, "tool_call") {
        if common::within_any(call.open_start, &research_plan_spans) {
            tracing::debug!("xml parser: ignoring tool_call nested inside research_plan");
            continue;
        }
        match parse_function_block(&call.content) {
            Some(proposal) => tool_proposals.push(proposal),
            None => tracing::debug!("xml parser: tool_call block had no well-formed function"),
        }
    }

    ParsedOutput {
        tool_proposals,
        research_plan,
        think,
        synthesis,
        confidence,
        gaps,
    }
}
