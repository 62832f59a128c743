//! JSON-variant tool-call parser (§4.7).
//!
//! Matches the renderer in `argo-tool::manifest::render_manifest` for the
//! JSON model family: `{"plan": "...", "tool_calls": [{"tool": "...",
//! "args": {...}}]}`. Also accepts a bare `<tool_call>` wrapper around a
//! JSON payload, an OpenAI-style `{"function": {"name", "arguments"}}`
//! shape, and stringified `arguments`.

use std::collections::BTreeMap;

use argo_types::ToolProposal;
use serde_json::Value;

use crate::common;
use crate::ParsedOutput;

fn mask(text: &str, spans: &[common::TagSpan]) -> String {
    text.char_indices()
        .map(|(idx, ch)| if common::within_any(idx, spans) { ' ' } else { ch })
        .collect()
}

/// Find the `[...]` array starting at or after `from`, respecting quoted
/// strings so a `[` inside a string value doesn't throw off the depth
/// count. Returns the matched slice including both brackets.
fn extract_bracket_array(text: &str, from: usize) -> Option<String> {
    let start = from + text[from..].find('[')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        let c = b as char;
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn args_to_map(value: &Value) -> BTreeMap<String, String> {
    let resolved = match value {
        Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or_else(|_| Value::String(s.clone())),
        other => other.clone(),
    };
    match resolved {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), value_to_string(v))).collect(),
        _ => BTreeMap::new(),
    }
}

fn parse_call_item(item: &Value) -> Option<ToolProposal> {
    let obj = item.as_object()?;
    if let Some(func) = obj.get("function").and_then(Value::as_object) {
        let name = func.get("name")?.as_str()?.to_string();
        let args = func.get("arguments").cloned().unwrap_or(Value::Null);
        return Some(ToolProposal {
            tool_name: name,
            params: args_to_map(&args),
        });
    }
    if let Some(name) = obj.get("tool").and_then(Value::as_str) {
        let args = obj.get("args").cloned().unwrap_or(Value::Null);
        return Some(ToolProposal {
            tool_name: name.to_string(),
            params: args_to_map(&args),
        });
    }
    if let Some(name) = obj.get("name").and_then(Value::as_str) {
        let args = obj.get("arguments").cloned().unwrap_or(Value::Null);
        return Some(ToolProposal {
            tool_name: name.to_string(),
            params: args_to_map(&args),
        });
    }
    None
}

fn extract_calls(value: &Value) -> Vec<ToolProposal> {
    let items: Vec<&Value> = match value {
        Value::Array(arr) => arr.iter().collect(),
        Value::Object(map) => {
            if let Some(Value::Array(arr)) = map.get("tool_calls") {
                arr.iter().collect()
            } else if map.contains_key("tool") || map.contains_key("name") || map.contains_key("function") {
                vec![value]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    };
    items.into_iter().filter_map(parse_call_item).collect()
}

fn text_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parse a raw model response rendered in the JSON tool-call family.
pub fn parse(raw: &str) -> ParsedOutput {
    let research_plan_spans = common::extract_all(raw, "research_plan");
    let mut research_plan = research_plan_spans.first().map(|s| s.content.clone());
    let mut think = None;
    let mut synthesis = None;
    let mut confidence = None;
    let mut gaps = None;

    let scan = mask(raw, &research_plan_spans);

    let root_value: Option<Value> = if let Some(tc) = common::extract_first(&scan, "tool_call") {
        serde_json::from_str(tc.content.trim()).ok()
    } else if let Ok(value) = serde_json::from_str::<Value>(scan.trim()) {
        Some(value)
    } else if let Some(idx) = scan.find("tool_calls") {
        extract_bracket_array(&scan, idx).and_then(|arr| serde_json::from_str(&arr).ok())
    } else {
        None
    };

    let tool_proposals = root_value.as_ref().map(extract_calls).unwrap_or_default();

    if let Some(Value::Object(map)) = &root_value {
        if research_plan.is_none() {
            research_plan = text_field(map, "plan");
        }
        think = think.or_else(|| text_field(map, "think"));
        synthesis = synthesis.or_else(|| text_field(map, "synthesis"));
        confidence = confidence.or_else(|| text_field(map, "confidence"));
        gaps = gaps.or_else(|| text_field(map, "gaps"));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wrapped_tool_call_object() {
        let raw = r#"<tool_call>{"tool": "web_search", "args": {"query": "rust", "max_results": 3}}</tool_call>"#;
        let parsed = parse(raw);
        assert_eq!(parsed.tool_proposals.len(), 1);
        assert_eq!(parsed.tool_proposals[0].tool_name, "web_search");
        assert_eq!(parsed.tool_proposals[0].params.get("max_results").unwrap(), "3");
    }

    #[test]
    fn parses_bare_plan_and_tool_calls_object() {
        let raw = r#"{"plan": "search then read", "tool_calls": [{"tool": "web_search", "args": {"query": "gpt-4 vs claude"}}]}"#;
        let parsed = parse(raw);
        assert_eq!(parsed.tool_proposals.len(), 1);
        assert_eq!(parsed.research_plan.as_deref(), Some("search then read"));
    }

    #[test]
    fn parses_openai_style_function_call_with_stringified_arguments() {
        let raw = r#"{"tool_calls": [{"function": {"name": "web_access", "arguments": "{\"url\": \"https://example.com\"}"}}]}"#;
        let parsed = parse(raw);
        assert_eq!(parsed.tool_proposals.len(), 1);
        assert_eq!(parsed.tool_proposals[0].tool_name, "web_access");
        assert_eq!(
            parsed.tool_proposals[0].params.get("url").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn parses_bare_array_of_calls() {
        let raw = r#"[{"name": "memory_query", "arguments": {"query": "past trips"}}]"#;
        let parsed = parse(raw);
        assert_eq!(parsed.tool_proposals.len(), 1);
        assert_eq!(parsed.tool_proposals[0].tool_name, "memory_query");
    }

    #[test]
    fn tool_call_inside_research_plan_yields_zero_proposals() {
        let raw = r#"<research_plan>I will call {"tool_calls": [{"tool": "web_search", "args": {"query": "x"}}]} first</research_plan>"#;
        let parsed = parse(raw);
        assert!(parsed.tool_proposals.is_empty());
        assert!(parsed.research_plan.unwrap().contains("I will call"));
    }

    #[test]
    fn plain_prose_yields_zero_proposals() {
        let parsed = parse("Here is your answer, no tools needed.");
        assert!(parsed.tool_proposals.is_empty());
        assert!(parsed.research_plan.is_none());
    }
}
