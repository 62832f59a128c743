//! Shared tag-scanning primitives used by both the XML and JSON parser
//! variants (§4.7 of the spec).
//!
//! Model output is truncated at arbitrary byte offsets (token limits,
//! client-side cancellation). None of this scanning assumes a closing tag
//! is actually present — a missing close is treated as "runs to the end of
//! the text", with any partial prefix of the close tag trimmed back off.

/// A located `<tag>…</tag>` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan {
    /// Byte offset of the opening `<`.
    pub open_start: usize,
    /// Byte offset one past the end of whatever closed the tag (or the end
    /// of the text, if the tag was never closed).
    pub consumed_end: usize,
    /// The tag's inner text, with a truncated close-tag fragment trimmed.
    pub content: String,
}

/// Find every top-level `<tag>…</tag>` occurrence in `text`, in order.
/// Occurrences do not nest within themselves (the first `</tag>` found
/// after an opening tag closes it).
pub fn extract_all(text: &str, tag: &str) -> Vec<TagSpan> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut spans = Vec::new();
    let mut cursor = 0usize;
    while let Some(rel) = text[cursor..].find(open.as_str()) {
        let open_start = cursor + rel;
        let content_start = open_start + open.len();
        let (content_end, consumed_end, truncated) = match text[content_start..].find(close.as_str()) {
            Some(rel_close) => {
                let close_start = content_start + rel_close;
                (close_start, close_start + close.len(), false)
            }
            None => (text.len(), text.len(), true),
        };
        let mut content = text[content_start..content_end].to_string();
        if truncated {
            content = trim_trailing_partial(&content, &close);
        }
        spans.push(TagSpan {
            open_start,
            consumed_end,
            content,
        });
        cursor = consumed_end.max(content_start + 1).min(text.len());
        if cursor >= text.len() {
            break;
        }
    }
    spans
}

/// Find the first top-level `<tag>…</tag>` occurrence, if any.
pub fn extract_first(text: &str, tag: &str) -> Option<TagSpan> {
    extract_all(text, tag).into_iter().next()
}

/// Trim a trailing fragment of `close` off the end of `content` (e.g. a
/// response cut off mid-`</tool_c`).
pub(crate) fn trim_trailing_partial(content: &str, close: &str) -> String {
    for len in (1..close.len()).rev() {
        let prefix = &close[..len];
        if content.ends_with(prefix) {
            return content[..content.len() - len].to_string();
        }
    }
    content.to_string()
}

/// Whether `pos` falls inside any of `spans` (used to mask tool-call-looking
/// text that lives inside a descriptive block like `<research_plan>`).
pub fn within_any(pos: usize, spans: &[TagSpan]) -> bool {
    spans
        .iter()
        .any(|s| pos >= s.open_start && pos < s.consumed_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_tag() {
        let spans = extract_all("before <think>hello</think> after", "think");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "hello");
    }

    #[test]
    fn tolerates_truncated_close() {
        let spans = extract_all("<synthesis>partial answer cut off", "synthesis");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "partial answer cut off");
    }

    #[test]
    fn trims_partial_close_fragment() {
        let spans = extract_all("<gaps>needs more sources</ga", "gaps");
        assert_eq!(spans[0].content, "needs more sources");
    }

    #[test]
    fn within_any_detects_nesting() {
        let outer = extract_all("<research_plan>do <tool_call>x</tool_call> later</research_plan>", "research_plan");
        let inner_pos = "<research_plan>do ".len();
        assert!(within_any(inner_pos, &outer));
    }
}
