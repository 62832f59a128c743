//! Quick-mode heuristics enforced in S4/S5 (§4.1): ambiguous/context-only
//! short-circuiting, offline phrasing, "wants something external/latest"
//! detection, and the post-hoc citation check.

const CONTEXT_ONLY_PRONOUNS: &[&str] = &["it", "that", "this", "those", "them", "he", "she", "they"];
const OFFLINE_MARKERS: &[&str] = &["offline", "no internet", "without internet", "no wifi"];
const EXTERNAL_LATEST_MARKERS: &[&str] = &[
    "latest", "newest", "current version", "today", "right now", "as of now", "this week",
];

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether `user_text` is short and leans entirely on an unresolved
/// pronoun/deictic reference with no other content word — the "ambiguous
/// or context-only question" the orchestrator short-circuits before S5
/// with a clarification reply (§4.1 Quick mode additions).
#[must_use]
pub fn is_ambiguous_context_only(user_text: &str) -> bool {
    let tokens = words(user_text);
    if tokens.is_empty() || tokens.len() > 6 {
        return false;
    }
    let has_pronoun = tokens.iter().any(|t| CONTEXT_ONLY_PRONOUNS.contains(&t.as_str()));
    let has_content_word = tokens
        .iter()
        .any(|t| t.len() > 3 && !CONTEXT_ONLY_PRONOUNS.contains(&t.as_str()));
    has_pronoun && !has_content_word
}

/// Whether the user explicitly phrased the request as offline (§4.1: "If
/// offline-phrased, web_search and web_access are removed from the
/// manifest AND blocked in S4").
#[must_use]
pub fn is_offline_phrased(user_text: &str) -> bool {
    let lower = user_text.to_lowercase();
    OFFLINE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Whether the question explicitly asks for external/latest information,
/// the trigger for pre-seeding a single `web_search` when memory yielded
/// nothing useful (§4.1 Quick mode additions).
#[must_use]
pub fn wants_external_latest(user_text: &str) -> bool {
    let lower = user_text.to_lowercase();
    EXTERNAL_LATEST_MARKERS.iter().any(|m| lower.contains(m))
}

/// Whether `final_text` contains at least one URL-shaped citation (§4.1:
/// "Final answer must contain at least one citation when a web tool ran").
#[must_use]
pub fn has_citation(final_text: &str) -> bool {
    final_text.contains("http://") || final_text.contains("https://")
}
