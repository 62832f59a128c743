#![deny(missing_docs)]
//! Per-turn research-mode statistics and the stopping-condition checklist
//! (§4.8 of the spec).
//!
//! Deliberately decoupled from `argo-parser`'s `ParsedOutput` type: the
//! orchestrator feeds this crate plain strings/tool outcomes so a future
//! parser variant never forces a change here.

use argo_types::{
    normalize_url, ExecutionStep, ResearchStats, ToolProposal, ToolResult, ToolResultStatus,
};

/// Fetch-failure count at which the Research-only fallback rule (§4.1 S6
/// rule 4) considers transitioning to partial synthesis.
pub const FETCH_FAILURE_THRESHOLD: u32 = 3;
/// Consecutive-failure count at which the same fallback rule fires.
pub const CONSECUTIVE_FAILURE_THRESHOLD: u32 = 2;
/// Minimum distinct sources required before `synthesis_triggered` can flip
/// (§3 invariant).
pub const SYNTHESIS_MIN_SOURCES: usize = 3;

/// Record a `<research_plan>` block, if this is the first one seen this
/// turn (§4.8: "has_plan was false").
pub fn record_plan(stats: &mut ResearchStats, research_plan: Option<&str>) {
    if let Some(plan) = research_plan {
        if !stats.has_plan {
            stats.has_plan = true;
            stats.plan_text = Some(plan.to_string());
            tracing::debug!("research tracker: plan recorded");
        }
    }
}

/// One tool execution this iteration, paired with the proposal that
/// produced it and whether it ran as part of a parallel batch.
pub struct Execution<'a> {
    /// The approved proposal that was executed.
    pub proposal: &'a ToolProposal,
    /// The result it produced.
    pub result: &'a ToolResult,
    /// Whether this ran alongside at least one other proposal this
    /// iteration (§4.6/§4.8 execution_path).
    pub in_batch: bool,
}

fn host_of(url_str: &str) -> Option<String> {
    url::Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Update `stats` from this iteration's executed tool results (§4.8),
/// then recompute `synthesis_triggered`.
pub fn record_executions(stats: &mut ResearchStats, executions: &[Execution<'_>]) {
    for execution in executions {
        stats.tool_calls += 1;
        stats.execution_path.push(if execution.in_batch {
            ExecutionStep::Batch {
                tool_name: execution.result.tool_name.clone(),
            }
        } else {
            ExecutionStep::Individual {
                tool_name: execution.result.tool_name.clone(),
            }
        });

        match execution.result.tool_name.as_str() {
            "web_access" => match execution.result.status {
                ToolResultStatus::Ok => {
                    if let Some(url) = &execution.result.metadata.url {
                        stats.unique_urls.insert(normalize_url(url));
                    }
                    stats.consecutive_failures = 0;
                }
                ToolResultStatus::Error => {
                    stats.fetch_failures += 1;
                    stats.consecutive_failures += 1;
                    let raw_url = execution
                        .result
                        .metadata
                        .url
                        .as_deref()
                        .or_else(|| execution.proposal.params.get("url").map(String::as_str));
                    if let Some(host) = raw_url.and_then(host_of) {
                        stats.failed_hosts.insert(host);
                    }
                    tracing::warn!(
                        tool = %execution.result.tool_name,
                        "research tracker: fetch failure recorded"
                    );
                }
            },
            "web_search" => {
                if let Some(query) = execution.proposal.params.get("query") {
                    stats.search_queries.push(query.clone());
                }
            }
            _ => {}
        }
    }
    recompute_synthesis(stats);
}

fn recompute_synthesis(stats: &mut ResearchStats) {
    if !stats.synthesis_triggered
        && stats.has_plan
        && stats.unique_urls.len() >= SYNTHESIS_MIN_SOURCES
    {
        stats.synthesis_triggered = true;
        tracing::info!(
            unique_urls = stats.unique_urls.len(),
            "research tracker: synthesis triggered"
        );
    }
}

/// Whether the Research-only fallback rule (§4.1 S6 rule 4) should fire
/// this iteration: failures have crossed a threshold and at least one
/// source has already been obtained.
#[must_use]
pub fn should_fallback_to_partial_synthesis(stats: &ResearchStats) -> bool {
    let failing = stats.fetch_failures >= FETCH_FAILURE_THRESHOLD
        || stats.consecutive_failures >= CONSECUTIVE_FAILURE_THRESHOLD;
    failing && !stats.unique_urls.is_empty()
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "\u{2713}"
    } else {
        "\u{2717}"
    }
}

/// Render the real-time stopping-conditions checklist injected into the
/// transient message set `E` each Research-mode iteration (§4.8, exact
/// layout).
#[must_use]
pub fn render_checklist(stats: &ResearchStats) -> String {
    format!(
        "{} Explicit research plan created\n\
         {} \u{2265}3 distinct sources ({}/3)\n\
         ? All sub-questions addressed (self-assess)\n\
         ? Sources cross-referenced (self-assess)\n\
         \u{2717} Confidence assessed\n\
         \u{2717} Knowledge gaps identified",
        mark(stats.has_plan),
        mark(stats.unique_urls.len() >= SYNTHESIS_MIN_SOURCES),
        stats.unique_urls.len(),
    )
}
