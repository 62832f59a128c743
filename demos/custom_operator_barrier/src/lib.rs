#![deny(missing_docs)]
//! Demonstrates the "batch barrier" property `argo-executor::ToolExecutor`
//! gives a proposal batch: a single proposal runs inline, but two or more
//! run concurrently under a bounded semaphore, so the whole batch's
//! wall-clock time tracks the slowest member, not the sum of all of them.
//!
//! Grounded in `layer0`'s `Orchestrator::dispatch_many` (dispatch many
//! operator invocations, collect results back in input order) and its
//! `LocalOrchestrator` reference implementation's `tokio::spawn` fan-out —
//! the same pattern `argo-executor::ToolExecutor::execute_batch` already
//! implements. This crate adds nothing to that dispatch logic; it only
//! wires up a couple of artificially slow [`Tool`]s so the barrier effect
//! is directly observable rather than just asserted.

use std::sync::Arc;
use std::time::Duration;

use argo_tool::registry::{ParamSpec, Tool};
use argo_types::{Document, DocumentWriter, StorageError, ToolProposal, ToolResult};
use async_trait::async_trait;

/// A tool that sleeps for a fixed duration before echoing its `input`
/// parameter back, standing in for a slow network call in this demo.
pub struct SlowEchoTool {
    name: &'static str,
    delay: Duration,
}

impl SlowEchoTool {
    /// Construct a tool registered under `name` that takes `delay` to run.
    #[must_use]
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self { name, delay }
    }
}

#[async_trait]
impl Tool for SlowEchoTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "echoes its input parameter after an artificial delay"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec {
            name: "input",
            description: "text to echo back",
            required: true,
        }]
    }

    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        tokio::time::sleep(self.delay).await;
        ToolResult {
            tool_name: self.name.to_string(),
            text: proposal.params.get("input").cloned().unwrap_or_default(),
            snippets: None,
            metadata: Default::default(),
            status: argo_types::ToolResultStatus::Ok,
        }
    }
}

/// A [`DocumentWriter`] that discards everything it's given, standing in
/// for `web_cache` in a demo that never calls `web_access`.
pub struct DiscardingWriter;

#[async_trait]
impl DocumentWriter for DiscardingWriter {
    async fn ingest(&self, _doc: Document) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Build a [`ToolExecutor`][argo_executor::ToolExecutor] over two
/// [`SlowEchoTool`]s, `fast` and `slow`, each taking `delay`.
#[must_use]
pub fn barrier_executor(delay: Duration) -> argo_executor::ToolExecutor {
    let mut registry = argo_tool::ToolRegistry::new();
    registry.register(Arc::new(SlowEchoTool::new("fast", delay)));
    registry.register(Arc::new(SlowEchoTool::new("slow", delay)));

    argo_executor::ToolExecutor::new(
        Arc::new(registry),
        Arc::new(argo_session::InMemorySessionStore::new()),
        Arc::new(DiscardingWriter),
    )
}

fn proposal(tool_name: &str, input: &str) -> ToolProposal {
    let mut params = std::collections::BTreeMap::new();
    params.insert("input".to_string(), input.to_string());
    ToolProposal {
        tool_name: tool_name.to_string(),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_single_proposal_runs_inline() {
        let executor = barrier_executor(Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        let results = executor
            .execute_batch("s1", vec![proposal("fast", "one")])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "one");
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn two_or_more_proposals_run_concurrently_under_the_barrier() {
        let delay = Duration::from_millis(50);
        let executor = barrier_executor(delay);
        let started = tokio::time::Instant::now();
        let results = executor
            .execute_batch(
                "s1",
                vec![proposal("fast", "one"), proposal("slow", "two")],
            )
            .await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "one");
        assert_eq!(results[1].text, "two");

        // Batch wall-clock is close to one delay, not the sum of both —
        // the barrier runs them concurrently rather than sequentially.
        assert!(elapsed < delay * 2);
    }
}
