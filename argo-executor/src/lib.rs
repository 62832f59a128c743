#![deny(missing_docs)]
//! Bounded-concurrency tool dispatch, one-row-per-run audit logging, and
//! `web_cache` capture of fetched pages (§4.6 of the spec).
//!
//! Grounded in `neuron-tool`'s `TimeoutMiddleware` (per-call
//! `tokio::time::timeout`) and `layer0`'s `LocalOrchestrator::dispatch_many`
//! (`tokio::spawn` fan-out, results collected back in input order), adapted
//! to a `tokio::sync::Semaphore` so the whole batch — not just one pair of
//! concurrent calls — is bounded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use argo_session::SessionStore;
use argo_tool::ToolRegistry;
use argo_types::{
    Document, DocumentWriter, SourceType, ToolProposal, ToolResult, ToolResultMetadata,
    ToolResultStatus, ToolRun, RunStatus,
};
use chrono::Utc;
use tokio::sync::Semaphore;

/// Default bounded-concurrency worker count for a tool batch (§4.6).
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Default per-tool wall-clock timeout (§4.6).
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(20);

fn metadata_to_map(metadata: &ToolResultMetadata) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(trust) = metadata.trust_level {
        map.insert("trust_level".to_string(), format!("{trust:?}"));
    }
    if let Some(url) = &metadata.url {
        map.insert("url".to_string(), url.clone());
    }
    if let Some(source_type) = &metadata.source_type {
        map.insert("source_type".to_string(), source_type.clone());
    }
    if let Some(fetched_at) = metadata.fetched_at {
        map.insert("fetched_at".to_string(), fetched_at.to_rfc3339());
    }
    if let Some(error_type) = &metadata.error_type {
        map.insert("error_type".to_string(), error_type.clone());
    }
    map
}

/// Dispatches approved tool proposals, logs one audit row per execution, and
/// forwards successful `web_access` fetches into `web_cache` (§4.6).
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    session_store: Arc<dyn SessionStore>,
    web_cache_writer: Arc<dyn DocumentWriter>,
    concurrency: usize,
    default_timeout: Duration,
    per_tool_timeout: BTreeMap<String, Duration>,
}

impl ToolExecutor {
    /// Construct an executor over a tool registry, the session store to
    /// audit into, and the document writer that caches fetched pages.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        session_store: Arc<dyn SessionStore>,
        web_cache_writer: Arc<dyn DocumentWriter>,
    ) -> Self {
        Self {
            registry,
            session_store,
            web_cache_writer,
            concurrency: DEFAULT_CONCURRENCY,
            default_timeout: DEFAULT_TOOL_TIMEOUT,
            per_tool_timeout: BTreeMap::new(),
        }
    }

    /// Override the bounded-concurrency worker count.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Override the default per-tool timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Override the timeout for one named tool.
    #[must_use]
    pub fn with_tool_timeout(mut self, tool_name: impl Into<String>, timeout: Duration) -> Self {
        self.per_tool_timeout.insert(tool_name.into(), timeout);
        self
    }

    fn timeout_for(&self, tool_name: &str) -> Duration {
        self.per_tool_timeout
            .get(tool_name)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Run one approved proposal: look up the tool, enforce its timeout,
    /// audit the result, and cache successful `web_access` fetches.
    async fn run_one(&self, session_id: &str, proposal: ToolProposal) -> ToolResult {
        let timeout = self.timeout_for(&proposal.tool_name);
        let result = match self.registry.get(&proposal.tool_name) {
            Some(tool) => match tokio::time::timeout(timeout, tool.run(&proposal)).await {
                Ok(result) => result,
                Err(_elapsed) => ToolResult {
                    tool_name: proposal.tool_name.clone(),
                    text: format!(
                        "tool '{}' timed out after {:.1}s",
                        proposal.tool_name,
                        timeout.as_secs_f64()
                    ),
                    snippets: None,
                    metadata: ToolResultMetadata {
                        error_type: Some("timeout".to_string()),
                        error_message: Some(format!(
                            "timed out after {:.1}s",
                            timeout.as_secs_f64()
                        )),
                        ..Default::default()
                    },
                    status: ToolResultStatus::Error,
                },
            },
            None => ToolResult::error(
                proposal.tool_name.clone(),
                "tool_not_found",
                format!("no tool registered under '{}'", proposal.tool_name),
            ),
        };

        self.audit(session_id, &proposal, &result).await;
        if result.tool_name == "web_access" && result.status == ToolResultStatus::Ok {
            self.cache_web_access(&result).await;
        }
        result
    }

    async fn audit(&self, session_id: &str, proposal: &ToolProposal, result: &ToolResult) {
        let run = ToolRun {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            tool_name: result.tool_name.clone(),
            input: serde_json::to_string(&proposal.params).unwrap_or_default(),
            output: result.text.clone(),
            metadata: metadata_to_map(&result.metadata),
            created_at: Utc::now(),
            status: match result.status {
                ToolResultStatus::Ok => RunStatus::Ok,
                ToolResultStatus::Error => RunStatus::Error,
            },
            error_type: result.metadata.error_type.clone(),
            error_message: result.metadata.error_message.clone(),
        };
        if let Err(err) = self.session_store.append_tool_run(run).await {
            tracing::warn!(%err, tool = %result.tool_name, "failed to append tool_run audit row");
        }
    }

    async fn cache_web_access(&self, result: &ToolResult) {
        let doc = Document {
            text: result.text.clone(),
            source_type: SourceType::WebArticle,
            url: result.metadata.url.clone(),
            title: None,
            metadata: BTreeMap::new(),
            ephemeral: true,
        };
        if let Err(err) = self.web_cache_writer.ingest(doc).await {
            tracing::warn!(%err, "failed to cache web_access fetch into web_cache");
        }
    }

    /// Dispatch a batch of approved proposals, preserving input order in the
    /// returned results. A single proposal runs inline; two or more run
    /// concurrently, bounded by [`ToolExecutor::with_concurrency`] (default
    /// [`DEFAULT_CONCURRENCY`]).
    pub async fn execute_batch(
        &self,
        session_id: &str,
        proposals: Vec<ToolProposal>,
    ) -> Vec<ToolResult> {
        if proposals.len() <= 1 {
            let mut out = Vec::with_capacity(proposals.len());
            for proposal in proposals {
                out.push(self.run_one(session_id, proposal).await);
            }
            return out;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let semaphore = semaphore.clone();
            let session_id = session_id.to_string();
            let executor = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("tool dispatch semaphore never closed");
                executor.run_one(&session_id, proposal).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => results.push(ToolResult::error(
                    "unknown",
                    "tool_error",
                    format!("tool task panicked: {join_err}"),
                )),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_session::InMemorySessionStore;
    use argo_tool::registry::{ParamSpec, Tool};
    use argo_types::StorageError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "web_search"
        }
        fn description(&self) -> &'static str {
            "echo"
        }
        fn params(&self) -> &'static [ParamSpec] {
            &[]
        }
        async fn run(&self, proposal: &ToolProposal) -> ToolResult {
            ToolResult {
                tool_name: "web_search".to_string(),
                text: proposal.params.get("query").cloned().unwrap_or_default(),
                snippets: None,
                metadata: ToolResultMetadata::default(),
                status: ToolResultStatus::Ok,
            }
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &'static str {
            "web_access"
        }
        fn description(&self) -> &'static str {
            "slow"
        }
        fn params(&self) -> &'static [ParamSpec] {
            &[]
        }
        async fn run(&self, _proposal: &ToolProposal) -> ToolResult {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ToolResult {
                tool_name: "web_access".to_string(),
                text: "too slow".to_string(),
                snippets: None,
                metadata: ToolResultMetadata::default(),
                status: ToolResultStatus::Ok,
            }
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        docs: Mutex<Vec<Document>>,
    }

    #[async_trait]
    impl DocumentWriter for RecordingWriter {
        async fn ingest(&self, doc: Document) -> Result<(), StorageError> {
            self.docs.lock().unwrap().push(doc);
            Ok(())
        }
    }

    fn proposal(tool: &str, params: &[(&str, &str)]) -> ToolProposal {
        ToolProposal {
            tool_name: tool.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[tokio::test]
    async fn unknown_tool_produces_error_result_not_panic() {
        let registry = Arc::new(ToolRegistry::new());
        let store = Arc::new(InMemorySessionStore::new());
        store.ensure_session("s1").await.unwrap();
        let writer = Arc::new(RecordingWriter::default());
        let executor = ToolExecutor::new(registry, store, writer);
        let results = executor
            .execute_batch("s1", vec![proposal("nonexistent", &[])])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ToolResultStatus::Error);
        assert_eq!(results[0].metadata.error_type.as_deref(), Some("tool_not_found"));
    }

    #[tokio::test]
    async fn single_proposal_runs_inline_and_is_audited() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let store = Arc::new(InMemorySessionStore::new());
        store.ensure_session("s1").await.unwrap();
        let writer = Arc::new(RecordingWriter::default());
        let executor = ToolExecutor::new(Arc::new(registry), store.clone(), writer);
        let results = executor
            .execute_batch("s1", vec![proposal("web_search", &[("query", "rust")])])
            .await;
        assert_eq!(results[0].text, "rust");
        let stats = store.tool_use_stats("s1").await.unwrap();
        assert_eq!(stats.total_runs, 1);
        assert_eq!(stats.ok_runs, 1);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let store = Arc::new(InMemorySessionStore::new());
        store.ensure_session("s1").await.unwrap();
        let writer = Arc::new(RecordingWriter::default());
        let executor = ToolExecutor::new(Arc::new(registry), store, writer);
        let results = executor
            .execute_batch(
                "s1",
                vec![
                    proposal("web_search", &[("query", "a")]),
                    proposal("web_search", &[("query", "b")]),
                    proposal("web_search", &[("query", "c")]),
                ],
            )
            .await;
        assert_eq!(
            results.iter().map(|r| r.text.clone()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out_with_error_type_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SlowTool));
        let store = Arc::new(InMemorySessionStore::new());
        store.ensure_session("s1").await.unwrap();
        let writer = Arc::new(RecordingWriter::default());
        let executor = ToolExecutor::new(Arc::new(registry), store, writer)
            .with_default_timeout(Duration::from_millis(10));
        let results = executor
            .execute_batch("s1", vec![proposal("web_access", &[("url", "https://example.com")])])
            .await;
        assert_eq!(results[0].status, ToolResultStatus::Error);
        assert_eq!(results[0].metadata.error_type.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn successful_web_access_is_cached_into_web_cache() {
        struct FetchTool;
        #[async_trait]
        impl Tool for FetchTool {
            fn name(&self) -> &'static str {
                "web_access"
            }
            fn description(&self) -> &'static str {
                "fetch"
            }
            fn params(&self) -> &'static [ParamSpec] {
                &[]
            }
            async fn run(&self, _proposal: &ToolProposal) -> ToolResult {
                ToolResult {
                    tool_name: "web_access".to_string(),
                    text: "page body".to_string(),
                    snippets: None,
                    metadata: ToolResultMetadata {
                        url: Some("https://example.com/a".to_string()),
                        ..Default::default()
                    },
                    status: ToolResultStatus::Ok,
                }
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FetchTool));
        let store = Arc::new(InMemorySessionStore::new());
        store.ensure_session("s1").await.unwrap();
        let writer = Arc::new(RecordingWriter::default());
        let executor = ToolExecutor::new(Arc::new(registry), store, writer.clone());
        executor
            .execute_batch("s1", vec![proposal("web_access", &[("url", "https://example.com/a")])])
            .await;
        let docs = writer.docs.lock().unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].ephemeral);
        assert_eq!(docs[0].text, "page body");
    }

    #[tokio::test]
    async fn concurrency_cap_is_respected() {
        struct CountingTool {
            current: Arc<AtomicUsize>,
            max_seen: Arc<AtomicUsize>,
        }
        #[async_trait]
        impl Tool for CountingTool {
            fn name(&self) -> &'static str {
                "memory_query"
            }
            fn description(&self) -> &'static str {
                "count"
            }
            fn params(&self) -> &'static [ParamSpec] {
                &[]
            }
            async fn run(&self, _proposal: &ToolProposal) -> ToolResult {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                ToolResult {
                    tool_name: "memory_query".to_string(),
                    text: String::new(),
                    snippets: None,
                    metadata: ToolResultMetadata::default(),
                    status: ToolResultStatus::Ok,
                }
            }
        }

        let current = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingTool {
            current: current.clone(),
            max_seen: max_seen.clone(),
        }));
        let store = Arc::new(InMemorySessionStore::new());
        store.ensure_session("s1").await.unwrap();
        let writer = Arc::new(RecordingWriter::default());
        let executor = ToolExecutor::new(Arc::new(registry), store, writer).with_concurrency(2);
        let proposals = (0..6).map(|_| proposal("memory_query", &[])).collect();
        executor.execute_batch("s1", proposals).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
