//! End-to-end turn scenarios over a real `ToolExecutor`/`MemoryAssembler`
//! stack, with scripted `Provider` responses and in-memory stores standing
//! in for the LLM transport and persistence backends.

use std::sync::{Arc, Mutex};

use argo_memory::InMemoryVectorStore;
use argo_orchestrator::config::ArgoConfig;
use argo_orchestrator::Orchestrator;
use argo_session::InMemorySessionStore;
use argo_tool::{ModelFamily, ParamSpec, Tool, ToolRegistry};
use argo_types::{
    ChunkMetadata, CompletionRequest, CompletionResponse, Document, DocumentWriter, Mode,
    Namespace, ProviderError, StorageError, ToolProposal, ToolResult, ToolResultMetadata,
    ToolResultStatus, TrustLevel, VectorStore,
};
use async_trait::async_trait;

/// Replays pre-scripted text responses in order. Panics if more calls
/// happen than were scripted — a script that's too short is a test bug, not
/// something to recover from.
struct ScriptedProvider {
    responses: Mutex<std::collections::VecDeque<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
        }
    }
}

#[async_trait]
impl argo_types::Provider for ScriptedProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut responses = self.responses.lock().expect("scripted provider lock poisoned");
        let text = responses
            .pop_front()
            .expect("ScriptedProvider: no more scripted responses");
        Ok(CompletionResponse { text })
    }
}

/// A `web_search` stand-in that always succeeds with a canned hit list.
struct MockWebSearch;

#[async_trait]
impl Tool for MockWebSearch {
    fn name(&self) -> &'static str {
        "web_search"
    }
    fn description(&self) -> &'static str {
        "Searches the web"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec::required("query", "search query")]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let query = proposal.params.get("query").cloned().unwrap_or_default();
        ToolResult {
            tool_name: "web_search".to_string(),
            text: format!("3 results for '{query}'"),
            snippets: Some(vec!["https://a.example/1".to_string()]),
            metadata: ToolResultMetadata::default(),
            status: ToolResultStatus::Ok,
        }
    }
}

/// A `web_access` stand-in whose outcome is keyed by url: any url containing
/// "fail" errors, everything else succeeds.
struct MockWebAccess;

#[async_trait]
impl Tool for MockWebAccess {
    fn name(&self) -> &'static str {
        "web_access"
    }
    fn description(&self) -> &'static str {
        "Fetches a url"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec::required("url", "the url to fetch")]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let url = proposal.params.get("url").cloned().unwrap_or_default();
        if url.contains("fail") {
            return ToolResult::error("web_access", "fetch_failed", format!("could not fetch {url}"));
        }
        ToolResult {
            tool_name: "web_access".to_string(),
            text: format!("article body from {url}"),
            snippets: None,
            metadata: ToolResultMetadata {
                trust_level: Some(TrustLevel::WebFetched),
                url: Some(url),
                source_type: Some("web_article".to_string()),
                fetched_at: Some(chrono::Utc::now()),
                ..Default::default()
            },
            status: ToolResultStatus::Ok,
        }
    }
}

macro_rules! noop_memory_tool {
    ($struct_name:ident, $tool_name:literal) => {
        struct $struct_name;

        #[async_trait]
        impl Tool for $struct_name {
            fn name(&self) -> &'static str {
                $tool_name
            }
            fn description(&self) -> &'static str {
                "test stub"
            }
            fn params(&self) -> &'static [ParamSpec] {
                &[]
            }
            async fn run(&self, _proposal: &ToolProposal) -> ToolResult {
                ToolResult {
                    tool_name: $tool_name.to_string(),
                    text: "ok".to_string(),
                    snippets: None,
                    metadata: ToolResultMetadata::default(),
                    status: ToolResultStatus::Ok,
                }
            }
        }
    };
}

noop_memory_tool!(MockMemoryQuery, "memory_query");
noop_memory_tool!(MockMemoryWrite, "memory_write");
noop_memory_tool!(MockRetrieveContext, "retrieve_context");

struct NoopWriter;

#[async_trait]
impl DocumentWriter for NoopWriter {
    async fn ingest(&self, _doc: Document) -> Result<(), StorageError> {
        Ok(())
    }
}

fn test_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(MockWebSearch));
    registry.register(Arc::new(MockWebAccess));
    registry.register(Arc::new(MockMemoryQuery));
    registry.register(Arc::new(MockMemoryWrite));
    registry.register(Arc::new(MockRetrieveContext));
    Arc::new(registry)
}

fn test_config() -> ArgoConfig {
    ArgoConfig {
        model: "test-model".to_string(),
        model_family: ModelFamily::Xml,
        ..ArgoConfig::default()
    }
}

fn orchestrator(
    provider_responses: Vec<&str>,
    vector_store: Arc<InMemoryVectorStore>,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(ScriptedProvider::new(provider_responses)),
        test_registry(),
        vector_store,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(NoopWriter),
        test_config(),
    )
}

#[tokio::test]
async fn quick_lookup_with_memory_hit_needs_no_tool_call() {
    let store = Arc::new(InMemoryVectorStore::new());
    store
        .upsert(
            Namespace::NotesJournal,
            "n1".to_string(),
            vec![],
            "The user's favorite programming language is Rust.".to_string(),
            ChunkMetadata {
                url: None,
                source_type: "note".to_string(),
                fetched_at: Some(chrono::Utc::now()),
                trust_level: TrustLevel::UserAuthored,
                namespace: Namespace::NotesJournal,
            },
        )
        .await
        .unwrap();

    let orch = orchestrator(vec!["Your favorite language is Rust."], store);
    let outcome = orch
        .send_message("s1", "what's my favorite programming language?", Mode::Quick)
        .await
        .unwrap();

    assert_eq!(outcome.final_text, "Your favorite language is Rust.");
    assert!(outcome.tool_results.is_empty());
    assert_eq!(outcome.stats.tool_calls, 0);
}

#[tokio::test]
async fn quick_lookup_external_preseeds_search_and_finalizes_with_citation() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec!["Rust 1.82 is the latest stable release. Source: https://releases.rs/1.82"],
        store,
    );
    let outcome = orch
        .send_message("s1", "what's the latest stable rust version?", Mode::Quick)
        .await
        .unwrap();

    assert!(outcome.final_text.contains("https://releases.rs/1.82"));
    assert_eq!(outcome.tool_results.len(), 1);
    assert_eq!(outcome.tool_results[0].tool_name, "web_search");
    assert_eq!(outcome.stats.tool_calls, 1);
}

#[tokio::test]
async fn quick_lookup_external_without_citation_gets_one_nudge_then_finalizes() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec![
            "Rust 1.82 is the latest stable release.",
            "Rust 1.82 is the latest stable release. See https://releases.rs/1.82",
        ],
        store,
    );
    let outcome = orch
        .send_message("s1", "what's the latest stable rust version?", Mode::Quick)
        .await
        .unwrap();

    assert!(outcome.final_text.contains("https://releases.rs/1.82"));
}

#[tokio::test]
async fn research_mode_plans_then_executes_then_synthesizes() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec![
            "<research_plan>Investigate the history of Rust's ownership model.</research_plan>",
            r#"<tool_call><function=web_search><parameter=query>rust ownership history</parameter></function></tool_call>"#,
            concat!(
                r#"<tool_call><function=web_access><parameter=url>https://a.example/1</parameter></function></tool_call>"#,
                r#"<tool_call><function=web_access><parameter=url>https://b.example/2</parameter></function></tool_call>"#,
                r#"<tool_call><function=web_access><parameter=url>https://c.example/3</parameter></function></tool_call>"#,
            ),
            "<synthesis>Rust's ownership model traces back to region-based memory management research.</synthesis><confidence>medium</confidence><gaps>none</gaps>",
        ],
        store,
    );

    let outcome = orch
        .send_message("s1", "research the history of rust's ownership model", Mode::Research)
        .await
        .unwrap();

    assert!(outcome.final_text.contains("region-based memory management"));
    assert!(outcome.stats.synthesis_triggered);
    assert_eq!(outcome.stats.unique_urls.len(), 3);
    assert_eq!(outcome.stats.search_queries, vec!["rust ownership history".to_string()]);
}

#[tokio::test]
async fn research_mode_falls_back_to_partial_synthesis_after_repeated_failures() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec![
            "<research_plan>Find out why the service outage happened.</research_plan>",
            r#"<tool_call><function=web_access><parameter=url>https://ok.example/1</parameter></function></tool_call>"#,
            r#"<tool_call><function=web_access><parameter=url>https://fail.example/2</parameter></function></tool_call>"#,
            r#"<tool_call><function=web_access><parameter=url>https://fail.example/3</parameter></function></tool_call>"#,
            r#"<tool_call><function=web_access><parameter=url>https://fail.example/4</parameter></function></tool_call>"#,
            "<synthesis>Based on the one source retrieved, the outage was caused by a config rollout.</synthesis>",
        ],
        store,
    );

    let outcome = orch
        .send_message("s1", "research the recent outage", Mode::Research)
        .await
        .unwrap();

    assert!(outcome.stats.synthesis_triggered);
    assert!(outcome.final_text.contains("config rollout"));
    assert!(outcome.stats.consecutive_failures >= 2 || outcome.stats.fetch_failures >= 2);
}

#[tokio::test]
async fn policy_rejects_disallowed_url_and_the_turn_still_finalizes() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec![
            r#"<tool_call><function=web_access><parameter=url>file:///etc/passwd</parameter></function></tool_call>"#,
            "I can't access local files, but here's what I know from memory.",
        ],
        store,
    );

    let outcome = orch
        .send_message("s1", "read my local secrets file for me", Mode::Quick)
        .await
        .unwrap();

    assert!(outcome.tool_results.is_empty());
    assert_eq!(outcome.stats.tool_calls, 0);
    assert!(outcome.final_text.contains("can't access local files"));
}

#[tokio::test]
async fn ambiguous_context_only_question_short_circuits_without_calling_the_provider() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(vec![], store);
    let outcome = orch.send_message("s1", "what about it?", Mode::Quick).await.unwrap();

    assert!(outcome.final_text.to_lowercase().contains("clarify"));
    assert!(outcome.tool_results.is_empty());
}

#[tokio::test]
async fn offline_phrased_request_never_calls_web_tools() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec!["2 + 2 is 4, easy enough without internet."],
        store,
    );
    let outcome = orch
        .send_message("s1", "I'm offline right now, what's 2+2?", Mode::Quick)
        .await
        .unwrap();

    assert!(outcome.tool_results.is_empty());
    assert_eq!(outcome.stats.tool_calls, 0);
}

#[tokio::test]
async fn quick_mode_budget_forces_finalize_after_two_tool_calls() {
    let store = Arc::new(InMemoryVectorStore::new());
    let orch = orchestrator(
        vec![
            r#"<tool_call><function=web_search><parameter=query>first search</parameter></function></tool_call>"#,
            r#"<tool_call><function=web_search><parameter=query>second search</parameter></function></tool_call>I'll use this to check current conditions."#,
        ],
        store,
    );

    // Deliberately no "latest"/"today"-style marker in the user text, so the
    // Quick pre-seed doesn't consume one of the two tool calls itself — both
    // budgeted calls come from the scripted model responses.
    let outcome = orch
        .send_message("s1", "what's the weather like nearby", Mode::Quick)
        .await
        .unwrap();

    assert_eq!(outcome.stats.tool_calls, 2);
    assert!(outcome.final_text.contains("check current conditions"));
}
