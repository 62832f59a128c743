//! The five built-in tools named in §4.3. Each is a thin adapter over an
//! injected external-collaborator seam (`argo_types::VectorStore`,
//! `argo_types::DocumentWriter`, or a web client trait declared here) — the
//! tool itself holds no business logic beyond shaping the request/response.

use std::sync::Arc;

use argo_types::{
    Chunk, Document, DocumentWriter, Namespace, QueryFilter, SourceType, ToolProposal, ToolResult,
    ToolResultMetadata, ToolResultStatus, TrustLevel, VectorStore,
};
use async_trait::async_trait;
use chrono::Utc;

use crate::registry::{ParamSpec, Tool};

/// One web search hit, returned by a [`WebSearchClient`].
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The hit's title.
    pub title: String,
    /// The hit's URL.
    pub url: String,
    /// A short snippet of surrounding text.
    pub snippet: String,
}

/// The web search seam (external collaborator, out of scope to implement).
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    /// Run a search and return up to `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, String>;
}

/// A fetched and extracted web page, returned by a [`WebFetchClient`].
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The extracted plain-text content.
    pub text: String,
    /// The final URL, after redirects.
    pub final_url: String,
}

/// The web fetch seam (external collaborator, out of scope to implement).
#[async_trait]
pub trait WebFetchClient: Send + Sync {
    /// Fetch `url` and return its extracted text.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, String>;
}

fn chunk_to_text(c: &Chunk) -> String {
    match &c.metadata.url {
        Some(url) => format!("[{}] {}", url, c.text),
        None => c.text.clone(),
    }
}

/// `web_search`: queries the injected [`WebSearchClient`] (§4.3).
pub struct WebSearchTool {
    client: Arc<dyn WebSearchClient>,
}

impl WebSearchTool {
    /// Construct a `web_search` tool over the given client.
    #[must_use]
    pub fn new(client: Arc<dyn WebSearchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }
    fn description(&self) -> &'static str {
        "Search the web and return a list of candidate results with titles, URLs, and snippets."
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec::required("query", "the search query"),
            ParamSpec::optional("max_results", "how many results to return (1-10, default 5)"),
        ]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let query = proposal.params.get("query").cloned().unwrap_or_default();
        let max_results: usize = proposal
            .params
            .get("max_results")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        match self.client.search(&query, max_results).await {
            Ok(hits) => {
                let snippets: Vec<String> = hits
                    .iter()
                    .map(|h| format!("{} — {}\n{}", h.title, h.url, h.snippet))
                    .collect();
                ToolResult {
                    tool_name: self.name().to_string(),
                    text: snippets.join("\n\n"),
                    snippets: Some(snippets),
                    metadata: ToolResultMetadata::default(),
                    status: ToolResultStatus::Ok,
                }
            }
            Err(e) => ToolResult::error(self.name(), "tool_error", e),
        }
    }
}

/// `web_access`: fetches one URL via the injected [`WebFetchClient`] (§4.3).
/// Caching the fetched text into `web_cache` is the executor's
/// responsibility (§4.6), not this tool's.
pub struct WebAccessTool {
    client: Arc<dyn WebFetchClient>,
}

impl WebAccessTool {
    /// Construct a `web_access` tool over the given client.
    #[must_use]
    pub fn new(client: Arc<dyn WebFetchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebAccessTool {
    fn name(&self) -> &'static str {
        "web_access"
    }
    fn description(&self) -> &'static str {
        "Fetch and extract the text content of a single web page."
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec::required("url", "the page to fetch")]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let url = proposal.params.get("url").cloned().unwrap_or_default();
        match self.client.fetch(&url).await {
            Ok(page) => ToolResult {
                tool_name: self.name().to_string(),
                text: page.text,
                snippets: None,
                metadata: ToolResultMetadata {
                    trust_level: Some(TrustLevel::WebFetched),
                    url: Some(page.final_url),
                    source_type: Some("web_article".to_string()),
                    fetched_at: Some(Utc::now()),
                    ..Default::default()
                },
                status: ToolResultStatus::Ok,
            },
            Err(e) => ToolResult {
                tool_name: self.name().to_string(),
                text: e.clone(),
                snippets: None,
                metadata: ToolResultMetadata {
                    url: Some(url),
                    error_type: Some("tool_error".to_string()),
                    error_message: Some(e),
                    ..Default::default()
                },
                status: ToolResultStatus::Error,
            },
        }
    }
}

/// `memory_query`: queries `autobiographical_memory`, or a caller-specified
/// namespace, via the injected [`VectorStore`] (§4.3).
pub struct MemoryQueryTool {
    store: Arc<dyn VectorStore>,
}

impl MemoryQueryTool {
    /// Construct a `memory_query` tool over the given vector store.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryQueryTool {
    fn name(&self) -> &'static str {
        "memory_query"
    }
    fn description(&self) -> &'static str {
        "Search stored memory for facts relevant to a query."
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec::required("query", "what to search for"),
            ParamSpec::optional("namespace", "restrict to one memory namespace"),
        ]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let query = proposal.params.get("query").cloned().unwrap_or_default();
        let namespace = proposal
            .params
            .get("namespace")
            .and_then(|s| Namespace::parse(s))
            .unwrap_or(Namespace::AutobiographicalMemory);
        match self.store.query(namespace, &query, 5, None).await {
            Ok(chunks) => {
                let snippets: Vec<String> = chunks.iter().map(chunk_to_text).collect();
                ToolResult {
                    tool_name: self.name().to_string(),
                    text: snippets.join("\n\n"),
                    snippets: Some(snippets),
                    metadata: ToolResultMetadata::default(),
                    status: ToolResultStatus::Ok,
                }
            }
            Err(e) => ToolResult::error(self.name(), "storage_error", e.to_string()),
        }
    }
}

/// `memory_write`: writes a note to memory via the injected [`DocumentWriter`]
/// (§4.3).
pub struct MemoryWriteTool {
    writer: Arc<dyn DocumentWriter>,
}

impl MemoryWriteTool {
    /// Construct a `memory_write` tool over the given document writer.
    #[must_use]
    pub fn new(writer: Arc<dyn DocumentWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl Tool for MemoryWriteTool {
    fn name(&self) -> &'static str {
        "memory_write"
    }
    fn description(&self) -> &'static str {
        "Write a durable note to memory, optionally tagged with a title."
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec::required("content", "the text to remember"),
            ParamSpec::optional("title", "a short title/tag"),
            ParamSpec::optional("ephemeral", "\"true\" to cache only (default false)"),
        ]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let content = proposal.params.get("content").cloned().unwrap_or_default();
        let title = proposal.params.get("title").cloned();
        let ephemeral = proposal
            .params
            .get("ephemeral")
            .map(|s| s == "true")
            .unwrap_or(false);
        let doc = Document {
            text: content,
            source_type: SourceType::Note,
            url: None,
            title,
            metadata: Default::default(),
            ephemeral,
        };
        match self.writer.ingest(doc).await {
            Ok(()) => ToolResult {
                tool_name: self.name().to_string(),
                text: "saved".to_string(),
                snippets: None,
                metadata: ToolResultMetadata::default(),
                status: ToolResultStatus::Ok,
            },
            Err(e) => ToolResult::error(self.name(), "storage_error", e.to_string()),
        }
    }
}

/// `retrieve_context`: merges top results across the archival RAG
/// namespaces (`reading_history`, `youtube_history`, `notes_journal`) via
/// the injected [`VectorStore`] (§4.3, §4.4 layer 4).
pub struct RetrieveContextTool {
    store: Arc<dyn VectorStore>,
}

impl RetrieveContextTool {
    /// Construct a `retrieve_context` tool over the given vector store.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RetrieveContextTool {
    fn name(&self) -> &'static str {
        "retrieve_context"
    }
    fn description(&self) -> &'static str {
        "Retrieve relevant passages from reading history, watched videos, and notes."
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec::required("query", "what to search for"),
            ParamSpec::optional("namespace", "restrict to one archival namespace"),
        ]
    }
    async fn run(&self, proposal: &ToolProposal) -> ToolResult {
        let query = proposal.params.get("query").cloned().unwrap_or_default();
        let namespaces: Vec<Namespace> = match proposal.params.get("namespace").and_then(|s| Namespace::parse(s)) {
            Some(ns) => vec![ns],
            None => vec![
                Namespace::ReadingHistory,
                Namespace::YoutubeHistory,
                Namespace::NotesJournal,
            ],
        };
        let mut chunks: Vec<Chunk> = Vec::new();
        for ns in namespaces {
            match self
                .store
                .query(ns, &query, 5, Some(QueryFilter::default()))
                .await
            {
                Ok(mut found) => chunks.append(&mut found),
                Err(e) => return ToolResult::error(self.name(), "storage_error", e.to_string()),
            }
        }
        chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        chunks.truncate(5);
        let snippets: Vec<String> = chunks.iter().map(chunk_to_text).collect();
        ToolResult {
            tool_name: self.name().to_string(),
            text: snippets.join("\n\n"),
            snippets: Some(snippets),
            metadata: ToolResultMetadata::default(),
            status: ToolResultStatus::Ok,
        }
    }
}
