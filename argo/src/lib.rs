#![deny(missing_docs)]
//! # argo — umbrella crate
//!
//! Wires every `argo-*` crate into [`Assistant`], a single
//! construction point for the conversational orchestration engine. Grounded
//! in `neuron`'s umbrella-crate re-export/prelude pattern, specialized from
//! a pluggable multi-backend framework down to argo's one fixed pipeline —
//! `argo`'s job is composition, not choice, so unlike `neuron` nothing here
//! is feature-gated except the optional `OpenAiCompatProvider` reference
//! transport.
//!
//! This crate implements no policy of its own: it only builds a
//! [`ToolRegistry`] from whichever external-collaborator seams the caller
//! injects and hands everything to [`argo_orchestrator::Orchestrator`].

pub use argo_executor;
pub use argo_ingest;
pub use argo_memory;
pub use argo_orchestrator;
pub use argo_parser;
pub use argo_policy;
pub use argo_research;
pub use argo_session;
pub use argo_tool;
pub use argo_types;

#[cfg(feature = "openai")]
pub use argo_provider_openai;

use std::sync::Arc;

use argo_ingest::IngestionManager;
use argo_memory::InMemoryVectorStore;
use argo_orchestrator::{ArgoConfig, Orchestrator, TurnOutcome};
use argo_session::InMemorySessionStore;
use argo_tool::{
    MemoryQueryTool, MemoryWriteTool, RetrieveContextTool, ToolRegistry, WebAccessTool,
    WebFetchClient, WebSearchClient, WebSearchTool,
};
use argo_types::{ArgoError, Chunker, Embedder, Mode, Provider, VectorStore, WholeDocumentChunker};

/// Happy-path imports for composing an [`Assistant`].
pub mod prelude {
    pub use crate::{Assistant, AssistantBuilder};
    pub use argo_orchestrator::{ArgoConfig, Orchestrator, TurnOutcome};
    pub use argo_types::{ArgoError, Mode, Provider, VectorStore};
}

/// Builds an [`Assistant`] from injected external-collaborator seams,
/// falling back to in-memory reference implementations for anything
/// not supplied — suitable for tests and single-process local use.
pub struct AssistantBuilder {
    provider: Option<Arc<dyn Provider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    session_store: Option<Arc<dyn argo_session::SessionStore>>,
    web_search_client: Option<Arc<dyn WebSearchClient>>,
    web_fetch_client: Option<Arc<dyn WebFetchClient>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedder: Option<Arc<dyn Embedder>>,
    config: ArgoConfig,
}

impl AssistantBuilder {
    /// Start from an empty builder; every seam below has an in-memory
    /// default except the LLM transport, which must be supplied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: None,
            vector_store: None,
            session_store: None,
            web_search_client: None,
            web_fetch_client: None,
            chunker: None,
            embedder: None,
            config: ArgoConfig::default(),
        }
    }

    /// Set the LLM transport. Required — `build()` fails without one.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Override the vector store. Defaults to
    /// [`argo_memory::InMemoryVectorStore`].
    #[must_use]
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the session store. Defaults to
    /// [`argo_session::InMemorySessionStore`].
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn argo_session::SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Supply a web search client, enabling the `web_search` tool.
    /// Without one, `web_search` is never registered and any proposal
    /// naming it is rejected by `ToolPolicy` as not permitted.
    #[must_use]
    pub fn web_search_client(mut self, client: Arc<dyn WebSearchClient>) -> Self {
        self.web_search_client = Some(client);
        self
    }

    /// Supply a web fetch client, enabling the `web_access` tool.
    #[must_use]
    pub fn web_fetch_client(mut self, client: Arc<dyn WebFetchClient>) -> Self {
        self.web_fetch_client = Some(client);
        self
    }

    /// Override the ingestion chunker. Defaults to
    /// [`argo_types::WholeDocumentChunker`].
    #[must_use]
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the ingestion embedder. Defaults to
    /// [`argo_ingest::ZeroEmbedder`], a placeholder for the injected seam —
    /// embedding generation itself is out of scope here.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Override the frozen configuration. Defaults to `ArgoConfig::default()`.
    #[must_use]
    pub fn config(mut self, config: ArgoConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the [`ToolRegistry`] and [`Orchestrator`] into an
    /// [`Assistant`].
    ///
    /// # Errors
    /// Returns `ArgoError::Config` if no [`Provider`] was supplied.
    pub fn build(self) -> Result<Assistant, ArgoError> {
        let provider = self
            .provider
            .ok_or_else(|| ArgoError::Config("AssistantBuilder requires a provider".to_string()))?;
        let vector_store = self
            .vector_store
            .unwrap_or_else(|| Arc::new(InMemoryVectorStore::new()));
        let session_store = self
            .session_store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        let chunker = self.chunker.unwrap_or_else(|| Arc::new(WholeDocumentChunker));
        let embedder = self
            .embedder
            .unwrap_or_else(|| Arc::new(argo_ingest::ZeroEmbedder::new(8)));

        let ingestion = Arc::new(IngestionManager::new(
            vector_store.clone(),
            chunker,
            embedder,
        ));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MemoryQueryTool::new(vector_store.clone())));
        registry.register(Arc::new(MemoryWriteTool::new(ingestion.clone())));
        registry.register(Arc::new(RetrieveContextTool::new(vector_store.clone())));
        if let Some(client) = self.web_search_client {
            registry.register(Arc::new(WebSearchTool::new(client)));
        }
        if let Some(client) = self.web_fetch_client {
            registry.register(Arc::new(WebAccessTool::new(client)));
        }

        let orchestrator = Orchestrator::new(
            provider,
            Arc::new(registry),
            vector_store,
            session_store,
            ingestion,
            self.config,
        );

        Ok(Assistant { orchestrator })
    }
}

impl Default for AssistantBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled conversational orchestration engine: one [`Orchestrator`]
/// over a fully wired tool registry, vector store, session store, and
/// ingestion manager. The sole public operation is
/// [`Assistant::send_message`] — everything else is internal wiring,
/// matching `layer0::Operator`'s "one atomic `execute`" shape that
/// `argo-orchestrator` itself is grounded on.
pub struct Assistant {
    orchestrator: Orchestrator,
}

impl Assistant {
    /// Start building an [`Assistant`] from injected seams.
    #[must_use]
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::new()
    }

    /// Drive one conversational turn to completion.
    ///
    /// # Errors
    /// See [`Orchestrator::send_message`].
    pub async fn send_message(
        &self,
        session_id: &str,
        user_text: &str,
        mode: Mode,
    ) -> Result<TurnOutcome, ArgoError> {
        self.orchestrator.send_message(session_id, user_text, mode).await
    }
}
