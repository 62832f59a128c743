//! The external-collaborator seams §6 of the spec names: the LLM transport,
//! the vector store, and the ingestion chunker/embedder. The core depends
//! only on these traits; it never constructs a concrete transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, StorageError};
use crate::types::{Chunk, Namespace};

/// One message in a [`CompletionRequest`]'s wire-level chat list. Distinct
/// from [`crate::types::Message`]: this is the literal `{role, content}`
/// pair sent over the wire, after `PromptBuilder` has flattened everything
/// (short-term buffer, context block, transient tool messages) into a
/// single ordered list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// The message text.
    pub content: String,
}

impl WireMessage {
    /// Construct a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Construct a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Construct an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A request to an OpenAI-style chat completion endpoint (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model identifier to request.
    pub model: String,
    /// The full chat message list, already flattened by `PromptBuilder`.
    pub messages: Vec<WireMessage>,
    /// Sampling temperature, chosen by the phase table (§4.9).
    pub temperature: f32,
    /// The max output token budget, chosen by the phase table (§4.9).
    pub max_tokens: u32,
    /// Optional stop sequences.
    #[serde(default)]
    pub stop: Vec<String>,
}

/// The model's raw response to a [`CompletionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw text of the model's single choice. The core never uses a
    /// structured tool-call API — tool usage is entirely prompt-based and
    /// recovered from this text by `argo-parser`.
    pub text: String,
}

/// The LLM transport seam. The core never sends tool schemas through a
/// structured tool-call API; it only ever calls `complete`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send one completion request and await the raw text response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

/// An optional metadata filter applied to a [`VectorStore::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Only return chunks whose `source_type` matches, if set.
    pub source_type: Option<String>,
    /// Only return chunks fetched at or after this many days ago, if set.
    pub max_age_days: Option<i64>,
}

/// The vector store seam (§6): namespaced similarity search over scored
/// document chunks. Distance is converted to similarity `1/(1+distance)` by
/// the implementation so that higher is always better.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace one embedded chunk of text in `namespace`.
    async fn upsert(
        &self,
        namespace: Namespace,
        id: String,
        embedding: Vec<f32>,
        text: String,
        metadata: crate::types::ChunkMetadata,
    ) -> Result<(), StorageError>;

    /// Similarity search within `namespace`, returning up to `top_k` chunks
    /// sorted by descending score.
    async fn query(
        &self,
        namespace: Namespace,
        query_text: &str,
        top_k: usize,
        filter: Option<QueryFilter>,
    ) -> Result<Vec<Chunk>, StorageError>;

    /// Remove every chunk in `namespace` matching `filter`.
    async fn delete(
        &self,
        namespace: Namespace,
        filter: Option<QueryFilter>,
    ) -> Result<(), StorageError>;
}

/// Splits a normalized document into embeddable text fragments. Out of
/// scope to implement per spec §1 — the core only calls this seam.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks no longer than implementation-defined size.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Produces a dense vector embedding for a chunk of text. Out of scope to
/// implement per spec §1.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`, returning a dense vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
}

/// Accepts a normalized [`crate::types::Document`] for ingestion, implemented
/// by `argo-ingest::IngestionManager`. Exists so `argo-tool`'s `memory_write`
/// can depend on the seam without depending on `argo-ingest` itself.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Normalize, chunk, embed, and write `doc` to the vector store.
    async fn ingest(&self, doc: crate::types::Document) -> Result<(), StorageError>;
}

/// A trivial whole-document chunker used by tests and as the default for
/// `argo-ingest` when no real chunker is injected (spec §4.11: "stubbed
/// with a trivial whole-document chunker for tests").
pub struct WholeDocumentChunker;

impl Chunker for WholeDocumentChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        vec![text.to_string()]
    }
}
