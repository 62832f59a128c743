#![deny(missing_docs)]
//! Shared vocabulary for the argo conversational orchestration engine.
//!
//! This crate has no behavior of its own: it is the vocabulary every other
//! `argo-*` crate builds on — the data model (§3), the external-collaborator
//! trait seams (§6), and the rolled-up error kinds (§7).

pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{ArgoError, ParseError, PolicyError, ProviderError, StorageError, ToolError};
pub use normalize::{content_hash, normalize_url};
pub use traits::{
    Chunker, CompletionRequest, CompletionResponse, DocumentWriter, Embedder, Provider,
    QueryFilter, VectorStore, WholeDocumentChunker, WireMessage,
};
pub use types::{
    Chunk, ChunkMetadata, Document, ExecutionStep, Message, Mode, Namespace, Phase, ProfileFact,
    ResearchStats, RetentionPolicy, Role, RunStatus, SessionSummary, SourceType, SummarySnapshot,
    ToolProposal, ToolResult, ToolResultMetadata, ToolResultStatus, ToolRun, TrustLevel,
};
