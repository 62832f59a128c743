//! `ArgoError`: the rolled-up error kind family (§7 of the spec).
//!
//! Each lower-level crate (`argo-tool`, `argo-session`, ...) defines its own
//! `thiserror` enum for its concern; those roll up into this one variant-per-
//! kind enum at the orchestrator boundary so callers only need to match on
//! the seven kinds the propagation policy actually distinguishes.

use std::time::Duration;

/// Errors from LLM provider transport operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if the provider sent one.
        retry_after: Option<Duration>,
    },
    /// Provider service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Any other provider error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } | Self::ServiceUnavailable(_)
        )
    }
}

/// Errors from tool policy validation (`argo-policy`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    /// The proposal's URL used a disallowed scheme (only http/https permitted).
    #[error("disallowed url scheme: {0}")]
    DisallowedScheme(String),
    /// The proposal's host resolves to a private/local address range.
    #[error("host not permitted: {0}")]
    DisallowedHost(String),
    /// A bounded parameter (query length, max_results, ...) fell outside its range.
    #[error("parameter out of range: {0}")]
    OutOfRange(String),
    /// A required parameter was missing.
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    /// The tool itself is not permitted in the current manifest/mode.
    #[error("tool not permitted in this phase: {0}")]
    ToolNotPermitted(String),
    /// The namespace named in the proposal is not one of the known namespaces.
    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),
}

/// Errors from parsing raw model output (`argo-parser`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// A `<tool_call>` block was malformed even after tolerant normalization.
    #[error("malformed tool_call block: {0}")]
    MalformedToolCall(String),
    /// A JSON tool-call payload failed to deserialize.
    #[error("invalid json tool_call payload: {0}")]
    InvalidJson(String),
}

/// Errors surfaced by a tool's own execution (`argo-tool`).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The requested tool is not registered.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// The tool rejected its input outside of policy (e.g. a schema mismatch).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The tool ran but failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The tool exceeded its wall-clock budget.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

/// Errors from `SessionStore`/vector store persistence (`argo-session`, `argo-memory`).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The referenced session does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(String),
    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// I/O error underlying the store (file, socket, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing database rejected the query.
    #[error("database error: {0}")]
    Database(String),
}

/// The seven (plus cancellation) error kinds from spec §7, rolled up at the
/// orchestrator boundary. Each wraps its lower-level source via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum ArgoError {
    /// LLM transport unreachable or rejected the request.
    #[error("transport error: {0}")]
    Transport(#[from] ProviderError),
    /// A suspension point (LLM call, tool execution) exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),
    /// `ToolPolicy` rejected a tool proposal.
    #[error("policy rejected: {0}")]
    PolicyRejected(#[from] PolicyError),
    /// `ToolParser` could not make sense of the model's raw output.
    #[error("parse invalid: {0}")]
    ParseInvalid(#[from] ParseError),
    /// A tool executed but produced an error result.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
    /// `SessionStore`/`VectorStore` persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// The turn was cancelled (deadline or explicit user cancel).
    #[error("cancelled")]
    Cancelled,
    /// The frozen configuration was invalid; refuse to start.
    #[error("config error: {0}")]
    Config(String),
}

impl ArgoError {
    /// Whether this error kind is retried with backoff per §7's propagation
    /// policy (`Timeout`, `Transport` when the inner error is retryable).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }

    /// Whether this error kind is recovered locally by surfacing a system
    /// message into the transient extra-message set `E`, per §7.
    #[must_use]
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PolicyRejected(_) | Self::ParseInvalid(_) | Self::Tool(_)
        )
    }

    /// A short, plain-language description of the failure kind suitable for
    /// a user-visible assistant reply (§7 "User-visible failure").
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => {
                "I couldn't reach the language model service.".to_string()
            }
            Self::Timeout(_) => "That took too long and timed out.".to_string(),
            Self::Storage(_) => "I couldn't save this turn, so it wasn't recorded.".to_string(),
            Self::Config(_) => "I'm misconfigured and can't start.".to_string(),
            Self::Cancelled | Self::PolicyRejected(_) | Self::ParseInvalid(_) | Self::Tool(_) => {
                "Something went wrong handling that.".to_string()
            }
        }
    }
}
