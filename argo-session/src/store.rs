//! The `SessionStore` trait (§4.10): the required queries listed in the
//! spec, independent of backend.

use std::collections::BTreeMap;

use argo_types::{Message, ProfileFact, SessionSummary, StorageError, ToolRun};
use async_trait::async_trait;

/// Aggregate tool-use statistics for a session (§4.10 "aggregate tool-use
/// statistics for a session").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolUseStats {
    /// Total tool runs recorded.
    pub total_runs: u64,
    /// Runs that completed with `status == Ok`.
    pub ok_runs: u64,
    /// Runs that completed with `status == Error`.
    pub error_runs: u64,
    /// Per-tool-name run counts.
    pub by_tool: BTreeMap<String, u64>,
}

/// Persistent session state backing `argo-orchestrator` (§4.10).
///
/// Every method is keyed by `session_id`; no method depends on or mutates
/// state belonging to a different session (§9 "no shared global state" —
/// two concurrent sessions must not observe each other's state).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the session if it does not already exist. Idempotent.
    async fn ensure_session(&self, session_id: &str) -> Result<(), StorageError>;

    /// Append one message. `message.session_id` must already exist
    /// (§3 invariant: "Every persisted Message has a session_id that
    /// exists").
    async fn append_message(&self, message: Message) -> Result<(), StorageError>;

    /// The last `k` messages for `session_id`, oldest first.
    async fn last_messages(&self, session_id: &str, k: usize) -> Result<Vec<Message>, StorageError>;

    /// Total message count ever appended for `session_id`.
    async fn message_count(&self, session_id: &str) -> Result<u64, StorageError>;

    /// `message_count(session_id) - live_summary.message_count_at_update`
    /// (or the full count if there is no live summary yet) — the trigger
    /// for regeneration (§3 invariant, §4.10).
    async fn messages_since_summary(&self, session_id: &str) -> Result<u64, StorageError>;

    /// The single live summary for `session_id`, if one has been written.
    async fn live_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, StorageError>;

    /// Atomically replace the live summary: archive the previous live row
    /// (if any) into an immutable [`argo_types::SummarySnapshot`], then
    /// write `new_summary` as the new live row (§3, §4.10, §5 "summary
    /// replacement" atomicity).
    async fn replace_summary(&self, new_summary: SessionSummary) -> Result<(), StorageError>;

    /// Append a durable fact extracted by the background memory-writer.
    async fn append_profile_fact(&self, fact: ProfileFact) -> Result<(), StorageError>;

    /// Soft-activate/deactivate a fact by id. Facts are never hard-deleted
    /// by the core (§3).
    async fn set_fact_active(&self, fact_id: &str, active: bool) -> Result<(), StorageError>;

    /// Every currently-active profile fact, most-recent first.
    async fn active_profile_facts(&self) -> Result<Vec<ProfileFact>, StorageError>;

    /// Append one row to the tool-run audit log. Exactly one call per
    /// executed tool (§8 property 7: "no duplicates" — callers, not this
    /// trait, must guarantee that).
    async fn append_tool_run(&self, run: ToolRun) -> Result<(), StorageError>;

    /// Aggregate tool-use statistics for `session_id` (§4.10).
    async fn tool_use_stats(&self, session_id: &str) -> Result<ToolUseStats, StorageError>;
}
