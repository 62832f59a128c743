//! In-memory [`SessionStore`], mirroring `agent-runtime`'s
//! `InMemorySessionStorage` shape but specialized to the six argo tables
//! (§4.10). Suitable for testing and short-lived processes.

use std::collections::HashMap;

use argo_types::{Message, ProfileFact, SessionSummary, StorageError, SummarySnapshot, ToolRun};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::store::{SessionStore, ToolUseStats};

#[derive(Default)]
struct SessionData {
    messages: Vec<Message>,
    live_summary: Option<SessionSummary>,
    snapshots: Vec<SummarySnapshot>,
    tool_runs: Vec<ToolRun>,
}

/// In-memory session store backed by a `HashMap` behind a `RwLock`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    facts: RwLock<Vec<ProfileFact>>,
}

impl InMemorySessionStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn ensure_session(&self, session_id: &str) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default();
        Ok(())
    }

    async fn append_message(&self, message: Message) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let data = sessions
            .get_mut(&message.session_id)
            .ok_or_else(|| StorageError::SessionNotFound(message.session_id.clone()))?;
        data.messages.push(message);
        Ok(())
    }

    async fn last_messages(&self, session_id: &str, k: usize) -> Result<Vec<Message>, StorageError> {
        let sessions = self.sessions.read().await;
        let data = sessions
            .get(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        let len = data.messages.len();
        Ok(data.messages[len.saturating_sub(k)..].to_vec())
    }

    async fn message_count(&self, session_id: &str) -> Result<u64, StorageError> {
        let sessions = self.sessions.read().await;
        let data = sessions
            .get(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        Ok(data.messages.len() as u64)
    }

    async fn messages_since_summary(&self, session_id: &str) -> Result<u64, StorageError> {
        let sessions = self.sessions.read().await;
        let data = sessions
            .get(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        let total = data.messages.len() as u64;
        let since_update = data
            .live_summary
            .as_ref()
            .map(|s| s.message_count_at_update)
            .unwrap_or(0);
        Ok(total.saturating_sub(since_update))
    }

    async fn live_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, StorageError> {
        let sessions = self.sessions.read().await;
        let data = sessions
            .get(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        Ok(data.live_summary.clone())
    }

    async fn replace_summary(&self, new_summary: SessionSummary) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let data = sessions
            .get_mut(&new_summary.session_id)
            .ok_or_else(|| StorageError::SessionNotFound(new_summary.session_id.clone()))?;
        if let Some(previous) = data.live_summary.take() {
            data.snapshots.push(SummarySnapshot {
                session_id: previous.session_id,
                summary_text: previous.summary_text,
                updated_at: previous.updated_at,
                message_count_at_update: previous.message_count_at_update,
                archived_at: Utc::now(),
            });
        }
        data.live_summary = Some(new_summary);
        Ok(())
    }

    async fn append_profile_fact(&self, fact: ProfileFact) -> Result<(), StorageError> {
        self.facts.write().await.push(fact);
        Ok(())
    }

    async fn set_fact_active(&self, fact_id: &str, active: bool) -> Result<(), StorageError> {
        let mut facts = self.facts.write().await;
        let fact = facts
            .iter_mut()
            .find(|f| f.id == fact_id)
            .ok_or_else(|| StorageError::Database(format!("fact not found: {fact_id}")))?;
        fact.active = active;
        Ok(())
    }

    async fn active_profile_facts(&self) -> Result<Vec<ProfileFact>, StorageError> {
        let facts = self.facts.read().await;
        let mut active: Vec<ProfileFact> = facts.iter().filter(|f| f.active).cloned().collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn append_tool_run(&self, run: ToolRun) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let data = sessions
            .get_mut(&run.session_id)
            .ok_or_else(|| StorageError::SessionNotFound(run.session_id.clone()))?;
        data.tool_runs.push(run);
        Ok(())
    }

    async fn tool_use_stats(&self, session_id: &str) -> Result<ToolUseStats, StorageError> {
        let sessions = self.sessions.read().await;
        let data = sessions
            .get(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        let mut stats = ToolUseStats::default();
        for run in &data.tool_runs {
            stats.total_runs += 1;
            match run.status {
                argo_types::RunStatus::Ok => stats.ok_runs += 1,
                argo_types::RunStatus::Error => stats.error_runs += 1,
            }
            *stats.by_tool.entry(run.tool_name.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }
}
