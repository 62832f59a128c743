//! The data model of §3: messages, summaries, facts, tool runs, chunks,
//! documents, retention policy and the per-turn research stats.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a [`Message`] in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A message authored by the end user.
    User,
    /// A message authored by the assistant (the model's own prior replies).
    Assistant,
    /// A system-authored instruction or context block.
    System,
}

/// An append-only conversational message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The session this message belongs to.
    pub session_id: String,
    /// Who authored it.
    pub role: Role,
    /// Plain text content. Tool invocations, if any, live inside this text
    /// and are recovered by `argo-parser` — there is no structured tool-call
    /// wire format.
    pub content: String,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Construct a message stamped with the current time.
    #[must_use]
    pub fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// The single live rolling summary for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session this summary describes.
    pub session_id: String,
    /// The summary text itself.
    pub summary_text: String,
    /// When this summary was last regenerated.
    pub updated_at: DateTime<Utc>,
    /// The session's message count at the time this summary was produced,
    /// used to compute `messages_since_last_summary`.
    pub message_count_at_update: u64,
}

/// An immutable archived copy of a [`SessionSummary`], written whenever the
/// live row is replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySnapshot {
    /// The session this snapshot belonged to.
    pub session_id: String,
    /// The summary text at the time it was superseded.
    pub summary_text: String,
    /// When the superseded summary had last been updated.
    pub updated_at: DateTime<Utc>,
    /// The message count recorded at that update.
    pub message_count_at_update: u64,
    /// When this snapshot was archived (i.e. when the live row was replaced).
    pub archived_at: DateTime<Utc>,
}

/// A durable fact about the user, extracted by the background memory-writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFact {
    /// Stable identifier.
    pub id: String,
    /// A short label for the kind of fact (e.g. `"preference"`, `"identity"`).
    pub fact_type: String,
    /// The fact's text, as written by the memory-writer.
    pub text: String,
    /// Where this fact came from (e.g. a session id or ingestion source).
    pub source: String,
    /// When the fact was recorded.
    pub created_at: DateTime<Utc>,
    /// Facts are soft-deactivated, never hard-deleted, by the core.
    pub active: bool,
}

/// The outcome of one tool execution, persisted for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The tool executed successfully.
    Ok,
    /// The tool produced an error result.
    Error,
}

/// One row of the tool-run audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRun {
    /// Stable identifier for this run.
    pub id: String,
    /// The session the run happened within.
    pub session_id: String,
    /// The tool's registered name.
    pub tool_name: String,
    /// The raw input text/JSON given to the tool.
    pub input: String,
    /// The raw output text/JSON the tool produced.
    pub output: String,
    /// Free-form key/value metadata (trust level, url, error kind, ...).
    pub metadata: std::collections::BTreeMap<String, String>,
    /// When the run was recorded.
    pub created_at: DateTime<Utc>,
    /// Whether the tool succeeded or errored.
    pub status: RunStatus,
    /// The `ArgoError` kind name, if `status == Error`.
    pub error_type: Option<String>,
    /// A human-readable error message, if `status == Error`.
    pub error_message: Option<String>,
}

/// A logical partition of the vector store, identified by content type.
///
/// Known namespaces carry a [`RetentionPolicy`] per spec §3. `Other` exists
/// so `argo-ingest`/`argo-policy` can reject source types that don't map to
/// a known namespace rather than silently coercing them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Previously read web articles.
    ReadingHistory,
    /// Watched YouTube videos/channels.
    YoutubeHistory,
    /// User-authored notes and journal entries.
    NotesJournal,
    /// Extracted autobiographical facts about the user.
    AutobiographicalMemory,
    /// Ephemeral web fetches, TTL'd.
    WebCache,
}

impl Namespace {
    /// All known namespaces, in retrieval priority order low→high (used by
    /// `argo-memory`'s dedup priority table).
    #[must_use]
    pub fn known() -> &'static [Namespace] {
        &[
            Namespace::ReadingHistory,
            Namespace::YoutubeHistory,
            Namespace::NotesJournal,
            Namespace::AutobiographicalMemory,
            Namespace::WebCache,
        ]
    }

    /// The wire/config name for this namespace, e.g. `"web_cache"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::ReadingHistory => "reading_history",
            Namespace::YoutubeHistory => "youtube_history",
            Namespace::NotesJournal => "notes_journal",
            Namespace::AutobiographicalMemory => "autobiographical_memory",
            Namespace::WebCache => "web_cache",
        }
    }

    /// Parse a namespace name, returning `None` for anything unrecognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Namespace> {
        Namespace::known().iter().find(|n| n.as_str() == s).cloned()
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-namespace retention: keep-forever vs TTL, and an optional decay
/// half-life used by `argo-memory`'s `DecayScorer`.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// If true, chunks in this namespace are never TTL-expired.
    pub keep_forever: bool,
    /// Time-to-live in days, if not `keep_forever`.
    pub ttl_days: Option<i64>,
    /// Score half-life in days, if this namespace decays.
    pub decay_half_life_days: Option<f64>,
}

impl Namespace {
    /// The required retention mapping from spec §3.
    #[must_use]
    pub fn retention_policy(&self) -> RetentionPolicy {
        match self {
            Namespace::ReadingHistory => RetentionPolicy {
                keep_forever: true,
                ttl_days: None,
                decay_half_life_days: Some(180.0),
            },
            Namespace::YoutubeHistory => RetentionPolicy {
                keep_forever: true,
                ttl_days: None,
                decay_half_life_days: Some(180.0),
            },
            Namespace::NotesJournal => RetentionPolicy {
                keep_forever: true,
                ttl_days: None,
                decay_half_life_days: None,
            },
            Namespace::AutobiographicalMemory => RetentionPolicy {
                keep_forever: true,
                ttl_days: None,
                decay_half_life_days: None,
            },
            Namespace::WebCache => RetentionPolicy {
                keep_forever: false,
                ttl_days: Some(7),
                decay_half_life_days: Some(3.0),
            },
        }
    }
}

/// How much the consuming code should trust a retrieved chunk's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Directly authored by the user (notes, journal, autobiographical facts).
    UserAuthored,
    /// Fetched from the open web.
    WebFetched,
    /// Produced by the model itself (e.g. a prior turn's summary).
    ModelGenerated,
}

/// Metadata carried alongside a retrieved [`Chunk`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source URL, if the chunk came from the web.
    pub url: Option<String>,
    /// A free-form label for what kind of document this chunk came from.
    pub source_type: String,
    /// When the underlying document was fetched, if ever.
    pub fetched_at: Option<DateTime<Utc>>,
    /// How much this chunk should be trusted.
    pub trust_level: TrustLevel,
    /// Which namespace this chunk was retrieved from.
    pub namespace: Namespace,
}

/// A scored document fragment returned by a [`crate::traits::VectorStore`] query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier within its namespace.
    pub id: String,
    /// The chunk's text.
    pub text: String,
    /// Similarity score, higher is better (`1/(1+distance)`).
    pub score: f64,
    /// Everything needed to rescore/dedup/tag this chunk.
    pub metadata: ChunkMetadata,
}

/// The kind of source material fed to `argo-ingest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A web article.
    WebArticle,
    /// A single YouTube video transcript.
    YoutubeVideo,
    /// A YouTube channel-level summary.
    YoutubeChannel,
    /// A short user-authored note.
    Note,
    /// A journal entry.
    Journal,
    /// An exported chat transcript.
    ChatExport,
    /// Anything else.
    Other,
}

impl SourceType {
    /// The namespace a non-ephemeral document of this source type routes to,
    /// per spec §4.11 — `None` means the source type is unroutable and
    /// ingestion should be rejected with `ArgoError::Config`.
    #[must_use]
    pub fn namespace(&self) -> Option<Namespace> {
        match self {
            SourceType::WebArticle => Some(Namespace::ReadingHistory),
            SourceType::YoutubeVideo | SourceType::YoutubeChannel => {
                Some(Namespace::YoutubeHistory)
            }
            SourceType::Note | SourceType::Journal => Some(Namespace::NotesJournal),
            SourceType::ChatExport | SourceType::Other => None,
        }
    }
}

/// A document to be normalized, chunked, and written to the vector store by
/// `argo-ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The raw text.
    pub text: String,
    /// What kind of source this came from.
    pub source_type: SourceType,
    /// Source URL, if any.
    pub url: Option<String>,
    /// A human title, if any.
    pub title: Option<String>,
    /// Free-form metadata forwarded to the vector store.
    pub metadata: std::collections::BTreeMap<String, String>,
    /// If true, always routes to `web_cache` with a 7-day TTL regardless of
    /// `source_type`.
    pub ephemeral: bool,
}

/// One entry of [`ResearchStats::execution_path`]: whether a tool ran as
/// part of a parallel batch or individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStep {
    /// Ran alongside at least one other proposal in the same iteration.
    Batch {
        /// The tool's registered name.
        tool_name: String,
    },
    /// Ran alone.
    Individual {
        /// The tool's registered name.
        tool_name: String,
    },
}

/// Transient, per-turn research-mode bookkeeping (§3 `ResearchStats`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchStats {
    /// Whether a `<research_plan>` block has appeared this turn.
    pub has_plan: bool,
    /// The text of the plan, once seen.
    pub plan_text: Option<String>,
    /// Normalized URLs of every successful `web_access` this turn.
    pub unique_urls: BTreeSet<String>,
    /// Every `web_search` query issued this turn, in order.
    pub search_queries: Vec<String>,
    /// Total tool calls executed this turn.
    pub tool_calls: u32,
    /// Total failed `web_access` attempts this turn.
    pub fetch_failures: u32,
    /// Consecutive failed `web_access` attempts (reset by a success).
    pub consecutive_failures: u32,
    /// Hosts that have produced a failed fetch this turn.
    pub failed_hosts: BTreeSet<String>,
    /// Whether the synthesis transition has already fired this turn.
    pub synthesis_triggered: bool,
    /// Batch vs individual dispatch history, in order.
    pub execution_path: Vec<ExecutionStep>,
}

impl ResearchStats {
    /// The last 3 search queries, most-recent-last — the subset shown back
    /// to the model per spec §4.8.
    #[must_use]
    pub fn recent_queries(&self) -> &[String] {
        let len = self.search_queries.len();
        &self.search_queries[len.saturating_sub(3)..]
    }
}

/// A single named tool invocation recovered from raw model output by
/// `argo-parser`, before `argo-policy` has classified it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProposal {
    /// The tool's registered name, as written by the model.
    pub tool_name: String,
    /// Named parameters, as parsed (string-valued; tools coerce as needed).
    pub params: std::collections::BTreeMap<String, String>,
}

/// Whether a tool execution succeeded or produced an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultStatus {
    /// The tool ran and produced a usable result.
    Ok,
    /// The tool ran but failed; `metadata.error_type`/`error_message` are set.
    Error,
}

/// Metadata carried on a [`ToolResult`] (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// How much the result should be trusted, if applicable.
    pub trust_level: Option<TrustLevel>,
    /// The URL fetched/searched, if applicable.
    pub url: Option<String>,
    /// The source type of the fetched content, if applicable.
    pub source_type: Option<String>,
    /// When the content was fetched, if applicable.
    pub fetched_at: Option<DateTime<Utc>>,
    /// The `ArgoError` kind name, if `status == Error`.
    pub error_type: Option<String>,
    /// A human-readable error message, if `status == Error`.
    pub error_message: Option<String>,
}

/// The well-formed, never-an-exception result of one tool execution (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The tool's registered name.
    pub tool_name: String,
    /// The primary text result (error message, if `status == Error`).
    pub text: String,
    /// Optional supporting snippets (e.g. search hit titles/urls).
    pub snippets: Option<Vec<String>>,
    /// Structured metadata about the result.
    pub metadata: ToolResultMetadata,
    /// Whether this result is a success or a well-formed error.
    pub status: ToolResultStatus,
}

impl ToolResult {
    /// Construct an error result with `error_type`/`error_message` populated.
    #[must_use]
    pub fn error(tool_name: impl Into<String>, error_type: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            tool_name: tool_name.into(),
            text: message.clone(),
            snippets: None,
            metadata: ToolResultMetadata {
                error_type: Some(error_type.to_string()),
                error_message: Some(message),
                ..Default::default()
            },
            status: ToolResultStatus::Error,
        }
    }
}

/// The conversational mode chosen once per turn (§2, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fast lookup: at most a couple of tool calls, terse answers.
    Quick,
    /// Multi-step research: plan, search, fetch, synthesize.
    Research,
    /// Archival ingest: summarize provided material into memory.
    Ingest,
}

impl Mode {
    /// The hard per-turn tool-call budget for this mode (§4.1 S6 rule 1).
    #[must_use]
    pub fn max_tool_calls(&self) -> u32 {
        match self {
            Mode::Quick => 2,
            Mode::Ingest => 4,
            Mode::Research => 10,
        }
    }
}

/// Within a turn, the phase `Research` mode is currently in (§9: "phase as a
/// tagged variant, not booleans"). `Quick` and `Ingest` turns have a single
/// implicit phase and don't vary sampling/manifest by iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// `Quick` mode, before any tool has run this turn.
    QuickInitial,
    /// `Quick` mode, after at least one tool call this turn.
    QuickAfterTools,
    /// `Research` mode, no `<research_plan>` has appeared yet.
    ResearchPlanning,
    /// `Research` mode, a plan exists and exploration tool calls are allowed.
    ResearchExploration,
    /// `Research` mode, `synthesis_triggered` is true.
    ResearchSynthesis,
    /// `Ingest` mode (single phase).
    Ingest,
}

impl Phase {
    /// Derive the phase from `mode` and this turn's running [`ResearchStats`]
    /// (§4.1 S1, §9).
    #[must_use]
    pub fn derive(mode: Mode, stats: &ResearchStats) -> Phase {
        match mode {
            Mode::Quick => {
                if stats.tool_calls == 0 {
                    Phase::QuickInitial
                } else {
                    Phase::QuickAfterTools
                }
            }
            Mode::Ingest => Phase::Ingest,
            Mode::Research => {
                if stats.synthesis_triggered {
                    Phase::ResearchSynthesis
                } else if stats.has_plan {
                    Phase::ResearchExploration
                } else {
                    Phase::ResearchPlanning
                }
            }
        }
    }

    /// The sampling temperature for this phase (§4.9).
    #[must_use]
    pub fn temperature(&self) -> f32 {
        match self {
            Phase::QuickInitial => 0.3,
            Phase::QuickAfterTools => 0.5,
            Phase::ResearchPlanning => 0.4,
            Phase::ResearchExploration => 0.2,
            Phase::ResearchSynthesis => 0.7,
            Phase::Ingest => 0.5,
        }
    }

    /// The max output token budget for this phase (§4.9).
    #[must_use]
    pub fn max_tokens(&self) -> u32 {
        match self {
            Phase::QuickInitial | Phase::QuickAfterTools => 1024,
            Phase::ResearchPlanning | Phase::ResearchExploration | Phase::ResearchSynthesis => {
                4096
            }
            Phase::Ingest => 2048,
        }
    }
}
