//! `ArgoConfig`: the frozen, serde-deserializable configuration the
//! orchestrator is built from (§6a).
//!
//! The core never reads environment variables itself except the four
//! `ARGO_DEBUG_*` flags, read once at [`crate::Orchestrator`] construction
//! via [`DebugFlags::from_env`] — everything else here is built by an
//! external loader (TOML/env) and handed in frozen.

use std::time::Duration;

use argo_tool::ModelFamily;
use serde::Deserialize;

/// Per-mode/global tunables named throughout the spec as `K` (short-term
/// buffer length), `M` (memory top-M per namespace), `N` (summary
/// regeneration interval), `C` (tool concurrency), plus transport and
/// timeout settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArgoConfig {
    /// `K`: the number of most-recent short-term messages kept verbatim in
    /// the prompt (§4.2 item 3) and used to decide summary inclusion
    /// (§4.4).
    pub short_term_k: usize,
    /// `M`: candidates retrieved per namespace before rescoring/dedup
    /// (§4.4).
    pub memory_top_m: usize,
    /// `N`: messages-since-summary threshold that triggers regeneration
    /// (§4.10, §9 decided Open Question — default 20).
    pub summary_interval: u64,
    /// How many of the most recent messages regeneration leaves out of the
    /// portion it summarizes (§4.10).
    pub summary_keep_recent: usize,
    /// `C`: bounded tool-dispatch concurrency per batch (§4.6, default 4).
    pub tool_concurrency: usize,
    /// How many of the most recent turns the background memory-writer
    /// reads when extracting `ProfileFact`s (§4.1 S7: "recent N=4 turns").
    pub memory_extraction_window: usize,
    /// The model identifier sent in every `CompletionRequest`.
    pub model: String,
    /// Which tool-call wire variant to render/parse (§4.3).
    pub model_family: ModelFamily,
    /// Per-LLM-call timeout (§5, default 120s).
    #[serde(with = "duration_secs")]
    pub llm_timeout: Duration,
    /// Per-turn wall-clock cap (§5, default 300s).
    #[serde(with = "duration_secs")]
    pub per_turn_timeout: Duration,
    /// Per-tool default timeout for web tools (§5, default 20s).
    #[serde(with = "duration_secs")]
    pub web_tool_timeout: Duration,
    /// Per-tool timeout for memory tools (§5, default 5s).
    #[serde(with = "duration_secs")]
    pub memory_tool_timeout: Duration,
    /// Maximum LLM transport retries on a retryable error (§5, default 2).
    pub llm_max_retries: u32,
}

impl Default for ArgoConfig {
    fn default() -> Self {
        Self {
            short_term_k: 10,
            memory_top_m: 5,
            summary_interval: 20,
            summary_keep_recent: 10,
            tool_concurrency: argo_executor::DEFAULT_CONCURRENCY,
            memory_extraction_window: 4,
            model: String::new(),
            model_family: ModelFamily::Xml,
            llm_timeout: Duration::from_secs(120),
            per_turn_timeout: Duration::from_secs(300),
            web_tool_timeout: Duration::from_secs(20),
            memory_tool_timeout: Duration::from_secs(5),
            llm_max_retries: 2,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// The four `ARGO_DEBUG_*` category flags, read once at construction (§6,
/// §6a). `ARGO_DEBUG_ALL` implies the other three.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugFlags {
    /// `ARGO_DEBUG_RESEARCH`: verbose research-tracker logging.
    pub research: bool,
    /// `ARGO_DEBUG_TOOLS`: verbose tool-dispatch logging.
    pub tools: bool,
    /// `ARGO_DEBUG_PROMPT`: dump the assembled prompt message list to a
    /// file each iteration (§4.2).
    pub prompt: bool,
}

impl DebugFlags {
    fn flag_set(name: &str) -> bool {
        std::env::var(name).is_ok_and(|v| v != "0" && !v.is_empty())
    }

    /// Read the four flags from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let all = Self::flag_set("ARGO_DEBUG_ALL");
        Self {
            research: all || Self::flag_set("ARGO_DEBUG_RESEARCH"),
            tools: all || Self::flag_set("ARGO_DEBUG_TOOLS"),
            prompt: all || Self::flag_set("ARGO_DEBUG_PROMPT"),
        }
    }
}
