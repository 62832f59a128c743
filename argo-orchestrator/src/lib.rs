#![deny(missing_docs)]
//! The per-turn state machine tying memory, tools, policy, parsing, and the
//! LLM transport together (§4.1 of the spec).
//!
//! Grounded in `neuron-loop`'s `AgentLoop::run` while-loop shape (call
//! provider, check for tool calls, execute, append, repeat until a
//! text-only response) and `layer0::Operator`'s atomic
//! input-in/output-out protocol, adapted from a generic agentic loop to
//! argo's mode/phase-aware, prompt-based tool calling.

pub mod config;
pub mod prompt;
pub mod quick;

use std::sync::Arc;
use std::time::Duration;

use argo_executor::ToolExecutor;
use argo_memory::MemoryAssembler;
use argo_parser::{JsonToolCallParser, ParsedOutput, ToolCallParser, XmlToolCallParser};
use argo_policy::ToolPolicy;
use argo_session::{regenerate_summary_if_due, SessionStore};
use argo_tool::{ModelFamily, Tool, ToolRegistry};
use argo_types::{
    content_hash, normalize_url, ArgoError, CompletionRequest, DocumentWriter, ExecutionStep,
    Message, Mode, Phase, ProfileFact, Provider, ResearchStats, Role, SessionSummary, ToolProposal,
    ToolResult, ToolResultStatus, VectorStore, WireMessage,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{ArgoConfig, DebugFlags};
use crate::prompt::PromptBuilder;

pub use crate::config::ArgoConfig as Config;

/// A hard safety bound on loop iterations, independent of the per-mode
/// tool-call budget — guards against a model that never emits a tool call
/// nor a recognized final-answer signal. Mirrors `neuron-loop`'s
/// `LoopConfig::max_turns`, which this crate doesn't otherwise carry since
/// §4.1 already specifies a tool-call budget per mode.
const MAX_ITERATIONS: u32 = 40;

/// The result of one [`Orchestrator::send_message`] call (§4.1).
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The user-visible final answer, with `<think>` and other reasoning
    /// tags stripped.
    pub final_text: String,
    /// Every tool result produced this turn, in execution order.
    pub tool_results: Vec<ToolResult>,
    /// The turn's final research-tracker state.
    pub stats: ResearchStats,
}

/// Ties `argo-memory`, `argo-tool`, `argo-policy`, `argo-parser`,
/// `argo-research`, `argo-session`, and `argo-executor` together behind one
/// public operation (§4.1, §5: "no orchestrator state is shared across
/// sessions" — every injected collaborator is internally synchronized, and
/// `send_message` takes `&self`).
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    vector_store: Arc<dyn VectorStore>,
    session_store: Arc<dyn SessionStore>,
    executor: ToolExecutor,
    memory: MemoryAssembler,
    prompt_builder: PromptBuilder,
    parser: Arc<dyn ToolCallParser>,
    config: ArgoConfig,
    debug: DebugFlags,
}

impl Orchestrator {
    /// Construct an orchestrator over the injected collaborators and a
    /// frozen [`ArgoConfig`]. `web_cache_writer` is where `ToolExecutor`
    /// caches successful `web_access` fetches (§4.6) — typically backed by
    /// `argo-ingest::IngestionManager`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        vector_store: Arc<dyn VectorStore>,
        session_store: Arc<dyn SessionStore>,
        web_cache_writer: Arc<dyn DocumentWriter>,
        config: ArgoConfig,
    ) -> Self {
        let parser: Arc<dyn ToolCallParser> = match config.model_family {
            ModelFamily::Xml => Arc::new(XmlToolCallParser),
            ModelFamily::Json => Arc::new(JsonToolCallParser),
        };
        let executor = ToolExecutor::new(tools.clone(), session_store.clone(), web_cache_writer)
            .with_concurrency(config.tool_concurrency)
            .with_tool_timeout("web_search", config.web_tool_timeout)
            .with_tool_timeout("web_access", config.web_tool_timeout)
            .with_tool_timeout("memory_query", config.memory_tool_timeout)
            .with_tool_timeout("memory_write", config.memory_tool_timeout)
            .with_tool_timeout("retrieve_context", config.memory_tool_timeout);
        let memory = MemoryAssembler::new(config.memory_top_m);
        Self {
            provider,
            tools,
            vector_store,
            session_store,
            executor,
            memory,
            prompt_builder: PromptBuilder::new(),
            parser,
            debug: DebugFlags::from_env(),
            config,
        }
    }

    /// Drive one conversational turn to completion (§4.1's S0-S7 state
    /// machine), bounded by the configured per-turn wall-clock cap.
    ///
    /// # Errors
    ///
    /// Returns `ArgoError::Timeout` if the turn exceeds
    /// `config.per_turn_timeout`, or any error the state machine could not
    /// recover from locally (exhausted LLM retries, storage failure).
    pub async fn send_message(
        &self,
        session_id: &str,
        user_text: &str,
        mode: Mode,
    ) -> Result<TurnOutcome, ArgoError> {
        match tokio::time::timeout(
            self.config.per_turn_timeout,
            self.run_turn(session_id, user_text, mode),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(session_id, ?mode, "turn exceeded per-turn timeout");
                Err(ArgoError::Timeout(format!(
                    "turn exceeded {:?}",
                    self.config.per_turn_timeout
                )))
            }
        }
    }

    async fn run_turn(
        &self,
        session_id: &str,
        user_text: &str,
        mode: Mode,
    ) -> Result<TurnOutcome, ArgoError> {
        self.session_store.ensure_session(session_id).await?;
        let short_term = self
            .session_store
            .last_messages(session_id, self.config.short_term_k)
            .await?;
        self.session_store
            .append_message(Message::new(session_id, Role::User, user_text))
            .await?;

        if mode == Mode::Quick && quick::is_ambiguous_context_only(user_text) {
            return self.finalize_short_circuit(session_id).await;
        }

        let summary = self.session_store.live_summary(session_id).await?;
        let offline = mode == Mode::Quick && quick::is_offline_phrased(user_text);
        let filter_tools: Vec<&str> = if offline {
            vec!["web_search", "web_access"]
        } else {
            Vec::new()
        };

        let mut stats = ResearchStats::default();
        let mut results: Vec<ToolResult> = Vec::new();
        let mut transient: Vec<String> = Vec::new();
        let mut citation_nudge_given = false;

        if mode == Mode::Quick && !offline && quick::wants_external_latest(user_text) {
            self.preseed_web_search(
                session_id,
                user_text,
                summary.as_ref(),
                short_term.len(),
                &mut stats,
                &mut results,
                &mut transient,
            )
            .await;
        }

        let mut iterations: u32 = 0;
        let (raw_text, parsed) = 'turn: loop {
            iterations += 1;

            // S1 Assemble
            let phase = Phase::derive(mode, &stats);
            let tools_for_phase = argo_tool::resolve_manifest(&self.tools, mode, phase, &filter_tools);
            let tool_names_for_phase: Vec<&str> =
                tools_for_phase.iter().map(|t| t.name()).collect();
            let rendered_manifest =
                argo_tool::render_manifest(&tools_for_phase, self.config.model_family);
            let mode_description = format!("{}\n\n{rendered_manifest}", phase_instructions(phase));

            let already_seen = seen_keys(&results);
            let context_block = self
                .assemble_context(user_text, summary.as_ref(), short_term.len(), &already_seen)
                .await?;

            let messages = self.prompt_builder.build(
                BASE_IDENTITY,
                &mode_description,
                &context_block,
                &short_term,
                user_text,
                &transient,
            );
            if self.debug.prompt {
                debug!(session_id, iterations, ?messages, "assembled prompt (ARGO_DEBUG_PROMPT)");
            }

            // S2 Call LLM
            let request = CompletionRequest {
                model: self.config.model.clone(),
                messages,
                temperature: phase.temperature(),
                max_tokens: phase.max_tokens(),
                stop: Vec::new(),
            };
            let response = self.call_llm_with_retry(request).await?;

            // S3 Parse
            let had_plan_before = stats.has_plan;
            let parsed = self.parser.parse(&response.text);
            argo_research::record_plan(&mut stats, parsed.research_plan.as_deref());
            let plan_newly_set = !had_plan_before && stats.has_plan;

            // S4 Policy
            let policy = ToolPolicy::new(&tool_names_for_phase);
            let (approved, rejected) = policy.classify(parsed.tool_proposals.clone());

            transient.clear();
            for rejection in &rejected {
                debug!(
                    session_id,
                    tool = %rejection.proposal.tool_name,
                    reason = %rejection.reason,
                    "policy rejected tool proposal"
                );
                transient.push(format!(
                    "Tool call to '{}' was rejected: {}",
                    rejection.proposal.tool_name, rejection.reason
                ));
            }

            // S5 Execute
            if !approved.is_empty() {
                let batch_results = self.executor.execute_batch(session_id, approved.clone()).await;
                let in_batch = approved.len() > 1;
                let executions: Vec<argo_research::Execution<'_>> = approved
                    .iter()
                    .zip(batch_results.iter())
                    .map(|(proposal, result)| argo_research::Execution {
                        proposal,
                        result,
                        in_batch,
                    })
                    .collect();
                argo_research::record_executions(&mut stats, &executions);
                for result in &batch_results {
                    transient.push(render_tool_result(result));
                }
                results.extend(batch_results);
            }

            if mode == Mode::Research {
                transient.push(argo_research::render_checklist(&stats));
            }

            // S6 Decide
            if iterations >= MAX_ITERATIONS || stats.tool_calls >= mode.max_tool_calls() {
                if iterations >= MAX_ITERATIONS {
                    warn!(session_id, iterations, "turn hit the safety iteration bound, forcing finalize");
                }
                break 'turn (response.text, parsed);
            }

            let no_tool_proposed = parsed.tool_proposals.is_empty();
            let final_signal = match mode {
                Mode::Quick | Mode::Ingest => no_tool_proposed && !response.text.trim().is_empty(),
                Mode::Research => no_tool_proposed && parsed.synthesis.is_some(),
            };
            if final_signal {
                if mode == Mode::Quick {
                    let web_tool_ran = stats.execution_path.iter().any(|step| {
                        matches!(
                            step,
                            ExecutionStep::Batch { tool_name } | ExecutionStep::Individual { tool_name }
                                if tool_name == "web_search" || tool_name == "web_access"
                        )
                    });
                    if web_tool_ran && !quick::has_citation(&response.text) && !citation_nudge_given {
                        citation_nudge_given = true;
                        transient.push(
                            "Your answer drew on web results but cited no source. Revise your \
                             final answer to include at least one source URL."
                                .to_string(),
                        );
                        continue 'turn;
                    }
                }
                break 'turn (response.text, parsed);
            }

            if mode == Mode::Research && plan_newly_set && no_tool_proposed {
                transient.push(
                    "A research plan has been recorded. Begin executing it now with your first \
                     tool call."
                        .to_string(),
                );
                continue 'turn;
            }

            if mode == Mode::Research
                && !stats.synthesis_triggered
                && argo_research::should_fallback_to_partial_synthesis(&stats)
            {
                stats.synthesis_triggered = true;
                stats.failed_hosts.clear();
                info!(session_id, "research fallback: transitioning to partial synthesis");
                transient.push(
                    "Repeated fetch failures occurred. Synthesize your answer now using only \
                     the sources you already gathered."
                        .to_string(),
                );
                continue 'turn;
            }

            // Rule 5: otherwise go around again.
        };

        // S7 Finalize
        let final_text = match mode {
            Mode::Research => parsed
                .synthesis
                .clone()
                .unwrap_or_else(|| strip_known_tags(&raw_text)),
            Mode::Quick | Mode::Ingest => strip_known_tags(&raw_text),
        };

        self.session_store
            .append_message(Message::new(session_id, Role::Assistant, final_text.clone()))
            .await?;

        if let Err(err) = regenerate_summary_if_due(
            self.session_store.as_ref(),
            self.provider.as_ref(),
            session_id,
            self.config.summary_interval,
            self.config.summary_keep_recent,
        )
        .await
        {
            warn!(session_id, %err, "summary regeneration failed, leaving prior summary in place");
        }

        // Per §9: the memory-writer runs only after Quick/Research turns,
        // never after Ingest.
        if matches!(mode, Mode::Quick | Mode::Research) {
            if let Err(err) = self.extract_memory(session_id).await {
                warn!(session_id, %err, "background memory extraction failed");
            }
        }

        Ok(TurnOutcome {
            final_text,
            tool_results: results,
            stats,
        })
    }

    async fn finalize_short_circuit(&self, session_id: &str) -> Result<TurnOutcome, ArgoError> {
        let final_text =
            "Could you clarify what you mean? I want to make sure I answer the right question."
                .to_string();
        self.session_store
            .append_message(Message::new(session_id, Role::Assistant, final_text.clone()))
            .await?;
        Ok(TurnOutcome {
            final_text,
            tool_results: Vec::new(),
            stats: ResearchStats::default(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn preseed_web_search(
        &self,
        session_id: &str,
        user_text: &str,
        summary: Option<&SessionSummary>,
        short_term_len: usize,
        stats: &mut ResearchStats,
        results: &mut Vec<ToolResult>,
        transient: &mut Vec<String>,
    ) {
        let context_probe = self
            .assemble_context(user_text, summary, short_term_len, &[])
            .await
            .unwrap_or_default();
        if !context_probe.trim().is_empty() {
            return;
        }
        let proposal = ToolProposal {
            tool_name: "web_search".to_string(),
            params: [("query".to_string(), user_text.to_string())].into_iter().collect(),
        };
        let batch_results = self.executor.execute_batch(session_id, vec![proposal.clone()]).await;
        let Some(result) = batch_results.first() else {
            return;
        };
        let executions = vec![argo_research::Execution {
            proposal: &proposal,
            result,
            in_batch: false,
        }];
        argo_research::record_executions(stats, &executions);
        transient.push(render_tool_result(result));
        results.extend(batch_results);
    }

    async fn assemble_context(
        &self,
        query: &str,
        summary: Option<&SessionSummary>,
        short_term_len: usize,
        already_seen: &[String],
    ) -> Result<String, ArgoError> {
        self.memory
            .assemble(
                self.vector_store.as_ref(),
                query,
                summary,
                short_term_len,
                self.config.short_term_k,
                already_seen,
                Utc::now(),
            )
            .await
            .map_err(ArgoError::from)
    }

    async fn call_llm_with_retry(
        &self,
        request: CompletionRequest,
    ) -> Result<argo_types::CompletionResponse, ArgoError> {
        let mut attempt: u32 = 0;
        loop {
            let outcome =
                tokio::time::timeout(self.config.llm_timeout, self.provider.complete(request.clone()))
                    .await;
            match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => {
                    if attempt >= self.config.llm_max_retries || !err.is_retryable() {
                        return Err(ArgoError::Transport(err));
                    }
                }
                Err(_elapsed) => {
                    if attempt >= self.config.llm_max_retries {
                        return Err(ArgoError::Timeout(format!(
                            "llm call exceeded {:?}",
                            self.config.llm_timeout
                        )));
                    }
                }
            }
            let delay = backoff_delay(attempt);
            warn!(attempt, ?delay, "retrying llm call after a transient failure");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn extract_memory(&self, session_id: &str) -> Result<(), ArgoError> {
        let window = self.config.memory_extraction_window.max(1) * 2;
        let recent = self.session_store.last_messages(session_id, window).await?;
        if recent.is_empty() {
            return Ok(());
        }

        let mut prompt = String::from(
            "Extract any durable facts about the user from the conversation excerpt below. \
             Write one fact per line, each prefixed with \"FACT: \". If there are no durable \
             facts, reply with a single line: FACT: none\n\n",
        );
        for message in &recent {
            let role = match message.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            prompt.push_str(&format!("{role}: {}\n", message.content));
        }

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                WireMessage::system("You extract durable facts about a user from a conversation excerpt."),
                WireMessage::user(prompt),
            ],
            temperature: 0.2,
            max_tokens: 512,
            stop: Vec::new(),
        };
        let response = self.provider.complete(request).await?;

        for line in response.text.lines() {
            let Some(fact_text) = line.strip_prefix("FACT:").map(str::trim) else {
                continue;
            };
            if fact_text.is_empty() || fact_text.eq_ignore_ascii_case("none") {
                continue;
            }
            self.session_store
                .append_profile_fact(ProfileFact {
                    id: uuid::Uuid::new_v4().to_string(),
                    fact_type: "general".to_string(),
                    text: fact_text.to_string(),
                    source: session_id.to_string(),
                    created_at: Utc::now(),
                    active: true,
                })
                .await?;
        }
        Ok(())
    }
}

const BASE_IDENTITY: &str =
    "You are argo, a locally-hosted personal AI assistant with access to the user's memory and a small set of tools.";

fn phase_instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::QuickInitial | Phase::QuickAfterTools => {
            "Quick lookup mode: answer directly and concisely, using at most two tool calls. \
             Cite a source URL whenever you use information from a web tool."
        }
        Phase::ResearchPlanning => {
            "Research mode, planning: before calling any tool, write a <research_plan> block \
             describing the sub-questions you'll investigate and the sources you expect to need."
        }
        Phase::ResearchExploration => {
            "Research mode, exploration: execute your plan. Search and fetch sources, and track \
             which sub-questions remain open."
        }
        Phase::ResearchSynthesis => {
            "Research mode, synthesis: write your final answer inside a <synthesis> block, with \
             a <confidence> assessment and a <gaps> list of anything still unresolved."
        }
        Phase::Ingest => {
            "Ingest mode: read the provided material, produce a structured markdown summary, \
             then call memory_write with the summary and appropriate tags."
        }
    }
}

fn seen_keys(results: &[ToolResult]) -> Vec<String> {
    results
        .iter()
        .map(|result| match &result.metadata.url {
            Some(url) => normalize_url(url),
            None => content_hash(&result.text),
        })
        .collect()
}

fn render_tool_result(result: &ToolResult) -> String {
    match result.status {
        ToolResultStatus::Ok => format!("Tool '{}' result: {}", result.tool_name, result.text),
        ToolResultStatus::Error => format!(
            "Tool '{}' failed: {}",
            result.tool_name,
            result.metadata.error_message.as_deref().unwrap_or(&result.text)
        ),
    }
}

/// Remove one top-level `<tag>...</tag>` occurrence's worth of content,
/// tolerating an unclosed tag by dropping everything to the end of input.
fn strip_tag(text: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        rest = &rest[start + open.len()..];
        match rest.find(&close) {
            Some(end) => rest = &rest[end + close.len()..],
            None => rest = "",
        }
    }
    out.push_str(rest);
    out
}

/// Strip every known reasoning tag from a raw response before it becomes
/// the user-visible final answer (§4.1 S7: "split out any `<think>`
/// content").
fn strip_known_tags(raw: &str) -> String {
    let mut text = raw.to_string();
    for tag in ["think", "research_plan", "tool_call", "synthesis", "confidence", "gaps"] {
        text = strip_tag(&text, tag);
    }
    text.trim().to_string()
}

fn backoff_delay(attempt: u32) -> Duration {
    let base_ms: u64 = 200u64.saturating_mul(1u64 << attempt.min(10));
    let jitter: u64 = rand::random::<u64>() % 100;
    Duration::from_millis(base_ms + jitter)
}
