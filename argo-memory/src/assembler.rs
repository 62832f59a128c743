//! Six-layer context assembly (§4.4).

use chrono::{DateTime, Utc};

use argo_types::{Namespace, SessionSummary, StorageError, VectorStore};

use crate::decay;
use crate::dedup::{self, Candidate, Layer};

/// Assembles the system context block handed to `PromptBuilder` as item 2
/// of the message list. Top-M per namespace, decay-rescored, deduplicated
/// against this turn's already-fetched tool results and across layers.
pub struct MemoryAssembler {
    top_m: usize,
}

impl MemoryAssembler {
    /// Build an assembler that retrieves up to `top_m` candidates per
    /// namespace before rescoring and dedup.
    #[must_use]
    pub fn new(top_m: usize) -> Self {
        Self { top_m }
    }

    async fn query_layer(
        &self,
        store: &dyn VectorStore,
        namespace: Namespace,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(argo_types::Chunk, f64)>, StorageError> {
        let raw = store.query(namespace, query, self.top_m, None).await?;
        let mut rescored: Vec<(argo_types::Chunk, f64)> = raw
            .into_iter()
            .filter_map(|chunk| decay::rescore(&chunk, now).map(|score| (chunk, score)))
            .collect();
        rescored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        rescored.truncate(self.top_m);
        Ok(rescored)
    }

    /// Assemble the rendered context block.
    ///
    /// `already_seen_keys` are normalized URLs / content hashes of this
    /// turn's tool results (`argo-executor` supplies these) — used purely
    /// to exclude stale duplicates from the rendered layers, since the
    /// tool results themselves are rendered separately as transient `E`
    /// messages, not inside this block.
    pub async fn assemble(
        &self,
        store: &dyn VectorStore,
        query: &str,
        summary: Option<&SessionSummary>,
        short_term_len: usize,
        k: usize,
        already_seen_keys: &[String],
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let autobiographical = self
            .query_layer(store, Namespace::AutobiographicalMemory, query, now)
            .await?;

        let mut rag = Vec::new();
        for namespace in [Namespace::ReadingHistory, Namespace::YoutubeHistory, Namespace::NotesJournal] {
            rag.extend(self.query_layer(store, namespace, query, now).await?);
        }
        rag.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        rag.truncate(self.top_m);

        let web_cache = self.query_layer(store, Namespace::WebCache, query, now).await?;

        let mut candidates = Vec::new();
        candidates.extend(
            autobiographical
                .into_iter()
                .map(|(c, s)| Candidate::from_chunk(Layer::Autobiographical, c, s)),
        );
        candidates.extend(rag.into_iter().map(|(c, s)| Candidate::from_chunk(Layer::ArchivalRag, c, s)));
        candidates.extend(web_cache.into_iter().map(|(c, s)| Candidate::from_chunk(Layer::WebCache, c, s)));

        let deduped = dedup::dedup(candidates, already_seen_keys);

        let include_summary = summary.is_some() && short_term_len * 2 >= k;
        tracing::debug!(
            candidates = deduped.len(),
            include_summary,
            "assembled context block"
        );
        Ok(render(summary.filter(|_| include_summary), &deduped))
    }
}

fn render_chunk(candidate: &Candidate) -> String {
    let url_attr = candidate
        .url
        .as_deref()
        .map(|u| format!(" url=\"{u}\""))
        .unwrap_or_default();
    format!(
        "<chunk id=\"{}\" trust=\"{:?}\" source_type=\"{}\"{}>{}</chunk>",
        candidate.id, candidate.trust_level, candidate.source_type, url_attr, candidate.text
    )
}

fn render(summary: Option<&SessionSummary>, candidates: &[Candidate]) -> String {
    let mut out = String::new();

    if let Some(summary) = summary {
        out.push_str("<session_summary>");
        out.push_str(&summary.summary_text);
        out.push_str("</session_summary>\n");
    }

    let autobiographical: Vec<&Candidate> = candidates.iter().filter(|c| c.layer == Layer::Autobiographical).collect();
    if !autobiographical.is_empty() {
        out.push_str("<autobiographical>\n");
        for c in autobiographical {
            out.push_str(&render_chunk(c));
            out.push('\n');
        }
        out.push_str("</autobiographical>\n");
    }

    let rag: Vec<&Candidate> = candidates.iter().filter(|c| c.layer == Layer::ArchivalRag).collect();
    if !rag.is_empty() {
        out.push_str("<knowledge_base>\n");
        for c in rag {
            out.push_str(&render_chunk(c));
            out.push('\n');
        }
        out.push_str("</knowledge_base>\n");
    }

    let web_cache: Vec<&Candidate> = candidates.iter().filter(|c| c.layer == Layer::WebCache).collect();
    if !web_cache.is_empty() {
        out.push_str("<web_cache>\n");
        for c in web_cache {
            out.push_str(&render_chunk(c));
            out.push('\n');
        }
        out.push_str("</web_cache>\n");
    }

    out
}
