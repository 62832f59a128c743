//! Cross-layer deduplication (§4.4).
//!
//! A chunk is keyed by its normalized URL when it has one, otherwise by a
//! content hash of its first 256 characters. When two layers surface the
//! same key, the higher-priority layer's copy wins: tool results (handled
//! by the caller, never rendered here) > web cache > archival RAG >
//! autobiographical.

use std::collections::HashSet;

use argo_types::{normalize_url, content_hash, Chunk, TrustLevel};

/// Which of the four renderable layers a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    /// `web_cache` namespace.
    WebCache,
    /// Merged `reading_history` + `youtube_history` + `notes_journal`.
    ArchivalRag,
    /// `autobiographical_memory` namespace.
    Autobiographical,
}

/// A chunk carried through rescoring, dedup, and rendering.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Which layer this came from.
    pub layer: Layer,
    /// Stable id within its namespace.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Rescored similarity, descending order within a layer.
    pub score: f64,
    /// Source URL, if any.
    pub url: Option<String>,
    /// Free-form source type label.
    pub source_type: String,
    /// Trust level, rendered into the `<chunk trust=…>` attribute.
    pub trust_level: TrustLevel,
}

impl Candidate {
    /// Build a candidate from a rescored [`Chunk`].
    #[must_use]
    pub fn from_chunk(layer: Layer, chunk: Chunk, rescored: f64) -> Self {
        Self {
            layer,
            id: chunk.id,
            text: chunk.text,
            score: rescored,
            url: chunk.metadata.url,
            source_type: chunk.metadata.source_type,
            trust_level: chunk.metadata.trust_level,
        }
    }

    fn dedup_key(&self) -> String {
        match &self.url {
            Some(url) => normalize_url(url),
            None => content_hash(&self.text),
        }
    }
}

/// Dedup `candidates` against `already_seen` keys (normalized URLs or
/// content hashes of this turn's tool results) and against each other,
/// keeping the first occurrence once layers are sorted by priority.
#[must_use]
pub fn dedup(mut candidates: Vec<Candidate>, already_seen: &[String]) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.layer.cmp(&b.layer));
    let mut seen: HashSet<String> = already_seen.iter().cloned().collect();
    let mut out = Vec::new();
    for candidate in candidates {
        let key = candidate.dedup_key();
        if seen.insert(key) {
            out.push(candidate);
        }
    }
    out
}
