//! Reference in-memory [`VectorStore`] implementation, used by tests and as
//! a development default. Out of scope per spec §1 is a real embedding
//! index — similarity here is a crude lexical-overlap heuristic good
//! enough to exercise `MemoryAssembler`'s rescoring/dedup/rendering
//! pipeline without a real embedder wired in.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use argo_types::{Chunk, ChunkMetadata, Namespace, QueryFilter, StorageError, VectorStore};

struct StoredChunk {
    id: String,
    text: String,
    metadata: ChunkMetadata,
}

fn lexical_score(query: &str, text: &str) -> f64 {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    if query.is_empty() {
        return 0.1;
    }
    let hits = query.split_whitespace().filter(|term| text.contains(term)).count();
    if hits == 0 {
        0.1
    } else {
        1.0 / (1.0 + (query.split_whitespace().count().saturating_sub(hits)) as f64)
    }
}

/// In-memory vector store backed by a `HashMap<Namespace, Vec<_>>` behind a
/// `RwLock`, mirroring `neuron-state-memory`'s single-process store shape.
pub struct InMemoryVectorStore {
    data: RwLock<HashMap<Namespace, Vec<StoredChunk>>>,
}

impl InMemoryVectorStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        namespace: Namespace,
        id: String,
        _embedding: Vec<f32>,
        text: String,
        metadata: ChunkMetadata,
    ) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        let bucket = data.entry(namespace).or_default();
        if let Some(existing) = bucket.iter_mut().find(|c| c.id == id) {
            existing.text = text;
            existing.metadata = metadata;
        } else {
            bucket.push(StoredChunk { id, text, metadata });
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: Namespace,
        query_text: &str,
        top_k: usize,
        filter: Option<QueryFilter>,
    ) -> Result<Vec<Chunk>, StorageError> {
        let data = self.data.read().await;
        let Some(bucket) = data.get(&namespace) else {
            return Ok(Vec::new());
        };
        let now = chrono::Utc::now();
        let mut scored: Vec<Chunk> = bucket
            .iter()
            .filter(|c| match &filter {
                Some(f) => {
                    let source_ok = f
                        .source_type
                        .as_ref()
                        .is_none_or(|s| s == &c.metadata.source_type);
                    let age_ok = match (f.max_age_days, c.metadata.fetched_at) {
                        (Some(max_age), Some(fetched_at)) => {
                            (now - fetched_at).num_days() <= max_age
                        }
                        (Some(_), None) => false,
                        (None, _) => true,
                    };
                    source_ok && age_ok
                }
                None => true,
            })
            .map(|c| Chunk {
                id: c.id.clone(),
                text: c.text.clone(),
                score: lexical_score(query_text, &c.text),
                metadata: c.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(
        &self,
        namespace: Namespace,
        filter: Option<QueryFilter>,
    ) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        let Some(bucket) = data.get_mut(&namespace) else {
            return Ok(());
        };
        let now = chrono::Utc::now();
        let before = bucket.len();
        bucket.retain(|c| match &filter {
            Some(f) => {
                let source_ok = f
                    .source_type
                    .as_ref()
                    .is_none_or(|s| s == &c.metadata.source_type);
                let age_ok = match (f.max_age_days, c.metadata.fetched_at) {
                    (Some(max_age), Some(fetched_at)) => (now - fetched_at).num_days() <= max_age,
                    (Some(_), None) => false,
                    (None, _) => true,
                };
                !(source_ok && age_ok)
            }
            None => false,
        });
        tracing::debug!(
            %namespace,
            removed = before - bucket.len(),
            "deleted chunks from in-memory vector store"
        );
        Ok(())
    }
}
