#![deny(missing_docs)]
//! Document normalization, chunking, embedding, and vector-store ingestion
//! (§4.11 of the spec).
//!
//! `IngestionManager` is the only place a [`Document`] turns into rows in a
//! [`VectorStore`] namespace: it resolves which namespace a document belongs
//! in, derives a stable id, and delegates the actual text-splitting and
//! embedding to injected [`Chunker`]/[`Embedder`] seams.

use std::sync::Arc;

use argo_types::{
    Chunk, ChunkMetadata, Chunker, Document, DocumentWriter, Embedder, Namespace, SourceType,
    StorageError, TrustLevel, VectorStore, content_hash,
};
use async_trait::async_trait;
use chrono::Utc;

fn stable_id(doc: &Document) -> String {
    if let Some(url) = &doc.url {
        return content_hash(url);
    }
    if let Some(title) = &doc.title {
        return content_hash(title);
    }
    content_hash(&doc.text)
}

fn trust_level(source_type: &SourceType) -> TrustLevel {
    match source_type {
        SourceType::WebArticle | SourceType::YoutubeVideo | SourceType::YoutubeChannel => {
            TrustLevel::WebFetched
        }
        SourceType::Note | SourceType::Journal | SourceType::ChatExport | SourceType::Other => {
            TrustLevel::UserAuthored
        }
    }
}

/// Resolve the namespace a document routes to (§4.11): `ephemeral` always
/// wins and routes to `web_cache`; otherwise the source type's namespace, or
/// `None` if the source type is unroutable.
#[must_use]
pub fn resolve_namespace(doc: &Document) -> Option<Namespace> {
    if doc.ephemeral {
        return Some(Namespace::WebCache);
    }
    doc.source_type.namespace()
}

/// Normalizes documents, delegates chunking/embedding to injected seams, and
/// writes the resulting chunks to a [`VectorStore`] (§4.11).
pub struct IngestionManager {
    store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
}

impl IngestionManager {
    /// Construct a manager over the given vector store, chunker, and
    /// embedder seams.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            chunker,
            embedder,
        }
    }

    /// Normalize `doc`, resolve its namespace, chunk and embed its text, and
    /// upsert each resulting chunk into the vector store.
    ///
    /// # Errors
    /// Returns `StorageError` wrapped as `ArgoError::Config` by callers that
    /// need the rolled-up error type if `doc.source_type` has no routable
    /// namespace and `doc.ephemeral` is false.
    pub async fn ingest(&self, doc: Document) -> Result<(), StorageError> {
        let text = doc.text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let Some(namespace) = resolve_namespace(&doc) else {
            return Err(StorageError::Database(format!(
                "source type {:?} has no routable namespace",
                doc.source_type
            )));
        };
        let base_id = stable_id(&doc);
        let fetched_at = if doc.ephemeral || matches!(doc.source_type, SourceType::WebArticle) {
            Some(Utc::now())
        } else {
            None
        };
        let metadata = ChunkMetadata {
            url: doc.url.clone(),
            source_type: format!("{:?}", doc.source_type).to_lowercase(),
            fetched_at,
            trust_level: trust_level(&doc.source_type),
            namespace: namespace.clone(),
        };

        let chunks = self.chunker.chunk(text);
        for (i, chunk_text) in chunks.iter().enumerate() {
            let embedding = self.embedder.embed(chunk_text).await?;
            let id = if chunks.len() == 1 {
                base_id.clone()
            } else {
                format!("{base_id}-{i}")
            };
            self.store
                .upsert(
                    namespace.clone(),
                    id,
                    embedding,
                    chunk_text.clone(),
                    metadata.clone(),
                )
                .await?;
        }
        tracing::debug!(namespace = %namespace, chunks = chunks.len(), "ingested document");
        Ok(())
    }
}

#[async_trait]
impl DocumentWriter for IngestionManager {
    async fn ingest(&self, doc: Document) -> Result<(), StorageError> {
        IngestionManager::ingest(self, doc).await
    }
}

/// A no-op embedder for tests: returns a constant low-dimensional vector
/// regardless of input.
pub struct ZeroEmbedder {
    dims: usize,
}

impl ZeroEmbedder {
    /// Construct an embedder that always returns a zero vector of `dims`
    /// dimensions.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl Embedder for ZeroEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(vec![0.0; self.dims])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_types::{QueryFilter, WholeDocumentChunker};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        upserts: Mutex<Vec<(Namespace, String, String)>>,
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn upsert(
            &self,
            namespace: Namespace,
            id: String,
            _embedding: Vec<f32>,
            text: String,
            _metadata: ChunkMetadata,
        ) -> Result<(), StorageError> {
            self.upserts.lock().unwrap().push((namespace, id, text));
            Ok(())
        }
        async fn query(
            &self,
            _namespace: Namespace,
            _query_text: &str,
            _top_k: usize,
            _filter: Option<QueryFilter>,
        ) -> Result<Vec<Chunk>, StorageError> {
            Ok(Vec::new())
        }
        async fn delete(
            &self,
            _namespace: Namespace,
            _filter: Option<QueryFilter>,
        ) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn doc(source_type: SourceType, ephemeral: bool) -> Document {
        Document {
            text: "some body text".to_string(),
            source_type,
            url: Some("https://example.com/a".to_string()),
            title: None,
            metadata: BTreeMap::new(),
            ephemeral,
        }
    }

    #[test]
    fn ephemeral_always_routes_to_web_cache() {
        let d = doc(SourceType::Note, true);
        assert_eq!(resolve_namespace(&d), Some(Namespace::WebCache));
    }

    #[test]
    fn known_source_type_routes_by_table() {
        assert_eq!(
            resolve_namespace(&doc(SourceType::WebArticle, false)),
            Some(Namespace::ReadingHistory)
        );
        assert_eq!(
            resolve_namespace(&doc(SourceType::YoutubeVideo, false)),
            Some(Namespace::YoutubeHistory)
        );
        assert_eq!(
            resolve_namespace(&doc(SourceType::Journal, false)),
            Some(Namespace::NotesJournal)
        );
    }

    #[test]
    fn unroutable_source_type_is_rejected() {
        assert_eq!(resolve_namespace(&doc(SourceType::ChatExport, false)), None);
        assert_eq!(resolve_namespace(&doc(SourceType::Other, false)), None);
    }

    #[tokio::test]
    async fn ingest_rejects_unroutable_source_type() {
        let store = Arc::new(RecordingStore::default());
        let manager = IngestionManager::new(store, Arc::new(WholeDocumentChunker), Arc::new(ZeroEmbedder::new(4)));
        let err = manager.ingest(doc(SourceType::Other, false)).await.unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }

    #[tokio::test]
    async fn ingest_writes_one_chunk_per_split() {
        let store = Arc::new(RecordingStore::default());
        let manager = IngestionManager::new(
            store.clone(),
            Arc::new(WholeDocumentChunker),
            Arc::new(ZeroEmbedder::new(4)),
        );
        manager
            .ingest(doc(SourceType::WebArticle, false))
            .await
            .unwrap();
        let upserts = store.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].0, Namespace::ReadingHistory);
    }

    #[tokio::test]
    async fn empty_text_is_a_no_op() {
        let store = Arc::new(RecordingStore::default());
        let manager = IngestionManager::new(store.clone(), Arc::new(WholeDocumentChunker), Arc::new(ZeroEmbedder::new(4)));
        let mut d = doc(SourceType::Note, false);
        d.text = "   ".to_string();
        manager.ingest(d).await.unwrap();
        assert!(store.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ephemeral_document_with_no_namespace_rule_still_caches() {
        let store = Arc::new(RecordingStore::default());
        let manager = IngestionManager::new(store.clone(), Arc::new(WholeDocumentChunker), Arc::new(ZeroEmbedder::new(4)));
        manager
            .ingest(doc(SourceType::ChatExport, true))
            .await
            .unwrap();
        let upserts = store.upserts.lock().unwrap();
        assert_eq!(upserts[0].0, Namespace::WebCache);
    }
}
