//! Age-based rescoring and TTL expiry (§4.4).

use argo_types::Chunk;
use chrono::{DateTime, Utc};

/// Rescore a chunk against `now`, returning `None` if it has aged past its
/// namespace's TTL. Chunks without a `decay_half_life_days` (notes,
/// autobiographical facts) or without a known `fetched_at` pass through
/// unscaled.
#[must_use]
pub fn rescore(chunk: &Chunk, now: DateTime<Utc>) -> Option<f64> {
    let policy = chunk.metadata.namespace.retention_policy();
    let age_days = chunk
        .metadata
        .fetched_at
        .map(|fetched_at| (now - fetched_at).num_seconds() as f64 / 86_400.0);

    if !policy.keep_forever {
        if let (Some(ttl_days), Some(age_days)) = (policy.ttl_days, age_days) {
            if age_days > ttl_days as f64 {
                return None;
            }
        }
    }

    let mut score = chunk.score;
    if let (Some(half_life), Some(age_days)) = (policy.decay_half_life_days, age_days) {
        if half_life > 0.0 {
            score *= 0.5f64.powf(age_days / half_life);
        }
    }
    Some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_types::{ChunkMetadata, Namespace, TrustLevel};
    use chrono::Duration;

    fn chunk(namespace: Namespace, score: f64, age_days: i64) -> Chunk {
        Chunk {
            id: "c1".to_string(),
            text: "body".to_string(),
            score,
            metadata: ChunkMetadata {
                url: None,
                source_type: "web_article".to_string(),
                fetched_at: Some(Utc::now() - Duration::days(age_days)),
                trust_level: TrustLevel::WebFetched,
                namespace,
            },
        }
    }

    #[test]
    fn web_cache_past_ttl_is_dropped() {
        let c = chunk(Namespace::WebCache, 1.0, 10);
        assert!(rescore(&c, Utc::now()).is_none());
    }

    #[test]
    fn web_cache_within_ttl_decays() {
        let c = chunk(Namespace::WebCache, 1.0, 3);
        let rescored = rescore(&c, Utc::now()).unwrap();
        assert!(rescored < 1.0);
        assert!(rescored > 0.0);
    }

    #[test]
    fn notes_journal_never_decays() {
        let c = chunk(Namespace::NotesJournal, 0.8, 400);
        assert_eq!(rescore(&c, Utc::now()).unwrap(), 0.8);
    }

    #[test]
    fn autobiographical_never_decays() {
        let c = chunk(Namespace::AutobiographicalMemory, 0.9, 1000);
        assert_eq!(rescore(&c, Utc::now()).unwrap(), 0.9);
    }

    #[test]
    fn reading_history_decays_but_never_expires() {
        let c = chunk(Namespace::ReadingHistory, 1.0, 10_000);
        let rescored = rescore(&c, Utc::now()).unwrap();
        assert!(rescored > 0.0 && rescored < 1.0);
    }

    #[test]
    fn missing_fetched_at_passes_through_unscaled() {
        let mut c = chunk(Namespace::WebCache, 0.5, 0);
        c.metadata.fetched_at = None;
        assert_eq!(rescore(&c, Utc::now()).unwrap(), 0.5);
    }
}
