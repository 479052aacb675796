//! Explicitly scoped paper cache
//!
//! Provides:
//! - Normalised papers and their relation lists keyed by canonical id
//! - A refresh policy: entries older than the configured horizon are stale
//! - A capacity bound that evicts the oldest entry first
//!
//! The cache is an object handed to the graph builder, never ambient state.

use crate::config::CacheConfig;
use crate::errors::Result;
use crate::metrics::record_cache;
use crate::models::{Paper, PaperId, Relation};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// One cached fetch
#[derive(Debug, Clone)]
pub struct CachedPaper {
    pub paper: Paper,
    /// None when only the record was fetched
    pub relations: Option<Vec<Relation>>,
    pub fetched_at: DateTime<Utc>,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Fresh(CachedPaper),
    /// Older than the refresh horizon; usable as a fallback only
    Stale(CachedPaper),
    Miss,
}

/// In-memory paper cache
pub struct PaperCache {
    entries: RwLock<HashMap<PaperId, CachedPaper>>,
    capacity: usize,
    refresh_after: TimeDelta,
}

impl PaperCache {
    /// Fails with `InvalidConfiguration` when the refresh horizon is out of range
    pub fn new(config: CacheConfig) -> Result<Self> {
        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            capacity: config.capacity,
            refresh_after: config.refresh_after()?,
        })
    }

    /// Look up an entry against the current time
    pub async fn lookup(&self, key: &PaperId) -> CacheLookup {
        self.lookup_at(key, Utc::now()).await
    }

    /// Look up an entry against an explicit clock
    pub async fn lookup_at(&self, key: &PaperId, now: DateTime<Utc>) -> CacheLookup {
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(entry) if now - entry.fetched_at < self.refresh_after => {
                debug!(key = %key, "Cache hit");
                record_cache(true, "papers");
                CacheLookup::Fresh(entry.clone())
            }
            Some(entry) => {
                debug!(key = %key, fetched_at = %entry.fetched_at, "Cache entry stale");
                record_cache(false, "papers");
                CacheLookup::Stale(entry.clone())
            }
            None => {
                debug!(key = %key, "Cache miss");
                record_cache(false, "papers");
                CacheLookup::Miss
            }
        }
    }

    /// Store a fetch made now
    pub async fn insert(&self, key: PaperId, paper: Paper, relations: Option<Vec<Relation>>) {
        self.insert_at(
            key,
            CachedPaper {
                paper,
                relations,
                fetched_at: Utc::now(),
            },
        )
        .await;
    }

    /// Store an entry with its own timestamp
    pub async fn insert_at(&self, key: PaperId, entry: CachedPaper) {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by(|(ka, a), (kb, b)| a.fetched_at.cmp(&b.fetched_at).then_with(|| ka.cmp(kb)))
                .map(|(k, _)| k.clone());

            if let Some(oldest) = oldest {
                debug!(key = %oldest, "Cache eviction");
                entries.remove(&oldest);
            }
        }

        entries.insert(key, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTag;

    fn paper(key: &str) -> Paper {
        Paper::new(PaperId::parse(key), "A paper", SourceTag::SemanticScholar)
    }

    fn config(capacity: usize) -> CacheConfig {
        CacheConfig {
            capacity,
            refresh_after_hours: 24,
        }
    }

    #[tokio::test]
    async fn test_fresh_then_stale() {
        let cache = PaperCache::new(config(8)).unwrap();
        let key = PaperId::parse("10.1000/a");
        let fetched_at = Utc::now();

        cache
            .insert_at(
                key.clone(),
                CachedPaper {
                    paper: paper("10.1000/a"),
                    relations: None,
                    fetched_at,
                },
            )
            .await;

        let soon = fetched_at + chrono::Duration::hours(1);
        assert!(matches!(cache.lookup_at(&key, soon).await, CacheLookup::Fresh(_)));

        let later = fetched_at + chrono::Duration::hours(25);
        assert!(matches!(cache.lookup_at(&key, later).await, CacheLookup::Stale(_)));

        let missing = PaperId::parse("10.1000/b");
        assert!(matches!(cache.lookup(&missing).await, CacheLookup::Miss));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = PaperCache::new(config(2)).unwrap();
        let base = Utc::now();

        for (i, key) in ["10.1000/a", "10.1000/b", "10.1000/c"].iter().enumerate() {
            cache
                .insert_at(
                    PaperId::parse(key),
                    CachedPaper {
                        paper: paper(key),
                        relations: Some(Vec::new()),
                        fetched_at: base + chrono::Duration::minutes(i as i64),
                    },
                )
                .await;
        }

        assert_eq!(cache.len().await, 2);
        assert!(matches!(
            cache.lookup_at(&PaperId::parse("10.1000/a"), base).await,
            CacheLookup::Miss
        ));
        assert!(matches!(
            cache.lookup_at(&PaperId::parse("10.1000/c"), base).await,
            CacheLookup::Fresh(_)
        ));
    }

    #[test]
    fn test_out_of_range_horizon_rejected() {
        let err = PaperCache::new(CacheConfig {
            capacity: 8,
            refresh_after_hours: 10_000_000_000_000_000,
        })
        .err()
        .unwrap();
        assert_eq!(err.code(), crate::errors::ErrorCode::InvalidConfiguration);
    }
}
