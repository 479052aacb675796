//! Paper fetcher abstraction
//!
//! The graph builder never talks to a provider directly. It is handed a
//! [`PaperFetcher`], which hides Semantic Scholar, arXiv, CrossRef or any
//! other backend behind two calls.

use crate::normalize::normalize;
use async_trait::async_trait;
use citenet_common::errors::{AppError, Result};
use citenet_common::models::{PaperId, Relation, SourceTag};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Source-specific record as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: SourceTag,
    pub record: serde_json::Value,
}

/// Trait for metadata providers
///
/// Identifiers passed in are canonical [`PaperId`] strings
/// (`doi:...`, `arxiv:...`, `s2:...`, `title:...`).
#[async_trait]
pub trait PaperFetcher: Send + Sync {
    /// Fetch one record; `Ok(None)` means the provider has no such paper
    async fn fetch_paper(&self, id: &str) -> Result<Option<RawRecord>>;

    /// Fetch citation relations of one paper
    async fn fetch_references(&self, id: &str) -> Result<Vec<Relation>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// One paper in a corpus file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Lookup key in any identifier form
    pub key: String,

    pub source: SourceTag,

    pub record: serde_json::Value,

    #[serde(default)]
    pub relations: Vec<Relation>,

    /// Simulate a provider error for this key
    #[serde(default)]
    pub fail: bool,
}

#[derive(Debug, Deserialize)]
struct Corpus {
    papers: Vec<CorpusEntry>,
}

/// In-memory fetcher over a fixed corpus
///
/// Entries are reachable through their key and through every identifier
/// their record normalizes to.
#[derive(Debug, Default)]
pub struct CorpusFetcher {
    entries: Vec<CorpusEntry>,
    index: HashMap<PaperId, usize>,
    failing: HashSet<PaperId>,
}

impl CorpusFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a corpus document: `{ "papers": [ { key, source, record, relations } ] }`
    pub fn from_json(json: &str) -> Result<Self> {
        let corpus: Corpus = serde_json::from_str(json)?;
        Ok(Self::from_entries(corpus.papers))
    }

    /// Load a corpus file
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let fetcher = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            papers = fetcher.len(),
            "Loaded corpus"
        );

        Ok(fetcher)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CorpusEntry>) -> Self {
        let mut fetcher = Self::new();
        for entry in entries {
            fetcher.insert(entry);
        }
        fetcher
    }

    /// Add an entry; earlier entries keep their aliases
    pub fn insert(&mut self, entry: CorpusEntry) {
        let slot = self.entries.len();
        let key = PaperId::parse(&entry.key);

        if entry.fail {
            self.failing.insert(key.clone());
        }
        self.index.insert(key, slot);

        match normalize(&entry.record, entry.source) {
            Ok(paper) => {
                for alias in paper.external_ids {
                    self.index.entry(alias).or_insert(slot);
                }
            }
            Err(e) => debug!(key = %entry.key, error = %e, "Corpus record does not normalize"),
        }

        self.entries.push(entry);
    }

    /// Make every fetch for this key fail
    pub fn fail_on(mut self, key: &str) -> Self {
        self.failing.insert(PaperId::parse(key));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, id: &str) -> Result<Option<&CorpusEntry>> {
        let key = PaperId::parse(id);
        if self.failing.contains(&key) {
            return Err(AppError::FetchFailure {
                id: id.to_string(),
                message: "corpus entry marked as failing".to_string(),
            });
        }
        Ok(self.index.get(&key).map(|&slot| &self.entries[slot]))
    }
}

#[async_trait]
impl PaperFetcher for CorpusFetcher {
    async fn fetch_paper(&self, id: &str) -> Result<Option<RawRecord>> {
        Ok(self.lookup(id)?.map(|entry| RawRecord {
            source: entry.source,
            record: entry.record.clone(),
        }))
    }

    async fn fetch_references(&self, id: &str) -> Result<Vec<Relation>> {
        Ok(self
            .lookup(id)?
            .map(|entry| entry.relations.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "corpus"
    }
}
