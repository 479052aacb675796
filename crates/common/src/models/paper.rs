//! Canonical paper record

use super::{PaperId, SourceTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One paper, normalised from any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Canonical identifier; never changes after creation
    pub id: PaperId,

    pub title: String,

    /// Authors in publication order
    pub authors: Vec<String>,

    /// Publication year (None = unknown)
    pub year: Option<i32>,

    pub venue: Option<String>,

    /// Lower-cased topic and keyword labels
    pub topics: BTreeSet<String>,

    /// Provider-reported citation count, refreshed on re-fetch
    pub citation_count: u64,

    /// Identifiers this record says it cites
    pub references: Vec<String>,

    /// Identifiers this record says cite it
    pub cited_by: Vec<String>,

    /// Every identifier form carried by the record
    pub external_ids: BTreeSet<PaperId>,

    pub source: SourceTag,
}

impl Paper {
    pub fn new(id: PaperId, title: impl Into<String>, source: SourceTag) -> Self {
        let mut external_ids = BTreeSet::new();
        external_ids.insert(id.clone());

        Self {
            id,
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            topics: BTreeSet::new(),
            citation_count: 0,
            references: Vec::new(),
            cited_by: Vec::new(),
            external_ids,
            source,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.topics = topics
            .into_iter()
            .filter_map(|t| normalize_topic(t.as_ref()))
            .collect();
        self
    }

    pub fn with_citation_count(mut self, count: u64) -> Self {
        self.citation_count = count;
        self
    }

    /// Apply the mutable fields of a later fetch of the same paper.
    ///
    /// Returns true when the citation count changed.
    pub fn refresh_from(&mut self, later: &Paper) -> bool {
        self.external_ids.extend(later.external_ids.iter().cloned());
        if self.citation_count != later.citation_count {
            self.citation_count = later.citation_count;
            true
        } else {
            false
        }
    }
}

/// Lower-case and trim a topic label, dropping empty ones
pub fn normalize_topic(raw: &str) -> Option<String> {
    let topic = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!topic.is_empty()).then_some(topic)
}
