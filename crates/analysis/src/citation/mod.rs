//! Citation graph construction
//!
//! Builds a bounded citation graph breadth-first from seed identifiers and
//! freezes it into an immutable snapshot for analysis.

mod builder;
mod fetch;
mod graph;
mod pagerank;

pub use builder::GraphBuilder;
pub use fetch::{CorpusEntry, CorpusFetcher, PaperFetcher, RawRecord};
pub use graph::{CitationGraph, EdgeInsert, GraphSnapshot, MergeOutcome};
pub use pagerank::{PageRankConfig, PageRankScorer};

use citenet_common::models::PaperId;
use serde::{Deserialize, Serialize};

/// Completeness annotation attached to every built graph
///
/// An incomplete graph is still a valid result; analysis runs on it as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatus {
    /// True when any reason is present
    pub incomplete: bool,

    pub reasons: Vec<IncompleteReason>,

    /// The node budget cut expansion short (informational)
    pub truncated: bool,

    /// Failed or not-found fetches, relation fetches included
    pub fetch_failures: usize,

    pub skipped: Vec<SkippedNode>,

    /// Nodes kept in the graph whose relations could not be fetched
    pub unexpanded: Vec<UnexpandedNode>,

    /// Relations whose endpoint never entered the graph
    pub dropped_edges: usize,

    pub waves_completed: usize,
}

impl GraphStatus {
    pub(crate) fn mark(&mut self, reason: IncompleteReason) {
        self.incomplete = true;
        self.reasons.push(reason);
    }
}

/// Why a graph is flagged incomplete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IncompleteReason {
    FetchFailures { count: usize, threshold: usize },
    Cancelled,
    DeadlineExceeded,
}

/// A key that did not become a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedNode {
    pub key: PaperId,
    pub reason: SkipReason,
}

/// A node expanded from its declared relations only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnexpandedNode {
    pub id: PaperId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    FetchFailed(String),
    Malformed(String),
}

impl SkipReason {
    /// Whether this counts against the fetch-failure threshold
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, SkipReason::NotFound | SkipReason::FetchFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_sets_incomplete() {
        let mut status = GraphStatus::default();
        assert!(!status.incomplete);

        status.mark(IncompleteReason::Cancelled);
        assert!(status.incomplete);
        assert_eq!(status.reasons, vec![IncompleteReason::Cancelled]);
    }

    #[test]
    fn test_malformed_is_not_a_fetch_failure() {
        assert!(SkipReason::NotFound.is_fetch_failure());
        assert!(SkipReason::FetchFailed("timeout".into()).is_fetch_failure());
        assert!(!SkipReason::Malformed("no title".into()).is_fetch_failure());
    }

    #[test]
    fn test_status_serializes_tagged() {
        let mut status = GraphStatus::default();
        status.mark(IncompleteReason::FetchFailures { count: 3, threshold: 0 });

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["reasons"][0]["reason"], "fetch_failures");
        assert_eq!(json["reasons"][0]["count"], 3);
    }
}
