//! Research gap identification
//!
//! Flags topics that are touched by several papers in the graph but barely
//! cross-cited among them. A high score is a hint of an under-explored area,
//! not proof of novelty.

use crate::citation::GraphSnapshot;
use crate::graph_metrics::GraphMetrics;
use citenet_common::config::{GapConfig, GapWeights};
use citenet_common::errors::{AppError, Result};
use citenet_common::metrics::record_gaps;
use citenet_common::models::PaperId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument};
use validator::Validate;

/// Heuristic inputs behind a gap score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSignals {
    pub paper_count: usize,
    /// Mean normalized citation rank of the topic's papers
    pub average_rank: f64,
    /// Share of dated topic papers in the most recent third of the year range
    pub recency: f64,
    /// Linked topic-paper pairs over possible pairs
    pub connectivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapCandidate {
    pub topic: String,
    pub description: String,
    pub score: f64,
    pub signals: TopicSignals,
    /// Least connected topic papers first
    pub evidence: Vec<PaperId>,
}

/// Observed year range of the graph's dated papers
#[derive(Debug, Clone, Copy)]
struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    fn of(graph: &GraphSnapshot) -> Option<Self> {
        let mut years = graph.papers().iter().filter_map(|paper| paper.year);
        let first = years.next()?;
        Some(years.fold(Self { min: first, max: first }, |range, year| Self {
            min: range.min.min(year),
            max: range.max.max(year),
        }))
    }

    fn is_recent(&self, year: i32) -> bool {
        let cutoff = self.max as f64 - (self.max - self.min) as f64 / 3.0;
        year as f64 >= cutoff
    }
}

/// Scores topics for gap candidacy
pub struct GapIdentifier {
    config: GapConfig,
}

impl GapIdentifier {
    pub fn new(config: GapConfig) -> Self {
        Self { config }
    }

    /// Ranked gap candidates: score descending, then topic
    #[instrument(skip(self, graph, metrics), fields(nodes = graph.node_count()))]
    pub fn identify(
        &self,
        graph: &GraphSnapshot,
        metrics: &GraphMetrics,
        top_k: usize,
    ) -> Result<Vec<GapCandidate>> {
        if top_k == 0 {
            return Err(AppError::invalid_field("top_k", "top_k must be at least 1"));
        }
        self.config.validate()?;
        self.config.weights.check_total()?;

        metrics.ensure_matches(graph)?;

        let mut topics: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, paper) in graph.papers().iter().enumerate() {
            for topic in &paper.topics {
                topics.entry(topic.as_str()).or_default().push(index);
            }
        }

        let co_cited: HashSet<(&PaperId, &PaperId)> = metrics
            .co_citations
            .iter()
            .filter(|pair| pair.count >= metrics.co_citation_threshold)
            .map(|pair| (&pair.a, &pair.b))
            .collect();
        let years = YearRange::of(graph);

        let mut candidates: Vec<GapCandidate> = topics
            .into_iter()
            .filter(|(topic, members)| {
                let enough = members.len() >= self.config.min_evidence;
                if !enough {
                    debug!(topic, papers = members.len(), "Topic below minimum evidence");
                }
                enough
            })
            .map(|(topic, members)| self.score_topic(graph, metrics, &co_cited, years, topic, &members))
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        candidates.truncate(top_k);

        record_gaps(candidates.len());
        info!(candidates = candidates.len(), "Research gaps identified");

        Ok(candidates)
    }

    fn score_topic(
        &self,
        graph: &GraphSnapshot,
        metrics: &GraphMetrics,
        co_cited: &HashSet<(&PaperId, &PaperId)>,
        years: Option<YearRange>,
        topic: &str,
        members: &[usize],
    ) -> GapCandidate {
        let n = members.len();

        let average_rank =
            members.iter().map(|&i| metrics.nodes[i].normalized_rank).sum::<f64>() / n as f64;

        let dated: Vec<i32> = members.iter().filter_map(|&i| graph.paper(i).year).collect();
        let recency = match years {
            _ if dated.is_empty() => 0.0,
            Some(range) if range.min == range.max => 1.0,
            Some(range) => {
                dated.iter().filter(|&&year| range.is_recent(year)).count() as f64 / dated.len() as f64
            }
            None => 0.0,
        };

        let mut links = vec![0usize; n];
        let mut linked_pairs = 0;
        for i in 0..n {
            for j in i + 1..n {
                let (a, b) = (members[i], members[j]);
                if self.linked(graph, co_cited, a, b) {
                    linked_pairs += 1;
                    links[i] += 1;
                    links[j] += 1;
                }
            }
        }
        let possible_pairs = n * n.saturating_sub(1) / 2;
        let connectivity = if possible_pairs == 0 {
            0.0
        } else {
            linked_pairs as f64 / possible_pairs as f64
        };

        let signals = TopicSignals {
            paper_count: n,
            average_rank,
            recency,
            connectivity,
        };
        let score = score(&self.config.weights, &signals, graph.node_count());

        let mut evidence: Vec<(usize, &PaperId)> = members
            .iter()
            .enumerate()
            .map(|(k, &i)| (links[k], &graph.paper(i).id))
            .collect();
        evidence.sort();

        GapCandidate {
            topic: topic.to_string(),
            description: format!(
                "{n} papers touch \"{topic}\" but only {linked_pairs} of {possible_pairs} possible pairs cite or are co-cited with each other; {:.0}% of the dated ones are recent",
                recency * 100.0
            ),
            score,
            signals,
            evidence: evidence
                .into_iter()
                .take(self.config.max_evidence)
                .map(|(_, id)| id.clone())
                .collect(),
        }
    }

    /// Direct citation either way, or a qualifying co-citation
    fn linked(
        &self,
        graph: &GraphSnapshot,
        co_cited: &HashSet<(&PaperId, &PaperId)>,
        a: usize,
        b: usize,
    ) -> bool {
        if graph.linked(a, b) {
            return true;
        }
        let (x, y) = (&graph.paper(a).id, &graph.paper(b).id);
        let key = if x <= y { (x, y) } else { (y, x) };
        co_cited.contains(&key)
    }
}

/// Weighted mean of sparsity, size, recency and impact
fn score(weights: &GapWeights, signals: &TopicSignals, node_count: usize) -> f64 {
    let size = if node_count == 0 {
        0.0
    } else {
        1.0 - signals.paper_count as f64 / node_count as f64
    };

    let weighted = weights.sparsity * (1.0 - signals.connectivity)
        + weights.size * size
        + weights.recency * signals.recency
        + weights.impact * signals.average_rank;

    weighted / weights.total()
}
