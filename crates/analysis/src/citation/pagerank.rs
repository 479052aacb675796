//! PageRank-based citation scoring
//!
//! Implements a simplified PageRank over a graph snapshot. Scores are indexed
//! like the snapshot's papers.

use super::GraphSnapshot;
use std::cmp::Ordering;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub damping: f64,

    /// Maximum iterations
    pub max_iterations: usize,

    /// Convergence threshold
    pub epsilon: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            epsilon: 1e-6,
        }
    }
}

/// PageRank scorer for papers
pub struct PageRankScorer {
    config: PageRankConfig,
}

impl PageRankScorer {
    /// Create a new scorer
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    /// Compute authority scores, normalized so the top paper scores 1.0
    pub fn compute(&self, graph: &GraphSnapshot) -> Vec<f64> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let n_f64 = n as f64;
        let damping = self.config.damping;
        let teleport = (1.0 - damping) / n_f64;

        let mut scores = vec![1.0 / n_f64; n];

        for _ in 0..self.config.max_iterations {
            let mut max_diff: f64 = 0.0;

            let next: Vec<f64> = (0..n)
                .map(|node| {
                    // Sum contributions from papers citing this one
                    let citation_sum: f64 = graph
                        .citations(node)
                        .iter()
                        .map(|&citing| scores[citing] / graph.references(citing).len() as f64)
                        .sum();

                    let score = teleport + damping * citation_sum;
                    max_diff = max_diff.max((score - scores[node]).abs());
                    score
                })
                .collect();

            scores = next;

            if max_diff < self.config.epsilon {
                break;
            }
        }

        // Normalize to 0-1 range
        let max_score = scores.iter().copied().fold(0.0f64, f64::max);
        if max_score > 0.0 {
            for score in &mut scores {
                *score /= max_score;
            }
        }

        scores
    }

    /// Top `limit` of the given nodes by score; ties go to the smaller id
    pub fn top(graph: &GraphSnapshot, scores: &[f64], members: &[usize], limit: usize) -> Vec<usize> {
        let mut ranked = members.to_vec();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| graph.paper(a).id.cmp(&graph.paper(b).id))
        });
        ranked.truncate(limit);
        ranked
    }
}

impl Default for PageRankScorer {
    fn default() -> Self {
        Self::new(PageRankConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{CitationGraph, GraphStatus};
    use citenet_common::models::{Paper, PaperId, SourceTag};

    fn snapshot(nodes: &[&str], edges: &[(&str, &str)]) -> GraphSnapshot {
        let mut graph = CitationGraph::new();
        for key in nodes {
            let id = PaperId::parse(key);
            graph.add_paper(Paper::new(id.clone(), *key, SourceTag::SemanticScholar), 0, &id);
        }
        for (from, to) in edges {
            graph.add_edge(&PaperId::parse(from), &PaperId::parse(to));
        }
        graph.freeze(GraphStatus::default())
    }

    #[test]
    fn test_pagerank_basic() {
        // A -> B -> C
        //      ^
        //      D
        // B should have highest score (most citations)
        let graph = snapshot(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("d", "b")]);

        let scores = PageRankScorer::default().compute(&graph);

        assert!(scores[1] > scores[0], "B should rank higher than A");
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(scores.iter().any(|&s| (s - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_pagerank_empty_graph() {
        let graph = snapshot(&[], &[]);
        let scores = PageRankScorer::default().compute(&graph);

        assert!(scores.is_empty());
    }

    #[test]
    fn test_top_breaks_ties_by_id() {
        let graph = snapshot(&["b", "a", "c"], &[]);
        let scores = PageRankScorer::default().compute(&graph);

        // No edges: every score is equal
        let top = PageRankScorer::top(&graph, &scores, &[0, 1, 2], 2);
        assert_eq!(top, vec![1, 0]);
    }
}
