//! Graph metrics engine
//!
//! Pure computation over a frozen [`GraphSnapshot`]:
//! - Degree counts and normalized citation rank
//! - PageRank authority
//! - Co-citation pairs and union-find clusters with cohesion
//! - Network statistics (density, average citations, year histogram)
//!
//! Results hold identifiers only; the snapshot stays the owner of papers.

mod cocitation;

pub use cocitation::{components, count_pairs, Component, DisjointSet};

use crate::citation::{GraphSnapshot, PageRankScorer};
use citenet_common::config::AnalysisConfig;
use citenet_common::errors::{AppError, Result};
use citenet_common::models::PaperId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Longest cluster label, in characters
const LABEL_MAX_CHARS: usize = 50;

/// Per-node metrics, in snapshot order
///
/// Paper fields such as the provider citation count stay on the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub id: PaperId,
    pub in_degree: usize,
    pub out_degree: usize,
    /// In-degree over the graph's maximum in-degree
    pub normalized_rank: f64,
    /// PageRank, normalized to 0..1
    pub authority: f64,
    pub depth: usize,
    /// Index into `GraphMetrics::clusters` when the node's cluster was kept
    pub cluster: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoCitationCluster {
    pub id: usize,
    /// Title of the highest-authority member
    pub label: String,
    /// Member ids, ascending
    pub members: Vec<PaperId>,
    pub cohesion: f64,
    pub key_papers: Vec<PaperId>,
}

/// Two papers cited together by at least `count` citers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoCitationPair {
    pub a: PaperId,
    pub b: PaperId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub nodes: Vec<NodeMetrics>,
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    /// Mean in-graph citations per paper
    pub average_citations: f64,
    pub year_histogram: BTreeMap<i32, usize>,
    pub undated_papers: usize,
    pub most_cited: Vec<PaperId>,
    pub clusters: Vec<CoCitationCluster>,
    /// Pairs at or above the threshold, strongest first
    pub co_citations: Vec<CoCitationPair>,
    pub co_citation_threshold: u32,
}

impl GraphMetrics {
    pub fn node(&self, id: &PaperId) -> Option<&NodeMetrics> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Fails with `Internal` unless these metrics were computed over `graph`
    pub fn ensure_matches(&self, graph: &GraphSnapshot) -> Result<()> {
        let matches = self.nodes.len() == graph.node_count()
            && self
                .nodes
                .iter()
                .zip(graph.papers())
                .all(|(node, paper)| node.id == paper.id);

        if matches {
            Ok(())
        } else {
            Err(AppError::Internal {
                message: "metrics were computed for a different graph".to_string(),
            })
        }
    }
}

/// Computes [`GraphMetrics`]
pub struct MetricsEngine {
    config: AnalysisConfig,
    pagerank: PageRankScorer,
}

impl MetricsEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            pagerank: PageRankScorer::default(),
        }
    }

    /// Deterministic: the same snapshot always yields the same metrics
    #[instrument(skip(self, graph), fields(nodes = graph.node_count(), edges = graph.edge_count()))]
    pub fn compute(&self, graph: &GraphSnapshot) -> GraphMetrics {
        let n = graph.node_count();
        let e = graph.edge_count();

        let mut in_degree = vec![0usize; n];
        let mut out_degree = vec![0usize; n];
        for &(from, to) in graph.edges() {
            out_degree[from] += 1;
            in_degree[to] += 1;
        }

        let max_in = in_degree.iter().copied().max().unwrap_or(0);
        let authority = self.pagerank.compute(graph);

        let mut nodes: Vec<NodeMetrics> = (0..n)
            .map(|i| {
                let paper = graph.paper(i);
                NodeMetrics {
                    id: paper.id.clone(),
                    in_degree: in_degree[i],
                    out_degree: out_degree[i],
                    normalized_rank: if max_in == 0 {
                        0.0
                    } else {
                        in_degree[i] as f64 / max_in as f64
                    },
                    authority: authority[i],
                    depth: graph.depth(i),
                    cluster: None,
                }
            })
            .collect();

        let density = if n < 2 {
            0.0
        } else {
            e as f64 / (n as f64 * (n as f64 - 1.0))
        };
        let average_citations = if n == 0 { 0.0 } else { e as f64 / n as f64 };

        let mut year_histogram = BTreeMap::new();
        let mut undated_papers = 0;
        for paper in graph.papers() {
            match paper.year {
                Some(year) => *year_histogram.entry(year).or_insert(0) += 1,
                None => undated_papers += 1,
            }
        }

        let mut by_in_degree: Vec<usize> = (0..n).collect();
        by_in_degree.sort_by(|&a, &b| {
            in_degree[b]
                .cmp(&in_degree[a])
                .then_with(|| graph.paper(a).id.cmp(&graph.paper(b).id))
        });
        let most_cited = by_in_degree
            .into_iter()
            .take(self.config.most_cited_count)
            .map(|i| graph.paper(i).id.clone())
            .collect();

        let threshold = self.config.co_citation_threshold;
        let pairs = count_pairs(graph);

        let mut co_citations: Vec<CoCitationPair> = pairs
            .iter()
            .filter(|(_, &count)| count >= threshold)
            .map(|(&(a, b), &count)| {
                let (a, b) = ordered(graph.paper(a).id.clone(), graph.paper(b).id.clone());
                CoCitationPair { a, b, count }
            })
            .collect();
        co_citations.sort_by(|x, y| {
            y.count
                .cmp(&x.count)
                .then_with(|| x.a.cmp(&y.a))
                .then_with(|| x.b.cmp(&y.b))
        });

        let clusters = self.clusters(graph, &pairs, &authority, &mut nodes);

        debug!(
            clusters = clusters.len(),
            co_cited_pairs = co_citations.len(),
            "Graph metrics computed"
        );

        GraphMetrics {
            nodes,
            node_count: n,
            edge_count: e,
            density,
            average_citations,
            year_histogram,
            undated_papers,
            most_cited,
            clusters,
            co_citations,
            co_citation_threshold: threshold,
        }
    }

    fn clusters(
        &self,
        graph: &GraphSnapshot,
        pairs: &BTreeMap<(usize, usize), u32>,
        authority: &[f64],
        nodes: &mut [NodeMetrics],
    ) -> Vec<CoCitationCluster> {
        let id_of = move |i: usize| &graph.paper(i).id;

        let mut found = components(graph.node_count(), pairs, self.config.co_citation_threshold);
        for component in &mut found {
            component.members.sort_by(|&a, &b| id_of(a).cmp(id_of(b)));
        }

        found.sort_by(|x, y| {
            y.members
                .len()
                .cmp(&x.members.len())
                .then_with(|| y.cohesion().partial_cmp(&x.cohesion()).unwrap_or(Ordering::Equal))
                .then_with(|| id_of(x.members[0]).cmp(id_of(y.members[0])))
        });
        found.truncate(self.config.max_clusters);

        found
            .into_iter()
            .enumerate()
            .map(|(cluster, component)| {
                for &member in &component.members {
                    nodes[member].cluster = Some(cluster);
                }

                let key = PageRankScorer::top(
                    graph,
                    authority,
                    &component.members,
                    self.config.key_papers_per_cluster,
                );
                let label = key
                    .first()
                    .map(|&top| truncate_label(&graph.paper(top).title))
                    .unwrap_or_default();

                CoCitationCluster {
                    id: cluster,
                    label,
                    cohesion: component.cohesion(),
                    members: component.members.iter().map(|&i| id_of(i).clone()).collect(),
                    key_papers: key.into_iter().map(|i| id_of(i).clone()).collect(),
                }
            })
            .collect()
    }
}

fn ordered(a: PaperId, b: PaperId) -> (PaperId, PaperId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn truncate_label(title: &str) -> String {
    if title.chars().count() <= LABEL_MAX_CHARS {
        title.to_string()
    } else {
        let cut: String = title.chars().take(LABEL_MAX_CHARS - 3).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{CitationGraph, GraphStatus};
    use citenet_common::models::{Paper, SourceTag};

    fn snapshot(nodes: &[(&str, Option<i32>)], edges: &[(&str, &str)]) -> GraphSnapshot {
        let mut graph = CitationGraph::new();
        for (key, year) in nodes {
            let id = PaperId::parse(key);
            let mut paper = Paper::new(id.clone(), format!("Paper {key}"), SourceTag::SemanticScholar);
            paper.year = *year;
            graph.add_paper(paper, 0, &id);
        }
        for (from, to) in edges {
            graph.add_edge(&PaperId::parse(from), &PaperId::parse(to));
        }
        graph.freeze(GraphStatus::default())
    }

    fn co_cited() -> GraphSnapshot {
        // x and y both cite a and b; z cites c
        snapshot(
            &[
                ("x", Some(2021)),
                ("y", Some(2022)),
                ("a", Some(2015)),
                ("b", Some(2016)),
                ("c", None),
                ("z", Some(2022)),
            ],
            &[("x", "a"), ("x", "b"), ("y", "a"), ("y", "b"), ("z", "c")],
        )
    }

    #[test]
    fn test_degrees_and_rank() {
        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&co_cited());

        let a = metrics.node(&PaperId::parse("a")).unwrap();
        assert_eq!(a.in_degree, 2);
        assert_eq!(a.normalized_rank, 1.0);

        let c = metrics.node(&PaperId::parse("c")).unwrap();
        assert_eq!(c.normalized_rank, 0.5);

        let x = metrics.node(&PaperId::parse("x")).unwrap();
        assert_eq!(x.out_degree, 2);
        assert_eq!(x.normalized_rank, 0.0);

        assert!(metrics
            .nodes
            .iter()
            .all(|n| (0.0..=1.0).contains(&n.normalized_rank) && (0.0..=1.0).contains(&n.authority)));
    }

    #[test]
    fn test_zero_edge_graph() {
        let graph = snapshot(&[("a", Some(2020)), ("b", None)], &[]);
        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&graph);

        assert!(metrics.nodes.iter().all(|n| n.normalized_rank == 0.0));
        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.average_citations, 0.0);
        assert_eq!(metrics.clusters.len(), 2);
        assert!(metrics.clusters.iter().all(|c| c.members.len() == 1 && c.cohesion == 0.0));
        assert!(metrics.co_citations.is_empty());
    }

    #[test]
    fn test_empty_graph() {
        let graph = snapshot(&[], &[]);
        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&graph);

        assert_eq!(metrics.node_count, 0);
        assert!(metrics.clusters.is_empty());
        assert!(metrics.most_cited.is_empty());
    }

    #[test]
    fn test_network_statistics() {
        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&co_cited());

        assert_eq!(metrics.node_count, 6);
        assert_eq!(metrics.edge_count, 5);
        assert!((metrics.density - 5.0 / 30.0).abs() < 1e-12);
        assert!((metrics.average_citations - 5.0 / 6.0).abs() < 1e-12);
        assert_eq!(metrics.year_histogram.get(&2022), Some(&2));
        assert_eq!(metrics.undated_papers, 1);
        assert_eq!(
            metrics.most_cited[..3],
            [PaperId::parse("a"), PaperId::parse("b"), PaperId::parse("c")]
        );
    }

    #[test]
    fn test_co_citation_clusters() {
        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&co_cited());

        assert_eq!(metrics.co_citations.len(), 1);
        assert_eq!(metrics.co_citations[0].count, 2);

        let top = &metrics.clusters[0];
        assert_eq!(top.members, vec![PaperId::parse("a"), PaperId::parse("b")]);
        assert_eq!(top.cohesion, 1.0);
        assert_eq!(top.key_papers.len(), 2);
        assert!(top.label.starts_with("Paper "));

        // Remaining nodes are singletons ordered by id
        assert_eq!(metrics.clusters.len(), 5);
        assert_eq!(metrics.clusters[1].members, vec![PaperId::parse("c")]);

        let a = metrics.node(&PaperId::parse("a")).unwrap();
        assert_eq!(a.cluster, Some(0));
    }

    #[test]
    fn test_max_clusters_truncates() {
        let config = AnalysisConfig {
            max_clusters: 2,
            ..AnalysisConfig::default()
        };
        let metrics = MetricsEngine::new(config).compute(&co_cited());

        assert_eq!(metrics.clusters.len(), 2);
        let z = metrics.node(&PaperId::parse("z")).unwrap();
        assert_eq!(z.cluster, None);
    }

    #[test]
    fn test_deterministic() {
        let graph = co_cited();
        let engine = MetricsEngine::new(AnalysisConfig::default());

        assert_eq!(engine.compute(&graph), engine.compute(&graph));
        assert_eq!(engine.compute(&graph.clone()), engine.compute(&graph));
    }

    #[test]
    fn test_node_metrics_carry_no_paper_fields() {
        let graph = snapshot(&[("a", Some(2020)), ("b", None)], &[("b", "a")]);
        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&graph);

        let node = serde_json::to_value(&metrics.nodes[0]).unwrap();
        assert_eq!(node["id"], "s2:a");
        assert!(node.get("citation_count").is_none());
        assert!(node.get("title").is_none());
    }

    #[test]
    fn test_label_truncation() {
        let long = "A".repeat(80);
        let label = truncate_label(&long);
        assert_eq!(label.chars().count(), 50);
        assert!(label.ends_with("..."));
        assert_eq!(truncate_label("Short"), "Short");
    }
}
