//! Result exporter
//!
//! Flattens a snapshot, its metrics and the ranked gaps into one
//! transport-neutral bundle for the tool-response layer or a renderer.

use crate::citation::{GraphSnapshot, GraphStatus};
use crate::gaps::GapCandidate;
use crate::graph_metrics::{CoCitationCluster, CoCitationPair, GraphMetrics};
use citenet_common::errors::Result;
use citenet_common::models::{PaperId, SourceTag};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Node size for renderers: base plus scaled rank
const VISUAL_WEIGHT_BASE: f64 = 10.0;
const VISUAL_WEIGHT_SCALE: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub status: GraphStatus,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
    pub summary: ExportSummary,
    pub clusters: Vec<CoCitationCluster>,
    pub co_citations: Vec<CoCitationPair>,
    pub gaps: Vec<GapCandidate>,
}

/// Paper fields plus its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub topics: BTreeSet<String>,
    pub source: SourceTag,
    pub depth: usize,
    pub in_degree: usize,
    pub out_degree: usize,
    pub citation_count: u64,
    pub normalized_rank: f64,
    pub authority: f64,
    pub cluster: Option<usize>,
    pub visual_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEdge {
    /// Citing paper
    pub source: PaperId,
    /// Cited paper
    pub target: PaperId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_citations: f64,
    pub year_histogram: BTreeMap<i32, usize>,
    pub undated_papers: usize,
    pub most_cited: Vec<MostCited>,
    pub co_citation_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostCited {
    pub id: PaperId,
    pub title: String,
    pub in_degree: usize,
    pub citation_count: u64,
}

impl ExportBundle {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Build the bundle; metrics from another snapshot fail with `Internal`
pub fn export(
    graph: &GraphSnapshot,
    metrics: &GraphMetrics,
    gaps: &[GapCandidate],
) -> Result<ExportBundle> {
    metrics.ensure_matches(graph)?;

    let nodes = graph
        .papers()
        .iter()
        .zip(&metrics.nodes)
        .map(|(paper, node)| ExportNode {
            id: paper.id.clone(),
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            year: paper.year,
            venue: paper.venue.clone(),
            topics: paper.topics.clone(),
            source: paper.source,
            depth: node.depth,
            in_degree: node.in_degree,
            out_degree: node.out_degree,
            citation_count: paper.citation_count,
            normalized_rank: node.normalized_rank,
            authority: node.authority,
            cluster: node.cluster,
            visual_weight: VISUAL_WEIGHT_BASE + node.normalized_rank * VISUAL_WEIGHT_SCALE,
        })
        .collect();

    let edges = graph
        .edges()
        .iter()
        .map(|&(from, to)| ExportEdge {
            source: graph.paper(from).id.clone(),
            target: graph.paper(to).id.clone(),
        })
        .collect();

    let most_cited = metrics
        .most_cited
        .iter()
        .filter_map(|id| {
            let index = graph.index_of(id)?;
            let paper = graph.paper(index);
            Some(MostCited {
                id: id.clone(),
                title: paper.title.clone(),
                in_degree: metrics.nodes.get(index).map_or(0, |node| node.in_degree),
                citation_count: paper.citation_count,
            })
        })
        .collect();

    Ok(ExportBundle {
        status: graph.status().clone(),
        nodes,
        edges,
        summary: ExportSummary {
            node_count: metrics.node_count,
            edge_count: metrics.edge_count,
            density: metrics.density,
            average_citations: metrics.average_citations,
            year_histogram: metrics.year_histogram.clone(),
            undated_papers: metrics.undated_papers,
            most_cited,
            co_citation_threshold: metrics.co_citation_threshold,
        },
        clusters: metrics.clusters.clone(),
        co_citations: metrics.co_citations.clone(),
        gaps: gaps.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{CitationGraph, IncompleteReason};
    use crate::gaps::GapIdentifier;
    use crate::graph_metrics::MetricsEngine;
    use citenet_common::config::{AnalysisConfig, GapConfig};
    use citenet_common::errors::ErrorCode;
    use citenet_common::models::Paper;

    fn fixture() -> (GraphSnapshot, GraphMetrics, Vec<GapCandidate>) {
        let mut graph = CitationGraph::new();
        for (key, year) in [("a", 2019), ("b", 2020), ("c", 2021)] {
            let id = PaperId::parse(key);
            let paper = Paper::new(id.clone(), format!("Paper {key}"), SourceTag::Crossref)
                .with_year(year)
                .with_authors(["Ada Lovelace"])
                .with_topics(["graphs"]);
            graph.add_paper(paper, 0, &id);
        }
        graph.add_edge(&PaperId::parse("b"), &PaperId::parse("a"));
        graph.add_edge(&PaperId::parse("c"), &PaperId::parse("a"));

        let mut status = GraphStatus::default();
        status.mark(IncompleteReason::Cancelled);
        let snapshot = graph.freeze(status);

        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&snapshot);
        let gaps = GapIdentifier::new(GapConfig::default())
            .identify(&snapshot, &metrics, 5)
            .unwrap();

        (snapshot, metrics, gaps)
    }

    #[test]
    fn test_export_bundle_contents() {
        let (graph, metrics, gaps) = fixture();
        let bundle = export(&graph, &metrics, &gaps).unwrap();

        assert_eq!(bundle.nodes.len(), 3);
        assert_eq!(bundle.edges.len(), 2);
        assert_eq!(bundle.edges[0].target, PaperId::parse("a"));
        assert!(bundle.status.incomplete);
        assert_eq!(bundle.gaps.len(), 1);
        assert_eq!(bundle.summary.most_cited[0].id, PaperId::parse("a"));
        assert_eq!(bundle.summary.most_cited[0].in_degree, 2);

        let a = &bundle.nodes[0];
        assert_eq!(a.normalized_rank, 1.0);
        assert_eq!(a.visual_weight, 50.0);
        assert_eq!(bundle.nodes[1].visual_weight, 10.0);
    }

    #[test]
    fn test_export_is_pure() {
        let (graph, metrics, gaps) = fixture();
        assert_eq!(
            export(&graph, &metrics, &gaps).unwrap(),
            export(&graph, &metrics, &gaps).unwrap()
        );
    }

    #[test]
    fn test_mismatched_metrics_rejected() {
        let (graph, _, gaps) = fixture();

        let mut other = CitationGraph::new();
        let id = PaperId::parse("z");
        other.add_paper(Paper::new(id.clone(), "Other", SourceTag::Crossref), 0, &id);
        let other = other.freeze(GraphStatus::default());
        let foreign = MetricsEngine::new(AnalysisConfig::default()).compute(&other);

        let err = export(&graph, &foreign, &gaps).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_citation_count_read_from_snapshot() {
        let mut graph = CitationGraph::new();
        let id = PaperId::parse("10.1000/a");
        for count in [3, 42] {
            let paper = Paper::new(id.clone(), "A", SourceTag::Crossref).with_citation_count(count);
            graph.add_paper(paper, 0, &id);
        }
        let snapshot = graph.freeze(GraphStatus::default());

        let metrics = MetricsEngine::new(AnalysisConfig::default()).compute(&snapshot);
        let bundle = export(&snapshot, &metrics, &[]).unwrap();

        assert_eq!(bundle.nodes[0].citation_count, 42);
        assert_eq!(bundle.summary.most_cited[0].citation_count, 42);
    }

    #[test]
    fn test_json_shape() {
        let (graph, metrics, gaps) = fixture();
        let bundle = export(&graph, &metrics, &gaps).unwrap();

        let value = bundle.to_value().unwrap();
        assert_eq!(value["nodes"][0]["id"], "s2:a");
        assert_eq!(value["edges"][0]["source"], "s2:b");
        assert_eq!(value["status"]["reasons"][0]["reason"], "cancelled");
        assert_eq!(value["summary"]["year_histogram"]["2020"], 1);

        let json = bundle.to_json().unwrap();
        let parsed: ExportBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.nodes.len(), bundle.nodes.len());
        assert_eq!(parsed.summary.year_histogram, bundle.summary.year_histogram);
    }
}
