//! Entry points for the surrounding tool layer
//!
//! Three calls mirror the three analysis tools, and [`ResearchTools`]
//! chains them into one export bundle.

use crate::citation::{GraphBuilder, GraphSnapshot, PaperFetcher};
use crate::export::{export, ExportBundle};
use crate::gaps::{GapCandidate, GapIdentifier};
use crate::graph_metrics::{GraphMetrics, MetricsEngine};
use citenet_common::cache::PaperCache;
use citenet_common::config::{AnalysisConfig, AppConfig, GapConfig, GraphConfig};
use citenet_common::errors::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use validator::Validate;

/// Build a citation graph from seed identifiers
pub async fn build_citation_graph(
    fetcher: Arc<dyn PaperFetcher>,
    seeds: &[String],
    options: GraphConfig,
    cancel: &CancellationToken,
) -> Result<GraphSnapshot> {
    GraphBuilder::new(fetcher, options).build(seeds, cancel).await
}

/// Compute metrics over a built graph
pub fn compute_graph_metrics(graph: &GraphSnapshot, options: AnalysisConfig) -> GraphMetrics {
    MetricsEngine::new(options).compute(graph)
}

/// Rank research gap candidates
pub fn identify_research_gaps(
    graph: &GraphSnapshot,
    metrics: &GraphMetrics,
    top_k: usize,
    options: GapConfig,
) -> Result<Vec<GapCandidate>> {
    GapIdentifier::new(options).identify(graph, metrics, top_k)
}

/// Full pipeline bound to one fetcher and configuration
pub struct ResearchTools {
    fetcher: Arc<dyn PaperFetcher>,
    config: AppConfig,
    cache: Option<Arc<PaperCache>>,
}

impl ResearchTools {
    pub fn new(fetcher: Arc<dyn PaperFetcher>, config: AppConfig) -> Self {
        Self {
            fetcher,
            config,
            cache: None,
        }
    }

    /// Share a paper cache across runs of this instance
    pub fn with_cache(mut self, cache: Arc<PaperCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build, measure and rank, using the configured `top_k`
    #[instrument(skip(self, seeds, cancel), fields(seeds = seeds.len()))]
    pub async fn analyze(&self, seeds: &[String], cancel: &CancellationToken) -> Result<ExportBundle> {
        self.config.validate()?;
        self.config.gaps.weights.check_total()?;

        let mut builder = GraphBuilder::new(self.fetcher.clone(), self.config.graph.clone());
        if let Some(cache) = &self.cache {
            builder = builder.with_cache(cache.clone());
        }

        let graph = builder.build(seeds, cancel).await?;
        let metrics = compute_graph_metrics(&graph, self.config.analysis.clone());
        let gaps = identify_research_gaps(
            &graph,
            &metrics,
            self.config.gaps.top_k,
            self.config.gaps.clone(),
        )?;

        info!(
            nodes = graph.node_count(),
            clusters = metrics.clusters.len(),
            gaps = gaps.len(),
            incomplete = graph.is_incomplete(),
            "Analysis complete"
        );

        export(&graph, &metrics, &gaps)
    }
}
