//! CiteNet Analysis
//!
//! Citation network analysis and research gap identification:
//! - Normalization of provider records into canonical papers
//! - Bounded breadth-first citation graph construction
//! - Graph metrics, PageRank authority and co-citation clusters
//! - Research gap candidates ranked by topic signals
//! - A transport-neutral export bundle

pub mod citation;
pub mod export;
pub mod gaps;
pub mod graph_metrics;
pub mod normalize;
pub mod tools;

pub use citation::{CorpusFetcher, GraphBuilder, GraphSnapshot, GraphStatus, PaperFetcher, RawRecord};
pub use export::{export, ExportBundle};
pub use gaps::{GapCandidate, GapIdentifier};
pub use graph_metrics::{GraphMetrics, MetricsEngine};
pub use normalize::normalize;
pub use tools::{build_citation_graph, compute_graph_metrics, identify_research_gaps, ResearchTools};
