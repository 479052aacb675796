//! Configuration management for CiteNet
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with CITENET__)
//! - Configuration files (config/default.toml, config/{env}.toml, config/local.toml)
//! - Default values

use crate::errors::{AppError, Result};
use crate::models::Direction;
use chrono::TimeDelta;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    /// Graph construction budget
    #[serde(default)]
    #[validate(nested)]
    pub graph: GraphConfig,

    /// Metrics engine settings
    #[serde(default)]
    #[validate(nested)]
    pub analysis: AnalysisConfig,

    /// Gap identification settings
    #[serde(default)]
    #[validate(nested)]
    pub gaps: GapConfig,

    /// Paper cache settings
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GraphConfig {
    /// Number of breadth-first waves beyond the seeds
    #[serde(default = "default_max_depth")]
    #[validate(range(min = 1))]
    pub max_depth: usize,

    /// Hard cap on graph nodes
    #[serde(default = "default_max_nodes")]
    #[validate(range(min = 1))]
    pub max_nodes: usize,

    /// Which relations to follow while expanding
    #[serde(default)]
    pub direction: Direction,

    /// Relations followed per node and per relation kind
    #[serde(default = "default_max_relations")]
    #[validate(range(min = 1))]
    pub max_relations_per_node: usize,

    /// Concurrent fetches within one wave
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1))]
    pub concurrency: usize,

    /// Fetch failures tolerated before the graph is marked incomplete
    #[serde(default)]
    pub max_fetch_failures: usize,

    /// Overall build deadline in seconds (none = unbounded)
    #[serde(default)]
    #[validate(range(min = 1, max = 604800))]
    pub build_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AnalysisConfig {
    /// Minimum shared citers for two papers to count as co-cited
    #[serde(default = "default_co_citation_threshold")]
    #[validate(range(min = 1))]
    pub co_citation_threshold: u32,

    /// Clusters reported in the metrics
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,

    /// Entries in the most-cited list
    #[serde(default = "default_most_cited")]
    pub most_cited_count: usize,

    /// Key papers listed per cluster
    #[serde(default = "default_key_papers")]
    pub key_papers_per_cluster: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GapConfig {
    /// Candidates returned when the caller does not ask for a number
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1))]
    pub top_k: usize,

    /// Minimum supporting papers for a topic to be considered
    #[serde(default = "default_min_evidence")]
    #[validate(range(min = 1))]
    pub min_evidence: usize,

    /// Evidence identifiers attached to each candidate
    #[serde(default = "default_max_evidence")]
    pub max_evidence: usize,

    #[serde(default)]
    #[validate(nested)]
    pub weights: GapWeights,
}

/// Weights of the gap score components
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GapWeights {
    /// Reward for sparse cross-citation among topic papers
    #[serde(default = "default_sparsity_weight")]
    #[validate(range(min = 0.0))]
    pub sparsity: f64,

    /// Reward for topics that are not saturated across the graph
    #[serde(default = "default_size_weight")]
    #[validate(range(min = 0.0))]
    pub size: f64,

    /// Reward for recent activity
    #[serde(default = "default_recency_weight")]
    #[validate(range(min = 0.0))]
    pub recency: f64,

    /// Reward for citation impact of the topic papers
    #[serde(default = "default_impact_weight")]
    #[validate(range(min = 0.0))]
    pub impact: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CacheConfig {
    /// Maximum cached papers
    #[serde(default = "default_cache_capacity")]
    #[validate(range(min = 1))]
    pub capacity: usize,

    /// Entries older than this are re-fetched
    #[serde(default = "default_refresh_after_hours")]
    #[validate(range(max = 87600))]
    pub refresh_after_hours: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or an EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name attached to log lines
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_max_depth() -> usize { 1 }
fn default_max_nodes() -> usize { 50 }
fn default_max_relations() -> usize { 20 }
fn default_concurrency() -> usize { 8 }
fn default_co_citation_threshold() -> u32 { 2 }
fn default_max_clusters() -> usize { 10 }
fn default_most_cited() -> usize { 5 }
fn default_key_papers() -> usize { 3 }
fn default_top_k() -> usize { 5 }
fn default_min_evidence() -> usize { 2 }
fn default_max_evidence() -> usize { 10 }
fn default_sparsity_weight() -> f64 { 0.4 }
fn default_size_weight() -> f64 { 0.25 }
fn default_recency_weight() -> f64 { 0.25 }
fn default_impact_weight() -> f64 { 0.1 }
fn default_cache_capacity() -> usize { 1024 }
fn default_refresh_after_hours() -> u64 { 24 }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "citenet".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("CITENET_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., CITENET__GRAPH__MAX_DEPTH=2
            .add_source(
                Environment::with_prefix("CITENET")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file, then the environment
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("CITENET")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate every section, mapping failures to `InvalidConfiguration`
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        self.gaps.weights.check_total()?;
        self.cache.refresh_after()?;
        Ok(self)
    }
}

impl GraphConfig {
    /// Build deadline as Duration
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }
}

impl GapWeights {
    pub fn total(&self) -> f64 {
        self.sparsity + self.size + self.recency + self.impact
    }

    /// At least one weight must be positive for scores to be defined
    pub fn check_total(&self) -> Result<()> {
        if self.total() > 0.0 && self.total().is_finite() {
            Ok(())
        } else {
            Err(AppError::invalid_field(
                "weights",
                "gap weights must sum to a positive, finite value",
            ))
        }
    }
}

impl CacheConfig {
    /// Staleness horizon as a chrono duration
    pub fn refresh_after(&self) -> Result<TimeDelta> {
        i64::try_from(self.refresh_after_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .ok_or_else(|| {
                AppError::invalid_field("refresh_after_hours", "refresh horizon is out of range")
            })
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            direction: Direction::default(),
            max_relations_per_node: default_max_relations(),
            concurrency: default_concurrency(),
            max_fetch_failures: 0,
            build_timeout_secs: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            co_citation_threshold: default_co_citation_threshold(),
            max_clusters: default_max_clusters(),
            most_cited_count: default_most_cited(),
            key_papers_per_cluster: default_key_papers(),
        }
    }
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_evidence: default_min_evidence(),
            max_evidence: default_max_evidence(),
            weights: GapWeights::default(),
        }
    }
}

impl Default for GapWeights {
    fn default() -> Self {
        Self {
            sparsity: default_sparsity_weight(),
            size: default_size_weight(),
            recency: default_recency_weight(),
            impact: default_impact_weight(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            refresh_after_hours: default_refresh_after_hours(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}
