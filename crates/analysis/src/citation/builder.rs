//! Breadth-first citation graph builder
//!
//! Wave 0 fetches the seed records. Wave `d` fetches the relations of every
//! node discovered at depth `d - 1`, then the records of the new keys those
//! relations name. Fetches inside a wave run concurrently; their results are
//! merged in request order by this single owner once the whole wave is in,
//! so a cancelled wave leaves no trace in the graph.

use super::fetch::PaperFetcher;
use super::graph::{CitationGraph, EdgeInsert, MergeOutcome};
use super::{GraphSnapshot, GraphStatus, IncompleteReason, SkipReason, SkippedNode, UnexpandedNode};
use crate::normalize::normalize;
use citenet_common::cache::{CacheLookup, CachedPaper, PaperCache};
use citenet_common::config::GraphConfig;
use citenet_common::errors::{AppError, Result};
use citenet_common::metrics::{record_build, FetchTimer};
use citenet_common::models::{Direction, Paper, PaperId, Relation, RelationKind};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// (citer, cited) waiting for both endpoints to enter the graph
type PendingEdges = BTreeSet<(PaperId, PaperId)>;

struct RecordFetch {
    key: PaperId,
    outcome: std::result::Result<Paper, SkipReason>,
}

struct RelationFetch {
    node: usize,
    /// Followed relations after direction filter and fan-out cap
    relations: Vec<Relation>,
    error: Option<String>,
}

struct Expansion {
    relations: Vec<RelationFetch>,
    records: Vec<RecordFetch>,
    truncated: bool,
}

#[derive(Debug, Clone, Copy)]
enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

impl From<Interruption> for IncompleteReason {
    fn from(interruption: Interruption) -> Self {
        match interruption {
            Interruption::Cancelled => IncompleteReason::Cancelled,
            Interruption::DeadlineExceeded => IncompleteReason::DeadlineExceeded,
        }
    }
}

/// Builds bounded citation graphs from seed identifiers
pub struct GraphBuilder {
    fetcher: Arc<dyn PaperFetcher>,
    config: GraphConfig,
    cache: Option<Arc<PaperCache>>,
}

impl GraphBuilder {
    pub fn new(fetcher: Arc<dyn PaperFetcher>, config: GraphConfig) -> Self {
        Self {
            fetcher,
            config,
            cache: None,
        }
    }

    /// Serve fetches from an explicit cache
    pub fn with_cache(mut self, cache: Arc<PaperCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn validate(&self, seeds: &[String]) -> Result<()> {
        self.config.validate()?;

        if seeds.iter().all(|seed| seed.trim().is_empty()) {
            return Err(AppError::invalid_field(
                "seeds",
                "at least one seed identifier is required",
            ));
        }
        Ok(())
    }

    /// Build a citation graph
    ///
    /// Options are validated before any fetch. Node-level failures are
    /// recorded in the returned status, never raised.
    #[instrument(
        skip(self, seeds, cancel),
        fields(
            fetcher = self.fetcher.name(),
            seeds = seeds.len(),
            max_depth = self.config.max_depth,
            max_nodes = self.config.max_nodes
        )
    )]
    pub async fn build(&self, seeds: &[String], cancel: &CancellationToken) -> Result<GraphSnapshot> {
        self.validate(seeds)?;

        let started = std::time::Instant::now();
        let deadline = match self.config.build_timeout() {
            Some(timeout) => Some(Instant::now().checked_add(timeout).ok_or_else(|| {
                AppError::invalid_field("build_timeout_secs", "build timeout is out of range")
            })?),
            None => None,
        };

        let mut graph = CitationGraph::new();
        let mut status = GraphStatus::default();
        let mut pending = PendingEdges::new();

        let mut seen = HashSet::new();
        let mut seed_keys: Vec<PaperId> = seeds
            .iter()
            .filter(|seed| !seed.trim().is_empty())
            .map(|seed| PaperId::parse(seed))
            .filter(|key| seen.insert(key.clone()))
            .collect();
        if seed_keys.len() > self.config.max_nodes {
            seed_keys.truncate(self.config.max_nodes);
            status.truncated = true;
        }

        info!("Building citation graph");

        let mut interrupted = None;
        let seeded = interruptible(cancel, deadline, self.fetch_records(seed_keys)).await;
        let mut layer = match seeded {
            Ok(records) => {
                let layer = self.merge_records(&mut graph, &mut status, &mut pending, records, 0);
                resolve_pending(&mut graph, &mut pending);
                status.waves_completed += 1;
                layer
            }
            Err(interruption) => {
                interrupted = Some(interruption);
                Vec::new()
            }
        };

        for depth in 1..=self.config.max_depth {
            if interrupted.is_some() || layer.is_empty() {
                break;
            }

            let budget = self.config.max_nodes.saturating_sub(graph.node_count());
            if budget == 0 {
                debug!(depth, "Node budget exhausted");
                break;
            }

            let expanded = interruptible(cancel, deadline, self.expand(&graph, &layer, budget)).await;
            match expanded {
                Ok(expansion) => {
                    status.truncated |= expansion.truncated;
                    self.merge_relations(&graph, &mut status, &mut pending, expansion.relations);
                    layer = self.merge_records(&mut graph, &mut status, &mut pending, expansion.records, depth);
                    resolve_pending(&mut graph, &mut pending);
                    status.waves_completed += 1;

                    info!(
                        depth,
                        nodes = graph.node_count(),
                        edges = graph.edge_count(),
                        "Wave completed"
                    );
                }
                Err(interruption) => interrupted = Some(interruption),
            }
        }

        if let Some(interruption) = interrupted {
            warn!(?interruption, "Build interrupted, in-flight wave discarded");
            status.mark(interruption.into());
        }

        status.dropped_edges = pending.len();
        if status.fetch_failures > self.config.max_fetch_failures {
            status.mark(IncompleteReason::FetchFailures {
                count: status.fetch_failures,
                threshold: self.config.max_fetch_failures,
            });
        }

        record_build(started.elapsed().as_secs_f64(), graph.node_count(), status.incomplete);

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            incomplete = status.incomplete,
            truncated = status.truncated,
            fetch_failures = status.fetch_failures,
            dropped_edges = status.dropped_edges,
            "Citation graph built"
        );

        Ok(graph.freeze(status))
    }

    /// Relations of one layer, then the records of newly named keys
    async fn expand(&self, graph: &CitationGraph, layer: &[usize], budget: usize) -> Expansion {
        let jobs: Vec<(usize, PaperId, Paper)> = layer
            .iter()
            .map(|&node| (node, graph.key(node).clone(), graph.paper(node).clone()))
            .collect();

        let relations: Vec<RelationFetch> = stream::iter(jobs)
            .map(|(node, key, paper)| self.fetch_relations(node, key, paper))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut seen = HashSet::new();
        let mut frontier = Vec::new();
        for fetch in &relations {
            for relation in &fetch.relations {
                let key = PaperId::parse(&relation.id);
                if graph.resolve(&key).is_none() && seen.insert(key.clone()) {
                    frontier.push(key);
                }
            }
        }

        // Aliases of one paper can sit in the frontier under different keys;
        // a slot is only spent once a record proves to be a new paper.
        let mut candidates = frontier.into_iter();
        let mut claimed: HashSet<PaperId> = HashSet::new();
        let mut records = Vec::new();
        let mut slots = budget;

        while slots > 0 {
            let batch: Vec<PaperId> = candidates.by_ref().take(slots).collect();
            if batch.is_empty() {
                break;
            }
            slots -= batch.len();

            let fetched = self.fetch_records(batch).await;
            for fetch in &fetched {
                let Ok(paper) = &fetch.outcome else {
                    continue;
                };
                let aliases: Vec<&PaperId> = std::iter::once(&fetch.key)
                    .chain(std::iter::once(&paper.id))
                    .chain(&paper.external_ids)
                    .collect();

                let known = graph.resolve_paper(paper).is_some()
                    || aliases.iter().any(|alias| claimed.contains(*alias));
                if known {
                    slots += 1;
                }
                claimed.extend(aliases.into_iter().cloned());
            }
            records.extend(fetched);
        }

        let unfetched = candidates.count();
        let truncated = unfetched > 0;
        if truncated {
            debug!(unfetched, budget, "Frontier truncated");
        }

        Expansion {
            relations,
            records,
            truncated,
        }
    }

    async fn fetch_records(&self, keys: Vec<PaperId>) -> Vec<RecordFetch> {
        stream::iter(keys)
            .map(|key| self.fetch_record(key))
            .buffered(self.config.concurrency)
            .collect()
            .await
    }

    async fn fetch_record(&self, key: PaperId) -> RecordFetch {
        let cached = match &self.cache {
            Some(cache) => cache.lookup(&key).await,
            None => CacheLookup::Miss,
        };
        if let CacheLookup::Fresh(entry) = cached {
            return RecordFetch {
                key,
                outcome: Ok(entry.paper),
            };
        }

        let timer = FetchTimer::start("paper");
        let outcome = match self.fetcher.fetch_paper(key.as_str()).await {
            Ok(Some(raw)) => {
                timer.finish("ok");
                match normalize(&raw.record, raw.source) {
                    Ok(paper) => {
                        if let Some(cache) = &self.cache {
                            cache.insert(key.clone(), paper.clone(), None).await;
                        }
                        Ok(paper)
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Skipping malformed record");
                        Err(SkipReason::Malformed(e.to_string()))
                    }
                }
            }
            Ok(None) => {
                timer.finish("not_found");
                debug!(key = %key, "Paper not found");
                Err(SkipReason::NotFound)
            }
            Err(e) => {
                timer.finish("error");
                match cached {
                    CacheLookup::Stale(entry) => {
                        warn!(key = %key, error = %e, "Fetch failed, using stale cache entry");
                        Ok(entry.paper)
                    }
                    _ => {
                        warn!(key = %key, error = %e, "Fetch failed");
                        Err(SkipReason::FetchFailed(e.to_string()))
                    }
                }
            }
        };

        RecordFetch { key, outcome }
    }

    async fn fetch_relations(&self, node: usize, key: PaperId, paper: Paper) -> RelationFetch {
        let cached = match &self.cache {
            Some(cache) => cache.lookup(&key).await,
            None => CacheLookup::Miss,
        };

        let fetched = match cached {
            CacheLookup::Fresh(CachedPaper {
                relations: Some(relations),
                ..
            }) => Ok(relations),
            cached => {
                let timer = FetchTimer::start("references");
                match self.fetcher.fetch_references(key.as_str()).await {
                    Ok(relations) => {
                        timer.finish("ok");
                        if let Some(cache) = &self.cache {
                            cache
                                .insert(key.clone(), paper.clone(), Some(relations.clone()))
                                .await;
                        }
                        Ok(relations)
                    }
                    Err(e) => {
                        timer.finish("error");
                        match cached {
                            CacheLookup::Stale(CachedPaper {
                                relations: Some(relations),
                                ..
                            }) => {
                                warn!(key = %key, error = %e, "Relations fetch failed, using stale cache entry");
                                Ok(relations)
                            }
                            _ => {
                                warn!(key = %key, error = %e, "Relations fetch failed");
                                Err(e.to_string())
                            }
                        }
                    }
                }
            }
        };

        let (fetched, error) = match fetched {
            Ok(relations) => (relations, None),
            Err(message) => (Vec::new(), Some(message)),
        };

        RelationFetch {
            node,
            relations: select_relations(
                fetched,
                declared_relations(&paper),
                self.config.direction,
                self.config.max_relations_per_node,
            ),
            error,
        }
    }

    fn merge_relations(
        &self,
        graph: &CitationGraph,
        status: &mut GraphStatus,
        pending: &mut PendingEdges,
        relations: Vec<RelationFetch>,
    ) {
        for fetch in relations {
            let node_id = &graph.paper(fetch.node).id;

            if let Some(message) = fetch.error {
                status.fetch_failures += 1;
                status.unexpanded.push(UnexpandedNode {
                    id: node_id.clone(),
                    message,
                });
            }

            for relation in &fetch.relations {
                push_edge(pending, node_id, relation);
            }
        }
    }

    /// Merge one wave of records; returns the indices of new nodes
    fn merge_records(
        &self,
        graph: &mut CitationGraph,
        status: &mut GraphStatus,
        pending: &mut PendingEdges,
        records: Vec<RecordFetch>,
        depth: usize,
    ) -> Vec<usize> {
        let mut layer = Vec::new();

        for fetch in records {
            let paper = match fetch.outcome {
                Ok(paper) => paper,
                Err(reason) => {
                    if reason.is_fetch_failure() {
                        status.fetch_failures += 1;
                    }
                    status.skipped.push(SkippedNode {
                        key: fetch.key,
                        reason,
                    });
                    continue;
                }
            };

            let known = graph.resolve(&fetch.key).or_else(|| graph.resolve_paper(&paper));
            if known.is_none() && graph.node_count() >= self.config.max_nodes {
                status.truncated = true;
                continue;
            }

            let node_id = paper.id.clone();
            let declared = declared_relations(&paper);

            match graph.add_paper(paper, depth, &fetch.key) {
                MergeOutcome::Inserted(index) => layer.push(index),
                MergeOutcome::Merged { index, refreshed } => {
                    debug!(key = %fetch.key, node = %graph.paper(index).id, refreshed, "Merged duplicate paper");
                }
            }

            for relation in &declared {
                push_edge(pending, &node_id, relation);
            }
        }

        layer
    }
}

/// Run one wave unless cancellation or the deadline comes first
async fn interruptible<T>(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    wave: impl Future<Output = T>,
) -> std::result::Result<T, Interruption> {
    let expired = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interruption::Cancelled),
        _ = expired => Err(Interruption::DeadlineExceeded),
        out = wave => Ok(out),
    }
}

fn resolve_pending(graph: &mut CitationGraph, pending: &mut PendingEdges) {
    pending.retain(|(citer, cited)| graph.add_edge(citer, cited) == EdgeInsert::Unresolved);
}

fn push_edge(pending: &mut PendingEdges, node: &PaperId, relation: &Relation) {
    let other = PaperId::parse(&relation.id);
    let edge = match relation.kind {
        RelationKind::Cites => (node.clone(), other),
        RelationKind::CitedBy => (other, node.clone()),
    };
    if edge.0 != edge.1 {
        pending.insert(edge);
    }
}

/// Relations a record itself declares
fn declared_relations(paper: &Paper) -> Vec<Relation> {
    paper
        .references
        .iter()
        .map(Relation::cites)
        .chain(paper.cited_by.iter().map(Relation::cited_by))
        .collect()
}

/// Direction filter, dedup, and a per-kind fan-out cap; fetched relations first
fn select_relations(
    fetched: Vec<Relation>,
    declared: Vec<Relation>,
    direction: Direction,
    cap: usize,
) -> Vec<Relation> {
    let mut seen = HashSet::new();
    let mut cites = 0;
    let mut cited_by = 0;
    let mut selected = Vec::new();

    for relation in fetched.into_iter().chain(declared) {
        if relation.id.trim().is_empty() || !direction.follows(relation.kind) {
            continue;
        }
        if !seen.insert((relation.kind, PaperId::parse(&relation.id))) {
            continue;
        }

        let count = match relation.kind {
            RelationKind::Cites => &mut cites,
            RelationKind::CitedBy => &mut cited_by,
        };
        if *count < cap {
            *count += 1;
            selected.push(relation);
        }
    }

    selected
}
