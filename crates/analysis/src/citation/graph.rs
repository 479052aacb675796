//! Citation graph representation
//!
//! `CitationGraph` is the construction-time graph owned by the builder.
//! `GraphSnapshot` is its frozen arena form: papers in a dense vector,
//! edges and adjacency as sorted index lists.

use super::GraphStatus;
use citenet_common::models::{Paper, PaperId};
use std::collections::{BTreeSet, HashMap};

/// Result of adding a paper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted(usize),
    /// Already present; `refreshed` when the citation count changed
    Merged { index: usize, refreshed: bool },
}

impl MergeOutcome {
    pub fn index(&self) -> usize {
        match *self {
            MergeOutcome::Inserted(index) => index,
            MergeOutcome::Merged { index, .. } => index,
        }
    }
}

/// Result of adding an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    /// Self loop or duplicate
    Ignored,
    /// An endpoint is not in the graph yet
    Unresolved,
}

/// Mutable citation graph
#[derive(Debug, Default)]
pub struct CitationGraph {
    papers: Vec<Paper>,

    /// Discovery depth per node
    depths: Vec<usize>,

    /// Key each node was first requested under
    keys: Vec<PaperId>,

    /// Every known identifier form -> node index
    aliases: HashMap<PaperId, usize>,

    /// (citer, cited)
    edges: BTreeSet<(usize, usize)>,
}

impl CitationGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve any identifier form to a node index
    pub fn resolve(&self, id: &PaperId) -> Option<usize> {
        self.aliases.get(id).copied()
    }

    /// Node a paper would merge into, if any
    pub fn resolve_paper(&self, paper: &Paper) -> Option<usize> {
        self.resolve(&paper.id)
            .or_else(|| paper.external_ids.iter().find_map(|id| self.resolve(id)))
    }

    /// Add a fetched paper at the given depth, merging on any shared identifier
    pub fn add_paper(&mut self, paper: Paper, depth: usize, requested: &PaperId) -> MergeOutcome {
        let existing = self.resolve(requested).or_else(|| self.resolve_paper(&paper));

        let outcome = match existing {
            Some(index) => {
                let refreshed = self.papers[index].refresh_from(&paper);
                MergeOutcome::Merged { index, refreshed }
            }
            None => {
                let index = self.papers.len();
                self.papers.push(paper.clone());
                self.depths.push(depth);
                self.keys.push(requested.clone());
                MergeOutcome::Inserted(index)
            }
        };

        let index = outcome.index();
        self.aliases.insert(requested.clone(), index);
        for id in paper.external_ids.iter().chain(std::iter::once(&paper.id)) {
            self.aliases.entry(id.clone()).or_insert(index);
        }

        outcome
    }

    /// Add a citation edge between two identifiers
    pub fn add_edge(&mut self, citer: &PaperId, cited: &PaperId) -> EdgeInsert {
        match (self.resolve(citer), self.resolve(cited)) {
            (Some(from), Some(to)) if from == to => EdgeInsert::Ignored,
            (Some(from), Some(to)) => {
                if self.edges.insert((from, to)) {
                    EdgeInsert::Added
                } else {
                    EdgeInsert::Ignored
                }
            }
            _ => EdgeInsert::Unresolved,
        }
    }

    pub fn paper(&self, index: usize) -> &Paper {
        &self.papers[index]
    }

    pub fn depth(&self, index: usize) -> usize {
        self.depths[index]
    }

    /// Key to use when fetching this node again
    pub fn key(&self, index: usize) -> &PaperId {
        &self.keys[index]
    }

    pub fn node_count(&self) -> usize {
        self.papers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Freeze into an immutable snapshot
    pub fn freeze(self, status: GraphStatus) -> GraphSnapshot {
        let n = self.papers.len();
        let edges: Vec<(usize, usize)> = self.edges.into_iter().collect();

        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];
        for &(from, to) in &edges {
            outgoing[from].push(to);
            incoming[to].push(from);
        }
        // BTreeSet order already sorts outgoing lists; incoming needs a pass
        for list in &mut incoming {
            list.sort_unstable();
        }

        GraphSnapshot {
            papers: self.papers,
            depths: self.depths,
            index: self.aliases,
            edges,
            outgoing,
            incoming,
            status,
        }
    }
}

/// Immutable citation graph with dense node indices
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    papers: Vec<Paper>,
    depths: Vec<usize>,
    index: HashMap<PaperId, usize>,
    edges: Vec<(usize, usize)>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    status: GraphStatus,
}

impl GraphSnapshot {
    /// Papers in BFS insertion order
    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn paper(&self, index: usize) -> &Paper {
        &self.papers[index]
    }

    pub fn depth(&self, index: usize) -> usize {
        self.depths[index]
    }

    /// Index of a node by any of its identifier forms
    pub fn index_of(&self, id: &PaperId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &PaperId) -> bool {
        self.index.contains_key(id)
    }

    /// Sorted (citer, cited) pairs
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Papers cited by this paper
    pub fn references(&self, index: usize) -> &[usize] {
        &self.outgoing[index]
    }

    /// Papers citing this paper
    pub fn citations(&self, index: usize) -> &[usize] {
        &self.incoming[index]
    }

    pub fn has_edge(&self, citer: usize, cited: usize) -> bool {
        self.outgoing[citer].binary_search(&cited).is_ok()
    }

    /// Edge in either direction
    pub fn linked(&self, a: usize, b: usize) -> bool {
        self.has_edge(a, b) || self.has_edge(b, a)
    }

    pub fn node_count(&self) -> usize {
        self.papers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn status(&self) -> &GraphStatus {
        &self.status
    }

    pub fn is_incomplete(&self) -> bool {
        self.status.incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citenet_common::models::SourceTag;

    fn paper(key: &str) -> Paper {
        Paper::new(PaperId::parse(key), format!("Paper {key}"), SourceTag::SemanticScholar)
    }

    fn id(key: &str) -> PaperId {
        PaperId::parse(key)
    }

    #[test]
    fn test_graph_construction() {
        let mut graph = CitationGraph::new();

        graph.add_paper(paper("a"), 0, &id("a"));
        graph.add_paper(paper("b"), 1, &id("b"));
        graph.add_paper(paper("c"), 1, &id("c"));

        // A cites B, B cites C
        assert_eq!(graph.add_edge(&id("a"), &id("b")), EdgeInsert::Added);
        assert_eq!(graph.add_edge(&id("b"), &id("c")), EdgeInsert::Added);

        let snapshot = graph.freeze(GraphStatus::default());
        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(snapshot.references(0), &[1]);
        assert_eq!(snapshot.citations(1), &[0]);
        assert_eq!(snapshot.references(1), &[2]);
        assert!(snapshot.linked(2, 1));
        assert!(!snapshot.linked(0, 2));
    }

    #[test]
    fn test_self_loops_and_duplicates_ignored() {
        let mut graph = CitationGraph::new();
        graph.add_paper(paper("a"), 0, &id("a"));
        graph.add_paper(paper("b"), 0, &id("b"));

        assert_eq!(graph.add_edge(&id("a"), &id("a")), EdgeInsert::Ignored);
        assert_eq!(graph.add_edge(&id("a"), &id("b")), EdgeInsert::Added);
        assert_eq!(graph.add_edge(&id("a"), &id("b")), EdgeInsert::Ignored);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_edge_to_missing_node_is_unresolved() {
        let mut graph = CitationGraph::new();
        graph.add_paper(paper("a"), 0, &id("a"));

        assert_eq!(graph.add_edge(&id("a"), &id("missing")), EdgeInsert::Unresolved);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_merge_keeps_one_node_with_later_count() {
        let mut graph = CitationGraph::new();
        let doi = id("10.1000/x");

        let first = Paper::new(doi.clone(), "X", SourceTag::Crossref).with_citation_count(10);
        let later = Paper::new(doi.clone(), "X", SourceTag::Crossref).with_citation_count(12);

        assert_eq!(graph.add_paper(first, 0, &doi), MergeOutcome::Inserted(0));
        assert_eq!(
            graph.add_paper(later, 1, &doi),
            MergeOutcome::Merged { index: 0, refreshed: true }
        );
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.paper(0).citation_count, 12);
        assert_eq!(graph.depth(0), 0);
    }

    #[test]
    fn test_merge_through_alias() {
        let mut graph = CitationGraph::new();
        let s2 = id("s2:abc");

        let mut from_s2 = Paper::new(id("10.1000/y"), "Y", SourceTag::SemanticScholar);
        from_s2.external_ids.insert(s2.clone());
        graph.add_paper(from_s2, 0, &s2);

        // Requested by DOI later: same node
        let from_crossref = Paper::new(id("10.1000/y"), "Y", SourceTag::Crossref);
        let outcome = graph.add_paper(from_crossref, 1, &id("10.1000/y"));

        assert_eq!(outcome.index(), 0);
        assert_eq!(graph.key(0), &s2);

        let snapshot = graph.freeze(GraphStatus::default());
        assert_eq!(snapshot.index_of(&s2), Some(0));
        assert_eq!(snapshot.index_of(&id("https://doi.org/10.1000/Y")), Some(0));
    }
}
