//! Co-citation counting and union-find clustering over dense node indices

use crate::citation::GraphSnapshot;
use std::collections::BTreeMap;

/// Disjoint-set forest with path compression and union by size
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Returns false when both were already in one set
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    pub fn set_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }
}

/// Shared-citer counts for every co-cited pair, keyed `(low, high)`
pub fn count_pairs(graph: &GraphSnapshot) -> BTreeMap<(usize, usize), u32> {
    let mut pairs = BTreeMap::new();

    for citer in 0..graph.node_count() {
        let cited = graph.references(citer);
        for (i, &a) in cited.iter().enumerate() {
            for &b in &cited[i + 1..] {
                *pairs.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
    }

    pairs
}

/// One connected component of the qualifying co-citation pairs
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Node indices, ascending
    pub members: Vec<usize>,
    /// Qualifying pairs inside the component
    pub internal_pairs: usize,
}

impl Component {
    /// Observed internal pairs over possible pairs; 0 for a single node
    pub fn cohesion(&self) -> f64 {
        let n = self.members.len();
        if n < 2 {
            return 0.0;
        }
        let possible = n * (n - 1) / 2;
        self.internal_pairs as f64 / possible as f64
    }
}

/// Union every pair at or above the threshold; every node lands in a component
pub fn components(
    node_count: usize,
    pairs: &BTreeMap<(usize, usize), u32>,
    threshold: u32,
) -> Vec<Component> {
    let mut sets = DisjointSet::new(node_count);
    let qualifying: Vec<(usize, usize)> = pairs
        .iter()
        .filter(|(_, &count)| count >= threshold)
        .map(|(&pair, _)| pair)
        .collect();

    for &(a, b) in &qualifying {
        sets.union(a, b);
    }

    let mut by_root: BTreeMap<usize, Component> = BTreeMap::new();
    for node in 0..node_count {
        let root = sets.find(node);
        by_root
            .entry(root)
            .or_insert_with(|| Component {
                members: Vec::new(),
                internal_pairs: 0,
            })
            .members
            .push(node);
    }
    for &(a, _) in &qualifying {
        let root = sets.find(a);
        if let Some(component) = by_root.get_mut(&root) {
            component.internal_pairs += 1;
        }
    }

    by_root.into_values().collect()
}
