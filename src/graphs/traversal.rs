//! Read-only searches over the graph.
//!
//! None of these functions mutate the graph, so they can run concurrently from many threads on a
//! shared reference. Every search that can blow up on cyclic or highly branched input is bounded,
//! and hitting a bound is reported as [`SearchOutcome::Aborted`] instead of a partial result.

use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::config::{DistanceSearch, PathSearchCaps, SearchLimits};
use crate::graphs::{node_index, NodeId, SequenceDistanceGraph, SequenceGraphPath};

/// A node reached during a bounded search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeVisitor {
    pub node: NodeId,

    /// Sequence length accumulated from the seed, excluding the seed itself
    pub dist: u32,

    /// Number of links traversed from the seed
    pub path_length: u32,
}

impl NodeVisitor {
    pub fn new(node: NodeId, dist: u32, path_length: u32) -> Self {
        NodeVisitor { node, dist, path_length }
    }

    pub fn seed(node: NodeId) -> Self {
        Self::new(node, 0, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    IterationLimit,
    TooManyEntries,
    TooManyPaths,
    LoopDetected,
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::IterationLimit => write!(f, "iteration limit reached"),
            Self::TooManyEntries => write!(f, "too many work list entries"),
            Self::TooManyPaths => write!(f, "too many paths"),
            Self::LoopDetected => write!(f, "loop detected"),
        }
    }
}

/// Result of a search that may give up on overly complex regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    Complete(T),
    Aborted(AbortReason),
}

impl<T> SearchOutcome<T> {
    pub fn complete(self) -> Option<T> {
        match self {
            Self::Complete(v) => Some(v),
            Self::Aborted(_) => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitOrder {
    BreadthFirst,
    DepthFirst,
}

impl SequenceDistanceGraph {
    /// Nodes reachable forward from `seed`, visiting closest first.
    ///
    /// A node seen before is visited again when reached with strictly fewer links or strictly
    /// less sequence, so reported distances are not guaranteed minimal. Nodes in `tabu` are
    /// neither visited nor reported. The seed is not part of the result.
    pub fn breadth_first_search(
        &self,
        seed: NodeVisitor,
        limits: &SearchLimits,
        tabu: &FxHashSet<NodeId>,
    ) -> SearchOutcome<Vec<NodeVisitor>> {
        self.bounded_search(seed, limits, tabu, VisitOrder::BreadthFirst)
    }

    /// Same as [`Self::breadth_first_search`], following one branch to its end first.
    pub fn depth_first_search(
        &self,
        seed: NodeVisitor,
        limits: &SearchLimits,
        tabu: &FxHashSet<NodeId>,
    ) -> SearchOutcome<Vec<NodeVisitor>> {
        self.bounded_search(seed, limits, tabu, VisitOrder::DepthFirst)
    }

    fn bounded_search(
        &self,
        seed: NodeVisitor,
        limits: &SearchLimits,
        tabu: &FxHashSet<NodeId>,
        order: VisitOrder,
    ) -> SearchOutcome<Vec<NodeVisitor>> {
        let mut to_visit = VecDeque::from([seed]);
        let mut visited: FxHashMap<NodeId, (u32, u32)> = FxHashMap::default();
        let mut iterations = 0usize;

        while let Some(active) = match order {
            VisitOrder::BreadthFirst => to_visit.pop_front(),
            VisitOrder::DepthFirst => to_visit.pop_back(),
        } {
            iterations += 1;
            if iterations > limits.max_iterations {
                warn!("Search from {} gave up after {} iterations", seed.node, limits.max_iterations);
                return SearchOutcome::Aborted(AbortReason::IterationLimit);
            }

            if tabu.contains(&active.node) || !limits.admits(&active) {
                continue;
            }

            if let Some(&(dist, path_length)) = visited.get(&active.node) {
                if path_length <= active.path_length && dist <= active.dist {
                    continue;
                }
            }

            visited.insert(active.node, (active.dist, active.path_length));
            for l in self.fw_links_iter(active.node) {
                to_visit.push_back(NodeVisitor {
                    node: l.dest,
                    dist: active.dist.saturating_add(self.get_node_size(l.dest) as u32),
                    path_length: active.path_length + 1,
                });
            }
        }

        let mut result: Vec<_> = visited.into_iter()
            .filter(|&(_, (_, path_length))| path_length > 0)
            .map(|(node, (dist, path_length))| NodeVisitor { node, dist, path_length })
            .collect();
        result.sort_unstable();

        SearchOutcome::Complete(result)
    }

    /// Neighbourhood of `seeds`, explored in both directions.
    ///
    /// Every reached node is explored again from both of its ends, carrying the distance it was
    /// reached with, so `limits` bound the radius around the seed set rather than each single
    /// search. Nodes are reported once, by slot, with the shortest (`path_length`, `dist`) found.
    /// Seeds are included with a zero distance.
    pub fn explore_nodes(&self, seeds: &[NodeId], limits: &SearchLimits) -> SearchOutcome<Vec<NodeVisitor>> {
        let no_tabu = FxHashSet::default();
        let mut best: FxHashMap<usize, (u32, u32)> = FxHashMap::default();
        let mut to_visit = Vec::new();

        for &n in seeds {
            if best.insert(node_index(n), (0, 0)).is_none() {
                to_visit.extend([NodeVisitor::seed(n), NodeVisitor::seed(-n)]);
            }
        }

        while let Some(start) = to_visit.pop() {
            let reached = match self.depth_first_search(start, limits, &no_tabu) {
                SearchOutcome::Complete(v) => v,
                SearchOutcome::Aborted(reason) => return SearchOutcome::Aborted(reason),
            };

            for v in reached {
                if node_index(v.node) == node_index(start.node) {
                    continue;
                }

                let shorter = best.get(&node_index(v.node))
                    .map_or(true, |&(path_length, dist)| (v.path_length, v.dist) < (path_length, dist));

                if shorter {
                    best.insert(node_index(v.node), (v.path_length, v.dist));
                    to_visit.extend([v, NodeVisitor { node: -v.node, ..v }]);
                }
            }
        }

        debug!("Explored {} nodes around {} seeds", best.len(), seeds.len());

        let mut result: Vec<_> = best.into_iter()
            .map(|(ix, (path_length, dist))| NodeVisitor::new(ix as NodeId, dist, path_length))
            .collect();
        result.sort_unstable();

        SearchOutcome::Complete(result)
    }

    /// True if two of the four nodes are the same node, in either orientation.
    pub fn is_loop(nodes: &[NodeId; 4]) -> bool {
        nodes.iter()
            .tuple_combinations()
            .any(|(&a, &b)| node_index(a) == node_index(b))
    }

    /// Partition the active nodes into groups connected by links in any direction.
    ///
    /// Components are sorted by their smallest node, and each component is sorted.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut used = vec![false; self.nodes.len()];
        let mut components = Vec::new();

        for start in 1..self.nodes.len() {
            if used[start] || !self.nodes[start].is_active() {
                continue;
            }

            used[start] = true;
            let mut component = vec![start as NodeId];
            let mut queue = VecDeque::from([start]);

            while let Some(n) = queue.pop_front() {
                for l in &self.links[n] {
                    let next = node_index(l.dest);
                    if !used[next] {
                        used[next] = true;
                        component.push(next as NodeId);
                        queue.push_back(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        let largest = components.iter().map(Vec::len).max().unwrap_or(0);
        debug!("Found {} connected components, largest has {largest} nodes", components.len());

        components
    }

    /// All maximal non-branching paths with at least `min_nodes` nodes.
    pub fn get_all_unitigs(&self, min_nodes: usize) -> Vec<SequenceGraphPath> {
        let mut used = vec![false; self.nodes.len()];
        let mut unitigs = Vec::new();

        for n in 1..self.nodes.len() {
            if used[n] || !self.nodes[n].is_active() {
                continue;
            }

            used[n] = true;
            let mut path = SequenceGraphPath::new(vec![n as NodeId]);

            // Extend forward, flip, extend forward again. Flipping twice leaves n positive.
            for _ in 0..2 {
                loop {
                    let Some(&last) = path.nodes.last() else {
                        break;
                    };

                    let fw = self.get_fw_links(last);
                    if fw.len() != 1 {
                        break;
                    }

                    let next = fw[0].dest;
                    if used[node_index(next)] || self.bw_links_iter(next).count() != 1 {
                        break;
                    }

                    used[node_index(next)] = true;
                    path.nodes.push(next);
                }

                path.reverse();
            }

            if path.len() >= min_nodes {
                unitigs.push(path);
            }
        }

        unitigs
    }

    /// Distances from the end of `from` to the start of any node in `destinations`, either
    /// orientation, reached within `max_dist` bp.
    ///
    /// This is a bounded frontier expansion, not an exact shortest path computation.
    pub fn get_distances_to(&self, from: NodeId, destinations: &[NodeId], max_dist: i64) -> Vec<(NodeId, i64)> {
        self.get_distances_to_with(from, destinations, max_dist, &DistanceSearch::default())
    }

    pub fn get_distances_to_with(
        &self,
        from: NodeId,
        destinations: &[NodeId],
        max_dist: i64,
        config: &DistanceSearch,
    ) -> Vec<(NodeId, i64)> {
        let targets: FxHashSet<usize> = destinations.iter().map(|&d| node_index(d)).collect();

        let mut current = vec![(from, -(self.get_node_size(from) as i64))];
        let mut found = Vec::new();

        for _ in 0..config.max_rounds {
            if current.is_empty() {
                break;
            }

            let mut next = Vec::new();
            for (node, dist) in current {
                if targets.contains(&node_index(node)) {
                    found.push((node, dist));
                    continue;
                }

                let node_end = dist + self.get_node_size(node) as i64;
                next.extend(
                    self.fw_links_iter(node)
                        .map(|l| (l.dest, node_end + l.dist as i64))
                        .filter(|&(_, d)| d <= max_dist)
                );
            }

            current = next;
        }

        found
    }

    /// Enumerate walks from `from` to `to` with at most `max_size` bp and `max_nodes` nodes in
    /// between.
    ///
    /// Returned paths hold only the nodes strictly between `from` and `to`, so a direct link
    /// between the two is not reported.
    pub fn find_all_paths_between(
        &self,
        from: NodeId,
        to: NodeId,
        max_size: i64,
        max_nodes: usize,
        abort_on_loops: bool,
    ) -> SearchOutcome<Vec<SequenceGraphPath>> {
        self.find_all_paths_between_with_caps(from, to, max_size, max_nodes, abort_on_loops, &PathSearchCaps::default())
    }

    pub fn find_all_paths_between_with_caps(
        &self,
        from: NodeId,
        to: NodeId,
        max_size: i64,
        max_nodes: usize,
        abort_on_loops: bool,
        caps: &PathSearchCaps,
    ) -> SearchOutcome<Vec<SequenceGraphPath>> {
        struct Entry {
            prev: Option<usize>,
            node: NodeId,
            node_count: usize,
            partial_size: i64,
        }

        let mut entries: Vec<Entry> = self.fw_links_iter(from)
            .filter(|l| max_nodes > 0 && self.get_node_size(l.dest) as i64 <= max_size)
            .map(|l| Entry {
                prev: None,
                node: l.dest,
                node_count: 1,
                partial_size: self.get_node_size(l.dest) as i64,
            })
            .collect();

        let mut paths = Vec::new();
        let mut current = 0;

        while current < entries.len() {
            let (node, node_count, partial_size) = {
                let e = &entries[current];
                (e.node, e.node_count, e.partial_size)
            };

            for l in self.fw_links_iter(node) {
                if l.dest == to {
                    let mut nodes = vec![0; node_count];
                    let mut ix = Some(current);
                    while let Some(i) = ix {
                        nodes[entries[i].node_count - 1] = entries[i].node;
                        ix = entries[i].prev;
                    }

                    if abort_on_loops {
                        let mut seen = FxHashSet::default();
                        if !nodes.iter().all(|n| seen.insert(node_index(*n))) {
                            debug!("Path search from {from} to {to} found a loop");
                            return SearchOutcome::Aborted(AbortReason::LoopDetected);
                        }
                    }

                    paths.push(SequenceGraphPath::new(nodes));
                    if paths.len() > caps.max_paths {
                        warn!("From {from} to {to} with max_size {max_size} and max_nodes {max_nodes} there were too many paths!");
                        return SearchOutcome::Aborted(AbortReason::TooManyPaths);
                    }
                } else {
                    let new_size = partial_size + l.dist as i64 + self.get_node_size(l.dest) as i64;
                    if new_size <= max_size && node_count < max_nodes {
                        entries.push(Entry {
                            prev: Some(current),
                            node: l.dest,
                            node_count: node_count + 1,
                            partial_size: new_size,
                        });
                    }
                }
            }

            if entries.len() > caps.max_entries {
                warn!("From {from} to {to} with max_size {max_size} and max_nodes {max_nodes} there were too many nodes!");
                return SearchOutcome::Aborted(AbortReason::TooManyEntries);
            }

            current += 1;
        }

        SearchOutcome::Complete(paths)
    }

    /// Nodes whose forward and backward neighbourhoods, up to `complexity` links away, share a
    /// node, and that have more than one distinct neighbour.
    ///
    /// Every node is checked independently in parallel. If any neighbourhood search hits its
    /// iteration limit the whole result is aborted.
    pub fn get_loopy_nodes(&self, complexity: u32) -> SearchOutcome<Vec<NodeId>> {
        let limits = SearchLimits::new(0, complexity);
        let no_tabu = FxHashSet::default();

        let per_node: Vec<SearchOutcome<bool>> = (1..self.nodes.len())
            .into_par_iter()
            .filter(|&ix| self.nodes[ix].is_active())
            .map(|ix| {
                let n = ix as NodeId;
                let fw = match self.depth_first_search(NodeVisitor::seed(n), &limits, &no_tabu) {
                    SearchOutcome::Complete(v) => v,
                    SearchOutcome::Aborted(reason) => return SearchOutcome::Aborted(reason),
                };
                let bw = match self.depth_first_search(NodeVisitor::seed(-n), &limits, &no_tabu) {
                    SearchOutcome::Complete(v) => v,
                    SearchOutcome::Aborted(reason) => return SearchOutcome::Aborted(reason),
                };

                let fw: FxHashSet<_> = fw.iter().map(|v| node_index(v.node)).collect();
                if !bw.iter().any(|v| fw.contains(&node_index(v.node))) {
                    return SearchOutcome::Complete(false);
                }

                let neighbours: FxHashSet<_> = self.get_neighbour_nodes(n)
                    .into_iter()
                    .map(node_index)
                    .collect();

                SearchOutcome::Complete(neighbours.len() > 1)
            })
            .collect();

        let mut loopy = Vec::new();
        for (ix, outcome) in (1..self.nodes.len()).filter(|&ix| self.nodes[ix].is_active()).zip(per_node) {
            match outcome {
                SearchOutcome::Complete(true) => loopy.push(ix as NodeId),
                SearchOutcome::Complete(false) => (),
                SearchOutcome::Aborted(reason) => {
                    warn!("Loopy node detection aborted at node {ix}: {reason}");
                    return SearchOutcome::Aborted(reason);
                }
            }
        }

        SearchOutcome::Complete(loopy)
    }
}
