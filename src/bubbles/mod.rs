//! Detection of bubbly regions: chains of two-haplotype bubbles.

use serde::{Deserialize, Serialize};

use crate::graphs::{NodeId, SequenceDistanceGraph, SequenceGraphPath};

pub mod finder;

pub use finder::BubblyChainFinder;

/// An ordered set of nodes describing a graph region.
///
/// For bubble chains the layout is `[anchor, hap_a, hap_b, anchor, hap_a, hap_b, ..., anchor]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSubGraph {
    pub nodes: Vec<NodeId>,
}

impl SequenceSubGraph {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        SequenceSubGraph { nodes }
    }

    pub fn total_size(&self, graph: &SequenceDistanceGraph) -> usize {
        self.nodes.iter()
            .map(|&n| graph.get_node_size(n))
            .sum()
    }

    /// Split a bubble chain into its two haplotype walks, both including the shared anchors.
    pub fn haplotype_paths(&self) -> (SequenceGraphPath, SequenceGraphPath) {
        let mut first = Vec::new();
        let mut second = Vec::new();

        for (i, &n) in self.nodes.iter().enumerate() {
            match i % 3 {
                0 => {
                    first.push(n);
                    second.push(n);
                },
                1 => first.push(n),
                _ => second.push(n),
            }
        }

        (SequenceGraphPath::new(first), SequenceGraphPath::new(second))
    }
}

impl SequenceDistanceGraph {
    /// Find up to `max` bubble chains, `0` for no limit.
    pub fn get_all_bubbly_subgraphs(&self, max: usize) -> Vec<SequenceSubGraph> {
        let limit = if max == 0 { usize::MAX } else { max };

        BubblyChainFinder::new(self).take(limit).collect()
    }
}
