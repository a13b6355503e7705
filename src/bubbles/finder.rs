use tracing::debug;

use crate::bubbles::SequenceSubGraph;
use crate::graphs::{node_index, NodeId, SequenceDistanceGraph};

/// Chains need more than this many nodes to be reported, i.e. at least two bubbles.
const MIN_CHAIN_NODES: usize = 6;

/// Identify chains of simple bubbles.
///
/// A bubble starts at a node with exactly two successors, each having a single predecessor and a
/// single successor, both reconverging on the same node. Chains are grown forward from a start
/// node, then backward, and every node is claimed by at most one chain. A chain running into
/// nodes already claimed is circular and discarded.
pub struct BubblyChainFinder<'a> {
    graph: &'a SequenceDistanceGraph,
    used: Vec<bool>,
    next_start: usize,
}

impl<'a> BubblyChainFinder<'a> {
    pub fn new(graph: &'a SequenceDistanceGraph) -> Self {
        Self {
            graph,
            used: vec![false; graph.node_count()],
            next_start: 1,
        }
    }

    /// The bubble following `node`, as `(hap_a, hap_b, exit)`.
    fn next_bubble(&self, node: NodeId) -> Option<(NodeId, NodeId, NodeId)> {
        let fw = self.graph.get_fw_links(node);
        if fw.len() != 2 || fw[0].dest == fw[1].dest {
            return None;
        }

        let (h1, h2) = (fw[0].dest, fw[1].dest);
        if self.graph.get_bw_links(h1).len() != 1 || self.graph.get_bw_links(h2).len() != 1 {
            return None;
        }

        let exit1 = self.graph.get_fw_links(h1);
        let exit2 = self.graph.get_fw_links(h2);
        if exit1.len() != 1 || exit2.len() != 1 || exit1[0].dest != exit2[0].dest {
            return None;
        }

        Some((h1, h2, exit1[0].dest))
    }

    /// Grow a chain from `start`. Returns `None` if it turned out to be circular.
    fn grow_chain(&mut self, start: NodeId) -> Option<Vec<NodeId>> {
        let mut chain = vec![start];

        for _ in 0..2 {
            while let Some(&last) = chain.last() {
                let Some((h1, h2, exit)) = self.next_bubble(last) else {
                    break;
                };

                if [h1, h2, exit].iter().any(|&n| self.used[node_index(n)]) {
                    return None;
                }

                for n in [h1, h2, exit] {
                    self.used[node_index(n)] = true;
                }
                self.used[node_index(start)] = true;

                chain.extend([h1, h2, exit]);
            }

            chain = chain.into_iter().rev().map(|n| -n).collect();
        }

        Some(chain)
    }
}

impl Iterator for BubblyChainFinder<'_> {
    type Item = SequenceSubGraph;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_start < self.used.len() {
            let n = self.next_start;
            self.next_start += 1;

            if self.used[n] || !self.graph.node(n as NodeId).is_active() {
                continue;
            }

            match self.grow_chain(n as NodeId) {
                Some(chain) if chain.len() > MIN_CHAIN_NODES => {
                    debug!("Bubbly chain of {} nodes starting at {}", chain.len(), chain[0]);
                    return Some(SequenceSubGraph::new(chain));
                },
                Some(_) => (),
                None => debug!("Discarding circular bubbly structure at node {n}"),
            }
        }

        None
    }
}
