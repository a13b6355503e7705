use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use crate::bubbles::SequenceSubGraph;
use crate::errors::SdgError;
use crate::graphs::{Node, SequenceDistanceGraph};

/// Size summary of the active nodes of a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub total_size: usize,
    pub max: usize,
    pub n20: usize,
    pub n50: usize,
    pub n80: usize,
    pub min: usize,
}

impl Display for GraphStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sequences with {}bp, N0: {}bp  N20: {}bp  N50: {}bp  N80: {}bp  N100: {}bp",
            self.nodes, self.total_size, self.max, self.n20, self.n50, self.n80, self.min
        )
    }
}

impl GraphStats {
    /// Summarise a set of sequence lengths.
    pub fn from_sizes(sizes: impl IntoIterator<Item = usize>) -> Self {
        let sizes: Vec<usize> = sizes.into_iter()
            .sorted_unstable_by(|a, b| b.cmp(a))
            .collect();

        let total_size: usize = sizes.iter().sum();

        // Size of the sequence at which the running total first reaches `pct` percent
        let nx = |pct: usize| {
            let mut acc = 0;
            for &s in &sizes {
                acc += s;
                if acc * 100 >= total_size * pct {
                    return s;
                }
            }

            0
        };

        GraphStats {
            nodes: sizes.len(),
            total_size,
            max: sizes.first().copied().unwrap_or(0),
            n20: nx(20),
            n50: nx(50),
            n80: nx(80),
            min: sizes.last().copied().unwrap_or(0),
        }
    }
}

/// Sequence sizes of bubble chains as they are now and once every chain is resolved into its
/// two haplotypes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BubblyStats {
    pub chains: usize,
    pub current: GraphStats,
    pub solved: GraphStats,
}

impl SequenceDistanceGraph {
    pub fn stats(&self) -> GraphStats {
        GraphStats::from_sizes(
            self.nodes.iter()
                .filter(|n| n.is_active())
                .map(Node::len)
        )
    }

    pub fn log_status(&self) {
        info!("The graph contains {}", self.stats());
    }

    /// Compare the sequences of `chains` now against the sequences left after resolving them.
    ///
    /// A resolved chain keeps its two end anchors, and its interior becomes two sequences, one
    /// per haplotype, each including the inner anchors.
    pub fn bubbly_subgraph_stats(&self, chains: &[SequenceSubGraph]) -> Result<BubblyStats, SdgError> {
        let mut current = Vec::new();
        let mut solved = Vec::new();

        for chain in chains {
            let (Some(&first), Some(&last)) = (chain.nodes.first(), chain.nodes.last()) else {
                continue;
            };

            current.extend(chain.nodes.iter().map(|&n| self.get_node_size(n)));
            solved.extend([self.get_node_size(first), self.get_node_size(last)]);

            if chain.nodes.len() > 2 {
                let interior = SequenceSubGraph::new(chain.nodes[..chain.nodes.len() - 1].to_vec());
                let (mut hap_a, mut hap_b) = interior.haplotype_paths();
                hap_a.nodes.remove(0);
                hap_b.nodes.remove(0);

                for hap in [hap_a, hap_b] {
                    solved.push(if hap.is_empty() { 0 } else { hap.sequence(self)?.len() });
                }
            }
        }

        Ok(BubblyStats {
            chains: chains.len(),
            current: GraphStats::from_sizes(current),
            solved: GraphStats::from_sizes(solved),
        })
    }

    pub fn log_bubbly_subgraph_stats(&self, chains: &[SequenceSubGraph]) -> Result<(), SdgError> {
        let stats = self.bubbly_subgraph_stats(chains)?;

        info!("{} bubbly paths", stats.chains);
        info!("Currently {}", stats.current);
        info!("Potentially {}", stats.solved);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::mock::create_bubble_chain;

    #[test]
    fn test_stats() {
        let mut graph = SequenceDistanceGraph::new();
        for len in [50, 10, 30, 10] {
            graph.add_node(vec![b'A'; len]);
        }
        let gone = graph.add_node(vec![b'C'; 1000]);
        graph.remove_node(gone);

        let stats = graph.stats();
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.total_size, 100);
        assert_eq!(stats.max, 50);
        assert_eq!(stats.n20, 50);
        assert_eq!(stats.n50, 50);
        assert_eq!(stats.n80, 30);
        assert_eq!(stats.min, 10);
    }

    #[test]
    fn test_bubbly_subgraph_stats() {
        let (graph, nodes) = create_bubble_chain(2);
        let chain = SequenceSubGraph::new(nodes);

        let stats = graph.bubbly_subgraph_stats(&[chain]).unwrap();
        assert_eq!(stats.chains, 1);

        // Three 40bp anchors and four 15bp haplotype nodes
        assert_eq!(stats.current.nodes, 7);
        assert_eq!(stats.current.total_size, 180);
        assert_eq!(stats.current.n50, 40);

        // Both end anchors, plus hap + anchor + hap for each haplotype
        assert_eq!(stats.solved.nodes, 4);
        assert_eq!(stats.solved.total_size, 220);
        assert_eq!(stats.solved.max, 70);
        assert_eq!(stats.solved.min, 40);

        graph.log_bubbly_subgraph_stats(&[]).unwrap();
        assert_eq!(graph.bubbly_subgraph_stats(&[]).unwrap(), BubblyStats::default());
    }

    #[test]
    fn test_stats_empty() {
        let stats = SequenceDistanceGraph::new().stats();
        assert_eq!(stats.nodes, 0);
        assert_eq!(stats.n50, 0);
    }
}
