use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::SdgError;
use crate::graphs::{is_forward, Link, NodeId, SequenceDistanceGraph};

/// An ordered walk through the graph.
///
/// Consecutive nodes are expected to be joined by a link `-prev -> next`, but this is only
/// checked by the operations that need it.
///
/// **Equality, ordering and hashing only look at the set of node magnitudes visited.** Two paths
/// traversing the same nodes in a different order or orientation compare equal, so paths can be
/// used to deduplicate graph regions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceGraphPath {
    pub nodes: Vec<NodeId>,
}

impl SequenceGraphPath {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        SequenceGraphPath { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reconstruct the sequence spelled by the path.
    ///
    /// Gaps are filled with `N`. Overlaps must match byte for byte, otherwise
    /// [`SdgError::PathOverlapInvalid`] is returned.
    pub fn sequence(&self, graph: &SequenceDistanceGraph) -> Result<Vec<u8>, SdgError> {
        trace!("Reconstructing sequence for path {:?}", self.nodes);

        let mut seq = Vec::new();
        let mut prev: Option<NodeId> = None;

        for &n in &self.nodes {
            let mut nseq = graph.get_node_sequence(n);

            if let Some(p) = prev {
                let link = graph.get_link(-p, n)
                    .ok_or(SdgError::PathHasNoLink { from: p, to: n })?;

                if link.dist > 0 {
                    seq.resize(seq.len() + link.dist as usize, b'N');
                } else {
                    let ovl = link.dist.unsigned_abs() as usize;
                    if ovl > seq.len() || ovl > nseq.len() || seq[seq.len() - ovl..] != nseq[..ovl] {
                        return Err(SdgError::PathOverlapInvalid { from: p, to: n });
                    }

                    nseq.drain(..ovl);
                }
            }

            seq.extend_from_slice(&nseq);
            prev = Some(n);
        }

        Ok(seq)
    }

    /// Length of [`Self::sequence`] computed from node sizes and link distances only.
    pub fn get_sequence_size_fast(&self, graph: &SequenceDistanceGraph) -> Result<usize, SdgError> {
        let mut size = self.nodes.first()
            .map_or(0i64, |&n| graph.get_node_size(n) as i64);

        for (&p, &n) in self.nodes.iter().tuple_windows() {
            let link = graph.get_link(-p, n)
                .ok_or(SdgError::PathHasNoLink { from: p, to: n })?;
            size += graph.get_node_size(n) as i64 + link.dist as i64;
        }

        Ok(size.max(0) as usize)
    }

    /// Reverse the walk in place, the result traverses the same nodes on the opposite strand.
    pub fn reverse(&mut self) {
        self.nodes.reverse();
        for n in self.nodes.iter_mut() {
            *n = -*n;
        }
    }

    pub fn reversed(&self) -> Self {
        let mut rp = self.clone();
        rp.reverse();

        rp
    }

    /// A path is canonical if its sequence is not greater than the sequence of its reverse.
    pub fn is_canonical(&self, graph: &SequenceDistanceGraph) -> Result<bool, SdgError> {
        Ok(self.sequence(graph)? <= self.reversed().sequence(graph)?)
    }

    /// Check that each consecutive pair is linked. Gap links only count when `allow_ns` is set.
    pub fn is_valid(&self, graph: &SequenceDistanceGraph, allow_ns: bool) -> bool {
        self.nodes.iter()
            .tuple_windows()
            .all(|(&p, &n)| {
                graph.fw_links_iter(p)
                    .any(|l| l.dest == n && (allow_ns || l.dist <= 0))
            })
    }

    /// True if nothing enters or leaves the path between its first and last node.
    pub fn is_unitig(&self, graph: &SequenceDistanceGraph) -> bool {
        let last = self.nodes.len().saturating_sub(1);

        self.nodes.iter().enumerate().all(|(i, &n)| {
            if i > 0 {
                let bw = graph.get_bw_links(n);
                if bw.len() != 1 || bw[0].dest != -self.nodes[i - 1] {
                    return false;
                }
            }

            if i < last {
                let fw = graph.get_fw_links(n);
                if fw.len() != 1 || fw[0].dest != self.nodes[i + 1] {
                    return false;
                }
            }

            true
        })
    }

    /// Links leaving the end of the path.
    pub fn get_next_links(&self, graph: &SequenceDistanceGraph) -> Vec<Link> {
        self.nodes.last()
            .map(|&n| graph.get_fw_links(n))
            .unwrap_or_default()
    }

    pub fn make_set_of_nodes(&self) -> BTreeSet<u64> {
        self.nodes.iter().map(|n| n.unsigned_abs()).collect()
    }

    /// FASTA header listing the path nodes, e.g. `>sgPath_[1, -2,]`.
    ///
    /// Every node is followed by a comma. With `use_oldnames` nodes are written as a strand sign
    /// followed by their original name.
    pub fn get_fasta_header(&self, graph: &SequenceDistanceGraph, use_oldnames: bool) -> String {
        let steps: Vec<String> = if use_oldnames {
            self.nodes.iter()
                .map(|&n| format!("{}{},", if is_forward(n) { '+' } else { '-' }, graph.node_name(n)))
                .collect()
        } else {
            self.nodes.iter().map(|n| format!("{n},")).collect()
        };

        format!(">sgPath_[{}]", steps.join(" "))
    }
}

impl From<Vec<NodeId>> for SequenceGraphPath {
    fn from(nodes: Vec<NodeId>) -> Self {
        SequenceGraphPath { nodes }
    }
}

impl PartialEq for SequenceGraphPath {
    fn eq(&self, other: &Self) -> bool {
        self.make_set_of_nodes() == other.make_set_of_nodes()
    }
}

impl Eq for SequenceGraphPath {}

impl PartialOrd for SequenceGraphPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SequenceGraphPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.make_set_of_nodes().cmp(&other.make_set_of_nodes())
    }
}

impl Hash for SequenceGraphPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.make_set_of_nodes().hash(state)
    }
}

impl Display for SequenceGraphPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.nodes.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::mock::create_linear_graph;
    use crate::graphs::Support;

    #[test]
    fn test_sequence_with_overlaps() {
        let (graph, [a, b, c]) = create_linear_graph();
        let path = SequenceGraphPath::new(vec![a, b, c]);

        let seq = path.sequence(&graph).unwrap();
        let expected_len = graph.get_node_size(a) + graph.get_node_size(b) + graph.get_node_size(c) - 10;
        assert_eq!(seq.len(), expected_len);
        assert_eq!(path.get_sequence_size_fast(&graph).unwrap(), expected_len);
        assert!(seq.starts_with(&graph.get_node_sequence(a)));
        assert!(seq.ends_with(&graph.get_node_sequence(c)));

        // Deterministic on an unchanged graph
        assert_eq!(path.sequence(&graph).unwrap(), seq);
    }

    #[test]
    fn test_reverse_path_sequence() {
        let (graph, [a, b, c]) = create_linear_graph();
        let path = SequenceGraphPath::new(vec![a, b, c]);
        let rp = path.reversed();

        assert_eq!(rp.nodes, vec![-c, -b, -a]);
        assert_eq!(
            rp.sequence(&graph).unwrap(),
            crate::graphs::reverse_complement(&path.sequence(&graph).unwrap())
        );
    }

    #[test]
    fn test_sequence_with_gap() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("AAAA");
        let b = graph.add_node("CCCC");
        graph.add_link(-a, b, 3, Support::default());

        let path = SequenceGraphPath::new(vec![a, b]);
        assert_eq!(path.sequence(&graph).unwrap(), b"AAAANNNCCCC");
        assert!(path.is_valid(&graph, true));
        assert!(!path.is_valid(&graph, false));
    }

    #[test]
    fn test_sequence_invalid_overlap() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("ACGTACGT");
        let b = graph.add_node("TTTTGGGG");
        // -B starts with CCCC, A ends with CGT
        graph.add_link(-a, -b, -3, Support::default());

        let path = SequenceGraphPath::new(vec![a, -b]);
        assert!(matches!(
            path.sequence(&graph),
            Err(SdgError::PathOverlapInvalid { from, to }) if from == a && to == -b
        ));
    }

    #[test]
    fn test_sequence_missing_link() {
        let (graph, [a, _, c]) = create_linear_graph();
        let path = SequenceGraphPath::new(vec![a, c]);
        assert!(matches!(path.sequence(&graph), Err(SdgError::PathHasNoLink { .. })));
        assert!(!path.is_valid(&graph, true));
    }

    #[test]
    fn test_is_unitig() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        let path = SequenceGraphPath::new(vec![a, b, c]);
        assert!(path.is_unitig(&graph));
        assert!(path.reversed().is_unitig(&graph));

        let d = graph.add_node("GATTACA");
        graph.add_link(-b, d, 0, Support::default());
        assert!(!path.is_unitig(&graph));
        assert_eq!(SequenceGraphPath::new(vec![b]).get_next_links(&graph).len(), 2);
    }

    #[test]
    fn test_equality_uses_node_set() {
        let p1 = SequenceGraphPath::new(vec![1, -2, 3]);
        let p2 = SequenceGraphPath::new(vec![-3, 2, -1]);
        let p3 = SequenceGraphPath::new(vec![1, 2]);

        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
        assert_eq!(p1.cmp(&p3), Ordering::Greater);
    }

    #[test]
    fn test_fasta_header() {
        let (graph, [a, b, _]) = create_linear_graph();
        let path = SequenceGraphPath::new(vec![a, -b]);
        assert_eq!(path.get_fasta_header(&graph, false), format!(">sgPath_[{a}, {},]", -b));
        assert_eq!(path.get_fasta_header(&graph, true), format!(">sgPath_[+seq{a}, -seq{b},]"));
        assert_eq!(SequenceGraphPath::default().get_fasta_header(&graph, false), ">sgPath_[]");
    }
}
