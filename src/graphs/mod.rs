//! Sequence distance graphs and the algorithms operating on them.
//!
//! Nodes are addressed with signed ids: the magnitude selects the node slot, the sign selects
//! the strand (positive is the stored sequence, negative its reverse complement). Every
//! conversion between the two lives in this module.

pub mod sdg;
pub mod path;
pub mod views;
pub mod traversal;
pub mod edit;
pub mod stats;

#[cfg(test)]
pub(crate) mod mock;

pub use sdg::{Link, Node, NodeStatus, SequenceDistanceGraph, Support, SupportType};
pub use path::SequenceGraphPath;
pub use views::{LinkView, NodeView};
pub use traversal::{AbortReason, NodeVisitor, SearchOutcome};
pub use stats::{BubblyStats, GraphStats};

/// Signed node identifier, `0` is never a valid node.
pub type NodeId = i64;

/// Storage slot of an oriented node id.
#[inline(always)]
pub fn node_index(node: NodeId) -> usize {
    node.unsigned_abs() as usize
}

/// `true` if the id refers to the stored orientation of the node.
#[inline(always)]
pub fn is_forward(node: NodeId) -> bool {
    node > 0
}

/// Compute the reverse complement of a DNA sequence
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' | b'a' => b'T',
            b'T' | b't' => b'A',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            _ => base,
        })
        .collect()
}

/// A sequence is canonical when it is lexicographically not greater than its reverse
/// complement.
pub fn is_canonical(seq: &[u8]) -> bool {
    seq <= reverse_complement(seq).as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_index() {
        assert_eq!(node_index(5), 5);
        assert_eq!(node_index(-5), 5);
        assert!(is_forward(3));
        assert!(!is_forward(-3));
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ATCG"), b"CGAT");
        assert_eq!(reverse_complement(b"AACN"), b"NGTT");
        assert_eq!(reverse_complement(b""), b"");
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical(b"AAAC"));
        assert!(!is_canonical(b"GTTT"));
        // Palindromes are their own reverse complement
        assert!(is_canonical(b"ACGT"));
    }
}
