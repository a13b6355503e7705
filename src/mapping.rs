//! Interfaces to read storage and read-to-node mappings provided by other components.

use crate::graphs::{node_index, NodeId, SequenceDistanceGraph};

/// Storage of sequencing reads, addressed by id.
pub trait ReadsDatastore {
    /// Number of reads in the store
    fn size(&self) -> usize;

    fn get_read_sequence(&self, id: u64) -> Vec<u8>;
}

/// A read placed on a node, positions are in node coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMapping {
    pub read_id: u64,
    pub node: NodeId,
    pub first_pos: u32,
    pub last_pos: u32,
}

impl ReadMapping {
    pub fn span(&self) -> usize {
        self.last_pos.saturating_sub(self.first_pos) as usize + 1
    }
}

/// Per-node mapping results of a read mapper.
pub trait NodeMappings {
    fn mappings_for(&self, node: NodeId) -> &[ReadMapping];
}

/// Mean read depth per node slot: bp of reads mapped to a node divided by its size.
///
/// Reads are measured by their actual sequence length, clipped to the mapped span. Deleted and
/// empty nodes get `NaN`.
pub fn node_depths<D, M>(graph: &SequenceDistanceGraph, datastore: &D, mappings: &M) -> Vec<f64>
where
    D: ReadsDatastore + ?Sized,
    M: NodeMappings + ?Sized,
{
    (0..graph.node_count())
        .map(|ix| {
            let node = ix as NodeId;
            let size = graph.get_node_size(node);
            if !graph.is_active(node) || size == 0 {
                return f64::NAN;
            }

            let mapped_bp: usize = mappings.mappings_for(node)
                .iter()
                .filter(|m| node_index(m.node) == ix && (m.read_id as usize) < datastore.size())
                .map(|m| datastore.get_read_sequence(m.read_id).len().min(m.span()))
                .sum();

            mapped_bp as f64 / size as f64
        })
        .collect()
}
