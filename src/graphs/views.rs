//! Read-only navigation handles over a graph.

use std::fmt::{self, Debug, Formatter};

use itertools::Itertools;

use crate::errors::SdgError;
use crate::graphs::{NodeId, SequenceDistanceGraph, Support};

/// A neighbour reached from a [`NodeView`], in the orientation it is traversed.
#[derive(Clone, Copy)]
pub struct LinkView<'a> {
    pub node: NodeView<'a>,
    pub distance: i32,
    pub support: Support,
}

impl Debug for LinkView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "LinkView({}bp to {})", self.distance, self.node.node_id())
    }
}

/// An oriented node borrowed from a graph.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    graph: &'a SequenceDistanceGraph,
    id: NodeId,
}

impl<'a> NodeView<'a> {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> &'a SequenceDistanceGraph {
        self.graph
    }

    /// The same node on the opposite strand.
    pub fn rc(&self) -> NodeView<'a> {
        NodeView { graph: self.graph, id: -self.id }
    }

    pub fn sequence(&self) -> Vec<u8> {
        self.graph.get_node_sequence(self.id)
    }

    pub fn size(&self) -> usize {
        self.graph.get_node_size(self.id)
    }

    pub fn next(&self) -> Vec<LinkView<'a>> {
        self.graph.fw_links_iter(self.id)
            .map(|l| LinkView {
                node: NodeView { graph: self.graph, id: l.dest },
                distance: l.dist,
                support: l.support,
            })
            .collect()
    }

    pub fn prev(&self) -> Vec<LinkView<'a>> {
        self.graph.bw_links_iter(self.id)
            .map(|l| LinkView {
                node: NodeView { graph: self.graph, id: -l.dest },
                distance: l.dist,
                support: l.support,
            })
            .collect()
    }

    /// Nodes sharing exactly the same predecessors and successors, e.g. the other side of a
    /// bubble. Nodes without links on either side have no parallels.
    pub fn parallels(&self) -> Vec<NodeView<'a>> {
        let prev_ids = sorted_ids(&self.prev());
        let next_ids = sorted_ids(&self.next());

        let candidates = if let Some(&p) = prev_ids.first() {
            self.graph.get_fw_nodes(p)
        } else if let Some(&n) = next_ids.first() {
            self.graph.get_bw_nodes(n)
        } else {
            return Vec::new();
        };

        candidates.into_iter()
            .unique()
            .filter(|&c| c != self.id)
            .map(|c| NodeView { graph: self.graph, id: c })
            .filter(|c| sorted_ids(&c.prev()) == prev_ids && sorted_ids(&c.next()) == next_ids)
            .collect()
    }
}

fn sorted_ids(links: &[LinkView]) -> Vec<NodeId> {
    links.iter()
        .map(|l| l.node.node_id())
        .sorted_unstable()
        .collect()
}

impl PartialEq for NodeView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for NodeView<'_> {}

impl Debug for NodeView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "NodeView({}, {}bp)", self.id, self.size())
    }
}

impl SequenceDistanceGraph {
    pub fn get_nodeview(&self, node: NodeId) -> Result<NodeView<'_>, SdgError> {
        self.check_node(node)?;

        Ok(NodeView { graph: self, id: node })
    }

    /// Views of all active nodes in their stored orientation.
    pub fn get_all_nodeviews(&self, include_disconnected: bool) -> Vec<NodeView<'_>> {
        (1..self.nodes.len())
            .filter(|&ix| self.nodes[ix].is_active())
            .filter(|&ix| include_disconnected || !self.links[ix].is_empty())
            .map(|ix| NodeView { graph: self, id: ix as NodeId })
            .collect()
    }
}
