use std::fmt::{self, Display, Formatter};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::errors::SdgError;
use crate::graphs::{is_canonical, node_index, reverse_complement, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum NodeStatus {
    #[default]
    Active,
    Deleted,
}

impl From<NodeStatus> for u8 {
    fn from(value: NodeStatus) -> Self {
        match value {
            NodeStatus::Active => 0,
            NodeStatus::Deleted => 1,
        }
    }
}

impl TryFrom<u8> for NodeStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NodeStatus::Active),
            1 => Ok(NodeStatus::Deleted),
            _ => Err(format!("invalid node status {value}")),
        }
    }
}

/// A sequence fragment of the assembly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    pub status: NodeStatus,
    pub sequence: Vec<u8>,
}

impl Node {
    pub fn new(sequence: impl Into<Vec<u8>>) -> Self {
        Node {
            status: NodeStatus::Active,
            sequence: sequence.into(),
        }
    }

    pub fn deleted() -> Self {
        Node {
            status: NodeStatus::Deleted,
            sequence: Vec::new(),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    pub fn is_canonical(&self) -> bool {
        is_canonical(&self.sequence)
    }

    /// Replace the stored sequence by its reverse complement.
    pub fn make_rc(&mut self) {
        self.sequence = reverse_complement(&self.sequence);
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Where the evidence for a link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SupportType {
    #[default]
    Undefined,
    Operation,
    ShortRead,
    LongRead,
    LinkedRead,
    KmerCoverage,
}

impl From<SupportType> for u8 {
    fn from(value: SupportType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for SupportType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SupportType::Undefined),
            1 => Ok(SupportType::Operation),
            2 => Ok(SupportType::ShortRead),
            3 => Ok(SupportType::LongRead),
            4 => Ok(SupportType::LinkedRead),
            5 => Ok(SupportType::KmerCoverage),
            _ => Err(format!("invalid support type {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Support {
    pub kind: SupportType,
    pub index: u16,
    pub id: u64,
}

impl Support {
    pub fn new(kind: SupportType, index: u16, id: u64) -> Self {
        Support { kind, index, id }
    }
}

/// One half of an adjacency between two node ends.
///
/// A link leaving the output end of node `A` towards the input end of node `B` is stored as
/// `source = -A, dest = B`. The other endpoint stores the mirror half `source = B, dest = -A`.
/// A non-positive `dist` is an overlap of `|dist|` bases, a positive one a gap of `dist` N's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub dest: NodeId,
    pub dist: i32,
    pub support: Support,
}

impl Link {
    pub fn new(source: NodeId, dest: NodeId, dist: i32) -> Self {
        Link { source, dest, dist, support: Support::default() }
    }

    pub fn with_support(source: NodeId, dest: NodeId, dist: i32, support: Support) -> Self {
        Link { source, dest, dist, support }
    }

    /// The half-link stored by the other endpoint.
    #[inline]
    pub fn mirror(&self) -> Link {
        Link {
            source: self.dest,
            dest: self.source,
            dist: self.dist,
            support: self.support,
        }
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Link {} -> {} ({}bp)", self.source, self.dest, self.dist)
    }
}

pub(crate) type LinkList = SmallVec<[Link; 4]>;

/// Assembly graph of sequence fragments joined by distance-annotated links.
///
/// Slot `0` always holds an empty deleted node. Nodes are never physically removed, deleting a
/// node only changes its status, so ids stay valid for the lifetime of the graph.
#[derive(Debug, Clone)]
pub struct SequenceDistanceGraph {
    pub name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<LinkList>,
    pub(crate) oldnames: Vec<String>,
    pub(crate) oldnames_to_ids: FxHashMap<String, NodeId>,
}

impl Default for SequenceDistanceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceDistanceGraph {
    pub fn new() -> Self {
        SequenceDistanceGraph {
            name: String::from("SDG"),
            nodes: vec![Node::deleted()],
            links: vec![LinkList::new()],
            oldnames: vec![String::new()],
            oldnames_to_ids: FxHashMap::default(),
        }
    }

    pub(crate) fn from_parts(nodes: Vec<Node>, links: Vec<LinkList>) -> Self {
        SequenceDistanceGraph {
            nodes,
            links,
            ..Self::new()
        }
    }

    /// Number of node slots, including the placeholder and deleted nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// # Panics
    ///
    /// Panics if the node does not exist.
    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node_index(node)]
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        node != 0 && self.nodes.get(node_index(node)).is_some_and(Node::is_active)
    }

    pub(crate) fn check_node(&self, node: NodeId) -> Result<usize, SdgError> {
        if self.is_active(node) {
            Ok(node_index(node))
        } else {
            Err(SdgError::InvalidNode(node))
        }
    }

    pub fn count_active_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    /// Total bp over all active nodes.
    pub fn total_size(&self) -> usize {
        self.nodes.iter()
            .filter(|n| n.is_active())
            .map(Node::len)
            .sum()
    }

    pub fn add_node(&mut self, sequence: impl Into<Vec<u8>>) -> NodeId {
        self.nodes.push(Node::new(sequence));
        self.links.push(LinkList::new());

        (self.nodes.len() - 1) as NodeId
    }

    /// Delete a node and every link touching it. Deleting an already deleted node is a no-op.
    pub fn remove_node(&mut self, node: NodeId) {
        let ix = node_index(node);
        if ix == 0 || ix >= self.nodes.len() {
            return;
        }

        self.disconnect_node(node);

        let data = &mut self.nodes[ix];
        if data.is_active() {
            debug!("Removing node {ix} ({}bp)", data.len());
        }

        data.status = NodeStatus::Deleted;
        data.sequence = Vec::new();
    }

    /// Remove every link of a node, keeping the node itself.
    pub fn disconnect_node(&mut self, node: NodeId) {
        let ix = node_index(node);
        let Some(node_links) = self.links.get(ix) else {
            return;
        };

        // Work on a copy, removing links mutates the list we read from
        let old_links = node_links.clone();
        for l in old_links {
            self.remove_link(l.source, l.dest);
        }
    }

    /// Add a link and its mirror.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint does not exist.
    pub fn add_link(&mut self, source: NodeId, dest: NodeId, dist: i32, support: Support) {
        let link = Link::with_support(source, dest, dist, support);
        let mirror = link.mirror();

        self.links[node_index(source)].push(link);
        if mirror != link {
            self.links[node_index(dest)].push(mirror);
        }
    }

    /// Remove every link between `source` and `dest` regardless of distance and support.
    /// Returns `true` if anything was removed.
    pub fn remove_link(&mut self, source: NodeId, dest: NodeId) -> bool {
        self.remove_matching(source, dest, |_| true)
    }

    /// Remove only links between `source` and `dest` with the given distance and support, used
    /// to tell apart parallel links of different spans.
    pub fn remove_link_exact(&mut self, source: NodeId, dest: NodeId, dist: i32, support: Support) -> bool {
        self.remove_matching(source, dest, |l| l.dist == dist && l.support == support)
    }

    fn remove_matching<F>(&mut self, source: NodeId, dest: NodeId, qualifies: F) -> bool
    where
        F: Fn(&Link) -> bool,
    {
        let mut removed = false;
        for (from, to) in [(source, dest), (dest, source)] {
            if let Some(list) = self.links.get_mut(node_index(from)) {
                let before = list.len();
                list.retain(|l| !(l.source == from && l.dest == to && qualifies(l)));
                removed |= list.len() != before;
            }
        }

        removed
    }

    /// All half-links stored for the slot of `node`, in both directions.
    pub fn links_of(&self, node: NodeId) -> &[Link] {
        self.links.get(node_index(node))
            .map(|l| l.as_slice())
            .unwrap_or(&[])
    }

    /// First link from `source` to `dest`, matching both ends.
    pub fn get_link(&self, source: NodeId, dest: NodeId) -> Option<Link> {
        self.links_of(source)
            .iter()
            .find(|l| l.source == source && l.dest == dest)
            .copied()
    }

    pub(crate) fn fw_links_iter(&self, node: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links_of(node).iter().filter(move |l| l.source == -node)
    }

    pub(crate) fn bw_links_iter(&self, node: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links_of(node).iter().filter(move |l| l.source == node)
    }

    /// Links leaving the output end of `node`.
    pub fn get_fw_links(&self, node: NodeId) -> Vec<Link> {
        self.fw_links_iter(node).copied().collect()
    }

    /// Links leaving the input end of `node`. Their `dest` is the previous node in reverse
    /// orientation.
    pub fn get_bw_links(&self, node: NodeId) -> Vec<Link> {
        self.bw_links_iter(node).copied().collect()
    }

    pub fn get_fw_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.fw_links_iter(node).map(|l| l.dest).collect()
    }

    /// Previous nodes, in the orientation they are traversed before `node`.
    pub fn get_bw_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.bw_links_iter(node).map(|l| -l.dest).collect()
    }

    pub fn get_neighbour_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut neighbours = self.get_fw_nodes(node);
        neighbours.extend(self.get_bw_nodes(node));

        neighbours
    }

    /// Neighbours of a loop node that are not themselves only part of the loop.
    pub fn get_flanking_nodes(&self, loopy_node: NodeId) -> Vec<NodeId> {
        let mut flanking = FxHashSet::default();
        for n in self.get_neighbour_nodes(loopy_node) {
            let fw = self.get_fw_nodes(n);
            let bw = self.get_bw_nodes(n);
            if fw == bw && fw.contains(&loopy_node) {
                continue;
            }

            flanking.insert(n.abs());
        }

        let mut flanking: Vec<_> = flanking.into_iter().collect();
        flanking.sort_unstable();

        flanking
    }

    /// Node sequence in the orientation given by the sign of `node`.
    pub fn get_node_sequence(&self, node: NodeId) -> Vec<u8> {
        match self.nodes.get(node_index(node)) {
            Some(n) if node < 0 => reverse_complement(&n.sequence),
            Some(n) => n.sequence.clone(),
            None => Vec::new(),
        }
    }

    pub fn get_node_size(&self, node: NodeId) -> usize {
        self.nodes.get(node_index(node)).map_or(0, Node::len)
    }

    /// Check that every stored half-link has its mirror stored at the other endpoint.
    pub fn is_sane(&self) -> bool {
        self.links.iter().all(|list| {
            list.iter().all(|l| {
                self.links_of(l.dest)
                    .iter()
                    .any(|m| m.source == l.dest && m.dest == l.source && m.dist == l.dist)
            })
        })
    }

    /// Name of a node in the file it was loaded from, `seq<id>` otherwise.
    pub fn node_name(&self, node: NodeId) -> String {
        let ix = node_index(node);
        match self.oldnames.get(ix) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("seq{ix}"),
        }
    }

    /// Signed id of a node by its original name.
    pub fn node_id_by_name(&self, name: &str) -> Option<NodeId> {
        self.oldnames_to_ids.get(name).copied()
    }

    pub(crate) fn register_name(&mut self, name: String, node: NodeId) {
        let ix = node_index(node);
        if self.oldnames.len() <= ix {
            self.oldnames.resize(ix + 1, String::new());
        }

        self.oldnames[ix] = name.clone();
        self.oldnames_to_ids.insert(name, node);
    }

    /// Translate a path specification such as `"ctg1+,ctg7-"` into signed node ids.
    pub fn oldnames_to_nodes(&self, spec: &str) -> Result<Vec<NodeId>, SdgError> {
        spec.split(',')
            .map(|step| {
                let step = step.trim();
                let (name, strand) = match step.char_indices().last() {
                    Some((pos, c @ ('+' | '-'))) if pos > 0 => (&step[..pos], c),
                    _ => return Err(SdgError::InvalidPathSpec(spec.to_string())),
                };

                let node = self.node_id_by_name(name)
                    .ok_or_else(|| SdgError::UnknownNodeName(name.to_string()))?;

                Ok(if strand == '-' { -node } else { node })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::mock::{create_linear_graph, create_repeat_graph};

    #[test]
    fn test_add_node_ids() {
        let mut graph = SequenceDistanceGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.node(0).is_active());

        let n1 = graph.add_node("ACGT");
        let n2 = graph.add_node("TTTT");
        assert_eq!((n1, n2), (1, 2));
        assert_eq!(graph.count_active_nodes(), 2);
        assert_eq!(graph.total_size(), 8);
    }

    #[test]
    fn test_add_link_is_mirrored() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("AAAAC");
        let b = graph.add_node("CGGGG");
        graph.add_link(-a, b, -1, Support::default());

        assert_eq!(graph.get_fw_nodes(a), vec![b]);
        assert_eq!(graph.get_bw_nodes(b), vec![a]);
        assert_eq!(graph.get_link(b, -a), Some(Link::new(b, -a, -1)));
        assert!(graph.is_sane());
    }

    #[test]
    fn test_get_link_matches_both_ends() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("AAAA");
        let b = graph.add_node("CCCC");
        graph.add_link(-a, b, 0, Support::default());

        // Same slot, wrong source end
        assert_eq!(graph.get_link(a, b), None);
        assert_eq!(graph.get_link(-a, -b), None);
        assert!(graph.get_link(-a, b).is_some());
    }

    #[test]
    fn test_remove_link_variants() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("AAAA");
        let b = graph.add_node("CCCC");
        let support = Support::new(SupportType::LongRead, 0, 7);
        graph.add_link(-a, b, 10, support);
        graph.add_link(-a, b, 250, support);

        assert!(!graph.remove_link_exact(-a, b, 99, support));
        assert!(graph.remove_link_exact(-a, b, 10, support));
        assert_eq!(graph.get_fw_links(a), vec![Link::with_support(-a, b, 250, support)]);
        assert!(graph.is_sane());

        assert!(graph.remove_link(b, -a));
        assert!(graph.get_fw_links(a).is_empty());
        assert!(graph.get_bw_links(b).is_empty());
        assert!(!graph.remove_link(-a, b));
    }

    #[test]
    fn test_remove_node_twice() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        graph.remove_node(b);

        assert!(!graph.is_active(b));
        assert!(graph.node(b).sequence.is_empty());
        assert!(graph.get_fw_links(b).is_empty());
        assert!(graph.get_bw_links(b).is_empty());
        assert!(graph.get_fw_links(a).is_empty());
        assert!(graph.get_bw_links(c).is_empty());
        assert!(graph.is_sane());

        graph.remove_node(b);
        assert!(graph.is_sane());
        assert!(graph.links_of(b).is_empty());
        assert_eq!(graph.count_active_nodes(), 2);
    }

    #[test]
    fn test_remove_node_with_two_links() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("ACGTA");
        let n = graph.add_node("CCCGT");
        let b = graph.add_node("TTTGA");
        graph.add_link(-a, n, 0, Support::default());
        graph.add_link(-n, b, 0, Support::default());

        graph.remove_node(n);
        assert!(graph.get_fw_links(n).is_empty());
        assert!(graph.get_bw_links(n).is_empty());
        assert!(graph.is_sane());
    }

    #[test]
    fn test_self_loop_link() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("ACGTT");
        // Output end of a folding back into its own output end
        graph.add_link(-a, a, -2, Support::default());
        assert_eq!(graph.links_of(a).len(), 2);
        assert!(graph.is_sane());

        let hairpin = graph.add_node("GGATCC");
        graph.add_link(-hairpin, -hairpin, 0, Support::default());
        assert_eq!(graph.links_of(hairpin).len(), 1);
        assert!(graph.is_sane());

        graph.remove_node(hairpin);
        assert!(graph.links_of(hairpin).is_empty());
    }

    #[test]
    fn test_is_sane_detects_one_sided_link() {
        let (mut graph, [a, b, _]) = create_linear_graph();
        graph.links[node_index(a)].push(Link::new(a, -b, 3));
        assert!(!graph.is_sane());
    }

    #[test]
    fn test_flanking_nodes() {
        let (graph, nodes) = create_repeat_graph();
        let flanking = graph.get_flanking_nodes(nodes.repeat);
        assert_eq!(flanking, vec![nodes.in1, nodes.in2, nodes.out1, nodes.out2]);
    }

    #[test]
    fn test_node_sequence_orientation() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("AACG");
        assert_eq!(graph.get_node_sequence(a), b"AACG");
        assert_eq!(graph.get_node_sequence(-a), b"CGTT");
        assert_eq!(graph.get_node_size(-a), 4);
        assert!(graph.get_node_sequence(42).is_empty());
    }

    #[test]
    fn test_oldnames_to_nodes() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("AAAA");
        let b = graph.add_node("CCCC");
        graph.register_name("ctg1".to_string(), a);
        graph.register_name("ctg2".to_string(), -b);

        assert_eq!(graph.oldnames_to_nodes("ctg1+,ctg2-").unwrap(), vec![a, b]);
        assert_eq!(graph.oldnames_to_nodes("ctg2+").unwrap(), vec![-b]);
        assert!(matches!(graph.oldnames_to_nodes("ctg1"), Err(SdgError::InvalidPathSpec(_))));
        assert!(matches!(graph.oldnames_to_nodes("ctg9+"), Err(SdgError::UnknownNodeName(_))));
        assert_eq!(graph.node_name(a), "ctg1");
        assert_eq!(graph.node_name(7), "seq7");
    }
}
