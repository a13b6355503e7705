use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::errors::SdgError;
use crate::graphs::{node_index, Link, NodeId, SequenceDistanceGraph, SequenceGraphPath};

impl SequenceDistanceGraph {
    /// Remove candidates as long as `should_remove` holds for one of them.
    ///
    /// Removing a node can change the answer for its neighbours, so the neighbours that are
    /// themselves candidates are checked again. Returns the removed nodes in removal order.
    pub(crate) fn remove_nodes_to_fixed_point<F>(&mut self, candidates: &[NodeId], mut should_remove: F) -> Vec<NodeId>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        let oriented: FxHashMap<usize, NodeId> = candidates.iter()
            .map(|&n| (node_index(n), n))
            .collect();

        let mut queue: VecDeque<NodeId> = candidates.iter().copied().collect();
        let mut queued: FxHashSet<usize> = oriented.keys().copied().collect();
        let mut removed = Vec::new();

        while let Some(n) = queue.pop_front() {
            queued.remove(&node_index(n));
            if !self.is_active(n) || !should_remove(self, n) {
                continue;
            }

            let neighbours = self.get_neighbour_nodes(n);
            self.remove_node(n);
            removed.push(n);

            for m in neighbours {
                let ix = node_index(m);
                if let Some(&candidate) = oriented.get(&ix) {
                    if self.is_active(candidate) && queued.insert(ix) {
                        queue.push_back(candidate);
                    }
                }
            }
        }

        removed
    }

    /// Replace a path by a single node carrying its sequence.
    ///
    /// The new node receives the links entering the first node and leaving the last node of the
    /// path, except links pointing back into the path. A link from the last node to the first
    /// one becomes a self loop. With `consume`, path nodes without any link leaving the path are
    /// deleted. Returns the id of the new node.
    pub fn join_path(&mut self, path: &SequenceGraphPath, consume: bool) -> Result<NodeId, SdgError> {
        if path.is_empty() {
            return Err(SdgError::EmptyPath);
        }

        for &n in &path.nodes {
            self.check_node(n)?;
        }

        let pnodes: FxHashSet<NodeId> = path.nodes.iter()
            .flat_map(|&n| [n, -n])
            .collect();

        let path = if path.is_canonical(self)? {
            path.clone()
        } else {
            path.reversed()
        };

        let sequence = path.sequence(self)?;
        let (front, back) = match (path.nodes.first(), path.nodes.last()) {
            (Some(&f), Some(&b)) => (f, b),
            _ => return Err(SdgError::EmptyPath),
        };

        let bw_links = self.get_bw_links(front);
        let fw_links = self.get_fw_links(back);

        let new_node = self.add_node(sequence);
        for l in bw_links {
            if !pnodes.contains(&l.dest) {
                self.add_link(new_node, l.dest, l.dist, l.support);
            }
        }

        for l in fw_links {
            if l.dest == front {
                self.add_link(-new_node, new_node, l.dist, l.support);
            } else if !pnodes.contains(&l.dest) {
                self.add_link(-new_node, l.dest, l.dist, l.support);
            }
        }

        debug!("Joined path {path} into node {new_node}");

        if consume {
            self.remove_nodes_to_fixed_point(&path.nodes, |g, n| {
                let external_fw = n != back && g.fw_links_iter(n).any(|l| !pnodes.contains(&l.dest));
                let external_bw = n != front && g.bw_links_iter(n).any(|l| !pnodes.contains(&l.dest));

                !external_fw && !external_bw
            });
        }

        Ok(new_node)
    }

    /// Collapse every unitig of two or more nodes into a single node. Returns the number of
    /// joined unitigs.
    pub fn join_all_unitigs(&mut self) -> Result<usize, SdgError> {
        let unitigs = self.get_all_unitigs(2);
        for p in &unitigs {
            self.join_path(p, true)?;
        }

        info!("Joined {} unitigs", unitigs.len());

        Ok(unitigs.len())
    }

    /// Split a repeat node into one copy per group.
    ///
    /// `bw_groups[i]` lists the link destinations on the input side of `node` (the previous
    /// nodes in reverse orientation) and `fw_groups[i]` the next nodes that copy `i` keeps. Each
    /// link goes to the first group that lists it; links not listed anywhere are dropped. The
    /// original node is deleted. Returns the new copies in group order.
    pub fn expand_node(
        &mut self,
        node: NodeId,
        bw_groups: &[Vec<NodeId>],
        fw_groups: &[Vec<NodeId>],
    ) -> Result<Vec<NodeId>, SdgError> {
        if bw_groups.len() != fw_groups.len() {
            return Err(SdgError::InvalidExpansion {
                bw_groups: bw_groups.len(),
                fw_groups: fw_groups.len(),
            });
        }

        let ix = self.check_node(node)?;

        // Groups hold link destinations, which do not depend on the orientation the node is
        // seen from. Only the sides swap.
        let (node, bw_groups, fw_groups) = if node < 0 {
            (-node, fw_groups, bw_groups)
        } else {
            (node, bw_groups, fw_groups)
        };

        let mut group_links: Vec<Vec<Link>> = vec![Vec::new(); bw_groups.len()];
        for l in self.links[ix].clone() {
            let groups = if l.source == node {
                bw_groups
            } else if l.source == -node {
                fw_groups
            } else {
                continue;
            };

            if let Some(g) = groups.iter().position(|g| g.contains(&l.dest)) {
                group_links[g].push(l);
            }
        }

        let sequence = self.nodes[ix].sequence.clone();
        let mut copies = Vec::with_capacity(group_links.len());
        for links in group_links {
            let copy = self.add_node(sequence.clone());
            for l in links {
                let source = if l.source > 0 { copy } else { -copy };
                self.add_link(source, l.dest, l.dist, l.support);
            }

            copies.push(copy);
        }

        self.remove_node(node);
        debug!("Expanded node {node} into {copies:?}");

        Ok(copies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::mock::{create_linear_graph, create_repeat_graph};
    use crate::graphs::Support;

    fn sorted_links(mut links: Vec<Link>) -> Vec<(NodeId, i32)> {
        links.sort();
        links.into_iter().map(|l| (l.dest, l.dist)).collect()
    }

    #[test]
    fn test_join_all_unitigs_linear() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        let expected = graph.get_node_size(a) + graph.get_node_size(b) + graph.get_node_size(c) - 10;

        assert_eq!(graph.join_all_unitigs().unwrap(), 1);
        assert_eq!(graph.count_active_nodes(), 1);
        assert!(!graph.is_active(a) && !graph.is_active(b) && !graph.is_active(c));

        let joined = graph.get_all_nodeviews(true);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].size(), expected);
        assert!(graph.is_sane());
    }

    #[test]
    fn test_join_path_keeps_boundary_links() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        let pre = graph.add_node("GGGTACGA");
        let post1 = graph.add_node("TTTTAGCA");
        let post2 = graph.add_node("AACCGTAG");
        graph.add_link(-pre, a, 10, Support::default());
        graph.add_link(-c, post1, 0, Support::default());
        graph.add_link(-c, post2, 25, Support::default());

        let path = SequenceGraphPath::new(vec![a, b, c]);
        let bw_before = sorted_links(graph.get_bw_links(a));
        let fw_before = sorted_links(graph.get_fw_links(c));

        let joined = graph.join_path(&path, true).unwrap();
        assert_eq!(sorted_links(graph.get_bw_links(joined)), bw_before);
        assert_eq!(sorted_links(graph.get_fw_links(joined)), fw_before);
        assert_eq!(graph.get_fw_nodes(pre), vec![joined]);
        assert_eq!(graph.count_active_nodes(), 4);
        assert!(graph.is_sane());
    }

    #[test]
    fn test_join_non_canonical_path() {
        let mut graph = SequenceDistanceGraph::new();
        let pre = graph.add_node("CCGATAG");
        let x = graph.add_node("TTTTGGG");
        let y = graph.add_node("GGGCCTT");
        let post = graph.add_node("ACGTTAC");
        graph.add_link(-pre, x, 7, Support::default());
        graph.add_link(-x, y, -3, Support::default());
        graph.add_link(-y, post, 11, Support::default());

        let path = SequenceGraphPath::new(vec![x, y]);
        assert!(!path.is_canonical(&graph).unwrap());

        // The joined node stores the reverse complement, the path reads along -joined
        let joined = graph.join_path(&path, true).unwrap();
        assert_eq!(graph.get_node_sequence(joined), b"AAGGCCCAAAA");
        assert_eq!(graph.get_node_sequence(-joined), b"TTTTGGGCCTT");

        assert_eq!(sorted_links(graph.get_fw_links(-joined)), vec![(post, 11)]);
        assert_eq!(sorted_links(graph.get_bw_links(-joined)), vec![(-pre, 7)]);
        assert_eq!(graph.get_fw_nodes(pre), vec![-joined]);
        assert_eq!(graph.get_bw_nodes(post), vec![-joined]);

        assert!(!graph.is_active(x) && !graph.is_active(y));
        assert!(graph.is_sane());
    }

    #[test]
    fn test_join_path_without_consume() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        let joined = graph.join_path(&SequenceGraphPath::new(vec![a, b]), false).unwrap();

        assert!(graph.is_active(a) && graph.is_active(b));
        assert_eq!(graph.get_fw_nodes(joined), vec![c]);
        assert_eq!(graph.get_bw_nodes(c).len(), 2);
        assert!(graph.is_sane());
    }

    #[test]
    fn test_join_path_keeps_shared_nodes() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        let branch = graph.add_node("CCATGGA");
        graph.add_link(-b, branch, 0, Support::default());

        graph.join_path(&SequenceGraphPath::new(vec![a, b, c]), true).unwrap();

        // b still leads somewhere outside of the path
        assert!(!graph.is_active(a));
        assert!(graph.is_active(b));
        assert!(!graph.is_active(c));
        assert!(graph.is_sane());
    }

    #[test]
    fn test_join_circular_path() {
        let (mut graph, [a, b, c]) = create_linear_graph();
        graph.add_link(-c, a, 0, Support::default());

        let joined = graph.join_path(&SequenceGraphPath::new(vec![a, b, c]), true).unwrap();
        assert_eq!(graph.get_fw_nodes(joined), vec![joined]);
        assert_eq!(graph.count_active_nodes(), 1);
        assert!(graph.is_sane());
    }

    #[test]
    fn test_join_empty_path() {
        let (mut graph, _) = create_linear_graph();
        assert!(matches!(graph.join_path(&SequenceGraphPath::default(), true), Err(SdgError::EmptyPath)));
    }

    #[test]
    fn test_expand_repeat() {
        let (mut graph, n) = create_repeat_graph();

        let copies = graph.expand_node(n.repeat, &[vec![-n.in1], vec![-n.in2]], &[vec![n.out1], vec![n.out2]])
            .unwrap();
        assert_eq!(copies.len(), 2);

        assert_eq!(graph.get_bw_nodes(copies[0]), vec![n.in1]);
        assert_eq!(graph.get_fw_nodes(copies[0]), vec![n.out1]);
        assert_eq!(graph.get_bw_nodes(copies[1]), vec![n.in2]);
        assert_eq!(graph.get_fw_nodes(copies[1]), vec![n.out2]);
        assert_eq!(graph.node(copies[0]).sequence, graph.node(copies[1]).sequence);

        assert!(!graph.is_active(n.repeat));
        assert!(graph.links_of(n.repeat).is_empty());
        assert!(graph.is_sane());
    }

    #[test]
    fn test_expand_reverse_orientation() {
        let (mut graph, n) = create_repeat_graph();

        // Seen from the other strand, the outputs come in and the inputs go out
        let copies = graph.expand_node(-n.repeat, &[vec![n.out1], vec![n.out2]], &[vec![-n.in1], vec![-n.in2]])
            .unwrap();

        assert_eq!(graph.get_bw_nodes(copies[0]), vec![n.in1]);
        assert_eq!(graph.get_fw_nodes(copies[0]), vec![n.out1]);
        assert_eq!(graph.get_fw_nodes(copies[1]), vec![n.out2]);
        assert!(graph.is_sane());
    }

    #[test]
    fn test_expand_invalid_groups() {
        let (mut graph, n) = create_repeat_graph();
        let res = graph.expand_node(n.repeat, &[vec![-n.in1]], &[vec![n.out1], vec![n.out2]]);
        assert!(matches!(res, Err(SdgError::InvalidExpansion { bw_groups: 1, fw_groups: 2 })));
        assert!(graph.is_active(n.repeat));
    }
}
