//! Audited structural edits.
//!
//! A [`GraphEditor`] remembers which nodes it modified during the current batch. An edit touching
//! one of those nodes again is refused with [`SdgError::EditConflict`] instead of working on a
//! region whose shape changed under it. Call [`GraphEditor::new_batch`] to start over.

use std::mem;

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::errors::SdgError;
use crate::graphs::{node_index, NodeId, SequenceDistanceGraph, SequenceGraphPath, Support, SupportType};

/// Result of trying to patch a gap between two nodes with an external sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    Success,

    /// The end of the start node does not occur in the patch
    AnchorNotFound,

    /// The walk through the patch ended somewhere other than the requested node
    WrongEndpoint,

    /// The path was found, but detaching it conflicted with an earlier edit
    DetachFailed,
}

#[derive(Debug, Clone)]
pub enum EditOperation {
    NodeExpansion {
        node: NodeId,
        bw_groups: Vec<Vec<NodeId>>,
        fw_groups: Vec<Vec<NodeId>>,
    },
    PathDetachment {
        path: SequenceGraphPath,
        consume_tips: bool,
    },
}

pub struct GraphEditor<'a> {
    graph: &'a mut SequenceDistanceGraph,
    config: EditorConfig,
    edited_nodes: FxHashSet<usize>,
    queued_nodes: FxHashSet<usize>,
    queue: Vec<EditOperation>,
}

impl<'a> GraphEditor<'a> {
    pub fn new(graph: &'a mut SequenceDistanceGraph) -> Self {
        Self::with_config(graph, EditorConfig::default())
    }

    pub fn with_config(graph: &'a mut SequenceDistanceGraph, config: EditorConfig) -> Self {
        GraphEditor {
            graph,
            config,
            edited_nodes: FxHashSet::default(),
            queued_nodes: FxHashSet::default(),
            queue: Vec::new(),
        }
    }

    pub fn graph(&self) -> &SequenceDistanceGraph {
        &*self.graph
    }

    pub fn is_edited(&self, node: NodeId) -> bool {
        self.edited_nodes.contains(&node_index(node))
    }

    /// Forget all edits and pending operations of the current batch.
    pub fn new_batch(&mut self) {
        self.edited_nodes.clear();
        self.queued_nodes.clear();
        self.queue.clear();
    }

    fn check_not_edited(&self, nodes: &[NodeId]) -> Result<(), SdgError> {
        match nodes.iter().find(|&&n| self.is_edited(n)) {
            Some(&n) => Err(SdgError::EditConflict(n)),
            None => Ok(()),
        }
    }

    fn mark_edited(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.edited_nodes.extend(nodes.into_iter().map(node_index));
    }

    /// Give the interior of `path` its own copy so it is no longer shared with other walks.
    ///
    /// The first node of the path then only leads into the copy, and the last node is only
    /// reached from it. A two-node path needs no copy, the links diverging from it are removed.
    /// Paths that already are unitigs are left alone. Every consecutive pair must be linked,
    /// otherwise [`SdgError::PathHasNoLink`] is returned before anything changes.
    ///
    /// Interior nodes left without links on one side are only deleted when `consume_tips` is
    /// set. Without it they stay in the graph as tips.
    pub fn detach_path(&mut self, path: &SequenceGraphPath, consume_tips: bool) -> Result<(), SdgError> {
        let nodes = &path.nodes;
        match nodes.len() {
            0 => return Err(SdgError::EmptyPath),
            1 => return Ok(()),
            _ => (),
        }

        if path.is_unitig(self.graph) {
            return Ok(());
        }

        self.check_not_edited(nodes)?;

        let last = nodes.len() - 1;
        if nodes.len() == 2 {
            let (a, b) = (nodes[0], nodes[1]);
            if self.graph.get_link(-a, b).is_none() {
                return Err(SdgError::PathHasNoLink { from: a, to: b });
            }

            for l in self.graph.get_fw_links(a) {
                if l.dest != b {
                    self.graph.remove_link(l.source, l.dest);
                }
            }
            for l in self.graph.get_bw_links(b) {
                if l.dest != -a {
                    self.graph.remove_link(l.source, l.dest);
                }
            }

            self.mark_edited([a, b]);
            return Ok(());
        }

        let first_link = self.graph.get_link(-nodes[0], nodes[1])
            .ok_or(SdgError::PathHasNoLink { from: nodes[0], to: nodes[1] })?;
        let last_link = self.graph.get_link(-nodes[last - 1], nodes[last])
            .ok_or(SdgError::PathHasNoLink { from: nodes[last - 1], to: nodes[last] })?;

        let mut middle = SequenceGraphPath::new(nodes[1..last].to_vec());
        let (mut src, mut dest) = (nodes[0], nodes[last]);
        let (mut dist_in, mut dist_out) = (first_link.dist, last_link.dist);

        if !middle.is_canonical(self.graph)? {
            middle.reverse();
            (src, dest) = (-dest, -src);
            mem::swap(&mut dist_in, &mut dist_out);
        }

        let sequence = middle.sequence(self.graph)?;
        let new_node = self.graph.add_node(sequence);
        let support = Support::new(SupportType::Operation, 0, new_node as u64);

        for l in self.graph.get_fw_links(src) {
            self.graph.remove_link(l.source, l.dest);
        }
        self.graph.add_link(-src, new_node, dist_in, support);

        for l in self.graph.get_bw_links(dest) {
            self.graph.remove_link(l.source, l.dest);
        }
        self.graph.add_link(-new_node, dest, dist_out, support);

        debug!("Detached path {path} through new node {new_node}");
        self.mark_edited([src, dest, new_node]);

        if consume_tips {
            let removed = self.graph.remove_nodes_to_fixed_point(&middle.nodes, |g, n| {
                g.get_fw_links(n).is_empty() || g.get_bw_links(n).is_empty()
            });

            self.mark_edited(removed);
        }

        Ok(())
    }

    /// Walk from `node` along the graph as far as the sequence `patch` allows.
    ///
    /// The last `anchor_size` bases of `node` are located in `patch`, then the walk repeatedly
    /// moves to the single next node whose sequence agrees with the patch at the offset given by
    /// the link distance. It stops when the patch is used up, when no or several next nodes agree,
    /// or when a step would not advance through the patch. Returns an empty path if the anchor is
    /// not found.
    pub fn find_longest_path_from(&self, node: NodeId, patch: &[u8]) -> SequenceGraphPath {
        let mut path = SequenceGraphPath::default();

        let node_seq = self.graph.get_node_sequence(node);
        let anchor = &node_seq[node_seq.len().saturating_sub(self.config.anchor_size)..];
        if anchor.is_empty() || anchor.len() > patch.len() {
            return path;
        }

        let Some(anchor_pos) = patch.windows(anchor.len()).position(|w| w == anchor) else {
            return path;
        };

        let mut last_end = anchor_pos + anchor.len();
        path.nodes.push(node);

        while last_end < patch.len() {
            let Some(&current) = path.nodes.last() else {
                break;
            };

            let mut next: Option<(NodeId, usize)> = None;
            let mut ambiguous = false;

            for l in self.graph.get_fw_links(current) {
                let start = last_end as i64 + l.dist as i64;
                if start < 0 || start as usize > patch.len() {
                    continue;
                }

                let start = start as usize;
                let candidate = self.graph.get_node_sequence(l.dest);
                let consistent = patch[start..].iter()
                    .zip(&candidate)
                    .all(|(a, b)| a == b);

                if consistent {
                    if next.is_some() {
                        ambiguous = true;
                        break;
                    }

                    next = Some((l.dest, start));
                }
            }

            let Some((next_node, start)) = next.filter(|_| !ambiguous) else {
                break;
            };

            let end = start + self.graph.get_node_size(next_node);
            if end <= last_end {
                break;
            }

            path.nodes.push(next_node);
            last_end = end;
        }

        path
    }

    /// Use `patch` to resolve the region between `from` and `to`, detaching the walk found.
    pub fn patch_between(&mut self, from: NodeId, to: NodeId, patch: &[u8]) -> Result<PatchStatus, SdgError> {
        let path = self.find_longest_path_from(from, patch);

        if path.is_empty() {
            return Ok(PatchStatus::AnchorNotFound);
        }

        if path.nodes.last() != Some(&to) {
            return Ok(PatchStatus::WrongEndpoint);
        }

        match self.detach_path(&path, true) {
            Ok(()) => Ok(PatchStatus::Success),
            Err(SdgError::EditConflict(n)) => {
                debug!("Patch between {from} and {to} conflicts with an earlier edit of node {n}");
                Ok(PatchStatus::DetachFailed)
            },
            Err(e) => Err(e),
        }
    }

    /// Delete every connected component with at most `max_nodes` nodes, no node larger than
    /// `max_size` and at most `max_total` bp overall. All three bounds are inclusive, a component
    /// sitting exactly on a limit is deleted. Returns the number of deleted nodes.
    pub fn remove_small_components(&mut self, max_nodes: usize, max_size: usize, max_total: usize) -> usize {
        let to_remove: Vec<NodeId> = self.graph.connected_components()
            .into_iter()
            .filter(|c| c.len() <= max_nodes)
            .filter(|c| {
                let sizes = c.iter().map(|&n| self.graph.get_node_size(n));
                sizes.clone().all(|s| s <= max_size) && sizes.sum::<usize>() <= max_total
            })
            .flatten()
            .collect();

        let total_bp: usize = to_remove.iter()
            .map(|&n| self.graph.get_node_size(n))
            .sum();
        info!("There are {} nodes and {total_bp}bp in small unconnected components", to_remove.len());

        for &n in &to_remove {
            self.graph.remove_node(n);
        }
        self.mark_edited(to_remove.iter().copied());

        to_remove.len()
    }

    /// [`SequenceDistanceGraph::join_path`], refusing paths through nodes edited in this batch.
    pub fn join_path(&mut self, path: &SequenceGraphPath, consume: bool) -> Result<NodeId, SdgError> {
        self.check_not_edited(&path.nodes)?;

        let new_node = self.graph.join_path(path, consume)?;
        self.mark_edited(path.nodes.iter().copied().chain([new_node]));

        Ok(new_node)
    }

    fn reserve(&mut self, nodes: &[NodeId]) -> bool {
        let clash = nodes.iter()
            .any(|&n| self.is_edited(n) || self.queued_nodes.contains(&node_index(n)));
        if clash {
            return false;
        }

        self.queued_nodes.extend(nodes.iter().map(|&n| node_index(n)));
        true
    }

    /// Queue a node expansion. Returns `false` if it touches nodes already queued or edited.
    pub fn queue_node_expansion(&mut self, node: NodeId, bw_groups: Vec<Vec<NodeId>>, fw_groups: Vec<Vec<NodeId>>) -> bool {
        let touched: Vec<NodeId> = [node].into_iter()
            .chain(bw_groups.iter().flatten().copied())
            .chain(fw_groups.iter().flatten().copied())
            .collect();

        if !self.reserve(&touched) {
            return false;
        }

        self.queue.push(EditOperation::NodeExpansion { node, bw_groups, fw_groups });
        true
    }

    /// Queue a path detachment. Returns `false` if it touches nodes already queued or edited.
    pub fn queue_path_detachment(&mut self, path: SequenceGraphPath, consume_tips: bool) -> bool {
        if !self.reserve(&path.nodes) {
            return false;
        }

        self.queue.push(EditOperation::PathDetachment { path, consume_tips });
        true
    }

    /// Apply queued operations in order. Stops at the first failing operation, dropping the
    /// rest of the queue. Returns the number of applied operations.
    pub fn apply_all(&mut self) -> Result<usize, SdgError> {
        let queue = mem::take(&mut self.queue);
        self.queued_nodes.clear();

        let mut applied = 0;
        for op in queue {
            match op {
                EditOperation::NodeExpansion { node, bw_groups, fw_groups } => {
                    let copies = self.graph.expand_node(node, &bw_groups, &fw_groups)?;
                    self.mark_edited(
                        [node].into_iter()
                            .chain(copies)
                            .chain(bw_groups.into_iter().flatten())
                            .chain(fw_groups.into_iter().flatten())
                    );
                },
                EditOperation::PathDetachment { path, consume_tips } => {
                    self.detach_path(&path, consume_tips)?;
                },
            }

            applied += 1;
        }

        info!("Applied {applied} queued edits");

        Ok(applied)
    }
}
