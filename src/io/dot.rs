use std::fmt;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::graphs::{is_forward, node_index, NodeId, SequenceDistanceGraph};

fn end_marker(node: NodeId) -> char {
    if is_forward(node) { '+' } else { '-' }
}

/// Render active nodes and every link once (from the half with `source <= dest`) in DOT format.
///
/// Edges point from the source slot to the destination slot, labelled with the signed ends and
/// the distance.
pub fn graph_to_dot(writer: &mut impl fmt::Write, graph: &SequenceDistanceGraph) -> fmt::Result {
    let mut dot_graph: DiGraph<String, String> = DiGraph::new();
    let mut ix_map: FxHashMap<usize, NodeIndex> = FxHashMap::default();

    for ix in 1..graph.node_count() {
        let node = ix as NodeId;
        if graph.is_active(node) {
            let label = format!("{} ({}bp)", graph.node_name(node), graph.get_node_size(node));
            ix_map.insert(ix, dot_graph.add_node(label));
        }
    }

    for l in graph.links.iter().flatten().filter(|l| l.source <= l.dest) {
        let (Some(&from), Some(&to)) = (ix_map.get(&node_index(l.source)), ix_map.get(&node_index(l.dest))) else {
            continue;
        };

        dot_graph.add_edge(from, to, format!("{}{} {}", end_marker(l.source), end_marker(l.dest), l.dist));
    }

    writeln!(writer, "{}", Dot::new(&dot_graph))
}
