//! Small fixture graphs shared by the unit tests

use crate::graphs::{NodeId, SequenceDistanceGraph, Support};

/// Deterministic pseudo-random sequence, different for each `seed`.
pub(crate) fn make_seq(seed: usize, len: usize) -> Vec<u8> {
    let mut state = (seed as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);

    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

/// `A -> B -> C` with 5bp overlaps.
pub(crate) fn create_linear_graph() -> (SequenceDistanceGraph, [NodeId; 3]) {
    let mut graph = SequenceDistanceGraph::new();
    let a = graph.add_node("ACCGTTAGCATGCA");
    let b = graph.add_node("ATGCAGGTCAATCC");
    let c = graph.add_node("AATCCTTGACGA");

    graph.add_link(-a, b, -5, Support::default());
    graph.add_link(-b, c, -5, Support::default());

    (graph, [a, b, c])
}

pub(crate) struct RepeatNodes {
    pub in1: NodeId,
    pub in2: NodeId,
    pub repeat: NodeId,
    pub out1: NodeId,
    pub out2: NodeId,
}

/// Two inputs and two outputs around a single repeat node.
pub(crate) fn create_repeat_graph() -> (SequenceDistanceGraph, RepeatNodes) {
    let mut graph = SequenceDistanceGraph::new();
    let in1 = graph.add_node(make_seq(1, 30));
    let in2 = graph.add_node(make_seq(2, 30));
    let repeat = graph.add_node(make_seq(3, 30));
    let out1 = graph.add_node(make_seq(4, 30));
    let out2 = graph.add_node(make_seq(5, 30));

    for n in [in1, in2] {
        graph.add_link(-n, repeat, 0, Support::default());
    }
    for n in [out1, out2] {
        graph.add_link(-repeat, n, 0, Support::default());
    }

    (graph, RepeatNodes { in1, in2, repeat, out1, out2 })
}

/// `A -> C`, `B -> C`, `C -> D`.
pub(crate) fn create_converging_graph() -> (SequenceDistanceGraph, [NodeId; 4]) {
    let mut graph = SequenceDistanceGraph::new();
    let nodes: Vec<NodeId> = (0..4)
        .map(|i| graph.add_node(make_seq(10 + i, 20)))
        .collect();
    let [a, b, c, d] = [nodes[0], nodes[1], nodes[2], nodes[3]];

    graph.add_link(-a, c, 0, Support::default());
    graph.add_link(-b, c, 0, Support::default());
    graph.add_link(-c, d, 0, Support::default());

    (graph, [a, b, c, d])
}

/// `n` nodes joined in a single cycle, ids `1..=n`.
pub(crate) fn create_cycle_graph(n: usize) -> (SequenceDistanceGraph, Vec<NodeId>) {
    let mut graph = SequenceDistanceGraph::new();
    let nodes: Vec<NodeId> = (0..n)
        .map(|i| graph.add_node(make_seq(20 + i, 25)))
        .collect();

    for i in 0..n {
        graph.add_link(-nodes[i], nodes[(i + 1) % n], 0, Support::default());
    }

    (graph, nodes)
}

/// A chain of simple bubbles: `anchor0 -> {top1, bottom1} -> anchor1 -> {top2, bottom2} -> ...`.
///
/// Nodes are returned as `[anchor0, top1, bottom1, anchor1, top2, bottom2, anchor2, ...]`.
pub(crate) fn create_bubble_chain(bubbles: usize) -> (SequenceDistanceGraph, Vec<NodeId>) {
    let mut graph = SequenceDistanceGraph::new();
    let mut nodes = vec![graph.add_node(make_seq(100, 40))];

    for i in 0..bubbles {
        let prev = nodes[nodes.len() - 1];
        let top = graph.add_node(make_seq(101 + 3 * i, 15));
        let bottom = graph.add_node(make_seq(102 + 3 * i, 15));
        let anchor = graph.add_node(make_seq(103 + 3 * i, 40));

        for hap in [top, bottom] {
            graph.add_link(-prev, hap, 0, Support::default());
            graph.add_link(-hap, anchor, 0, Support::default());
        }

        nodes.extend([top, bottom, anchor]);
    }

    (graph, nodes)
}
