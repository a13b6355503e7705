pub mod graph;
pub mod gfa;
pub mod fasta;
pub mod dot;

pub use graph::{save_graph, load_graph, save_graph_to_file, load_graph_from_file};
pub use gfa::{load_from_gfa, write_to_gfa1, write_to_gfa2, GfaOutputOptions};
pub use fasta::{load_from_fasta, load_from_fasta_canonical};
pub use dot::graph_to_dot;
