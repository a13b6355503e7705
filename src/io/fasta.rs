use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta::{self as fasta, record::{Definition, Sequence}, Record};
use tracing::info;

use crate::errors::SdgError;
use crate::graphs::{node_index, NodeId, SequenceDistanceGraph};

/// Open a possibly gzipped text file, failing on empty files.
pub(crate) fn open_input(path: &Path) -> Result<Box<dyn BufRead>, SdgError> {
    let file = File::open(path)
        .map_err(|source| SdgError::FileReadError { path: path.to_path_buf(), source })?;

    if file.metadata()?.len() == 0 {
        return Err(SdgError::EmptyFile(path.to_path_buf()));
    }

    let is_gzipped = path
        .file_name()
        .map(|v| v.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false);

    Ok(if is_gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Add one node per FASTA record, named after the record. Returns the number of nodes that
/// were stored as their reverse complement.
///
/// With `canonise`, non-canonical sequences are flipped and their name maps to the negative id.
pub(crate) fn read_fasta_nodes(
    graph: &mut SequenceDistanceGraph,
    path: &Path,
    canonise: bool,
) -> Result<usize, SdgError> {
    let mut reader = fasta::io::Reader::new(open_input(path)?);

    let mut flipped = 0;
    for result in reader.records() {
        let record = result?;
        let name = String::from_utf8_lossy(record.name()).into_owned();

        if graph.node_id_by_name(&name).is_some() {
            return Err(SdgError::DuplicateSequence(name));
        }

        let seq: &[u8] = record.sequence().as_ref();
        let mut node = graph.add_node(seq.to_ascii_uppercase());

        if canonise && !graph.nodes[node_index(node)].is_canonical() {
            graph.nodes[node_index(node)].make_rc();
            node = -node;
            flipped += 1;
        }

        graph.register_name(name, node);
    }

    Ok(flipped)
}

/// Load a graph without links from a FASTA file, one node per sequence.
pub fn load_from_fasta(path: impl AsRef<Path>) -> Result<SequenceDistanceGraph, SdgError> {
    let p = path.as_ref();
    info!("Loading sequences from {}", p.display());

    let mut graph = SequenceDistanceGraph::new();
    read_fasta_nodes(&mut graph, p, false)?;

    info!("{} nodes loaded", graph.node_count() - 1);

    Ok(graph)
}

/// Same as [`load_from_fasta`], storing every sequence in its canonical orientation.
pub fn load_from_fasta_canonical(path: impl AsRef<Path>) -> Result<SequenceDistanceGraph, SdgError> {
    let p = path.as_ref();
    info!("Loading sequences from {}", p.display());

    let mut graph = SequenceDistanceGraph::new();
    let flipped = read_fasta_nodes(&mut graph, p, true)?;

    info!("{} nodes loaded ({} canonised)", graph.node_count() - 1, flipped);

    Ok(graph)
}

/// Write the stored sequence of active nodes as `seq<id>` records. An empty selection writes
/// every node.
pub fn write_fasta<W>(graph: &SequenceDistanceGraph, output: W, selected: &[NodeId]) -> Result<(), SdgError>
    where W: Write
{
    let mut writer = fasta::io::Writer::new(output);

    for ix in 1..graph.node_count() {
        let node = ix as NodeId;
        if !graph.is_active(node) || !is_selected(selected, node) {
            continue;
        }

        let header = Definition::new(format!("seq{ix}"), None);
        let record = Record::new(header, Sequence::from(graph.node(node).sequence.clone()));

        writer.write_record(&record)?;
    }

    Ok(())
}

pub(crate) fn is_selected(selected: &[NodeId], node: NodeId) -> bool {
    selected.is_empty() || selected.iter().any(|&n| node_index(n) == node_index(node))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;
    use crate::graphs::reverse_complement;

    #[test]
    fn test_load_from_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contigs.fasta");
        std::fs::write(&path, ">ctg1 first contig\nacgtAC\nGT\n>ctg2\nTTTTGG\n").unwrap();

        let graph = load_from_fasta(&path).unwrap();
        assert_eq!(graph.count_active_nodes(), 2);
        assert_eq!(graph.node_id_by_name("ctg1"), Some(1));
        assert_eq!(graph.node(1).sequence, b"ACGTACGT");
        assert_eq!(graph.node(2).sequence, b"TTTTGG");
        assert_eq!(graph.node_name(2), "ctg2");
        assert!(graph.links_of(1).is_empty());
    }

    #[test]
    fn test_load_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contigs.fa");
        std::fs::write(&path, ">ctg1\nTTTTGG\n>ctg2\nAACC\n").unwrap();

        let graph = load_from_fasta_canonical(&path).unwrap();
        assert_eq!(graph.node_id_by_name("ctg1"), Some(-1));
        assert_eq!(graph.node(1).sequence, reverse_complement(b"TTTTGG"));
        assert_eq!(graph.get_node_sequence(-1), b"TTTTGG");
        assert_eq!(graph.node_id_by_name("ctg2"), Some(2));
    }

    #[test]
    fn test_load_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contigs.fasta.gz");

        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b">a\nACGT\n>b\nGGCC\n").unwrap();
        enc.finish().unwrap();

        let graph = load_from_fasta(&path).unwrap();
        assert_eq!(graph.count_active_nodes(), 2);
        assert_eq!(graph.node(2).sequence, b"GGCC");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let dup = dir.path().join("dup.fasta");
        std::fs::write(&dup, ">a\nACGT\n>a\nGGCC\n").unwrap();
        assert!(matches!(load_from_fasta(&dup), Err(SdgError::DuplicateSequence(n)) if n == "a"));

        let empty = dir.path().join("empty.fasta");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(load_from_fasta(&empty), Err(SdgError::EmptyFile(_))));

        assert!(matches!(
            load_from_fasta(dir.path().join("missing.fasta")),
            Err(SdgError::FileReadError { .. })
        ));
    }

    #[test]
    fn test_write_fasta() {
        let mut graph = SequenceDistanceGraph::new();
        let a = graph.add_node("ACGT");
        let b = graph.add_node("GGGA");
        let c = graph.add_node("TTAC");
        graph.remove_node(b);

        let mut out = Vec::new();
        write_fasta(&graph, &mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">seq1\nACGT\n>seq3\nTTAC\n");

        let mut out = Vec::new();
        write_fasta(&graph, &mut out, &[-c]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">seq3\nTTAC\n");
        assert!(is_selected(&[], a));
    }
}
