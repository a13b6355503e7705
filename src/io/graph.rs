//! Graph serialization to disk using serde

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::SdgError;
use crate::graphs::sdg::LinkList;
use crate::graphs::{node_index, Node, NodeId, NodeStatus, SequenceDistanceGraph};

/// "SDG1"
pub const GRAPH_MAGIC: u32 = 0x5344_4731;
pub const FORMAT_VERSION: u16 = 1;
pub const FILE_TYPE_GRAPH: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FileHeader {
    magic: u32,
    version: u16,
    file_type: u16,
}

impl FileHeader {
    fn for_graph() -> Self {
        FileHeader {
            magic: GRAPH_MAGIC,
            version: FORMAT_VERSION,
            file_type: FILE_TYPE_GRAPH,
        }
    }

    fn validate(&self) -> Result<(), SdgError> {
        if self.magic != GRAPH_MAGIC {
            return Err(SdgError::BadMagic(self.magic));
        }

        if self.version != FORMAT_VERSION {
            return Err(SdgError::UnsupportedVersion(self.version));
        }

        if self.file_type != FILE_TYPE_GRAPH {
            return Err(SdgError::WrongFileType(self.file_type));
        }

        Ok(())
    }
}

/// Original names of the nodes, stored after the graph stream.
#[derive(Debug, Default, Serialize, Deserialize)]
struct NameTable {
    graph_name: String,
    names: Vec<(String, NodeId)>,
}

impl SequenceDistanceGraph {
    /// Write the node and link storage.
    pub fn write(&self, out: &mut impl Write) -> Result<(), SdgError> {
        bincode::serialize_into(&mut *out, &self.nodes)?;
        bincode::serialize_into(&mut *out, &self.links)?;

        Ok(())
    }

    /// Read a graph written by [`SequenceDistanceGraph::write`], checking that the link lists
    /// are consistent with the nodes.
    pub fn read(reader: &mut impl Read) -> Result<Self, SdgError> {
        let nodes: Vec<Node> = bincode::deserialize_from(&mut *reader)?;
        let links: Vec<LinkList> = bincode::deserialize_from(&mut *reader)?;

        match nodes.first() {
            None => return Err(SdgError::InvalidFormat("graph has no placeholder node")),
            Some(n) if n.status != NodeStatus::Deleted =>
                return Err(SdgError::InvalidFormat("slot 0 is not a deleted placeholder")),
            _ => (),
        }

        if links.len() != nodes.len() {
            return Err(SdgError::InvalidFormat("link list count differs from node count"));
        }

        for (ix, list) in links.iter().enumerate() {
            for l in list {
                if l.source == 0 || node_index(l.source) != ix {
                    return Err(SdgError::InvalidFormat("link stored under the wrong node"));
                }

                if l.dest == 0 || node_index(l.dest) >= nodes.len() {
                    return Err(SdgError::InvalidFormat("link points outside the graph"));
                }
            }
        }

        Ok(SequenceDistanceGraph::from_parts(nodes, links))
    }
}

pub fn save_graph(graph: &SequenceDistanceGraph, mut out: impl Write) -> Result<(), SdgError> {
    bincode::serialize_into(&mut out, &FileHeader::for_graph())?;
    graph.write(&mut out)?;

    let mut names: Vec<(String, NodeId)> = graph.oldnames_to_ids.iter()
        .map(|(name, &id)| (name.clone(), id))
        .collect();
    names.sort_unstable_by_key(|(_, id)| node_index(*id));

    let table = NameTable { graph_name: graph.name.clone(), names };
    bincode::serialize_into(&mut out, &table)?;

    Ok(())
}

pub fn load_graph(mut reader: impl Read) -> Result<SequenceDistanceGraph, SdgError> {
    let header: FileHeader = bincode::deserialize_from(&mut reader)?;
    header.validate()?;

    let mut graph = SequenceDistanceGraph::read(&mut reader)?;

    let table: NameTable = bincode::deserialize_from(&mut reader)?;
    graph.name = table.graph_name;
    for (name, id) in table.names {
        if id == 0 || node_index(id) >= graph.node_count() {
            return Err(SdgError::InvalidFormat("named node outside the graph"));
        }

        graph.register_name(name, id);
    }

    Ok(graph)
}

pub fn save_graph_to_file(graph: &SequenceDistanceGraph, path: impl AsRef<Path>) -> Result<(), SdgError> {
    let mut out = File::create(path.as_ref()).map(BufWriter::new)?;
    save_graph(graph, &mut out)?;
    out.flush()?;

    info!("Graph with {} nodes written to {}", graph.count_active_nodes(), path.as_ref().display());

    Ok(())
}

pub fn load_graph_from_file(path: impl AsRef<Path>) -> Result<SequenceDistanceGraph, SdgError> {
    let p = path.as_ref();
    let file = File::open(p)
        .map_err(|source| SdgError::FileReadError { path: p.to_path_buf(), source })?;

    let graph = load_graph(BufReader::new(file))?;
    info!("Loaded graph with {} active nodes from {}", graph.count_active_nodes(), p.display());

    Ok(graph)
}
