//! GFA import and export.
//!
//! Graphs are exchanged as a GFA file holding the topology plus a FASTA file with the same stem
//! holding the sequences. GFA links describe paths (`A+ B+` reads A then B), which translate to
//! the link at the output end of A: source `-A`, destination `B`.

pub mod records;

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use rustc_hash::FxHashSet;
use tracing::{info, warn};

use crate::errors::SdgError;
use crate::graphs::{is_forward, node_index, Link, NodeId, SequenceDistanceGraph, Support};
use crate::io::fasta::{is_selected, open_input, read_fasta_nodes, write_fasta};

use records::{GfaLine, Orientation};

/// Extra annotation for GFA1 output.
#[derive(Debug, Clone, Default)]
pub struct GfaOutputOptions {
    /// Only write these nodes (either orientation) and links touching them. Empty means all.
    pub selected_nodes: Vec<NodeId>,

    /// Nodes tagged with `CL:Z:red`
    pub mark_red: Vec<NodeId>,

    /// Per-slot depth written as `DP:f`, `NaN` entries are skipped.
    pub depths: Vec<f64>,

    /// Write these links instead of the graph's own. Either half of a link may be given, each
    /// adjacency is written once. Empty means the graph links.
    pub links: Vec<Link>,
}

/// Companion FASTA path of a `.gfa` file.
fn fasta_path_for(path: &Path) -> Result<PathBuf, SdgError> {
    match path.extension() {
        Some(ext) if ext == "gfa" => Ok(path.with_extension("fasta")),
        _ => Err(SdgError::InvalidFilename(path.to_path_buf())),
    }
}

fn segment_name(node: NodeId) -> String {
    format!("seq{}", node_index(node))
}

/// Look up a segment by name, creating an empty node for names missing from the FASTA.
fn node_for_segment(graph: &mut SequenceDistanceGraph, name: &str) -> NodeId {
    graph.node_id_by_name(name).unwrap_or_else(|| {
        let node = graph.add_node(Vec::new());
        graph.register_name(name.to_string(), node);

        node
    })
}

/// Load a graph from a GFA1 file and the FASTA file next to it (`x.gfa` + `x.fasta`).
///
/// Sequences are stored canonically, a name maps to a negative id when its FASTA sequence was
/// flipped.
pub fn load_from_gfa(path: impl AsRef<Path>) -> Result<SequenceDistanceGraph, SdgError> {
    let gfa_path = path.as_ref();
    let fasta_path = fasta_path_for(gfa_path)?;
    let gfa_reader = open_input(gfa_path)?;

    info!("Graph fasta filename: {}", fasta_path.display());
    let mut graph = SequenceDistanceGraph::new();
    let flipped = read_fasta_nodes(&mut graph, &fasta_path, true)?;
    info!("{} nodes loaded ({} canonised).", graph.node_count() - 1, flipped);

    let mut link_count = 0usize;
    let mut non_overlapping = 0usize;
    for (i, line) in gfa_reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let record = GfaLine::try_from(line.as_str())
            .map_err(|reason| SdgError::InvalidGfaLine { line: line_no, reason })?;

        if line_no == 1 && !matches!(&record, GfaLine::Header(h) if h.version.as_deref() == Some("1.0")) {
            warn!("First line of {} is not a GFA1 header", gfa_path.display());
        }

        match record {
            GfaLine::Segment(segment) => {
                if segment.sequence.is_some() {
                    return Err(SdgError::InlineSegmentSequence(segment.name));
                }

                if let (Some(node), Some(gfa_len)) = (graph.node_id_by_name(&segment.name), segment.length()) {
                    let fasta_len = graph.get_node_size(node);
                    if gfa_len != fasta_len {
                        return Err(SdgError::SegmentLengthMismatch {
                            name: segment.name,
                            gfa: gfa_len,
                            fasta: fasta_len,
                        });
                    }
                }
            },
            GfaLine::Link(link) => {
                let mut source = node_for_segment(&mut graph, &link.from);
                let mut dest = node_for_segment(&mut graph, &link.to);

                if link.from_orient == Orientation::Forward {
                    source = -source;
                }

                if link.to_orient == Orientation::Reverse {
                    dest = -dest;
                }

                let dist = match link.overlap_bp() {
                    Some(ovl) => {
                        if ovl <= 0 {
                            non_overlapping += 1;
                        }
                        -ovl
                    },
                    None => 0,
                };

                graph.add_link(source, dest, dist, Support::default());
                link_count += 1;
            },
            GfaLine::Header(_) | GfaLine::Comment | GfaLine::Other(_) => (),
        }
    }

    if non_overlapping * 2 > link_count {
        warn!("The loaded graph contains {non_overlapping} non-overlapping links out of {link_count}");
    }

    info!("{} nodes after connecting with {} links.", graph.node_count() - 1, link_count);

    Ok(graph)
}

/// Links written to GFA: each adjacency once, from the half with `source <= dest`.
///
/// Uses `links` when given, the graph links otherwise.
fn canonical_links(graph: &SequenceDistanceGraph, links: &[Link], selected: &[NodeId]) -> Vec<Link> {
    let mut canonical: Vec<Link> = if links.is_empty() {
        graph.links.iter()
            .flatten()
            .filter(|l| l.source <= l.dest)
            .copied()
            .collect()
    } else {
        links.iter()
            .map(|l| if l.source <= l.dest { *l } else { l.mirror() })
            .sorted()
            .dedup()
            .collect()
    };

    canonical.retain(|l| is_selected(selected, l.source) || is_selected(selected, l.dest));
    canonical
}

/// Write GFA1 records to `gfa_out` and the sequences to `fasta_out`. `fasta_name` is stored in
/// the `UR` tag of every segment.
pub fn write_gfa1<W, F>(
    graph: &SequenceDistanceGraph,
    mut gfa_out: W,
    fasta_out: F,
    fasta_name: &str,
    options: &GfaOutputOptions,
) -> Result<(), SdgError>
    where W: Write,
          F: Write
{
    let red: FxHashSet<usize> = options.mark_red.iter().map(|&n| node_index(n)).collect();

    writeln!(gfa_out, "H\tVN:Z:1.0")?;

    for ix in 1..graph.node_count() {
        let node = ix as NodeId;
        if !graph.is_active(node) || !is_selected(&options.selected_nodes, node) {
            continue;
        }

        write!(gfa_out, "S\t{}\t*\tLN:i:{}\tUR:Z:{}", segment_name(node), graph.get_node_size(node), fasta_name)?;
        if red.contains(&ix) {
            write!(gfa_out, "\tCL:Z:red")?;
        }

        if let Some(depth) = options.depths.get(ix).filter(|d| !d.is_nan()) {
            write!(gfa_out, "\tDP:f:{depth:.6}")?;
        }

        writeln!(gfa_out)?;
    }

    for l in canonical_links(graph, &options.links, &options.selected_nodes) {
        let from_orient = if is_forward(l.source) { Orientation::Reverse } else { Orientation::Forward };
        let to_orient = if is_forward(l.dest) { Orientation::Forward } else { Orientation::Reverse };
        let overlap = if l.dist < 0 { -l.dist } else { 0 };

        writeln!(
            gfa_out,
            "L\t{}\t{from_orient}\t{}\t{to_orient}\t{overlap}M",
            segment_name(l.source),
            segment_name(l.dest),
        )?;
    }

    write_fasta(graph, fasta_out, &options.selected_nodes)
}

/// Write `path` (which must end in `.gfa`) and its companion FASTA file.
pub fn write_to_gfa1(
    graph: &SequenceDistanceGraph,
    path: impl AsRef<Path>,
    options: &GfaOutputOptions,
) -> Result<(), SdgError> {
    let gfa_path = path.as_ref();
    let fasta_path = fasta_path_for(gfa_path)?;

    let mut gfa_out = File::create(gfa_path).map(BufWriter::new)?;
    let mut fasta_out = File::create(&fasta_path).map(BufWriter::new)?;
    write_gfa1(graph, &mut gfa_out, &mut fasta_out, &fasta_path.to_string_lossy(), options)?;
    gfa_out.flush()?;
    fasta_out.flush()?;

    info!("Graph written to {} and {}", gfa_path.display(), fasta_path.display());

    Ok(())
}

/// GFA2 segment position, `$` marks the segment end.
fn gfa2_pos(pos: usize, len: usize) -> String {
    if pos == len {
        format!("{pos}$")
    } else {
        pos.to_string()
    }
}

/// Write GFA2 records. Overlaps and abutments become `E` records with the overlapping
/// interval on each segment, positive distances become `G` records.
pub fn write_gfa2<W>(graph: &SequenceDistanceGraph, mut out: W) -> Result<(), SdgError>
    where W: Write
{
    writeln!(out, "H\tVN:Z:2.0")?;

    for ix in 1..graph.node_count() {
        let node = ix as NodeId;
        if graph.is_active(node) {
            writeln!(out, "S\t{}\t{}\t*", segment_name(node), graph.get_node_size(node))?;
        }
    }

    for l in canonical_links(graph, &[], &[]) {
        // Leaving from the start of the source means reading it backwards
        let from_orient = if is_forward(l.source) { Orientation::Reverse } else { Orientation::Forward };
        let to_orient = if is_forward(l.dest) { Orientation::Forward } else { Orientation::Reverse };
        let from = format!("{}{from_orient}", segment_name(l.source));
        let to = format!("{}{to_orient}", segment_name(l.dest));

        if l.dist > 0 {
            writeln!(out, "G\t*\t{from}\t{to}\t{}\t*", l.dist)?;
            continue;
        }

        let from_len = graph.get_node_size(l.source);
        let to_len = graph.get_node_size(l.dest);
        let ovl = (-l.dist) as usize;

        let (from_beg, from_end) = match from_orient {
            Orientation::Forward => (from_len.saturating_sub(ovl), from_len),
            Orientation::Reverse => (0, ovl.min(from_len)),
        };
        let (to_beg, to_end) = match to_orient {
            Orientation::Forward => (0, ovl.min(to_len)),
            Orientation::Reverse => (to_len.saturating_sub(ovl), to_len),
        };

        writeln!(
            out,
            "E\t*\t{from}\t{to}\t{}\t{}\t{}\t{}\t*",
            gfa2_pos(from_beg, from_len),
            gfa2_pos(from_end, from_len),
            gfa2_pos(to_beg, to_len),
            gfa2_pos(to_end, to_len),
        )?;
    }

    Ok(())
}

/// Write `path` as GFA2 (must end in `.gfa`) plus the companion FASTA file.
pub fn write_to_gfa2(graph: &SequenceDistanceGraph, path: impl AsRef<Path>) -> Result<(), SdgError> {
    let gfa_path = path.as_ref();
    let fasta_path = fasta_path_for(gfa_path)?;

    let mut gfa_out = File::create(gfa_path).map(BufWriter::new)?;
    write_gfa2(graph, &mut gfa_out)?;
    gfa_out.flush()?;

    let mut fasta_out = File::create(&fasta_path).map(BufWriter::new)?;
    write_fasta(graph, &mut fasta_out, &[])?;
    fasta_out.flush()?;

    Ok(())
}
