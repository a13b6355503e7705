use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

use crate::graphs::NodeId;

#[derive(Debug)]
pub enum SdgError {
    /// The node id is zero or points outside the node storage
    InvalidNode(NodeId),

    /// An operation that needs at least one node was given an empty path
    EmptyPath,

    /// Two consecutive path nodes are not joined by a link
    PathHasNoLink { from: NodeId, to: NodeId },

    /// The overlap declared by a link does not match the adjacent sequences
    PathOverlapInvalid { from: NodeId, to: NodeId },

    /// The number of backward and forward groups given to a node expansion differ
    InvalidExpansion { bw_groups: usize, fw_groups: usize },

    /// A node was already modified by an earlier edit in the current batch
    EditConflict(NodeId),

    /// A path specification string could not be parsed
    InvalidPathSpec(String),

    /// A name does not refer to any node of the graph
    UnknownNodeName(String),

    /// A GFA file name without the `.gfa` extension
    InvalidFilename(PathBuf),

    /// An input file exists but is empty
    EmptyFile(PathBuf),

    /// A sequence name appears more than once in a FASTA file
    DuplicateSequence(String),

    /// A GFA segment line carries its sequence inline instead of `*`
    InlineSegmentSequence(String),

    /// The length reported by a GFA segment differs from the FASTA sequence
    SegmentLengthMismatch { name: String, gfa: usize, fasta: usize },

    /// A GFA line could not be parsed
    InvalidGfaLine { line: usize, reason: &'static str },

    /// The persisted file does not start with the expected magic number
    BadMagic(u32),

    /// The persisted file was written with an unsupported format version
    UnsupportedVersion(u16),

    /// The persisted file contains something other than a graph
    WrongFileType(u16),

    /// The persisted stream is structurally inconsistent
    InvalidFormat(&'static str),

    /// Error variant when we couldn't read from a file
    FileReadError { path: PathBuf, source: io::Error },

    /// Error variant when we could not (de)serialize the graph
    SerializationError { source: bincode::Error },

    /// Other IO errors
    IOError(io::Error),
}

impl Error for SdgError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            Self::FileReadError { ref source, .. } => Some(source),
            Self::SerializationError { ref source } => Some(source),
            Self::IOError(ref source) => Some(source),
            _ => None
        }
    }
}

impl From<io::Error> for SdgError {
    fn from(value: io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<bincode::Error> for SdgError {
    fn from(value: bincode::Error) -> Self {
        Self::SerializationError {
            source: value
        }
    }
}

impl Display for SdgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::InvalidNode(node) =>
                write!(f, "Node {node} does not exist in the graph!"),
            Self::EmptyPath =>
                write!(f, "Path has no nodes!"),
            Self::PathHasNoLink { from, to } =>
                write!(f, "Path has no link between {from} and {to}!"),
            Self::PathOverlapInvalid { from, to } =>
                write!(f, "Path overlap is invalid between {from} and {to}!"),
            Self::InvalidExpansion { bw_groups, fw_groups } =>
                write!(f, "Node expansion needs as many backward groups ({bw_groups}) as forward groups ({fw_groups})!"),
            Self::EditConflict(node) =>
                write!(f, "Node {node} was already edited in this batch!"),
            Self::InvalidPathSpec(ref spec) =>
                write!(f, "Invalid path specification: '{spec}'"),
            Self::UnknownNodeName(ref name) =>
                write!(f, "Node {name} doesn't exist in graph"),
            Self::InvalidFilename(ref path) =>
                write!(f, "Filename of the GFA file does not end in .gfa: {}", path.display()),
            Self::EmptyFile(ref path) =>
                write!(f, "Empty file: {}", path.display()),
            Self::DuplicateSequence(ref name) =>
                write!(f, "Sequence {name} is already defined"),
            Self::InlineSegmentSequence(ref name) =>
                write!(f, "Segment {name} has an inline sequence, sequences should be in a separate FASTA file"),
            Self::SegmentLengthMismatch { ref name, gfa, fasta } =>
                write!(f, "Different length in node and fasta for sequence {name} -> gfa: {gfa}, fasta: {fasta}"),
            Self::InvalidGfaLine { line, reason } =>
                write!(f, "Could not parse GFA line {line}: {reason}"),
            Self::BadMagic(magic) =>
                write!(f, "Not a graph file (magic number {magic:#010x})!"),
            Self::UnsupportedVersion(version) =>
                write!(f, "Unsupported graph file version {version}!"),
            Self::WrongFileType(file_type) =>
                write!(f, "Unexpected file type tag {file_type}, expected a graph!"),
            Self::InvalidFormat(reason) =>
                write!(f, "Malformed graph stream: {reason}"),
            Self::FileReadError { ref path, .. } =>
                write!(f, "Could not read from file {}!", path.display()),
            Self::SerializationError { source: _ } =>
                write!(f, "Could not (de)serialize the graph!"),
            Self::IOError(ref err) =>
                err.fmt(f),
        }
    }
}
