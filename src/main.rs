use std::fs::{self, File};
use std::io::{self, stdout, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use sdgraph::graphs::SequenceDistanceGraph;
use sdgraph::io::gfa::{write_gfa2, GfaOutputOptions};
use sdgraph::io::{fasta, graph_to_dot, load_from_fasta, load_from_gfa, load_graph_from_file, save_graph, write_to_gfa1};

trait Output: Write + IsTerminal { }
impl<T> Output for T where T: Write + IsTerminal { }

/// Output formats for graphs
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputType {
    /// Binary graph file
    Sdg,

    /// GFA1 plus a FASTA file with the same name. Requires an output filename ending in .gfa
    Gfa,

    /// GFA2 records, sequences are not included
    Gfa2,

    /// Node sequences in FASTA format
    Fasta,

    /// Graphviz DOT rendering of nodes and links
    Dot,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct CliArgs {
    /// More log output, repeat for trace level messages
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<CliSubcommand>,
}

#[derive(Subcommand, Debug)]
enum CliSubcommand {
    /// Print graph statistics
    Stats(StatsArgs),

    /// Convert graphs to various output formats
    View(ViewArgs),

    /// Merge every unitig into a single node
    JoinUnitigs(JoinUnitigsArgs),
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Input graph: binary graph file, GFA (with FASTA next to it) or FASTA
    graph: PathBuf,

    /// Print statistics as JSON
    #[arg(short, long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Input graph: binary graph file, GFA (with FASTA next to it) or FASTA
    graph: PathBuf,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Format to write, the binary graph format if not given
    #[arg(value_enum, short = 'O', long)]
    output_type: Option<OutputType>,
}

#[derive(Args, Debug)]
struct JoinUnitigsArgs {
    /// Input graph: binary graph file, GFA (with FASTA next to it) or FASTA
    graph: PathBuf,

    /// Output binary graph file
    #[arg(short, long)]
    output: PathBuf,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_filter(filter_layer);

    Registry::default().with(stderr_log).init();
}

fn load_input(path: &Path) -> Result<SequenceDistanceGraph> {
    let fasta_extensions = [".fa", ".fa.gz", ".fna", ".fna.gz", ".fasta", ".fasta.gz"];
    let path_as_str = path.to_string_lossy();

    let graph = if path_as_str.ends_with(".gfa") {
        load_from_gfa(path)
    } else if fasta_extensions.into_iter().any(|ext| path_as_str.ends_with(ext)) {
        load_from_fasta(path)
    } else {
        load_graph_from_file(path)
    };

    graph.with_context(|| format!("Could not load graph from {}", path.display()))
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Output>> {
    Ok(if let Some(path) = path {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?
        }

        let file = File::create(path)
            .with_context(|| format!("Could not create {}", path.display()))?;
        Box::new(file) as Box<dyn Output>
    } else {
        Box::new(stdout()) as Box<dyn Output>
    })
}

fn stats_subcommand(args: &StatsArgs) -> Result<()> {
    let graph = load_input(&args.graph)?;
    let stats = graph.stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{stats}");
        println!("{} connected components", graph.connected_components().len());
    }

    Ok(())
}

fn view_subcommand(args: &ViewArgs) -> Result<()> {
    let graph = load_input(&args.graph)?;
    let output_type = args.output_type.unwrap_or(OutputType::Sdg);

    if output_type == OutputType::Gfa {
        let Some(path) = &args.output else {
            bail!("GFA output needs an output filename ending in .gfa");
        };

        write_to_gfa1(&graph, path, &GfaOutputOptions::default())?;
        return Ok(());
    }

    let writer = open_output(args.output.as_ref())?;
    if output_type == OutputType::Sdg && writer.is_terminal() {
        warn!("Not writing binary graph data to terminal standard output!");
        return Ok(());
    }

    let mut out = BufWriter::new(writer);
    match output_type {
        OutputType::Sdg => save_graph(&graph, &mut out)?,
        OutputType::Gfa2 => write_gfa2(&graph, &mut out)?,
        OutputType::Fasta => fasta::write_fasta(&graph, &mut out, &[])?,
        OutputType::Dot => {
            let mut dot = String::new();
            graph_to_dot(&mut dot, &graph)?;
            write!(out, "{dot}")?
        },
        OutputType::Gfa => (),
    }

    out.flush()?;

    Ok(())
}

fn join_unitigs_subcommand(args: &JoinUnitigsArgs) -> Result<()> {
    let mut graph = load_input(&args.graph)?;
    graph.log_status();

    let joined = graph.join_all_unitigs()
        .context("Could not join unitigs")?;
    info!("Joined {joined} unitigs");
    graph.log_status();

    sdgraph::io::save_graph_to_file(&graph, &args.output)?;

    Ok(())
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match &args.command {
        Some(CliSubcommand::Stats(v)) => stats_subcommand(v)?,
        Some(CliSubcommand::View(v)) => view_subcommand(v)?,
        Some(CliSubcommand::JoinUnitigs(v)) => join_unitigs_subcommand(v)?,
        None => bail!("No subcommand given."),
    };

    Ok(())
}
