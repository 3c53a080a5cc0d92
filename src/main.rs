use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use fas::{io, perturb, pipeline, solution, Algorithm, CsrGraph, GraphFormat, ReductionKey, Weight};

/// Feedback arc set heuristics on a weighted digraph.
#[derive(Parser)]
#[command(name = "fas")]
#[command(about = "Orders the vertices of a digraph so that little edge weight points backwards")]
#[command(long_about = "Orders the vertices of a digraph so that little edge weight points backwards.

Prints `<graph>_<algorithm>_<max weight>_<seed>,<fas weight>,<milliseconds>`.
With --stats the algorithm is a reduction (loops, scc, scc+2cyc, scc+2cyc+chain,
RED, REDstar, HCS) and the line reports the edges and weight it leaves over.")]
struct Cli {
    /// Input graph
    graph_path: PathBuf,

    /// Input format: W, U, DW, DU, SU, LU or LO
    format: String,

    /// Pipeline, e.g. Greedy, scc+Greedy, RED+Greedy, REDstar+Greedy, HCS+Greedy, RAS3, RASstar, GreedyDC
    algorithm: String,

    /// Seed for weight randomization and shuffling
    #[arg(short = 'r', long)]
    seed: Option<u64>,

    /// Shuffle the edges and rename the vertices randomly before solving
    #[arg(short = 'p', long)]
    shuffle: bool,

    /// Draw every edge weight uniformly from 1..=MAX_WEIGHT
    #[arg(short = 'w', long, default_value_t = 1)]
    max_weight: Weight,

    /// Write the position of every input vertex to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Measure a reduction instead of solving
    #[arg(long, conflicts_with = "output")]
    stats: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let format: GraphFormat = cli.format.parse()?;
    let (n, mut edges) = io::read_graph_file(&cli.graph_path, format)
        .with_context(|| format!("failed to read {}", cli.graph_path.display()))?;
    info!("read {} vertices and {} edges", n, edges.len());

    if cli.seed.is_none() && (cli.shuffle || cli.max_weight > 1) {
        warn!("no seed given for -p or -w, using seed 0");
    }
    let seed = cli.seed.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    if cli.max_weight > 1 {
        perturb::randomize_weights(&mut edges, cli.max_weight, &mut rng);
    }
    let vertex_map = if cli.shuffle {
        perturb::shuffle_vertices(n, &mut edges, &mut rng)
    } else {
        (0..n).collect()
    };
    let g = CsrGraph::try_new(n, edges)?;

    let graph_name = cli.graph_path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let task = format!("{}_{}_{}_{}", graph_name, cli.algorithm, cli.max_weight, seed);

    if cli.stats {
        let key: ReductionKey = cli.algorithm.parse()?;
        let start = Instant::now();
        let stats = pipeline::reduction_stats(&g, key);
        println!("{},{},{},{}", task, stats.edges, stats.weight, start.elapsed().as_millis());
        return Ok(());
    }

    let algorithm: Algorithm = cli.algorithm.parse()?;
    let start = Instant::now();
    let rank = algorithm.solve(&g);
    let elapsed = start.elapsed().as_millis();
    let fas = solution::fas_weight(&g, &rank)?;
    println!("{},{},{}", task, fas, elapsed);

    if let Some(path) = &cli.output {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        io::write_solution(&perturb::restore(&rank, &vertex_map), file)?;
    }
    Ok(())
}
