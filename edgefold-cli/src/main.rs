//! edgefold: reduce an OBJ mesh by repeated midpoint edge collapse.
//!
//! # Logging
//!
//! Set `RUST_LOG` to control log output, or pass `-v` / `-vv` / `-vvv`:
//! - `RUST_LOG=edgefold_simplification=info` - Run summaries
//! - `RUST_LOG=edgefold_simplification=debug` - One event per collapse
//!
//! # Example
//!
//! ```bash
//! edgefold bunny.obj --target-faces 1000 --format json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use edgefold_simplification::{
    CollapseOrder, EdgeCollapseSimplifier, MeshSimplifier, SimplifyParams,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod report;

use report::Summary;

/// edgefold - midpoint edge collapse mesh simplification.
///
/// Loads a triangle/quad mesh, collapses edges until a stop condition is
/// met or no edges remain, and reports what happened.
#[derive(Parser, Debug)]
#[command(name = "edgefold")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input mesh file (.obj)
    input: PathBuf,

    /// JSON file with stop conditions; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop once this many vertices remain
    #[arg(long)]
    target_vertices: Option<usize>,

    /// Stop once this many faces remain
    #[arg(long)]
    target_faces: Option<usize>,

    /// Stop once the next edge is at least this long
    #[arg(long)]
    min_edge_length: Option<f32>,

    /// Stop after this many collapses
    #[arg(long)]
    max_collapses: Option<usize>,

    /// Collapse the longest edge first instead of the shortest
    #[arg(long)]
    longest_first: bool,

    /// Report counts for the mesh with unreferenced vertices dropped
    #[arg(long)]
    compact: bool,

    /// Output format for the summary
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

impl Cli {
    fn params(&self) -> Result<SimplifyParams> {
        let mut params = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => SimplifyParams::default(),
        };

        if let Some(n) = self.target_vertices {
            params.target_vertices = Some(n);
        }
        if let Some(n) = self.target_faces {
            params.target_faces = Some(n);
        }
        if let Some(length) = self.min_edge_length {
            params.min_edge_length = Some(length);
        }
        if let Some(n) = self.max_collapses {
            params.max_collapses = Some(n);
        }
        params.validate().context("Invalid stop conditions")?;
        Ok(params)
    }

    fn order(&self) -> CollapseOrder {
        if self.longest_first {
            CollapseOrder::LongestFirst
        } else {
            CollapseOrder::ShortestFirst
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "edgefold_io=info,edgefold_simplification=info",
            2 => "edgefold_io=debug,edgefold_simplification=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let params = cli.params()?;
    let mesh = edgefold_io::read_mesh(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;

    let simplifier = EdgeCollapseSimplifier::with_params(params, cli.order());
    let result = simplifier
        .simplify(&mesh)
        .with_context(|| format!("Failed to simplify {}", cli.input.display()))?;

    let summary = Summary::new(&cli.input, &mesh, &result, cli.compact);
    match cli.format {
        OutputFormat::Text => print!("{}", summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {}", cause);
        }
        std::process::exit(1);
    }
    Ok(())
}
