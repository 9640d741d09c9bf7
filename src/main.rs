//! isnad CLI: transmission-chain network analysis.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use isnad_net::config::{DEFAULT_CONFIG_FILE, PipelineConfig};
use isnad_net::graph::analytics::degree_centrality;
use isnad_net::metadata::MetadataTable;
use isnad_net::person::PersonTable;
use isnad_net::pipeline::{self, CentralityReport, DegreeReport};

#[derive(Parser)]
#[command(name = "isnad", version, about = "Transmission-chain network analysis")]
struct Cli {
    /// Pipeline config file (TOML). Relative paths inside it resolve against its
    /// directory. Without it, defaults resolve against the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file.
    Init {
        /// Where to write it.
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Degree stage: merge full-graph teacher/student counts into the metadata table.
    Metadata {
        /// Re-seed the table from the person table instead of updating it.
        #[arg(long)]
        rebuild: bool,
    },

    /// Centrality stage: merge subgraph PageRank into the metadata table and export the graph.
    Centrality,

    /// Run the degree and centrality stages in order.
    Run {
        /// Re-seed the metadata table from the person table.
        #[arg(long)]
        rebuild: bool,
    },

    /// Show graph statistics.
    Stats {
        /// Number of narrators to list by degree.
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Print the distinct narrator names of the metadata table, one per line.
    Names,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            Ok(PipelineConfig::default().resolve(&cwd))
        }
    }
}

fn print_degree_report(report: &DegreeReport) {
    println!(
        "Degree stage: {} rows ({} in graph{}), full graph {} nodes / {} edges",
        report.rows,
        report.matched,
        if report.seeded { ", seeded" } else { "" },
        report.nodes,
        report.edges,
    );
}

fn print_centrality_report(report: &CentralityReport) {
    println!(
        "Centrality stage: {} of {} rows scored, subgraph {} nodes / {} edges, {} iterations{}",
        report.scored,
        report.rows,
        report.subgraph_nodes,
        report.subgraph_edges,
        report.iterations,
        if report.converged { "" } else { " (not converged)" },
    );
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path, force } => {
            if path.exists() && !force {
                miette::bail!(
                    help = "Pass --force to overwrite it.",
                    "{} already exists",
                    path.display()
                );
            }
            PipelineConfig::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
        }

        Commands::Metadata { rebuild } => {
            let config = load_config(cli.config.as_ref())?;
            let report = pipeline::run_degree_stage(&config, rebuild)?;
            print_degree_report(&report);
            println!("Metadata table saved to {}", config.outputs.metadata.display());
        }

        Commands::Centrality => {
            let config = load_config(cli.config.as_ref())?;
            let report = pipeline::run_centrality_stage(&config)?;
            print_centrality_report(&report);
            println!("Updated metadata table at {}", config.outputs.metadata.display());
            println!("Graph export saved to {}", config.outputs.graph.display());
        }

        Commands::Run { rebuild } => {
            let config = load_config(cli.config.as_ref())?;
            let (degrees, centrality) = pipeline::run_all(&config, rebuild)?;
            print_degree_report(&degrees);
            print_centrality_report(&centrality);
        }

        Commands::Stats { top } => {
            let config = load_config(cli.config.as_ref())?;
            pipeline::check_inputs(&[&config.inputs.records])?;
            let build = pipeline::build_graph(&config.inputs.records)?;
            let graph = build.graph;

            println!("Records:         {}", build.records);
            println!("Extracted edges: {}", build.extracted_edges);
            println!("Distinct edges:  {}", graph.edge_count());
            println!("Narrators:       {}", graph.node_count());

            let names = if config.inputs.persons.exists() {
                PersonTable::load(&config.inputs.persons)?.names()
            } else {
                Default::default()
            };
            println!("\nTop {top} by degree:");
            for d in degree_centrality(&graph).into_iter().take(top) {
                let name = names.get(&d.id).map(String::as_str).unwrap_or("?");
                println!(
                    "  {:>8}  {:<40} in={:<4} out={:<4}",
                    d.id.get(),
                    name,
                    d.in_degree,
                    d.out_degree
                );
            }
        }

        Commands::Names => {
            let config = load_config(cli.config.as_ref())?;
            pipeline::check_inputs(&[&config.outputs.metadata])?;
            let table = MetadataTable::load(&config.outputs.metadata)?;
            for name in table.distinct_names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
