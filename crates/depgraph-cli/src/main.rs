//! Depgraph CLI - Command-line interface for depgraph
//!
//! This is the main entry point for users interacting with depgraph.
//! It provides commands for building, inspecting, and serving the
//! dependency graph.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "depgraph")]
#[command(author = "Depgraph Contributors")]
#[command(version)]
#[command(about = "Symbol dependency graphs from per-file summaries", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize depgraph in a directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Build the graph from a project summary and persist it
    Build {
        /// Project summary JSON ({"files": [...]})
        summary: PathBuf,

        /// Also write the graph as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Workspace holding the config and store
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Export the graph of a project summary to JSON
    Export {
        /// Project summary JSON
        summary: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "depgraph.json")]
        output: PathBuf,
    },

    /// Show the detail of one node from the last build
    Select {
        /// Node id, e.g. `stats.py::StatsAnalyzer.summary`
        id: String,

        /// Workspace (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show workspace status and statistics
    Status {
        /// Path to check (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Add one file summary to the summary cache
    Ingest {
        /// File summary JSON
        file: PathBuf,

        /// Workspace (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Drop one file's summary from the summary cache
    Forget {
        /// Source file path as it appears in the summary, e.g. `stats.py`
        file_name: String,

        /// Workspace (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Delete the persisted graph
    Clean {
        /// Workspace (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Start the graph server and watch the summary cache
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Headless mode: bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,

        /// Workspace (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Build {
            summary,
            output,
            path,
        } => commands::build(&summary, output.as_deref(), &path, cli.verbose),
        Commands::Export { summary, output } => commands::export(&summary, &output),
        Commands::Select { id, path } => commands::select(&id, &path),
        Commands::Status { path } => commands::status(&path),
        Commands::Ingest { file, path } => commands::ingest(&file, &path),
        Commands::Forget { file_name, path } => commands::forget(&file_name, &path),
        Commands::Clean { path } => commands::clean(&path),
        Commands::Serve {
            port,
            headless,
            path,
        } => commands::serve(port, headless, &path).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
