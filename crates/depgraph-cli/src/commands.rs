//! CLI command implementations.

use colored::Colorize;
use depgraph_core::{DepgraphConfig, FileSummary, ProjectSummary, SummaryCache};
use depgraph_graph::{build_parsed, BuildOutput, GraphStore, NodeMeta};
use depgraph_server::{DepgraphServer, ServerConfig, ServerHandle, SummaryWatcher};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::error;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Initialize depgraph in a directory.
pub fn init(path: &Path) -> Result<()> {
    if DepgraphConfig::path(path).exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let config = DepgraphConfig::default();
    let written = config.save(path)?;
    fs::create_dir_all(config.summary_dir(path))?;

    println!("{} Initialized depgraph in {}", "✓".green(), path.display());
    println!("  Config: {}", written.display());
    println!("  Run {} to build the graph", "depgraph build <summary.json>".cyan());

    Ok(())
}

/// Reads a project summary and builds its graph.
fn build_from_file(summary: &Path) -> Result<BuildOutput> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Reading summary...");

    let text = fs::read_to_string(summary)?;
    let parsed = ProjectSummary::from_json(&text)?;

    spinner.set_message(format!("Linking {} files...", parsed.summary.files.len()));
    let output = build_parsed(&parsed);

    spinner.finish_and_clear();
    Ok(output)
}

/// Build the graph, report it, and persist a snapshot.
pub fn build(summary: &Path, output: Option<&Path>, workspace: &Path, verbose: bool) -> Result<()> {
    println!("{}", "Building graph...".cyan());

    let start = Instant::now();
    let result = build_from_file(summary)?;
    print_build(&result, start.elapsed(), verbose);

    let config = DepgraphConfig::load(workspace)?;
    let store_dir = config.store_dir(workspace);
    GraphStore::open(&store_dir)?.save_snapshot(&result)?;
    println!("{} Saved snapshot to {}", "✓".green(), store_dir.display());

    if let Some(out_path) = output {
        export_graph(&result, out_path)?;
    }

    Ok(())
}

fn print_build(output: &BuildOutput, elapsed: Duration, verbose: bool) {
    let stats = output.stats;
    println!(
        "{} Built {} files ({} nodes, {} edges) in {}ms",
        "✓".green(),
        stats.files.to_string().cyan(),
        output.graph.node_count().to_string().cyan(),
        output.graph.edge_count().to_string().cyan(),
        elapsed.as_millis()
    );
    println!(
        "  {} {} resolved, {} unresolved",
        "Calls:".dimmed(),
        stats.calls_resolved,
        stats.calls_unresolved
    );
    println!("  {} {}", "Import usages:".dimmed(), stats.usage_edges);
    if stats.rejected_files > 0 {
        println!("  {} {}", "Rejected files:".dimmed(), stats.rejected_files.to_string().red());
    }

    let total = output.diagnostics.len();
    if total == 0 {
        return;
    }

    let shown = if verbose { total } else { total.min(5) };
    println!("\n{} {} diagnostics:", "⚠".yellow(), total);
    for d in output.diagnostics.iter().take(shown) {
        println!(
            "  {} {} - {}",
            format!("[{}]", d.kind).yellow(),
            d.file.red(),
            d.message
        );
    }
    if total > shown {
        println!("  ... and {} more (use --verbose)", total - shown);
    }
}

fn export_document(output: &BuildOutput) -> serde_json::Value {
    let nodes: Vec<_> = output.graph.nodes().collect();

    serde_json::json!({
        "version": "1.0",
        "stats": output.graph.stats(),
        "nodes": nodes,
        "edges": output.graph.export_edges(),
        "diagnostics": output.diagnostics
    })
}

fn export_graph(output: &BuildOutput, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(&export_document(output))?)?;
    println!("{} Exported to {}", "✓".green(), path.display());

    Ok(())
}

/// Export the graph of a summary without touching the store.
pub fn export(summary: &Path, output: &Path) -> Result<()> {
    let result = build_from_file(summary)?;
    export_graph(&result, output)
}

fn load_snapshot(workspace: &Path) -> Result<BuildOutput> {
    let config = DepgraphConfig::load(workspace)?;
    let store_dir = config.store_dir(workspace);
    if !store_dir.exists() {
        return Err("no graph built yet; run `depgraph build` first".into());
    }

    GraphStore::open(&store_dir)?
        .load_snapshot()?
        .ok_or_else(|| "no graph built yet; run `depgraph build` first".into())
}

/// Show one node of the persisted graph.
pub fn select(id: &str, workspace: &Path) -> Result<()> {
    let output = load_snapshot(workspace)?;

    let Some(detail) = output.graph.select(id)? else {
        println!("{} is a file; files carry no detail", id.cyan());
        return Ok(());
    };

    println!("{} {}", detail.kind.to_string().yellow(), detail.id.cyan());
    match &detail.info {
        NodeMeta::Callable(signature) => {
            println!("  {} {}{}", "Signature:".dimmed(), detail.label, signature);
        }
        NodeMeta::Class { methods } => {
            println!("  {} {}", "Methods:".dimmed(), methods.len());
            for method in methods {
                println!("    {}{}", method.name, method.signature);
            }
        }
        NodeMeta::Import { path } => {
            let target = path.as_deref().unwrap_or("(outside the project)");
            println!("  {} {}", "Path:".dimmed(), target);
        }
        NodeMeta::Empty => {}
    }

    if let Some(index) = output.graph.get_index(id) {
        let callers = output.graph.get_callers(index);
        if !callers.is_empty() {
            println!("  {}", "Called by:".dimmed());
            for caller in callers {
                println!("    {}", caller.id);
            }
        }
    }

    Ok(())
}

/// Show workspace status.
pub fn status(workspace: &Path) -> Result<()> {
    if !DepgraphConfig::path(workspace).exists() {
        println!("{} depgraph not initialized in this directory", "✗".red());
        println!("  Run {} to initialize", "depgraph init".cyan());
        return Ok(());
    }

    let config = DepgraphConfig::load(workspace)?;
    let cached = SummaryCache::new(config.summary_dir(workspace)).load_project()?;

    println!("{}", "Depgraph Status".cyan().bold());
    println!();
    println!(
        "  {} {} ({} unreadable)",
        "Cached summaries:".dimmed(),
        cached.summary.files.len(),
        cached.rejected.len()
    );
    println!("  {} {}", "Cached symbols:".dimmed(), cached.summary.symbol_count());

    match load_snapshot(workspace) {
        Ok(output) => {
            let stats = output.graph.stats();
            println!("  {} {}", "Files:".dimmed(), stats.files);
            println!("  {} {}", "Nodes:".dimmed(), stats.node_count);
            println!("  {} {}", "Edges:".dimmed(), stats.edge_count);
            println!("  {} {}", "Diagnostics:".dimmed(), output.diagnostics.len());
        }
        Err(_) => println!("  {} not built", "Graph:".dimmed()),
    }
    println!("  {} {}", "Port:".dimmed(), config.port);

    Ok(())
}

/// Validate a file summary and add it to the summary cache.
pub fn ingest(file: &Path, workspace: &Path) -> Result<()> {
    let config = DepgraphConfig::load(workspace)?;
    let summary: FileSummary = serde_json::from_str(&fs::read_to_string(file)?)?;
    summary.validate()?;

    let stored = SummaryCache::new(config.summary_dir(workspace)).store(&summary)?;
    println!(
        "{} Cached {} at {}",
        "✓".green(),
        summary.file_name.cyan(),
        stored.display()
    );

    Ok(())
}

/// Remove one file's summary from the summary cache.
pub fn forget(file_name: &str, workspace: &Path) -> Result<()> {
    let config = DepgraphConfig::load(workspace)?;
    if SummaryCache::new(config.summary_dir(workspace)).remove(file_name)? {
        println!("{} Forgot {}", "✓".green(), file_name.cyan());
    } else {
        println!("{} {} is not cached", "✗".yellow(), file_name.cyan());
    }
    Ok(())
}

/// Delete the persisted graph snapshot.
pub fn clean(workspace: &Path) -> Result<()> {
    let config = DepgraphConfig::load(workspace)?;
    let store_dir = config.store_dir(workspace);
    if !store_dir.exists() {
        println!("{} Nothing to clean", "✓".green());
        return Ok(());
    }

    GraphStore::open(&store_dir)?.clear()?;
    println!("{} Cleared the stored graph", "✓".green());
    Ok(())
}

/// Start the graph server.
pub async fn serve(port: Option<u16>, headless: bool, workspace: &Path) -> Result<()> {
    let config = DepgraphConfig::load(workspace)?;
    let headless = headless || config.headless;
    let port = port.unwrap_or(config.port);

    if headless {
        println!("{}", "Starting depgraph server in headless mode...".cyan());
    } else {
        println!("{}", "Starting depgraph server...".cyan());
    }

    let cache = SummaryCache::new(config.summary_dir(workspace));
    let output = build_parsed(&cache.load_project()?);
    println!(
        "{} Built {} files ({} nodes)",
        "✓".green(),
        output.stats.files,
        output.graph.node_count()
    );

    let handle = ServerHandle::new(output, config.build_timeout());
    let watcher = SummaryWatcher::new(cache, config.debounce(), handle.clone());
    tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            error!("Summary watcher error: {}", e);
        }
    });

    let server_config = ServerConfig::for_port(port, headless);
    println!("{} Listening on ws://{}", "✓".green(), server_config.addr);
    if headless {
        println!("  Headless mode: accepting connections from any host");
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    DepgraphServer::new(handle, server_config)
        .run()
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
