use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use treewatch::{JsonFileHost, MonitorConfig, TriggerKind, Visualizer};

#[derive(Parser, Debug)]
#[command(name = "treewatch")]
#[command(about = "Observe a node tree described in a JSON file and report its activity")]
struct Args {
    /// Path to a JSON file holding the host's root list
    #[arg(short, long, default_value = "tree.json")]
    tree: PathBuf,

    /// Optional configuration file (TOML, JSON or YAML); TREEWATCH_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulate a propagation starting at this node id
    #[arg(short, long)]
    simulate: Option<String>,

    /// Task source label used to classify the simulated trigger (e.g. "click", "setTimeout")
    #[arg(long, default_value = "manual")]
    trigger: String,

    /// Keep monitoring for this many seconds before reporting
    #[arg(short, long, default_value = "0")]
    watch: u64,

    /// Log the path to this node id (requires debug_mode)
    #[arg(short, long)]
    focus: Option<String>,

    /// Write the full export to this JSON file instead of printing the tree
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MonitorConfig::load(args.config.as_deref())
        .with_context(|| "failed to load configuration")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, config))
}

async fn run(args: Args, config: MonitorConfig) -> Result<()> {
    let host = Arc::new(JsonFileHost::new(&args.tree));
    let visualizer = Visualizer::new(host, config)?;

    if !visualizer.start_monitoring() {
        warn!("monitoring disabled, taking a single snapshot");
        visualizer.refresh();
    }

    if let Some(root) = &args.simulate {
        let kind = match TriggerKind::classify(&args.trigger) {
            TriggerKind::Unknown => TriggerKind::ManualTrigger,
            kind => kind,
        };
        if !visualizer.simulate(root, kind, &args.trigger) {
            bail!("unknown node id `{}` in {}", root, args.tree.display());
        }
        while visualizer.tracker().pending_cascades() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    if args.watch > 0 {
        info!(seconds = args.watch, "watching");
        tokio::time::sleep(Duration::from_secs(args.watch)).await;
    }

    if let Some(id) = &args.focus {
        if visualizer.focus(id).is_none() {
            warn!(id = %id, "focus target not found");
        }
    }

    visualizer.stop_monitoring();

    match &args.export {
        Some(path) => {
            let json = visualizer.export_json()?;
            fs::write(path, json)
                .with_context(|| format!("failed to write export to {}", path.display()))?;
            info!(path = %path.display(), "export written");
        }
        None => print_tree(&visualizer),
    }

    Ok(())
}

/// Print the tree, indented by depth, with counts and layout positions.
fn print_tree(visualizer: &Visualizer) {
    let nodes = visualizer.filtered_tree();
    if visualizer.snapshot().is_empty() {
        println!("(no nodes)");
        return;
    }

    let view = visualizer.graph_view();
    for node in &nodes {
        let position = view
            .nodes
            .iter()
            .find(|v| v.id == node.id)
            .map(|v| format!("({:.0}, {:.0})", v.x, v.y))
            .unwrap_or_else(|| "-".to_string());
        let origin = if node.is_propagation_origin() { " *" } else { "" };

        println!(
            "{:indent$}{} {} [{}] x{} {}{}",
            "",
            node.name,
            node.selector,
            node.update_strategy.label(),
            node.activation_count,
            position,
            origin,
            indent = node.depth * 2
        );
    }

    let stats = visualizer.statistics();
    println!();
    println!(
        "{} nodes ({} roots, {} lazy), {} active, {} activations, {} events",
        stats.node_count,
        stats.root_count,
        stats.lazy_count,
        stats.active_count,
        stats.total_activations,
        stats.event_count
    );
}
