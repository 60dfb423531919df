//! canopy demo — one coordinator and N workers over the in-memory hub
//!
//! Spawns each worker's control loop on the runtime, drives the
//! coordinator from the main task, sends a command to every worker
//! mid-run, and dumps the coordinator's converged tree at the end.

use anyhow::Result;
use canopy::config::ClusterConfig;
use canopy::{values, AttributeObject, MemoryHub, Root, SyncNode};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "canopy", about = "Synchronized state tree cluster demo")]
struct Cli {
    /// Path to canopy.json (default: ./canopy.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of worker nodes when the config names none
    #[arg(short, long, default_value_t = 2)]
    workers: usize,

    /// Coordinator iterations to run before shutting down
    #[arg(short, long)]
    iterations: Option<u64>,

    /// Loop period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Also log to rolling files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ClusterConfig::load(path),
        None => ClusterConfig::discover(),
    };
    if let Some(period_ms) = cli.period_ms {
        config.period_ms = Some(period_ms);
    }

    let log_dir = cli
        .log_dir
        .or_else(|| config.log_dir.as_ref().map(PathBuf::from));
    // The appender guard has to outlive the subscriber.
    let _guard = init_tracing(log_dir.as_deref());

    let coordinator_name = config.coordinator_name().to_string();
    let worker_names = config.worker_names(cli.workers);
    let period = config.period();
    let iterations = cli.iterations.or(config.iterations).unwrap_or(120);

    info!(
        coordinator = %coordinator_name,
        workers = worker_names.len(),
        ?period,
        "starting cluster"
    );

    // Wire the star: coordinator sees every worker, workers see only it.
    let hub = MemoryHub::new();
    let mut coordinator = SyncNode::new(Box::new(hub.register(&coordinator_name)), true);
    let mut workers = Vec::new();
    for name in &worker_names {
        let mut worker = SyncNode::new(Box::new(hub.register(name)), false);
        worker.connect_to(&coordinator_name)?;
        worker.register_object(Box::new(
            AttributeObject::new("screen").with_attribute("brightness", values![1.0]),
        ));
        coordinator.connect_to(name)?;
        workers.push(worker);
    }

    let stop = CancellationToken::new();
    let mut handles = Vec::new();
    for mut worker in workers {
        let stop = stop.clone();
        handles.push(tokio::spawn(async move {
            worker.run(period, stop).await;
            worker
        }));
    }

    let mut ticker = tokio::time::interval(period);
    let mut commanded = false;
    for iteration in 0..iterations {
        ticker.tick().await;
        coordinator.run_iteration();

        // Wait a few iterations so every namespace has replicated.
        if !commanded && iteration >= 10 {
            for name in &worker_names {
                if coordinator.send_command_to(name, "screen", "brightness", values![0.5]) {
                    info!(worker = %name, "dimming command sent");
                } else {
                    info!(worker = %name, "namespace not replicated yet, retrying");
                }
            }
            commanded = worker_names.iter().all(|name| {
                coordinator
                    .tree()
                    .has_branch_at(&format!("/{name}/commands"))
            });
        }
    }

    stop.cancel();
    for handle in handles {
        let worker = handle.await?;
        info!(
            worker = %worker.name(),
            brightness = ?worker.object_attribute("screen", "brightness"),
            "worker stopped"
        );
    }

    info!("coordinator tree after {iterations} iterations:");
    dump_subtree(coordinator.tree(), "/", 0);
    Ok(())
}

fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "canopy=info".into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "canopy.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn dump_subtree(tree: &Root, path: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    for leaf in tree.get_leaf_list_at(path) {
        let leaf_path = join(path, &leaf);
        let value = tree.get_value_for_leaf_at(&leaf_path);
        info!("{indent}{leaf} = {value:?}");
    }
    for branch in tree.get_branch_list_at(path) {
        info!("{indent}{branch}/");
        dump_subtree(tree, &join(path, &branch), depth + 1);
    }
}

fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}
