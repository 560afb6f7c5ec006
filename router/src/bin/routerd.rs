//! Thin CLI wrapper around [`router::Topology`]: load a topology file,
//! start every router, and run until interrupted.
//!
//! This binary is deliberately thin — the topology bootstrapper's own
//! internals are glue, not the routing core — it exists so the crate is
//! runnable end to end.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "routerd", about = "Run a simulated distance-vector routing topology")]
struct Args {
    /// Path to a topology JSON file.
    topology: PathBuf,

    /// Seconds between periodic distance-vector broadcasts.
    #[arg(long, default_value_t = 5)]
    update_time: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let topology = router::Topology::load(&args.topology, Duration::from_secs(args.update_time)).await?;

    topology.start_all()?;
    tracing::info!("{} router(s) started, press ctrl-c to stop", topology.routers().len());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    topology.stop_all().await?;

    Ok(())
}
