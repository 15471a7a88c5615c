//! Headless runner for the cell-life simulation.

mod config;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use config::RunConfig;
use life_world::Simulation;
use std::path::PathBuf;
use telemetry::LogFormat;
use tokio::signal;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "life-runner")]
#[command(about = "Run a cell-based artificial life simulation on a toroidal grid")]
struct Cli {
    /// JSON file with optional `world` and `hyperparameters` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks (runs until interrupted if omitted)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Override the world seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Ticks per second; 0 runs as fast as possible
    #[arg(long, default_value = "0")]
    tick_rate: u32,

    /// Log population metrics every N ticks (0 disables)
    #[arg(long, default_value = "100")]
    stats_interval: u64,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_format)?;

    let mut run_config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(seed) = cli.seed {
        run_config.world.seed = seed;
    }

    info!(
        cols = run_config.world.cols,
        rows = run_config.world.rows,
        seed = run_config.world.seed,
        initial_organisms = run_config.world.initial_organisms,
        "Starting cell-life runner"
    );

    let mut sim = Simulation::new(run_config.world, run_config.hyperparameters)?;
    run_loop(&mut sim, &cli).await;

    let stats = sim.stats();
    stats.emit();
    info!(
        ticks = sim.tick(),
        fossils = sim.species().archive().len(),
        "Simulation finished"
    );
    if let Some(species) = sim.species().archive().longest_lived() {
        info!(
            species = %species.name,
            lifespan = species.lifespan().unwrap_or(0),
            cumulative_population = species.cumulative_population,
            "Longest-lived extinct species"
        );
    }

    Ok(())
}

async fn run_loop(sim: &mut Simulation, cli: &Cli) {
    let mut pacer = (cli.tick_rate > 0).then(|| {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(cli.tick_rate)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        if cli.ticks.is_some_and(|limit| sim.tick() >= limit) {
            info!("Tick limit reached");
            break;
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = pace(&mut pacer) => {
                let summary = sim.step();

                if cli.stats_interval > 0 && summary.tick % cli.stats_interval == 0 {
                    sim.stats().emit();
                }
                if summary.population == 0 {
                    warn!(tick = summary.tick, "Population died out");
                    break;
                }
            }
        }
    }
}

async fn pace(pacer: &mut Option<Interval>) {
    match pacer {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => tokio::task::yield_now().await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
