use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hostmon::config::{self, Config};
use hostmon::supervisor::Supervisor;
use hostmon::system::{Collector, SnapshotStore};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "hostmon", about = "Host resource monitoring daemon")]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collection period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Log at debug level, including a per-cycle metrics summary
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    init_logging(&config, cli.debug);

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    let store = Arc::new(SnapshotStore::new());

    // A worker panic is isolated by the supervisor and escalated here as
    // a shutdown request, alongside the OS termination signals.
    let halt = Arc::new(Notify::new());
    let mut supervisor = {
        let halt = Arc::clone(&halt);
        Supervisor::new().with_panic_handler(move |payload| {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "worker panicked, requesting shutdown");
            halt.notify_one();
        })
    };

    let collector = Collector::new(Arc::clone(&store), &config.collector);
    supervisor.register("collector", move |shutdown| collector.run(shutdown))?;
    supervisor.start_all();
    info!(
        pid = std::process::id(),
        period_ms = config.collector.period_ms,
        "hostmon started"
    );

    wait_for_termination(&halt).await;
    info!("shutting down");
    supervisor.stop_all(SHUTDOWN_TIMEOUT).await;

    Ok(())
}

async fn wait_for_termination(halt: &Notify) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                halt.notified().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = halt.notified() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received Ctrl-C"),
            _ = halt.notified() => {}
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn init_logging(config: &Config, debug: bool) {
    let level = if debug { "debug" } else { &config.log.level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hostmon={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from_path(path),
        None => config::load_config(),
    };

    if let Some(period) = cli.period_ms {
        config.collector.period_ms = period;
    }

    config
}
