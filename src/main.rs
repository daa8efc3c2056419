//! Server isolation CLI.
//!
//! ```text
//!   config.toml ──▶ ConfigPolicyProvider ◀── ConfigWatcher (monitor only)
//!                          │
//!   snapshot.json ──▶ StatsRegistry
//!                          │
//!                          ▼
//!                   IsolationFilter ──▶ allowed servers (stdout / log)
//!                          │
//!                          ▼
//!                    event channel ──▶ EventLogger (monitor) / JSON (check)
//! ```

use clap::{Parser, Subcommand};
use std::error::Error;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use server_isolation::config::{load_config, watcher::ConfigWatcher, IsolationConfig};
use server_isolation::isolation::{channel, EventLogger, NoopSink};
use server_isolation::load_balancer::ServerPool;
use server_isolation::observability::{logging, metrics};
use server_isolation::snapshot::{check_report, load_snapshot, seed_registry, SnapshotServer};
use server_isolation::stats::now_millis;
use server_isolation::{ConfigPolicyProvider, IsolationFilter, PolicyProvider, StatsRegistry};

#[derive(Parser)]
#[command(name = "server-isolation")]
#[command(about = "Evaluate server isolation thresholds against exported stats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print resolved policies
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        /// Services to resolve in addition to the global defaults
        #[arg(short, long)]
        service: Vec<String>,
    },
    /// Filter a stats snapshot once and print the result as JSON
    Check {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(short, long)]
        service: String,
        /// Evaluate as of this epoch-millis timestamp instead of now
        #[arg(long)]
        now_ms: Option<u64>,
    },
    /// Re-evaluate a snapshot periodically, hot-reloading the config
    Monitor {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(short, long)]
        service: String,
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config, service } => validate(&config, &service)?,
        Commands::Check {
            config,
            snapshot,
            service,
            now_ms,
        } => check(&config, &snapshot, &service, now_ms)?,
        Commands::Monitor {
            config,
            snapshot,
            service,
            interval_secs,
        } => monitor(config, snapshot, service, interval_secs).await?,
    }

    Ok(())
}

fn validate(path: &Path, services: &[String]) -> Result<(), Box<dyn Error>> {
    let config = load_config(path)?;
    logging::init_logging(&config.observability);
    let pool = ServerPool::from_config(&config, Arc::new(NoopSink));
    let provider = ConfigPolicyProvider::new(config);

    println!("{} is valid", path.display());
    for name in std::iter::once("<default>").chain(services.iter().map(String::as_str)) {
        let policy = provider.policy(name)?;
        println!(
            "{name}: enabled={} error_threshold_percentage={} enable_request_threshold={} \
             single_test_time_ms={} continuous_failure_threshold={}",
            policy.enabled,
            policy.error_threshold_percentage,
            policy.enable_request_threshold,
            policy.single_test_time_window.as_millis(),
            policy.continuous_failure_threshold,
        );
    }
    for name in pool.services() {
        let addrs: Vec<String> = pool
            .backends(name)
            .iter()
            .map(|b| b.addr.to_string())
            .collect();
        println!("{name}: backends={}", addrs.join(","));
    }
    Ok(())
}

fn check(
    config_path: &Path,
    snapshot_path: &Path,
    service: &str,
    now_ms: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path)?;
    logging::init_logging(&config.observability);
    let servers = load_snapshot(snapshot_path)?;

    let now = now_ms.unwrap_or_else(now_millis);
    let report = check_report(config, &servers, service, now);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn monitor(
    config_path: PathBuf,
    snapshot_path: PathBuf,
    service: String,
    interval_secs: u64,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(&config_path)?;
    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = StatsRegistry::new();
    let provider = ConfigPolicyProvider::new(config.clone());
    let (sink, events) = channel(config.events.channel_capacity);
    let filter: IsolationFilter<SnapshotServer> = IsolationFilter::new(
        Arc::new(provider.clone()),
        Arc::new(registry.clone()),
        Arc::new(sink),
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let logger = tokio::spawn(EventLogger::new(events).run(shutdown_tx.subscribe()));

    let (watcher, updates) = ConfigWatcher::new(&config_path);
    let _watcher = watcher.run()?;

    let monitor = Monitor {
        filter,
        registry,
        provider,
        snapshot_path,
        service,
        interval: Duration::from_secs(interval_secs.max(1)),
    };
    let ticks = monitor.run(updates, tokio::signal::ctrl_c()).await;
    tracing::info!(ticks, "Shutdown signal received");

    let _ = shutdown_tx.send(());
    let handled = logger.await?;
    tracing::info!(events = handled, "Shutdown complete");
    Ok(())
}

struct Monitor {
    filter: IsolationFilter<SnapshotServer>,
    registry: StatsRegistry,
    provider: ConfigPolicyProvider,
    snapshot_path: PathBuf,
    service: String,
    interval: Duration,
}

impl Monitor {
    /// Evaluate the snapshot every interval and apply config updates until
    /// `shutdown` resolves. Returns the number of evaluations.
    async fn run<F: Future>(
        self,
        mut updates: mpsc::UnboundedReceiver<IsolationConfig>,
        shutdown: F,
    ) -> u64 {
        tracing::info!(
            service = %self.service,
            snapshot = %self.snapshot_path.display(),
            interval_secs = self.interval.as_secs(),
            "Monitoring isolation decisions"
        );

        // Polled across iterations so a signal during a tick is not lost.
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        let mut ticks = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    ticks += 1;
                    self.evaluate();
                }
                Some(new_config) = updates.recv() => {
                    self.provider.store(new_config);
                }
            }
        }

        ticks
    }

    fn evaluate(&self) {
        match load_snapshot(&self.snapshot_path) {
            Ok(servers) => {
                seed_registry(&self.registry, &servers);
                let allowed = self.filter.filter_servers(&servers, &self.service);
                tracing::info!(
                    service = %self.service,
                    candidates = servers.len(),
                    allowed = allowed.len(),
                    "Evaluated snapshot"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Failed to read snapshot"),
        }
    }
}
