//! API Pulse Dashboard Binary

use apipulse::{
    Config, FileTokenStore, LogView, RemoteClient, Result, SessionManager, Snapshot,
    SyncOrchestrator,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "apipulse", about = "Terminal client for the API Pulse monitoring backend")]
struct Args {
    /// Base URL of the monitoring backend
    #[arg(long, env = "APIPULSE_BASE_URL")]
    base_url: Option<String>,

    /// Account email
    #[arg(long, env = "APIPULSE_EMAIL")]
    email: String,

    /// Account password
    #[arg(long, env = "APIPULSE_PASSWORD")]
    password: String,

    /// Create the account before signing in
    #[arg(long)]
    register: bool,

    /// Seconds between sync cycles
    #[arg(long, env = "APIPULSE_REFRESH_SECONDS")]
    refresh_seconds: Option<u64>,

    /// Print the merged check logs as CSV after every sync
    #[arg(long)]
    export_csv: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(seconds) = args.refresh_seconds {
        config.refresh_interval = std::time::Duration::from_secs(seconds);
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Starting apipulse v{} against {} (refresh every {}s)",
        env!("CARGO_PKG_VERSION"),
        config.base_url,
        config.refresh_interval.as_secs()
    );

    let client = Arc::new(RemoteClient::new(&config.base_url, config.http_timeout)?);

    if !client.test_connectivity().await {
        warn!("Backend connectivity test failed, but continuing anyway");
    }

    let session = Arc::new(SessionManager::new(
        Arc::clone(&client),
        Box::new(FileTokenStore::new(&config.token_path)),
    ));

    if session.restore().await?.is_none() {
        if args.register {
            let user = session.register(&args.email, &args.password).await?;
            info!("Registered account {}", user.email);
        }
        session.login(&args.email, &args.password).await?;
    }

    let view = LogView::new(config.page_size);
    let orchestrator = Arc::new(SyncOrchestrator::new(Arc::clone(&client), config.clone()));

    let outcome = tokio::select! {
        result = watch(&orchestrator, &view, &config, &args) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("Session lost: {}", e);
        session.logout().await;
        orchestrator.clear().await;
        std::process::exit(1);
    }

    Ok(())
}

/// Periodic sync loop; the first tick fires immediately so the initial
/// load happens right away. Returns only on session loss.
async fn watch(
    orchestrator: &SyncOrchestrator,
    view: &LogView,
    config: &Config,
    args: &Args,
) -> Result<()> {
    let mut ticker = tokio::time::interval(config.refresh_interval);

    loop {
        ticker.tick().await;
        orchestrator.refresh().await?;

        let snapshot = orchestrator.snapshot().await;
        report(&snapshot, orchestrator.last_error().await);

        if args.export_csv {
            print!("{}", view.export_csv(&snapshot.logs));
        }
    }
}

/// Log a one-line overview of the published snapshot, plus any alerts.
fn report(snapshot: &Snapshot, last_error: Option<String>) {
    if let Some(error) = last_error {
        warn!("Last sync failed, showing stale data: {}", error);
        return;
    }

    if let Some(notice) = &snapshot.notice {
        info!("{}", notice);
        return;
    }

    let project = snapshot
        .active_project
        .as_ref()
        .map(|project| project.name.as_str())
        .unwrap_or("-");

    info!(
        "Project {}: uptime {}, avg latency {} ms, {} incidents, {} checks/hour",
        project,
        snapshot.stats.uptime,
        snapshot.stats.avg_latency_ms,
        snapshot.stats.incidents,
        snapshot.stats.checks_last_hour
    );

    for alert in &snapshot.alerts {
        warn!("{}", alert.message);
    }
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
