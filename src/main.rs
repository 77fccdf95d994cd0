use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ledger_gateway::db::HistoryDb;
use ledger_gateway::health::{HealthCache, HealthCheck};
use ledger_gateway::txsub::{DefaultSubmitter, Submitter};
use ledger_gateway::{api, ledger, reap, stellarcore, sync, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "ledger-gateway",
    about = "Ledger ingestion and transaction submission gateway for a Stellar-style network",
    version
)]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "BIND_ADDRESS")]
    bind: String,

    /// HTTP URL of the core node
    #[arg(long, default_value = "http://localhost:11626", env = "CORE_URL")]
    core_url: String,

    /// Number of most recent ledgers to retain; 0 keeps all history
    #[arg(long, default_value = "0", env = "HISTORY_RETENTION_COUNT")]
    history_retention_count: u32,

    /// Seconds between reaper runs
    #[arg(long, default_value = "3600", env = "REAP_INTERVAL_SECS")]
    reap_interval_secs: u64,

    /// Seconds between polls of the core node's info endpoint
    #[arg(long, default_value = "5", env = "CORE_POLL_INTERVAL_SECS")]
    core_poll_interval_secs: u64,

    /// How long a health check result is served from cache, in milliseconds
    #[arg(long, default_value = "500", env = "HEALTH_CACHE_TTL_MS")]
    health_cache_ttl_ms: u64,

    /// Deadline for a single transaction submission, in seconds
    #[arg(long, default_value = "30", env = "SUBMISSION_TIMEOUT_SECS")]
    submission_timeout_secs: u64,

    /// Timeout for outgoing HTTP connections, in seconds
    #[arg(long, default_value = "10", env = "CONNECTION_TIMEOUT_SECS")]
    connection_timeout_secs: u64,

    /// Reject transaction submissions
    #[arg(long, env = "DISABLE_TX_SUB")]
    disable_tx_sub: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(cli.connection_timeout_secs))
        .build()?;
    let core = stellarcore::Client::new(client, cli.core_url.clone());
    tracing::info!(core_url = %cli.core_url, "using core node");

    let db = Arc::new(HistoryDb::new());
    let ledger_state = Arc::new(ledger::State::new());
    let health = HealthCheck::new(
        db.clone(),
        Arc::new(core.clone()),
        HealthCache::new(Duration::from_millis(cli.health_cache_ttl_ms)),
    );

    let submitter: Option<Arc<dyn Submitter>> = if cli.disable_tx_sub {
        tracing::info!("transaction submission disabled");
        None
    } else {
        Some(Arc::new(DefaultSubmitter::new(
            core.clone(),
            Duration::from_secs(cli.submission_timeout_secs),
        )))
    };

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        ledger_state: Arc::clone(&ledger_state),
        health,
        submitter,
    });

    let cancel = CancellationToken::new();

    // Start background tasks
    let poller = tokio::spawn(sync::run_core_poller(
        Arc::new(core),
        Arc::clone(&ledger_state),
        Duration::from_secs(cli.core_poll_interval_secs),
        cancel.clone(),
    ));

    let reaper = reap::System::new(db, cli.history_retention_count, ledger_state);
    let reap_interval = Duration::from_secs(cli.reap_interval_secs);
    let reap_cancel = cancel.clone();
    let reaper = tokio::spawn(async move {
        reaper.run(reap_interval, reap_cancel).await;
    });

    // Build and start HTTP server
    let app = api::router(state, Some(metrics_handle));
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    tracing::info!(address = %addr, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    let _ = tokio::join!(poller, reaper);

    Ok(())
}
