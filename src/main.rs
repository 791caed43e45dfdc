// src/main.rs
use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::{Parser as ClapParser, Subcommand};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lottery_central::{
    bet::{WinningNumber, LOTTERY_WINNER_NUMBER},
    client::{self, AgencyClient},
    metrics::Metrics,
    server::{LotteryServer, ServerConfig, DEFAULT_MAX_REJECTED_CHUNKS},
    store::FileBetStore,
};

#[derive(ClapParser, Debug)]
#[command(name = "lottery-central", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the central server.
    Serve {
        #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "SERVER_PORT", default_value_t = 12345)]
        port: u16,
        #[arg(long, env = "SERVER_LISTEN_BACKLOG", default_value_t = 5)]
        listen_backlog: u32,
        /// Agencies per round; winners are drawn once all of them finish.
        #[arg(long, env = "MAX_CLIENTS", default_value_t = 5)]
        max_clients: usize,
        /// How long a finished agency waits for the draw (seconds).
        #[arg(long, env = "WINNERS_TIMEOUT_SECS", default_value_t = 5)]
        winners_timeout_secs: u64,
        #[arg(long, default_value_t = DEFAULT_MAX_REJECTED_CHUNKS)]
        max_rejected_chunks: u32,
        #[arg(long, env = "BETS_FILE", default_value = "bets.ndjson")]
        bets_file: PathBuf,
        /// Rounds to serve before exiting; 0 serves forever.
        #[arg(long, env = "ROUNDS", default_value_t = 0)]
        rounds: u64,
        #[arg(long, default_value_t = LOTTERY_WINNER_NUMBER)]
        winning_number: u32,
        /// Serve Prometheus metrics on this address.
        #[arg(long)]
        metrics_bind: Option<SocketAddr>,
    },
    /// Submit a bets file as one agency and print its winners.
    Agency {
        #[arg(long, env = "CLI_SERVER_ADDRESS", default_value = "127.0.0.1:12345")]
        server: String,
        #[arg(long, env = "CLI_ID")]
        id: u32,
        /// CSV lines: first_name,last_name,document,birthdate,number
        #[arg(long)]
        file: PathBuf,
        #[arg(long, env = "CLI_BATCH_MAX_AMOUNT", default_value_t = 100)]
        max_batch: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("LOGGING_LEVEL").map(|l| l.to_lowercase()))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Serve {
            host,
            port,
            listen_backlog,
            max_clients,
            winners_timeout_secs,
            max_rejected_chunks,
            bets_file,
            rounds,
            winning_number,
            metrics_bind,
        } => {
            let cfg = ServerConfig {
                bind: SocketAddr::new(host, port),
                listen_backlog,
                max_clients,
                winners_timeout: Duration::from_secs(winners_timeout_secs),
                max_rejected_chunks,
                rounds: (rounds != 0).then_some(rounds),
            };
            serve(cfg, bets_file, winning_number, metrics_bind).await
        }
        Cmd::Agency { server, id, file, max_batch } => run_agency(server, id, file, max_batch).await,
    }
}

async fn serve(
    cfg: ServerConfig,
    bets_file: PathBuf,
    winning_number: u32,
    metrics_bind: Option<SocketAddr>,
) -> Result<()> {
    let store = FileBetStore::create(&bets_file).with_context(|| format!("create bets file {:?}", bets_file))?;
    let metrics = Arc::new(Metrics::new());
    let bind = cfg.bind;

    let server = LotteryServer::bind(
        cfg,
        Arc::new(store),
        Arc::new(WinningNumber(winning_number)),
        metrics.clone(),
    )
    .with_context(|| format!("bind {bind}"))?;
    let shutdown = server.shutdown_token();

    let http_task = metrics_bind.map(|addr| {
        let metrics = metrics.clone();
        tokio::spawn(async move {
            info!("http: metrics on {addr}");
            let app = Router::new().route("/metrics", get(metrics_handler)).with_state(metrics);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
            Ok::<(), anyhow::Error>(())
        })
    });

    tokio::spawn(wait_for_signal(shutdown));
    let summary = server.run().await;
    info!("server: exit rounds={}", summary.rounds);

    if let Some(t) = http_task {
        t.abort();
    }
    Ok(())
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (StatusCode::OK, metrics.prometheus_text())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let term = async {
        #[cfg(unix)]
        {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut s) => {
                    s.recv().await;
                }
                Err(e) => {
                    warn!("signal: cannot listen for SIGTERM: {e}");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = signal::ctrl_c() => info!("signal: ctrl-c, shutting down"),
        _ = term => info!("signal: SIGTERM, shutting down"),
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}

async fn run_agency(server: String, id: u32, file: PathBuf, max_batch: usize) -> Result<()> {
    let bets = client::load_bets_csv(&file, id)?;
    info!("agency[{id}]: loaded {} bets from {:?}", bets.len(), file);

    let mut agency = AgencyClient::connect(server.as_str(), id).await?;
    let rejected = agency.send_all(&bets, max_batch).await?;
    if rejected != 0 {
        warn!("agency[{id}]: {rejected} batches rejected");
    }
    agency.finish().await?;

    let winners = agency.recv_winners().await?;
    info!("agency[{id}]: done winners={}", winners.len());
    Ok(())
}
