// src/server.rs
//! Accept loop and round lifecycle.
//!
//! Each round spawns one draw task and accepts exactly `max_clients`
//! connections, then joins every handler and the draw before the next round
//! starts. Shutdown stops accepting; handlers finish at a frame boundary.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bet::WinningRule;
use crate::metrics::Metrics;
use crate::round::Round;
use crate::session::{self, SessionContext};
use crate::store::{BetGateway, BetStore};
use crate::winners;

pub const DEFAULT_WINNERS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_REJECTED_CHUNKS: u32 = 8;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub listen_backlog: u32,
    /// Connections per round; the barrier waits for all of them.
    pub max_clients: usize,
    pub winners_timeout: Duration,
    pub max_rejected_chunks: u32,
    /// Stop after this many rounds. `None` serves forever.
    pub rounds: Option<u64>,
}

impl ServerConfig {
    pub fn new(bind: SocketAddr, max_clients: usize) -> Self {
        Self {
            bind,
            listen_backlog: 5,
            max_clients,
            winners_timeout: DEFAULT_WINNERS_TIMEOUT,
            max_rejected_chunks: DEFAULT_MAX_REJECTED_CHUNKS,
            rounds: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u64,
    pub sessions_ok: usize,
    pub sessions_failed: usize,
}

pub struct LotteryServer {
    listener: TcpListener,
    cfg: ServerConfig,
    gateway: BetGateway,
    rule: Arc<dyn WinningRule>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

impl LotteryServer {
    /// Binds and listens. Must be called inside a tokio runtime.
    ///
    /// A round needs at least one agency, so `max_clients == 0` is rejected.
    pub fn bind(
        cfg: ServerConfig,
        store: Arc<dyn BetStore>,
        rule: Arc<dyn WinningRule>,
        metrics: Arc<Metrics>,
    ) -> std::io::Result<Self> {
        if cfg.max_clients == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "max_clients must be at least 1",
            ));
        }
        let socket = match cfg.bind {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(cfg.bind)?;
        let listener = socket.listen(cfg.listen_backlog)?;

        Ok(Self {
            listener,
            cfg,
            gateway: BetGateway::new(store),
            rule,
            metrics,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Cancelling this token starts a graceful shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> RunSummary {
        let ctx = Arc::new(SessionContext {
            gateway: self.gateway.clone(),
            metrics: self.metrics.clone(),
            winners_timeout: self.cfg.winners_timeout,
            max_rejected_chunks: self.cfg.max_rejected_chunks,
            shutdown: self.shutdown.clone(),
        });
        let mut summary = RunSummary::default();
        info!(
            "server: listening on {:?} max_clients={} backlog={}",
            self.listener.local_addr().ok(),
            self.cfg.max_clients,
            self.cfg.listen_backlog
        );

        let mut round_id = 0u64;
        while !self.shutdown.is_cancelled() {
            if self.cfg.rounds.is_some_and(|max| round_id >= max) {
                break;
            }
            round_id += 1;
            self.run_round(round_id, &ctx, &mut summary).await;
        }

        drop(self.listener);
        info!(
            "server: closed after {} rounds ok={} failed={}",
            summary.rounds, summary.sessions_ok, summary.sessions_failed
        );
        summary
    }

    async fn run_round(&self, round_id: u64, ctx: &Arc<SessionContext>, summary: &mut RunSummary) {
        let round = Round::new(round_id, self.cfg.max_clients);
        let draw = tokio::spawn(winners::run_draw(
            round.clone(),
            self.gateway.clone(),
            self.rule.clone(),
            self.metrics.clone(),
        ));
        info!("round[{round_id}]: waiting for {} agencies", self.cfg.max_clients);

        let mut handlers = JoinSet::new();
        let mut accepted = 0usize;
        while accepted < self.cfg.max_clients {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                res = self.listener.accept() => match res {
                    Ok((sock, peer)) => {
                        accepted += 1;
                        info!("round[{round_id}]: accepted {peer} ({accepted}/{})", self.cfg.max_clients);
                        handlers.spawn(session::handle_connection(sock, peer, round.clone(), ctx.clone()));
                    }
                    Err(e) => warn!("round[{round_id}]: accept failed: {e}"),
                },
            }
        }

        if accepted < self.cfg.max_clients {
            // the barrier can never fill up
            info!("round[{round_id}]: shutdown with {accepted}/{} agencies, aborting", self.cfg.max_clients);
            round.abort();
        }

        while let Some(joined) = handlers.join_next().await {
            match joined {
                Ok(Ok(_)) => summary.sessions_ok += 1,
                Ok(Err(_)) => summary.sessions_failed += 1,
                Err(e) => {
                    summary.sessions_failed += 1;
                    error!("round[{round_id}]: handler task failed: {e}");
                }
            }
        }
        if let Err(e) = draw.await {
            error!("round[{round_id}]: draw task failed: {e}");
        }

        if round.is_aborted() {
            info!("round[{round_id}]: aborted");
            return;
        }
        summary.rounds += 1;
        self.metrics.inc_rounds();
        info!("round[{round_id}]: finished");
    }
}
