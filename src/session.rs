// src/session.rs
//! Per-connection handler.
//!
//! ```text
//! ReceivingBets -> AwaitingRoundBarrier -> AwaitingWinners -> SendingWinners -> Closed
//! ```
//!
//! Each accepted socket gets one [`Session`]. It owns its parse buffer and
//! socket halves and touches shared state only through the [`Round`] and the
//! [`BetGateway`]. Whatever way a session ends, its barrier ticket is
//! released, so the other agencies of the round are never starved.
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bet::AgencyId;
use crate::error::SessionError;
use crate::metrics::Metrics;
use crate::parser::{Frame, FrameReader};
use crate::round::{Arrival, Round};
use crate::store::BetGateway;
use crate::wire;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    ReceivingBets,
    AwaitingRoundBarrier,
    AwaitingWinners,
    SendingWinners,
    Closed,
}

/// Everything a session needs besides its socket and round.
pub struct SessionContext {
    pub gateway: BetGateway,
    pub metrics: Arc<Metrics>,
    pub winners_timeout: Duration,
    /// Consecutive undecodable chunks tolerated before the connection is dropped.
    pub max_rejected_chunks: u32,
    pub shutdown: CancellationToken,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub chunks_ok: u32,
    pub chunks_rejected: u32,
    pub bets: usize,
    pub agency: Option<AgencyId>,
    pub winners: usize,
}

struct Session {
    peer: SocketAddr,
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    state: SessionState,
    summary: SessionSummary,
}

/// Serves one agency for one round.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    round: Arc<Round>,
    ctx: Arc<SessionContext>,
) -> Result<SessionSummary, SessionError> {
    let arrival = round.ticket();
    ctx.metrics.inc_connections();
    stream.set_nodelay(true).ok();

    let (rd, wr) = stream.into_split();
    let mut session = Session {
        peer,
        reader: FrameReader::new(rd),
        writer: wr,
        state: SessionState::ReceivingBets,
        summary: SessionSummary::default(),
    };

    let res = session.run(&round, arrival, &ctx).await;
    let _ = session.writer.shutdown().await;

    match res {
        Ok(()) => {
            ctx.metrics.inc_session_ok();
            info!(
                "session[{peer}]: done agency={:?} bets={} winners={}",
                session.summary.agency, session.summary.bets, session.summary.winners
            );
            Ok(session.summary)
        }
        Err(e) => {
            ctx.metrics.inc_session_failed();
            match &e {
                SessionError::ConnectionClosedEarly { .. } => ctx.metrics.inc_closed_early(),
                SessionError::BarrierTimeout(_) => ctx.metrics.inc_barrier_timeout(),
                _ => {}
            }
            error!("session[{peer}]: failed in {:?}: {e}", session.state);
            Err(e)
        }
    }
}

impl Session {
    async fn run(&mut self, round: &Round, arrival: Arrival, ctx: &SessionContext) -> Result<(), SessionError> {
        // an early return drops `arrival`, which still counts at the barrier
        self.receive_bets(ctx).await?;

        self.enter(SessionState::AwaitingRoundBarrier);
        let arrived = arrival.arrive();
        info!(
            "session[{}]: end of bets, round {} at {arrived}/{}",
            self.peer,
            round.id(),
            round.expected()
        );
        round.await_all_arrived().await?;

        self.enter(SessionState::AwaitingWinners);
        let winners = round.await_winners(ctx.winners_timeout).await?;
        let agency = tokio::time::timeout(ctx.winners_timeout, self.reader.read_agency_request())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no winners request"))??;

        self.enter(SessionState::SendingWinners);
        let docs = winners.for_agency(AgencyId::from(agency));
        if docs.len() > wire::MAX_WINNERS {
            warn!(
                "session[{}]: agency={agency} has {} winners, reply truncated to {}",
                self.peer,
                docs.len(),
                wire::MAX_WINNERS
            );
        }
        let sent = docs.len().min(wire::MAX_WINNERS);
        self.writer.write_all(&wire::encode_winners(&docs)).await?;
        self.writer.flush().await?;
        self.summary.winners = sent;
        ctx.metrics.add_winners_sent(sent);
        info!("session[{}]: sent winners agency={agency} count={sent}", self.peer);

        self.enter(SessionState::Closed);
        Ok(())
    }

    async fn receive_bets(&mut self, ctx: &SessionContext) -> Result<(), SessionError> {
        let mut rejected_in_row = 0u32;

        loop {
            let frame = self
                .reader
                .next_frame_or_shutdown(&ctx.shutdown)
                .await?
                .ok_or(SessionError::Shutdown)?;

            let ok = match frame {
                Frame::End => return Ok(()),
                Frame::Batch(batch) => {
                    let agency = batch.first().map(|b| b.agency());
                    match ctx.gateway.store_batch(batch).await {
                        Ok(stored) => {
                            rejected_in_row = 0;
                            self.summary.chunks_ok += 1;
                            self.summary.bets += stored;
                            if self.summary.agency.is_none() {
                                self.summary.agency = agency;
                            }
                            ctx.metrics.inc_chunk_ok(stored);
                            info!("session[{}]: stored batch bets={stored}", self.peer);
                            true
                        }
                        Err(e) => {
                            ctx.metrics.inc_store_err();
                            error!("session[{}]: store batch failed: {e}", self.peer);
                            false
                        }
                    }
                }
                Frame::Rejected(e) => {
                    rejected_in_row += 1;
                    self.summary.chunks_rejected += 1;
                    ctx.metrics.inc_chunk_rejected();
                    warn!("session[{}]: rejected chunk: {e}", self.peer);
                    false
                }
            };

            self.writer.write_all(&wire::ack(ok)).await?;

            if rejected_in_row > ctx.max_rejected_chunks {
                return Err(SessionError::TooManyRejects(rejected_in_row));
            }
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug!("session[{}]: {:?} -> {next:?}", self.peer, self.state);
        self.state = next;
    }
}
