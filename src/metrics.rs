// src/metrics.rs
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub connections: AtomicU64,
    pub chunks_ok: AtomicU64,
    pub chunks_rejected: AtomicU64,
    pub bets_stored: AtomicU64,
    pub store_errors: AtomicU64,
    pub sessions_ok: AtomicU64,
    pub sessions_failed: AtomicU64,
    pub closed_early: AtomicU64,
    pub barrier_timeouts: AtomicU64,
    pub draws: AtomicU64,
    pub rounds: AtomicU64,
    pub winners_sent: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_connections(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_chunk_ok(&self, bets: usize) {
        self.chunks_ok.fetch_add(1, Ordering::Relaxed);
        self.bets_stored.fetch_add(bets as u64, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_chunk_rejected(&self) {
        self.chunks_rejected.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_store_err(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_session_ok(&self) {
        self.sessions_ok.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_closed_early(&self) {
        self.closed_early.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_barrier_timeout(&self) {
        self.barrier_timeouts.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_draws(&self) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_rounds(&self) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn add_winners_sent(&self, n: usize) {
        self.winners_sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn prometheus_text(&self) -> String {
        let conns = self.connections.load(Ordering::Relaxed);
        let ok = self.chunks_ok.load(Ordering::Relaxed);
        let rej = self.chunks_rejected.load(Ordering::Relaxed);
        let bets = self.bets_stored.load(Ordering::Relaxed);
        let serr = self.store_errors.load(Ordering::Relaxed);
        let sok = self.sessions_ok.load(Ordering::Relaxed);
        let sfail = self.sessions_failed.load(Ordering::Relaxed);
        let early = self.closed_early.load(Ordering::Relaxed);
        let bto = self.barrier_timeouts.load(Ordering::Relaxed);
        let draws = self.draws.load(Ordering::Relaxed);
        let rounds = self.rounds.load(Ordering::Relaxed);
        let sent = self.winners_sent.load(Ordering::Relaxed);

        format!(
            "\
# TYPE lottery_connections_total counter
lottery_connections_total {conns}
# TYPE lottery_chunks_total counter
lottery_chunks_total{{result=\"ok\"}} {ok}
lottery_chunks_total{{result=\"rejected\"}} {rej}
# TYPE lottery_bets_stored_total counter
lottery_bets_stored_total {bets}
# TYPE lottery_store_errors_total counter
lottery_store_errors_total {serr}
# TYPE lottery_sessions_total counter
lottery_sessions_total{{result=\"ok\"}} {sok}
lottery_sessions_total{{result=\"failed\"}} {sfail}
# TYPE lottery_closed_early_total counter
lottery_closed_early_total {early}
# TYPE lottery_barrier_timeouts_total counter
lottery_barrier_timeouts_total {bto}
# TYPE lottery_draws_total counter
lottery_draws_total {draws}
# TYPE lottery_rounds_total counter
lottery_rounds_total {rounds}
# TYPE lottery_winners_sent_total counter
lottery_winners_sent_total {sent}
"
        )
    }
}
