// src/round.rs
//! Round coordination.
//!
//! A [`Round`] is the only state handlers share with each other: an arrival
//! counter acting as the barrier, and the winners cell the draw publishes
//! into. Both are `watch` channels, so waiters never hold a lock while
//! suspended and the cell is written exactly once per round.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::bet::{AgencyId, BetRecord, WinningRule};
use crate::error::{RoundAborted, SessionError};

/// Winning documents per agency. Duplicates collapse; iteration is ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Winners {
    by_agency: HashMap<AgencyId, BTreeSet<u32>>,
}

impl Winners {
    /// Applies `rule` to every bet and groups the winners by agency.
    pub fn tally<'a>(bets: impl IntoIterator<Item = &'a BetRecord>, rule: &dyn WinningRule) -> Self {
        let mut by_agency: HashMap<AgencyId, BTreeSet<u32>> = HashMap::new();
        for bet in bets {
            if rule.has_won(bet) {
                by_agency
                    .entry(bet.agency())
                    .or_default()
                    .insert(bet.document_number());
            }
        }
        Self { by_agency }
    }

    pub fn for_agency(&self, agency: AgencyId) -> Vec<u32> {
        self.by_agency
            .get(&agency)
            .map(|docs| docs.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.by_agency.values().map(BTreeSet::len).sum()
    }

    pub fn agencies(&self) -> usize {
        self.by_agency.len()
    }
}

pub struct Round {
    id: u64,
    expected: usize,
    arrived: watch::Sender<usize>,
    winners: watch::Sender<Option<Arc<Winners>>>,
    aborted: CancellationToken,
}

impl Round {
    pub fn new(id: u64, expected: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            expected,
            arrived: watch::Sender::new(0),
            winners: watch::Sender::new(None),
            aborted: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn arrived(&self) -> usize {
        *self.arrived.borrow()
    }

    /// A ticket that signals the barrier once, when used or dropped.
    pub fn ticket(self: &Arc<Self>) -> Arrival {
        Arrival {
            round: Arc::clone(self),
            done: false,
        }
    }

    fn mark_arrived(&self) -> usize {
        let mut now = 0;
        self.arrived.send_modify(|n| {
            *n += 1;
            now = *n;
        });
        now
    }

    /// Parks until every expected participant arrived.
    pub async fn await_all_arrived(&self) -> Result<(), RoundAborted> {
        let mut rx = self.arrived.subscribe();
        let expected = self.expected;
        let all = async move { rx.wait_for(|n| *n >= expected).await.map(|_| ()) };

        tokio::select! {
            biased;
            r = all => r.map_err(|_| RoundAborted { round: self.id }),
            _ = self.aborted.cancelled() => Err(RoundAborted { round: self.id }),
        }
    }

    /// Makes the round's winners visible and wakes every waiter.
    pub fn publish_winners(&self, winners: Winners) {
        self.winners.send_replace(Some(Arc::new(winners)));
    }

    pub fn published(&self) -> Option<Arc<Winners>> {
        self.winners.borrow().clone()
    }

    /// Waits for the published winners, at most `timeout`.
    pub async fn await_winners(&self, timeout: Duration) -> Result<Arc<Winners>, SessionError> {
        let mut rx = self.winners.subscribe();
        let ready = async move {
            rx.wait_for(|w| w.is_some())
                .await
                .ok()
                .and_then(|w| w.clone())
        };

        tokio::select! {
            biased;
            r = tokio::time::timeout(timeout, ready) => match r {
                Ok(Some(w)) => Ok(w),
                Ok(None) => Err(RoundAborted { round: self.id }.into()),
                Err(_) => Err(SessionError::BarrierTimeout(timeout)),
            },
            _ = self.aborted.cancelled() => Err(RoundAborted { round: self.id }.into()),
        }
    }

    /// Releases every waiter with [`RoundAborted`]; the round will not draw.
    pub fn abort(&self) {
        self.aborted.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_cancelled()
    }
}

/// Barrier participation of one connection.
pub struct Arrival {
    round: Arc<Round>,
    done: bool,
}

impl Arrival {
    /// Signals the barrier. Returns how many have arrived so far.
    pub fn arrive(mut self) -> usize {
        self.done = true;
        self.round.mark_arrived()
    }
}

impl Drop for Arrival {
    fn drop(&mut self) {
        if !self.done {
            self.round.mark_arrived();
        }
    }
}
