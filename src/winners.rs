// src/winners.rs
//! The per-round draw. One task per round; the coordinator spawns it, so it
//! runs exactly once no matter how many handlers reach the barrier together.
use std::sync::Arc;

use tracing::{error, info};

use crate::bet::WinningRule;
use crate::metrics::Metrics;
use crate::round::{Round, Winners};
use crate::store::BetGateway;

pub async fn run_draw(
    round: Arc<Round>,
    gateway: BetGateway,
    rule: Arc<dyn WinningRule>,
    metrics: Arc<Metrics>,
) {
    if round.await_all_arrived().await.is_err() {
        info!("draw[{}]: round aborted, no draw", round.id());
        return;
    }

    let bets = match gateway.load_all().await {
        Ok(bets) => bets,
        Err(e) => {
            error!("draw[{}]: load bets failed: {e}", round.id());
            round.abort();
            return;
        }
    };

    let winners = Winners::tally(&bets, rule.as_ref());
    info!(
        "draw[{}]: bets={} winners={} agencies={}",
        round.id(),
        bets.len(),
        winners.total(),
        winners.agencies()
    );
    metrics.inc_draws();
    round.publish_winners(winners);
}
