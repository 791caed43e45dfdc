use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lottery_central::bet::{WinningNumber, LOTTERY_WINNER_NUMBER};
use lottery_central::round::Winners;
use lottery_central::store::{BetStore, FileBetStore};

/// Summarise a bets file: totals and winners per agency.
#[derive(Parser, Debug)]
#[command(name = "inspect", version)]
struct Args {
    #[arg(default_value = "bets.ndjson")]
    path: PathBuf,
    #[arg(default_value_t = LOTTERY_WINNER_NUMBER)]
    winning_number: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bets = FileBetStore::open(&args.path)
        .load_bets()
        .with_context(|| format!("load {:?}", args.path))?;

    let mut per_agency = BTreeMap::<u32, usize>::new();
    for bet in &bets {
        *per_agency.entry(bet.agency()).or_default() += 1;
    }
    let winners = Winners::tally(&bets, &WinningNumber(args.winning_number));

    println!("bets={}", bets.len());
    for (agency, count) in &per_agency {
        println!("agency={agency} bets={count} winners={}", winners.for_agency(*agency).len());
    }
    println!("winners={}", winners.total());
    Ok(())
}
