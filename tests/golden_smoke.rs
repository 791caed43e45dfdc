// tests/golden_smoke.rs
use std::process::Command;

use lottery_central::bet::BetRecord;
use lottery_central::store::{BetStore, FileBetStore};

#[test]
fn golden_smoke_inspects_bets_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bets.ndjson");

    let store = FileBetStore::create(&path).unwrap();
    store
        .store_bets(&[
            BetRecord::new(1, "Ana", "Diaz", "12345678", "1990-01-02", "7574").unwrap(),
            BetRecord::new(1, "Ana", "Diaz", "12345678", "1990-01-02", "7574").unwrap(),
            BetRecord::new(2, "Juan", "Paz", "87654321", "1985-05-06", "1000").unwrap(),
        ])
        .unwrap();

    let exe = env!("CARGO_BIN_EXE_inspect");
    let out = Command::new(exe).arg(&path).output().unwrap();

    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("bets=3"));
    assert!(text.contains("agency=1 bets=2 winners=1"));
    assert!(text.contains("agency=2 bets=1 winners=0"));
    assert!(text.contains("winners=1\n"));
}

#[test]
fn golden_smoke_cli_help() {
    let exe = env!("CARGO_BIN_EXE_lottery-central");
    let out = Command::new(exe).args(["serve", "--help"]).output().unwrap();

    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("--max-clients"));
    assert!(text.contains("--listen-backlog"));
}

#[test]
fn golden_smoke_inspect_takes_winning_number() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bets.ndjson");
    FileBetStore::create(&path)
        .unwrap()
        .store_bets(&[
            BetRecord::new(1, "Ana", "Diaz", "12345678", "1990-01-02", "7574").unwrap(),
            BetRecord::new(2, "Juan", "Paz", "87654321", "1985-05-06", "1000").unwrap(),
        ])
        .unwrap();

    let exe = env!("CARGO_BIN_EXE_inspect");
    let out = Command::new(exe).arg(&path).arg("1000").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("agency=1 bets=1 winners=0"));
    assert!(text.contains("agency=2 bets=1 winners=1"));

    let bad = Command::new(exe).arg(&path).arg("not-a-number").output().unwrap();
    assert!(!bad.status.success());
}
