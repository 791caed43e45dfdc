// src/store.rs
//! Bet persistence.
//!
//! The server only talks to [`BetGateway`], which serialises writers around a
//! single mutex and keeps blocking store calls off the socket tasks. Two
//! stores are provided: [`FileBetStore`] (newline-delimited JSON, the
//! deployment default) and [`MemoryBetStore`].
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::bet::BetRecord;
use crate::error::StoreError;

/// Persistence collaborator. Implementations may block.
pub trait BetStore: Send + Sync + 'static {
    /// Appends the whole batch or nothing.
    fn store_bets(&self, bets: &[BetRecord]) -> Result<(), StoreError>;
    /// Every record stored so far, in append order.
    fn load_bets(&self) -> Result<Vec<BetRecord>, StoreError>;
}

pub struct FileBetStore {
    path: PathBuf,
}

impl FileBetStore {
    /// Starts an empty log at `path`, truncating any previous run.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        File::create(&path)?;
        Ok(Self { path })
    }

    /// Uses an existing log as is.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BetStore for FileBetStore {
    fn store_bets(&self, bets: &[BetRecord]) -> Result<(), StoreError> {
        if bets.is_empty() {
            return Ok(());
        }
        // One buffer, one write: a batch never interleaves with another.
        let mut out = Vec::with_capacity(bets.len() * 96);
        for bet in bets {
            serde_json::to_writer(&mut out, bet).map_err(|e| StoreError::Io(e.into()))?;
            out.push(b'\n');
        }
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        f.write_all(&out)?;
        f.flush()?;
        Ok(())
    }

    fn load_bets(&self) -> Result<Vec<BetRecord>, StoreError> {
        let f = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut br = BufReader::new(f);
        let mut line = String::new();
        let mut bets = Vec::new();
        let mut line_no = 0usize;

        loop {
            line.clear();
            if br.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;

            let s = line.trim();
            if s.is_empty() {
                continue;
            }
            let bet: BetRecord =
                serde_json::from_str(s).map_err(|source| StoreError::Corrupt { line: line_no, source })?;
            bets.push(bet);
        }

        Ok(bets)
    }
}

#[derive(Default)]
pub struct MemoryBetStore {
    bets: Mutex<Vec<BetRecord>>,
}

impl MemoryBetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BetStore for MemoryBetStore {
    fn store_bets(&self, bets: &[BetRecord]) -> Result<(), StoreError> {
        self.bets
            .lock()
            .map_err(|_| StoreError::Worker("memory store lock poisoned".into()))?
            .extend_from_slice(bets);
        Ok(())
    }

    fn load_bets(&self) -> Result<Vec<BetRecord>, StoreError> {
        Ok(self
            .bets
            .lock()
            .map_err(|_| StoreError::Worker("memory store lock poisoned".into()))?
            .clone())
    }
}

/// Shared handle the connection handlers and the draw use.
#[derive(Clone)]
pub struct BetGateway {
    store: Arc<dyn BetStore>,
    write_lock: Arc<Mutex<()>>,
}

impl BetGateway {
    pub fn new(store: Arc<dyn BetStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends one batch. Returns the number of records stored.
    pub async fn store_batch(&self, batch: Vec<BetRecord>) -> Result<usize, StoreError> {
        let store = self.store.clone();
        let lock = self.write_lock.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, StoreError> {
            let _guard = lock
                .lock()
                .map_err(|_| StoreError::Worker("store write lock poisoned".into()))?;
            store.store_bets(&batch)?;
            Ok(batch.len())
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    pub async fn load_all(&self) -> Result<Vec<BetRecord>, StoreError> {
        let store = self.store.clone();
        let lock = self.write_lock.clone();
        tokio::task::spawn_blocking(move || {
            // no batch is half-written while we read
            let _guard = lock
                .lock()
                .map_err(|_| StoreError::Worker("store write lock poisoned".into()))?;
            store.load_bets()
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}
