// src/client.rs
//! Agency side of the protocol: submit bets in acked chunks, signal the end,
//! then read back the agency's winners.
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use crate::bet::{AgencyId, BetRecord};
use crate::wire::{self, ACK_ERROR, ACK_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Error,
}

pub struct AgencyClient {
    agency: u8,
    stream: TcpStream,
}

impl AgencyClient {
    /// Winners requests carry the agency as one byte, so ids stop at 255.
    pub async fn connect(addr: impl ToSocketAddrs, agency: AgencyId) -> Result<Self> {
        let agency = u8::try_from(agency).map_err(|_| anyhow!("agency {agency} does not fit the 1-byte request"))?;
        let stream = TcpStream::connect(addr).await.context("connect to lottery central")?;
        stream.set_nodelay(true).ok();
        Ok(Self { agency, stream })
    }

    /// Sends pre-encoded bytes and waits for the ack byte.
    pub async fn send_chunk(&mut self, chunk: &[u8]) -> Result<Ack> {
        self.stream.write_all(chunk).await?;
        match self.stream.read_u8().await.context("read ack")? {
            ACK_OK => Ok(Ack::Ok),
            ACK_ERROR => Ok(Ack::Error),
            other => bail!("unexpected ack byte {other:#04x}"),
        }
    }

    pub async fn send_batch(&mut self, bets: &[BetRecord]) -> Result<Ack> {
        let chunk = wire::encode_chunk(bets)?;
        self.send_chunk(&chunk).await
    }

    /// Sends every bet in acked chunks of at most `max_batch` bets.
    /// Returns how many chunks the server rejected.
    pub async fn send_all(&mut self, bets: &[BetRecord], max_batch: usize) -> Result<usize> {
        let mut rejected = 0;
        for (i, chunk) in wire::chunk_bets(bets, max_batch)?.iter().enumerate() {
            let ack = self.send_chunk(chunk).await?;
            debug!("agency[{}]: batch={} bytes={} ack={ack:?}", self.agency, i + 1, chunk.len());
            if ack == Ack::Error {
                rejected += 1;
            }
        }
        Ok(rejected)
    }

    /// End marker plus winners request.
    pub async fn finish(&mut self) -> Result<()> {
        self.stream.write_all(&wire::encode_end(self.agency)).await?;
        Ok(())
    }

    pub async fn recv_winners(&mut self) -> Result<Vec<u32>> {
        let count = self.stream.read_u16().await.context("read winners count")? as usize;
        let mut docs = Vec::with_capacity(count);
        for _ in 0..count {
            docs.push(self.stream.read_u32().await.context("read winner document")?);
        }
        info!("agency[{}]: winners={}", self.agency, docs.len());
        Ok(docs)
    }
}

const CSV_COLUMNS: usize = 5;

/// Reads `first_name,last_name,document,birthdate,number` rows. Fields may be
/// quoted; there is no header row.
pub fn load_bets_csv(path: &Path, agency: AgencyId) -> Result<Vec<BetRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {:?}", path))?;
    let mut bets = Vec::new();

    for row in rdr.records() {
        let row = row.with_context(|| format!("read {:?}", path))?;
        let line = row.position().map_or(0, |p| p.line());
        if row.len() == 1 && row[0].is_empty() {
            continue;
        }
        if row.len() != CSV_COLUMNS {
            bail!("{:?}:{line}: expected {CSV_COLUMNS} columns, got {}", path, row.len());
        }
        let bet = BetRecord::new(agency, &row[0], &row[1], &row[2], &row[3], &row[4])
            .with_context(|| format!("{:?}:{line}", path))?;
        bets.push(bet);
    }

    Ok(bets)
}
