// src/error.rs
//! Error kinds shared by the codec, the store adapters and the per-connection
//! handler. Every per-connection failure is a [`SessionError`] so one
//! misbehaving agency never takes the round down with it.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// A bet field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BetError {
    #[error("field `{field}` is missing")]
    Missing { field: &'static str },
    #[error("field `{field}` is {len} bytes long (max 255)")]
    TooLong { field: &'static str, len: usize },
    #[error("field `{field}` has invalid value {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// Wire level decode failure. The chunk carrying it is rejected with an
/// error ack; the connection keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("malformed record: {0}")]
    InvalidBet(#[from] BetError),
    #[error("chunk payload of {len} bytes exceeds the {max} byte cap")]
    ChunkTooLarge { len: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bet store i/o: {0}")]
    Io(#[from] io::Error),
    #[error("bet store line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("bet store worker failed: {0}")]
    Worker(String),
}

/// Why a round stopped before publishing winners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("round {round} aborted before winners were published")]
pub struct RoundAborted {
    pub round: u64,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("peer closed the connection early ({buffered} bytes of an unfinished frame buffered)")]
    ConnectionClosedEarly { buffered: usize },
    #[error("no winners published within {0:?}")]
    BarrierTimeout(Duration),
    #[error(transparent)]
    RoundAborted(#[from] RoundAborted),
    #[error("{0} consecutive chunks rejected")]
    TooManyRejects(u32),
    #[error("server shutting down")]
    Shutdown,
    #[error("socket: {0}")]
    Io(#[from] io::Error),
}
