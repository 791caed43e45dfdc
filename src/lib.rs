//! # Lottery Central - Concurrent Bet Aggregation Server
//!
//! Agencies connect over TCP, stream their bets as length-prefixed binary
//! chunks, and signal the end of their submission. Once every agency of the
//! round has finished, a single draw runs over everything persisted and each
//! agency receives the documents of its own winners.
//!
//! ## Architecture
//!
//! - **Wire**: record codec for chunks, acks, end marker and winners replies
//! - **Parser**: reassembles frames from partial socket reads without losing bytes
//! - **Store**: persistence adapters behind a write-serialising gateway
//! - **Session**: per-connection state machine, from bets to winners
//! - **Round**: the barrier and the winners cell shared by one round
//! - **Winners**: the draw, run once per round
//! - **Server**: accept loop, round lifecycle, graceful shutdown
//!
//! ## Example
//!
//! ```rust
//! use lottery_central::{
//!     bet::{BetRecord, WinningNumber},
//!     parser::{Frame, FrameParser},
//!     round::Winners,
//!     wire,
//! };
//!
//! let bets = vec![
//!     BetRecord::new(1, "Ana", "Diaz", "12345678", "1990-01-02", "7574").unwrap(),
//!     BetRecord::new(2, "Juan", "Paz", "87654321", "1985-05-06", "1000").unwrap(),
//! ];
//!
//! let mut parser = FrameParser::new();
//! let chunk = wire::encode_chunk(&bets).unwrap();
//! // partial reads are fine
//! parser.feed(&chunk[..3]);
//! assert_eq!(parser.next_frame(), None);
//! parser.feed(&chunk[3..]);
//! assert_eq!(parser.next_frame(), Some(Frame::Batch(bets.clone())));
//!
//! let winners = Winners::tally(&bets, &WinningNumber::default());
//! assert_eq!(winners.for_agency(1), vec![12345678]);
//! assert!(winners.for_agency(2).is_empty());
//! ```
pub mod bet;
pub mod client;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod round;
pub mod server;
pub mod session;
pub mod store;
pub mod winners;
pub mod wire;
