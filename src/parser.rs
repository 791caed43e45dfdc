// src/parser.rs
//! Frame reassembly for one agency connection.
//!
//! [`FrameParser`] is the pure state machine: bytes go in with
//! [`FrameParser::feed`] in whatever pieces the socket delivers them, complete
//! frames come out of [`FrameParser::next_frame`]. Leftover bytes are always
//! carried over, so pipelined chunks, the end marker and the winners request
//! may share a read. [`FrameReader`] drives it from an async byte source.
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::bet::BetRecord;
use crate::error::{CodecError, SessionError};
use crate::wire::{self, CHUNK_PREFIX_LEN, END_MARKER};

/// Size of the per-connection read buffer, reused on every read.
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A chunk that decoded into a batch (possibly empty).
    Batch(Vec<BetRecord>),
    /// A complete chunk whose payload did not decode. Its bytes are consumed.
    Rejected(CodecError),
    /// End of submission.
    End,
}

#[derive(Default)]
pub struct FrameParser {
    buf: BytesMut,
    /// Payload length of the chunk in progress, once its prefix is read.
    pending: Option<usize>,
    ended: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete frame, or `None` until more bytes are fed.
    /// Returns `None` for good once the end marker was seen.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.ended {
            return None;
        }

        let size = match self.pending {
            Some(size) => size,
            None => {
                if self.buf.first() == Some(&END_MARKER) {
                    self.buf.advance(1);
                    self.ended = true;
                    return Some(Frame::End);
                }
                if self.buf.len() < CHUNK_PREFIX_LEN {
                    return None;
                }
                let size = self.buf.get_u16() as usize;
                self.pending = Some(size);
                size
            }
        };

        if self.buf.len() < size {
            return None;
        }
        let payload = self.buf.split_to(size);
        self.pending = None;

        Some(match wire::decode_batch(&payload) {
            Ok(batch) => Frame::Batch(batch),
            Err(e) => Frame::Rejected(e),
        })
    }

    /// Agency id sent after the end marker, if it has arrived.
    pub fn take_agency_request(&mut self) -> Option<u8> {
        if self.ended && self.buf.has_remaining() {
            Some(self.buf.get_u8())
        } else {
            None
        }
    }

    /// True when no chunk is half-received.
    pub fn at_boundary(&self) -> bool {
        self.pending.is_none() && self.buf.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Bytes buffered but not yet part of an emitted frame.
    pub fn buffered(&self) -> usize {
        self.buf.len() + self.pending.map_or(0, |_| CHUNK_PREFIX_LEN)
    }
}

/// Async driver around [`FrameParser`].
pub struct FrameReader<R> {
    src: R,
    parser: FrameParser,
    scratch: Box<[u8]>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            src,
            parser: FrameParser::new(),
            scratch: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Reads until a frame completes. A clean EOF here always means the peer
    /// left before sending its end marker.
    pub async fn next_frame(&mut self) -> Result<Frame, SessionError> {
        loop {
            if let Some(frame) = self.parser.next_frame() {
                return Ok(frame);
            }
            self.fill().await?;
        }
    }

    /// Like [`next_frame`](Self::next_frame) but gives up with `None` when
    /// `shutdown` fires while no chunk is half-received.
    pub async fn next_frame_or_shutdown(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<Option<Frame>, SessionError> {
        loop {
            if let Some(frame) = self.parser.next_frame() {
                return Ok(Some(frame));
            }
            if self.parser.at_boundary() {
                if shutdown.is_cancelled() {
                    return Ok(None);
                }
                let n = tokio::select! {
                    _ = shutdown.cancelled() => return Ok(None),
                    r = self.src.read(&mut self.scratch) => r?,
                };
                self.absorb(n)?;
            } else {
                self.fill().await?;
            }
        }
    }

    /// The one-byte agency id that follows the end marker.
    pub async fn read_agency_request(&mut self) -> Result<u8, SessionError> {
        loop {
            if let Some(agency) = self.parser.take_agency_request() {
                return Ok(agency);
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<(), SessionError> {
        let n = self.src.read(&mut self.scratch).await?;
        self.absorb(n)
    }

    fn absorb(&mut self, n: usize) -> Result<(), SessionError> {
        if n == 0 {
            return Err(SessionError::ConnectionClosedEarly {
                buffered: self.parser.buffered(),
            });
        }
        self.parser.feed(&self.scratch[..n]);
        Ok(())
    }
}
