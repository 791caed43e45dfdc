// src/wire.rs
//! Record codec for the agency <-> central protocol. Big-endian throughout.
//!
//! ```text
//! chunk    := u16 payload_len, record*            (payload_len counts bytes)
//! record   := field{6}                            (order: bet::FIELDS)
//! field    := u8 len, utf8[len]
//! end      := 'E'
//! request  := u8 agency
//! ack      := u8 (1 = ok, 0 = error)
//! winners  := u16 count, u32 document[count]
//! ```
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::bet::{BetRecord, FIELDS};
use crate::error::CodecError;

pub const END_MARKER: u8 = b'E';
pub const ACK_OK: u8 = 1;
pub const ACK_ERROR: u8 = 0;

pub const CHUNK_PREFIX_LEN: usize = 2;
pub const FIELD_PREFIX_LEN: usize = 1;
pub const AGENCY_REQUEST_LEN: usize = 1;

/// A chunk prefix may not start with the end marker byte, so payloads stop
/// one short of `0x4500`.
pub const MAX_CHUNK_PAYLOAD: usize = ((END_MARKER as usize) << 8) - 1;

#[inline(always)]
fn push_field(out: &mut BytesMut, s: &str) {
    // BetRecord guarantees <= 255 bytes per field
    out.put_u8(s.len() as u8);
    out.put_slice(s.as_bytes());
}

/// Size of one record on the wire.
pub fn encoded_len(bet: &BetRecord) -> usize {
    bet.wire_fields()
        .iter()
        .map(|f| FIELD_PREFIX_LEN + f.len())
        .sum()
}

pub fn encode_bet_into(out: &mut BytesMut, bet: &BetRecord) {
    for field in bet.wire_fields().iter() {
        push_field(out, field);
    }
}

pub fn encode_bet(bet: &BetRecord) -> Bytes {
    let mut out = BytesMut::with_capacity(encoded_len(bet));
    encode_bet_into(&mut out, bet);
    out.freeze()
}

/// Length-prefixed chunk for `bets`. Fails when the payload does not fit
/// [`MAX_CHUNK_PAYLOAD`]; [`chunk_bets`] splits larger inputs.
pub fn encode_chunk(bets: &[BetRecord]) -> Result<Bytes, CodecError> {
    let payload: usize = bets.iter().map(encoded_len).sum();
    if payload > MAX_CHUNK_PAYLOAD {
        return Err(CodecError::ChunkTooLarge { len: payload, max: MAX_CHUNK_PAYLOAD });
    }

    let mut out = BytesMut::with_capacity(CHUNK_PREFIX_LEN + payload);
    out.put_u16(payload as u16);
    for bet in bets {
        encode_bet_into(&mut out, bet);
    }
    Ok(out.freeze())
}

/// Splits `bets` into chunks of at most `max_per_chunk` records that each fit
/// the chunk size cap.
pub fn chunk_bets(bets: &[BetRecord], max_per_chunk: usize) -> Result<Vec<Bytes>, CodecError> {
    let max_per_chunk = max_per_chunk.max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut payload = 0usize;

    for (i, bet) in bets.iter().enumerate() {
        let len = encoded_len(bet);
        let full = i - start == max_per_chunk || payload + len > MAX_CHUNK_PAYLOAD;
        if full && i > start {
            chunks.push(encode_chunk(&bets[start..i])?);
            start = i;
            payload = 0;
        }
        payload += len;
    }
    if start < bets.len() {
        chunks.push(encode_chunk(&bets[start..])?);
    }
    Ok(chunks)
}

/// Decodes one chunk payload (prefix already stripped) into a batch.
///
/// Fails when a field length runs past the payload, the payload ends inside
/// a record, a field is not UTF-8, or the record does not validate.
pub fn decode_batch(mut payload: &[u8]) -> Result<Vec<BetRecord>, CodecError> {
    let mut batch = Vec::new();
    while payload.has_remaining() {
        batch.push(decode_bet(&mut payload)?);
    }
    Ok(batch)
}

/// Decodes a single record from the front of `buf`, advancing it.
pub fn decode_bet(buf: &mut &[u8]) -> Result<BetRecord, CodecError> {
    let mut fields: [&str; 6] = [""; 6];
    for (slot, name) in fields.iter_mut().zip(FIELDS) {
        *slot = decode_field(buf, name)?;
    }
    Ok(BetRecord::from_wire_fields(fields)?)
}

fn decode_field<'a>(buf: &mut &'a [u8], name: &str) -> Result<&'a str, CodecError> {
    if buf.remaining() < FIELD_PREFIX_LEN {
        return Err(CodecError::MalformedRecord(format!(
            "record truncated before field `{name}`"
        )));
    }
    let len = buf.get_u8() as usize;
    if buf.remaining() < len {
        return Err(CodecError::MalformedRecord(format!(
            "field `{name}` claims {len} bytes, {} left",
            buf.remaining()
        )));
    }
    let data: &'a [u8] = buf;
    let (raw, rest) = data.split_at(len);
    *buf = rest;
    std::str::from_utf8(raw)
        .map_err(|e| CodecError::MalformedRecord(format!("field `{name}` is not utf-8: {e}")))
}

#[inline]
pub fn ack(ok: bool) -> [u8; 1] {
    if ok {
        [ACK_OK]
    } else {
        [ACK_ERROR]
    }
}

/// End marker followed by the agency's winners request.
pub fn encode_end(agency: u8) -> [u8; 2] {
    [END_MARKER, agency]
}

/// Most documents a winners reply can carry.
pub const MAX_WINNERS: usize = u16::MAX as usize;

/// Winners reply. Lists longer than [`MAX_WINNERS`] are cut at the cap;
/// callers check the length first.
pub fn encode_winners(documents: &[u32]) -> Bytes {
    let count = documents.len().min(MAX_WINNERS);
    let mut out = BytesMut::with_capacity(2 + count * 4);
    out.put_u16(count as u16);
    for doc in &documents[..count] {
        out.put_u32(*doc);
    }
    out.freeze()
}

/// Inverse of [`encode_winners`], used by the agency side.
pub fn decode_winners(mut buf: &[u8]) -> Result<Vec<u32>, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::MalformedRecord("winners count truncated".into()));
    }
    let count = buf.get_u16() as usize;
    if buf.remaining() < count * 4 {
        return Err(CodecError::MalformedRecord(format!(
            "winners list claims {count} documents, {} bytes left",
            buf.remaining()
        )));
    }
    Ok((0..count).map(|_| buf.get_u32()).collect())
}
