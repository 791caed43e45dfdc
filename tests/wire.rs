use lottery_central::bet::BetRecord;
use lottery_central::error::{BetError, CodecError};
use lottery_central::parser::{Frame, FrameParser};
use lottery_central::wire::{self, ACK_ERROR, ACK_OK, END_MARKER, MAX_CHUNK_PAYLOAD};

fn bet(agency: u32, doc: &str, number: &str) -> BetRecord {
    BetRecord::new(agency, "Santiago Lionel", "Lorca", doc, "1999-03-17", number).unwrap()
}

#[test]
fn record_layout_is_length_prefixed_fields_in_order() {
    let b = BetRecord::new(7, "Ana", "Diaz", "123", "1990-01-02", "42").unwrap();
    let bytes = wire::encode_bet(&b);

    let mut expected = Vec::new();
    for f in ["7", "Ana", "Diaz", "123", "1990-01-02", "42"] {
        expected.push(f.len() as u8);
        expected.extend_from_slice(f.as_bytes());
    }
    assert_eq!(&bytes[..], &expected[..]);
}

#[test]
fn chunk_prefix_counts_bytes_not_records() {
    let bets = vec![bet(1, "1", "1"), bet(1, "2", "2")];
    let chunk = wire::encode_chunk(&bets).unwrap();
    let payload = u16::from_be_bytes([chunk[0], chunk[1]]) as usize;

    assert_eq!(payload, chunk.len() - 2);
    assert_eq!(wire::decode_batch(&chunk[2..]).unwrap(), bets);
}

#[test]
fn empty_payload_is_empty_batch() {
    assert_eq!(wire::decode_batch(&[]).unwrap(), Vec::<BetRecord>::new());
    assert_eq!(&wire::encode_chunk(&[]).unwrap()[..], &[0, 0]);
}

#[test]
fn field_length_past_payload_is_malformed() {
    let err = wire::decode_batch(&[10, b'1']).unwrap_err();
    assert!(matches!(err, CodecError::MalformedRecord(_)), "{err:?}");
}

#[test]
fn payload_ending_inside_a_record_is_malformed() {
    let full = wire::encode_bet(&bet(1, "1", "1"));
    let err = wire::decode_batch(&full[..full.len() - 3]).unwrap_err();
    assert!(matches!(err, CodecError::MalformedRecord(_)), "{err:?}");

    // trailing partial record after a good one
    let mut two = full.to_vec();
    two.extend_from_slice(&[1, b'1']);
    assert!(wire::decode_batch(&two).is_err());
}

#[test]
fn invalid_utf8_is_malformed() {
    let mut bytes = vec![1, b'1'];
    bytes.extend_from_slice(&[2, 0xff, 0xfe]);
    let err = wire::decode_batch(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::MalformedRecord(m) if m.contains("utf-8")));
}

#[test]
fn invalid_field_value_is_rejected() {
    let mut bytes = Vec::new();
    for f in ["x1", "Ana", "Diaz", "123", "1990-01-02", "42"] {
        bytes.push(f.len() as u8);
        bytes.extend_from_slice(f.as_bytes());
    }
    let err = wire::decode_batch(&bytes).unwrap_err();
    assert_eq!(
        err,
        CodecError::InvalidBet(BetError::Invalid { field: "agency", value: "x1".into() })
    );
}

#[test]
fn winners_response_layout() {
    let bytes = wire::encode_winners(&[12345678]);
    assert_eq!(&bytes[..], &[0, 1, 0x00, 0xBC, 0x61, 0x4E]);
    assert_eq!(wire::decode_winners(&bytes).unwrap(), vec![12345678]);

    let none = wire::encode_winners(&[]);
    assert_eq!(&none[..], &[0, 0]);
    assert!(wire::decode_winners(&[0, 2, 0, 0, 0, 1]).is_err());
}

#[test]
fn ack_and_end_bytes() {
    assert_eq!(wire::ack(true), [ACK_OK]);
    assert_eq!(wire::ack(false), [ACK_ERROR]);
    assert_eq!(wire::encode_end(3), [END_MARKER, 3]);
    assert_eq!(END_MARKER, b'E');
}

#[test]
fn chunk_bets_respects_record_and_size_caps() {
    let bets: Vec<_> = (0..25).map(|i| bet(1, &i.to_string(), "1")).collect();
    let chunks = wire::chunk_bets(&bets, 10).unwrap();
    assert_eq!(chunks.len(), 3);

    let decoded: Vec<BetRecord> = chunks
        .iter()
        .flat_map(|c| wire::decode_batch(&c[2..]).unwrap())
        .collect();
    assert_eq!(decoded, bets);

    let long = "x".repeat(255);
    let big: Vec<_> = (0..200)
        .map(|i| BetRecord::new(1, &long, &long, &i.to_string(), "1999-03-17", "1").unwrap())
        .collect();
    for c in wire::chunk_bets(&big, 1_000).unwrap() {
        assert!(c.len() - 2 <= MAX_CHUNK_PAYLOAD);
        assert_ne!(c[0], END_MARKER);
    }
}

#[test]
fn over_cap_batch_is_refused_not_truncated() {
    let long = "x".repeat(255);
    let big: Vec<_> = (0..34)
        .map(|i| BetRecord::new(1, &long, &long, &i.to_string(), "1999-03-17", "1").unwrap())
        .chain(std::iter::once(bet(1, "99", "7574")))
        .collect();
    let payload: usize = big.iter().map(wire::encoded_len).sum();
    assert!(payload > MAX_CHUNK_PAYLOAD);

    match wire::encode_chunk(&big) {
        Err(CodecError::ChunkTooLarge { len, max }) => {
            assert_eq!(len, payload);
            assert_eq!(max, MAX_CHUNK_PAYLOAD);
        }
        other => panic!("expected ChunkTooLarge, got {other:?}"),
    }

    // the same bets split by chunk_bets parse back as batches, never as an end marker
    let mut parser = FrameParser::new();
    for c in wire::chunk_bets(&big, 1_000).unwrap() {
        parser.feed(&c);
    }
    let mut decoded = Vec::new();
    while let Some(frame) = parser.next_frame() {
        match frame {
            Frame::Batch(b) => decoded.extend(b),
            other => panic!("unexpected frame {other:?}"),
        }
    }
    assert_eq!(decoded, big);
}

#[test]
fn winners_reply_is_capped_at_u16_count() {
    let docs: Vec<u32> = (0..(wire::MAX_WINNERS as u32 + 10)).collect();
    let bytes = wire::encode_winners(&docs);

    assert_eq!(&bytes[..2], &[0xFF, 0xFF]);
    assert_eq!(bytes.len(), 2 + wire::MAX_WINNERS * 4);
    assert_eq!(wire::decode_winners(&bytes).unwrap(), docs[..wire::MAX_WINNERS].to_vec());
}
