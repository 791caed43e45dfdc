use lottery_central::bet::BetRecord;
use lottery_central::parser::{Frame, FrameParser};
use lottery_central::wire;
use proptest::prelude::*;
use proptest::sample::Index;

proptest! {
    #[test]
    fn bet_round_trips(bet in any_bet()) {
        let bytes = wire::encode_bet(&bet);
        prop_assert_eq!(bytes.len(), wire::encoded_len(&bet));
        prop_assert_eq!(wire::decode_batch(&bytes).unwrap(), vec![bet]);
    }

    #[test]
    fn frames_do_not_depend_on_read_boundaries(
        batches in prop::collection::vec(prop::collection::vec(any_bet(), 0..8), 1..6),
        cuts in prop::collection::vec(any::<Index>(), 0..24),
        agency in any::<u8>(),
    ) {
        let mut stream = Vec::new();
        for b in &batches {
            stream.extend_from_slice(&wire::encode_chunk(b).unwrap());
        }
        stream.extend_from_slice(&wire::encode_end(agency));

        let whole = parse_pieces(&[&stream[..]]);

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
        points.push(0);
        points.push(stream.len());
        points.sort_unstable();
        points.dedup();
        let pieces: Vec<&[u8]> = points.windows(2).map(|w| &stream[w[0]..w[1]]).collect();
        let split = parse_pieces(&pieces);

        let mut expected: Vec<Frame> = batches.into_iter().map(Frame::Batch).collect();
        expected.push(Frame::End);

        prop_assert_eq!(&whole, &split);
        prop_assert_eq!(whole.0, expected);
        prop_assert_eq!(whole.1, Some(agency));
    }
}

fn parse_pieces(pieces: &[&[u8]]) -> (Vec<Frame>, Option<u8>) {
    let mut parser = FrameParser::new();
    let mut frames = Vec::new();
    for piece in pieces {
        parser.feed(piece);
        while let Some(f) = parser.next_frame() {
            frames.push(f);
        }
    }
    (frames, parser.take_agency_request())
}

fn any_bet() -> impl Strategy<Value = BetRecord> {
    (
        1u32..1_000u32,
        "\\PC{0,30}",
        "\\PC{0,30}",
        any::<u32>(),
        (1900i32..2020i32, 1u32..13u32, 1u32..29u32),
        0u32..10_000u32,
    )
        .prop_map(|(agency, first, last, doc, (y, m, d), number)| {
            BetRecord::new(
                agency,
                &first,
                &last,
                &doc.to_string(),
                &format!("{y:04}-{m:02}-{d:02}"),
                &number.to_string(),
            )
            .unwrap()
        })
}
