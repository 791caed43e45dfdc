use lottery_central::bet::{BetRecord, WinningNumber, WinningRule, LOTTERY_WINNER_NUMBER};
use lottery_central::error::BetError;

#[test]
fn builds_and_exposes_fields() {
    let b = BetRecord::new(3, "Ana", "Diaz", "30904465", "1999-03-17", "7574").unwrap();
    assert_eq!(b.agency(), 3);
    assert_eq!(b.first_name(), "Ana");
    assert_eq!(b.last_name(), "Diaz");
    assert_eq!(b.document(), "30904465");
    assert_eq!(b.document_number(), 30904465);
    assert_eq!(b.birthdate().to_string(), "1999-03-17");
    assert_eq!(b.number(), LOTTERY_WINNER_NUMBER);
}

#[test]
fn construction_rejects_bad_fields() {
    assert_eq!(
        BetRecord::new(1, "a", "b", "", "1999-03-17", "1").unwrap_err(),
        BetError::Missing { field: "document" }
    );
    assert!(matches!(
        BetRecord::new(1, "a", "b", "12a", "1999-03-17", "1"),
        Err(BetError::Invalid { field: "document", .. })
    ));
    assert!(matches!(
        BetRecord::new(1, "a", "b", "1", "1999-13-01", "1"),
        Err(BetError::Invalid { field: "birthdate", .. })
    ));
    assert!(matches!(
        BetRecord::new(1, "a", "b", "1", "1999-03-17", "+5"),
        Err(BetError::Invalid { field: "number", .. })
    ));
    assert!(matches!(
        BetRecord::new(1, "a", "b", "99999999999", "1999-03-17", "5"),
        Err(BetError::Invalid { field: "document", .. })
    ));
    let long = "x".repeat(256);
    assert_eq!(
        BetRecord::new(1, &long, "b", "1", "1999-03-17", "1").unwrap_err(),
        BetError::TooLong { field: "first_name", len: 256 }
    );
}

#[test]
fn wire_fields_keep_text_exactly() {
    let b = BetRecord::from_wire_fields(["12", "Jose Maria", "Nunez", "00123", "2001-12-31", "0042"]).unwrap();
    assert_eq!(b.wire_fields(), ["12", "Jose Maria", "Nunez", "00123", "2001-12-31", "0042"].map(String::from));
    assert_eq!(b.document_number(), 123);
    assert_eq!(b.number(), 42);
}

#[test]
fn json_round_trip_validates() {
    let b = BetRecord::new(1, "Ana", "Diaz", "12345678", "1990-01-02", "7574").unwrap();
    let s = serde_json::to_string(&b).unwrap();
    assert_eq!(serde_json::from_str::<BetRecord>(&s).unwrap(), b);

    let bad = s.replace("12345678", "abc");
    assert!(serde_json::from_str::<BetRecord>(&bad).is_err());
}

#[test]
fn winning_rules() {
    let win = BetRecord::new(1, "a", "b", "1", "1999-03-17", "7574").unwrap();
    let lose = BetRecord::new(1, "a", "b", "2", "1999-03-17", "7575").unwrap();

    let rule = WinningNumber::default();
    assert!(rule.has_won(&win));
    assert!(!rule.has_won(&lose));

    let by_doc = |b: &BetRecord| b.document() == "2";
    assert!(by_doc.has_won(&lose));
    assert!(!by_doc.has_won(&win));
}
