// src/bet.rs
//! Bet records and the winning rule.
//!
//! A [`BetRecord`] is validated once, when it is built, and is immutable
//! afterwards. Field order on the wire is fixed by [`FIELDS`].
//!
//! ```rust
//! use lottery_central::bet::{BetRecord, WinningNumber, WinningRule};
//!
//! let bet = BetRecord::new(1, "Santiago", "Lorca", "30904465", "1999-03-17", "7574").unwrap();
//! assert_eq!(bet.document_number(), 30904465);
//! assert!(WinningNumber::default().has_won(&bet));
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BetError;

/// Number drawn by the default rule.
pub const LOTTERY_WINNER_NUMBER: u32 = 7574;

/// Longest field the 1-byte length prefix can describe.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Wire order of the record fields.
pub const FIELDS: [&str; 6] = [
    "agency",
    "first_name",
    "last_name",
    "document",
    "birthdate",
    "number",
];

pub type AgencyId = u32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BetFields")]
pub struct BetRecord {
    agency: AgencyId,
    first_name: String,
    last_name: String,
    document: String,
    birthdate: NaiveDate,
    number: String,
}

/// Unvalidated shape used when reading persisted records back.
#[derive(Deserialize)]
struct BetFields {
    agency: AgencyId,
    first_name: String,
    last_name: String,
    document: String,
    birthdate: String,
    number: String,
}

impl TryFrom<BetFields> for BetRecord {
    type Error = BetError;

    fn try_from(f: BetFields) -> Result<Self, Self::Error> {
        let agency = f.agency.to_string();
        Self::from_wire_fields([
            agency.as_str(),
            f.first_name.as_str(),
            f.last_name.as_str(),
            f.document.as_str(),
            f.birthdate.as_str(),
            f.number.as_str(),
        ])
    }
}

impl BetRecord {
    pub fn new(
        agency: AgencyId,
        first_name: &str,
        last_name: &str,
        document: &str,
        birthdate: &str,
        number: &str,
    ) -> Result<Self, BetError> {
        let agency = agency.to_string();
        Self::from_wire_fields([agency.as_str(), first_name, last_name, document, birthdate, number])
    }

    /// Builds a record from its text fields in [`FIELDS`] order.
    pub fn from_wire_fields(fields: [&str; 6]) -> Result<Self, BetError> {
        for (name, value) in FIELDS.iter().zip(fields.iter()) {
            if value.len() > MAX_FIELD_LEN {
                return Err(BetError::TooLong { field: *name, len: value.len() });
            }
        }
        let [agency, first_name, last_name, document, birthdate, number] = fields;

        let agency = parse_u32("agency", agency)?;
        parse_u32("document", document)?;
        parse_u32("number", number)?;
        if birthdate.is_empty() {
            return Err(BetError::Missing { field: "birthdate" });
        }
        let birthdate = NaiveDate::parse_from_str(birthdate, "%Y-%m-%d").map_err(|_| BetError::Invalid {
            field: "birthdate",
            value: birthdate.to_owned(),
        })?;

        Ok(Self {
            agency,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            document: document.to_owned(),
            birthdate,
            number: number.to_owned(),
        })
    }

    /// Text fields in wire order.
    pub fn wire_fields(&self) -> [String; 6] {
        [
            self.agency.to_string(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.document.clone(),
            self.birthdate.format("%Y-%m-%d").to_string(),
            self.number.clone(),
        ]
    }

    pub fn agency(&self) -> AgencyId {
        self.agency
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Document as the integer sent in winners responses. Leading zeros are not kept.
    pub fn document_number(&self) -> u32 {
        // validated at construction
        self.document.parse().unwrap_or_default()
    }

    pub fn birthdate(&self) -> NaiveDate {
        self.birthdate
    }

    pub fn number(&self) -> u32 {
        self.number.parse().unwrap_or_default()
    }
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, BetError> {
    if value.is_empty() {
        return Err(BetError::Missing { field });
    }
    // u32::from_str accepts a leading '+'
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BetError::Invalid { field, value: value.to_owned() });
    }
    value.parse().map_err(|_| BetError::Invalid { field, value: value.to_owned() })
}

/// Business rule deciding whether a single bet wins.
pub trait WinningRule: Send + Sync {
    fn has_won(&self, bet: &BetRecord) -> bool;
}

impl<F> WinningRule for F
where
    F: Fn(&BetRecord) -> bool + Send + Sync,
{
    fn has_won(&self, bet: &BetRecord) -> bool {
        self(bet)
    }
}

/// Wins when the bet number equals the drawn number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WinningNumber(pub u32);

impl Default for WinningNumber {
    fn default() -> Self {
        WinningNumber(LOTTERY_WINNER_NUMBER)
    }
}

impl WinningRule for WinningNumber {
    #[inline]
    fn has_won(&self, bet: &BetRecord) -> bool {
        bet.number() == self.0
    }
}
