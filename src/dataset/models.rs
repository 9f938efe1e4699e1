use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::table::Cell;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("static regex");
}

/// Registration (college) number that groups a candidate's results.
///
/// Numeric keys order numerically and sort before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityKey {
    Number(i64),
    Text(String),
}

impl IdentityKey {
    pub fn from_cell(cell: &Cell) -> Option<Self> {
        if let Some(n) = cell.as_integer() {
            return Some(IdentityKey::Number(n));
        }
        cell.as_text().map(IdentityKey::Text)
    }

    /// Canonical 4-digit form used on the certificate.
    pub fn padded(&self) -> String {
        zero_pad(&self.to_string(), 4)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Number(n) => write!(f, "{n}"),
            IdentityKey::Text(s) => f.write_str(s),
        }
    }
}

/// Exam seat number; one certificate per seat.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatNo(pub String);

impl SeatNo {
    pub fn from_cell(cell: &Cell) -> Option<Self> {
        if let Some(n) = cell.as_integer() {
            return Some(SeatNo(n.to_string()));
        }
        cell.as_text().filter(|s| !s.is_empty()).map(SeatNo)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatNo {
    fn from(value: &str) -> Self {
        SeatNo(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Gender {
    /// `1` is male, `2` is female, anything else is unclassified.
    pub fn from_code(cell: &Cell) -> Self {
        match cell.as_integer() {
            Some(1) => Gender::Male,
            Some(2) => Gender::Female,
            _ => Gender::NotAvailable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::NotAvailable => "N/A",
        }
    }
}

/// Which result wording a certificate uses, with the value it quotes.
///
/// A `None` value means the column exists but the cell was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeVariant {
    CgpaBased { cgpa: Option<String> },
    GradeBased { grade: Option<String> },
}

/// Row of the primary roster after deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub coll_no: IdentityKey,
    /// Remaining roster columns, carried for reference only.
    pub attributes: BTreeMap<String, Cell>,
}

/// Row of the results export that passed the eligibility filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Zero-based data row in the export.
    pub row: usize,
    pub coll_no: IdentityKey,
    pub seat_no: SeatNo,
    pub name: Option<String>,
    pub sex: Cell,
    pub rslt: String,
    /// Remark and override fields; `None` is the absent marker.
    pub frem: Option<String>,
    pub res: Option<String>,
    pub narrative: NarrativeVariant,
}

/// A result ready to be printed.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleRecord {
    pub result: ResultRecord,
    pub gender: Gender,
    /// 1-based position of this result within its identity key.
    pub pno: u32,
    pub coll_no_padded: String,
    pub pno_padded: String,
    /// Matching roster row, if the roster had one.
    pub candidate: Option<CandidateRecord>,
}

impl EligibleRecord {
    pub fn seat_no(&self) -> &SeatNo {
        &self.result.seat_no
    }

    pub fn coll_no(&self) -> &IdentityKey {
        &self.result.coll_no
    }

    /// Display name with collapsed whitespace, `N/A` when missing.
    pub fn display_name(&self) -> String {
        self.result
            .name
            .as_deref()
            .map(|name| WHITESPACE_RUN.replace_all(name.trim(), " ").into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// Left-pad with zeros to `width`, keeping a leading sign in front.
pub fn zero_pad(value: &str, width: usize) -> String {
    let (sign, digits) = match value.strip_prefix(['-', '+']) {
        Some(rest) => (&value[..1], rest),
        None => ("", value),
    };
    let fill = width.saturating_sub(sign.len() + digits.chars().count());
    format!("{sign}{}{digits}", "0".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("7", 4), "0007");
        assert_eq!(zero_pad("1234", 4), "1234");
        assert_eq!(zero_pad("123456", 4), "123456");
        assert_eq!(zero_pad("-12", 4), "-012");
        assert_eq!(zero_pad("AB", 4), "00AB");
    }

    #[test]
    fn test_identity_key_orders_numbers_numerically() {
        let mut keys = vec![
            IdentityKey::Number(100),
            IdentityKey::Text("A1".into()),
            IdentityKey::Number(9),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                IdentityKey::Number(9),
                IdentityKey::Number(100),
                IdentityKey::Text("A1".into())
            ]
        );
        assert_eq!(IdentityKey::from_cell(&Cell::Float(12.0)).unwrap().padded(), "0012");
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code(&Cell::Int(1)), Gender::Male);
        assert_eq!(Gender::from_code(&Cell::Float(2.0)), Gender::Female);
        assert_eq!(Gender::from_code(&Cell::Int(3)), Gender::NotAvailable);
        assert_eq!(Gender::from_code(&Cell::Empty), Gender::NotAvailable);
    }

    #[test]
    fn test_seat_no_from_numeric_cell() {
        assert_eq!(SeatNo::from_cell(&Cell::Float(1001.0)), Some(SeatNo::from("1001")));
        assert_eq!(SeatNo::from_cell(&Cell::text(" S-12 ")), Some(SeatNo::from("S-12")));
        assert_eq!(SeatNo::from_cell(&Cell::Empty), None);
    }
}
