//! Merges the roster and results exports into the ordered, sequenced set of
//! records that receive a certificate.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::models::{
    CandidateRecord, EligibleRecord, Gender, IdentityKey, NarrativeVariant, ResultRecord, SeatNo,
};
use super::table::{Row, Table};
use super::validation::{CGPA, COLL_NO, FREM, GRADE, NAME, RES, RSLT, SEAT_NO, SEX};

/// Result code for a pass.
pub const PASS: &str = "P";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("row {row} of the result export has no {column} value")]
    MissingKey { row: usize, column: &'static str },
    #[error("the result export has neither a CGPA nor a GRADE column")]
    MissingNarrativeColumn,
}

/// Spreadsheet row number (header is row 1) for a zero-based data row.
fn sheet_row(index: usize) -> usize {
    index + 2
}

/// Roster rows keyed by identity; the first row seen for a key wins.
pub fn dedupe_roster(roster: &Table) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for row in roster.rows() {
        let Some(coll_no) = IdentityKey::from_cell(row.get(COLL_NO)) else {
            log::warn!("Skipping roster row {} without {}", sheet_row(row.index()), COLL_NO);
            continue;
        };
        if !seen.insert(coll_no.clone()) {
            continue;
        }
        let attributes = row
            .iter()
            .filter(|(column, _)| *column != COLL_NO)
            .map(|(column, cell)| (column.to_string(), cell.clone()))
            .collect();
        candidates.push(CandidateRecord {
            coll_no,
            attributes,
        });
    }

    candidates
}

/// Pick the wording template from the columns the export carries.
///
/// `CGPA` wins when both are present.
fn narrative_column(outcomes: &Table) -> Result<&'static str, ReconciliationError> {
    if outcomes.has_column(CGPA) {
        Ok(CGPA)
    } else if outcomes.has_column(GRADE) {
        Ok(GRADE)
    } else {
        Err(ReconciliationError::MissingNarrativeColumn)
    }
}

/// Passed with no remark and no result override.
fn is_eligible_row(row: &Row<'_>) -> bool {
    row.get(RSLT).as_text().as_deref() == Some(PASS)
        && row.get(FREM).is_missing()
        && row.get(RES).is_missing()
}

fn parse_result(row: &Row<'_>, narrative_column: &str) -> Result<ResultRecord, ReconciliationError> {
    let coll_no = IdentityKey::from_cell(row.get(COLL_NO)).ok_or(ReconciliationError::MissingKey {
        row: sheet_row(row.index()),
        column: COLL_NO,
    })?;
    let seat_no = SeatNo::from_cell(row.get(SEAT_NO)).ok_or(ReconciliationError::MissingKey {
        row: sheet_row(row.index()),
        column: SEAT_NO,
    })?;

    let value = row.get(narrative_column).as_text();
    let narrative = if narrative_column == CGPA {
        NarrativeVariant::CgpaBased { cgpa: value }
    } else {
        NarrativeVariant::GradeBased { grade: value }
    };

    Ok(ResultRecord {
        row: row.index(),
        coll_no,
        seat_no,
        name: row.get(NAME).as_text(),
        sex: row.get(SEX).clone(),
        rslt: PASS.to_string(),
        frem: row.get(FREM).as_text(),
        res: row.get(RES).as_text(),
        narrative,
    })
}

/// Keep the first record per seat number, preserving order.
pub fn dedupe_by_seat(records: Vec<EligibleRecord>) -> Vec<EligibleRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.seat_no().clone()))
        .collect()
}

/// Number records 1..k within each identity key, in slice order.
///
/// Expects `records` to be sorted by identity key already.
pub fn assign_sequence(records: &mut [EligibleRecord]) {
    let mut counters: HashMap<IdentityKey, u32> = HashMap::new();
    for record in records.iter_mut() {
        let counter = counters.entry(record.coll_no().clone()).or_insert(0);
        *counter += 1;
        record.pno = *counter;
        record.pno_padded = super::models::zero_pad(&counter.to_string(), 4);
    }
}

/// Produce the ordered eligible set from both exports.
///
/// Both tables must already have passed column validation.
pub fn reconcile(roster: &Table, outcomes: &Table) -> Result<Vec<EligibleRecord>, ReconciliationError> {
    let candidates: HashMap<IdentityKey, CandidateRecord> = dedupe_roster(roster)
        .into_iter()
        .map(|candidate| (candidate.coll_no.clone(), candidate))
        .collect();
    let narrative_column = narrative_column(outcomes)?;

    let mut records = Vec::new();
    for row in outcomes.rows().filter(is_eligible_row) {
        let result = parse_result(&row, narrative_column)?;
        let gender = Gender::from_code(&result.sex);
        let candidate = candidates.get(&result.coll_no).cloned();
        if candidate.is_none() {
            log::debug!(
                "Seat {} ({} {}) has no roster entry",
                result.seat_no,
                COLL_NO,
                result.coll_no
            );
        }
        records.push(EligibleRecord {
            coll_no_padded: result.coll_no.padded(),
            result,
            gender,
            pno: 0,
            pno_padded: String::new(),
            candidate,
        });
    }

    // Stable: rows sharing a key keep their export order.
    records.sort_by(|a, b| a.coll_no().cmp(b.coll_no()));

    let before = records.len();
    let mut records = dedupe_by_seat(records);
    if records.len() != before {
        log::warn!(
            "Dropped {} result rows with a repeated {}",
            before - records.len(),
            SEAT_NO
        );
    }

    assign_sequence(&mut records);

    log::info!(
        "Reconciled {} roster candidates and {} result rows into {} eligible records",
        candidates.len(),
        outcomes.len(),
        records.len()
    );
    Ok(records)
}
