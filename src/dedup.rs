//! Duplicate detection against stored ledger rows.
//!
//! A candidate is a duplicate when some stored row carries exactly the same
//! name/phone/email triple. Comparison is exact string equality, case- and
//! whitespace-sensitive, as stored; the registration date column plays no
//! part. The check is a linear scan over all rows; the store grows by a
//! handful of rows per week.

use crate::record::SignupRecord;

/// Column offsets of the identity triple within a ledger row.
const NAME_COL: usize = 1;
const PHONE_COL: usize = 2;
const EMAIL_COL: usize = 3;

/// Returns whether `candidate`'s identity triple already appears in `rows`.
///
/// `rows` is the full table content, header row included. The header's cells
/// are column titles, so it can never equal a real triple and needs no
/// special-casing. Rows with fewer than four cells never match.
#[must_use]
pub fn is_duplicate(candidate: &SignupRecord, rows: &[Vec<String>]) -> bool {
    rows.iter().any(|row| row_matches(candidate, row))
}

fn row_matches(candidate: &SignupRecord, row: &[String]) -> bool {
    let (name, phone, email) = candidate.identity();
    match (row.get(NAME_COL), row.get(PHONE_COL), row.get(EMAIL_COL)) {
        (Some(row_name), Some(row_phone), Some(row_email)) => {
            row_name == name && row_phone == phone && row_email == email
        }
        _ => false,
    }
}
