//! Parser for the miner CLI's CSV output (`--format csv`).
//!
//! The hbbft performance CSV drifted across miner releases: older builds
//! emit 6 columns, newer ones add a tenure column for 7. The observed
//! column count selects the schema variant; there is no version flag.

use tracing::{debug, warn};

use crate::model::HbbftPerfRow;
use crate::parse::value::{coerce, parse_ratio};

/// Header token that identifies the (skipped) header row.
const HEADER_TOKEN: &str = "name";

/// Parses hbbft performance CSV into structured rows.
///
/// Two shapes are accepted, selected by column count:
///
/// - 6 columns: `name,bba_votes/total,seen_votes/total,bba_last,seen_last,penalty`
/// - 7 columns: same with `tenure` inserted before `penalty`
///
/// The header row (first field literally `"name"`) is excluded. Rows with
/// an unrecognized column count or non-numeric fields are logged and
/// skipped; the parser never fails.
pub fn parse_hbbft_csv(input: &str) -> Vec<HbbftPerfRow> {
    let mut rows = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields[0] == HEADER_TOKEN {
            continue;
        }

        match fields.len() {
            6 | 7 => {
                if let Some(row) = parse_row(&fields) {
                    rows.push(row);
                } else {
                    warn!("skipping malformed hbbft csv row: {}", line);
                }
            }
            n => {
                debug!("skipping hbbft csv line with {} fields: {}", n, line);
            }
        }
    }

    rows
}

/// Builds one row from 6 or 7 validated fields.
///
/// The penalty is always the last field; tenure only exists in the
/// 7-column shape and defaults to zero otherwise.
fn parse_row(fields: &[&str]) -> Option<HbbftPerfRow> {
    let (bba_votes, bba_total) = parse_ratio(fields[1])?;
    let (seen_votes, seen_total) = parse_ratio(fields[2])?;
    let bba_last = coerce(fields[3]).as_i64()? as u64;
    let seen_last = coerce(fields[4]).as_i64()? as u64;

    let tenure = if fields.len() == 7 {
        coerce(fields[5]).as_f64()?
    } else {
        0.0
    };
    let penalty = coerce(fields[fields.len() - 1]).as_f64()?;

    Some(HbbftPerfRow {
        name: fields[0].to_string(),
        bba_votes,
        bba_total,
        seen_votes,
        seen_total,
        bba_last,
        seen_last,
        tenure,
        penalty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_column_row() {
        let rows = parse_hbbft_csv("curly-peach-owl,11/11,368/368,0,0,1.86\n");
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.name, "curly-peach-owl");
        assert_eq!(row.bba_votes, 11);
        assert_eq!(row.bba_total, 11);
        assert_eq!(row.seen_votes, 368);
        assert_eq!(row.seen_total, 368);
        assert_eq!(row.bba_last, 0);
        assert_eq!(row.seen_last, 0);
        assert_eq!(row.tenure, 0.0);
        assert_eq!(row.penalty, 1.86);
    }

    #[test]
    fn test_seven_column_row_has_tenure() {
        let rows = parse_hbbft_csv("great-clear-chinchilla,5/5,237/237,0,0,2.91,2.91\n");
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.tenure, 2.91);
        assert_eq!(row.penalty, 2.91);
    }

    #[test]
    fn test_header_row_is_excluded() {
        let input = "\
name,bba_completions,seen_votes,last_bba,last_seen,penalty
curly-peach-owl,11/11,368/368,0,0,1.86
";
        let rows = parse_hbbft_csv(input);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "curly-peach-owl");
    }

    #[test]
    fn test_unrecognized_column_count_skipped() {
        let rows = parse_hbbft_csv("a,b,c\nx,1/1,2/2,0,0,0.5\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "x");
    }

    #[test]
    fn test_non_numeric_fields_drop_the_row() {
        // Ratio field is not a ratio; row is dropped, parse never panics.
        let rows = parse_hbbft_csv("bad-owl,eleven/11,368/368,0,0,1.86\n");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_fractional_last_vote_fields_drop_the_row() {
        // bba_last/seen_last are round counts; a float token must not be
        // silently truncated to an integer.
        assert!(parse_hbbft_csv("bad-owl,11/11,368/368,1.9,0,1.86\n").is_empty());
        assert!(parse_hbbft_csv("bad-owl,11/11,368/368,0,2.5,1.86\n").is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_hbbft_csv("").is_empty());
    }
}
