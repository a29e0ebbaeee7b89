//! Parser for the miner CLI's fixed-width pipe tables.
//!
//! The miner renders tables like:
//!
//! ```text
//! +---------+-----------------+
//! |address  |name             |
//! +---------+-----------------+
//! |11abc... |curly-peach-owl  |
//! +---------+-----------------+
//! ```
//!
//! Rows are recognized only when splitting on `|` yields the exact column
//! count expected for the table kind. Border lines (runs of `+` and `-`)
//! are skipped silently; any other mismatched line is logged and skipped.
//! The parser never fails on malformed input.

use tracing::debug;

/// Splits a pipe-table blob into rows of trimmed fields.
///
/// Only lines that produce exactly `expected_cols` fields are returned.
/// Empty input yields an empty vector.
pub fn parse_pipe_table(input: &str, expected_cols: usize) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || is_border_line(line) {
            continue;
        }

        let fields = split_pipe_line(line);
        if fields.len() != expected_cols {
            debug!(
                "skipping table line with {} fields (expected {}): {}",
                fields.len(),
                expected_cols,
                line
            );
            continue;
        }

        rows.push(fields);
    }

    rows
}

/// Splits one table line on `|`, trimming each field.
///
/// Leading and trailing delimiters produce empty edge fields which are
/// dropped, so `|a|b|` yields exactly two fields.
fn split_pipe_line(line: &str) -> Vec<String> {
    let mut parts: Vec<&str> = line.split('|').collect();
    if parts.first() == Some(&"") {
        parts.remove(0);
    }
    if parts.last() == Some(&"") {
        parts.pop();
    }
    parts.into_iter().map(|f| f.trim().to_string()).collect()
}

/// Returns true for table border/formatting lines like `+----+----+`.
fn is_border_line(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b == b'+' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEDGER_TABLE: &str = "\
+----------+-----------------+-------+----------------+-------+--------+---------+----------------+-------------+---------------------+---------------+-------+
|address   |name             |owner  |last_heartbeat  |stake  |status  |version  |tenure_penalty  |dkg_penalty  |performance_penalty  |total_penalty  |nonce  |
+----------+-----------------+-------+----------------+-------+--------+---------+----------------+-------------+---------------------+---------------+-------+
|11abcdef  |curly-peach-owl  |11own  |992929          |10000  |staked  |3.0.0    |1.00            |0.00         |0.86                 |1.86           |1      |
|11zyxwvu  |great-clear-chinchilla  |11own2  |992901   |10000  |staked  |3.0.0    |2.00            |0.50         |0.41                 |2.91           |1      |
+----------+-----------------+-------+----------------+-------+--------+---------+----------------+-------------+---------------------+---------------+-------+
";

    #[test]
    fn test_parse_ledger_table() {
        let rows = parse_pipe_table(LEDGER_TABLE, 12);

        // Header + 2 data rows all have 12 columns; borders are dropped.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "curly-peach-owl");
        assert_eq!(rows[1][10], "1.86");
        assert_eq!(rows[2][1], "great-clear-chinchilla");
        assert_eq!(rows[2][10], "2.91");
    }

    #[test]
    fn test_mismatched_rows_are_skipped() {
        let input = "\
+----+----+
|a   |b   |
|only one field
|x|y|z|
garbage without pipes
";
        let rows = parse_pipe_table(input, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_border_lines_produce_no_rows() {
        let input = "+------+------+\n+-+-+\n------\n";
        assert!(parse_pipe_table(input, 2).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_pipe_table("", 8).is_empty());
        assert!(parse_pipe_table("\n\n", 8).is_empty());
    }

    #[test]
    fn test_split_pipe_line_edges() {
        assert_eq!(split_pipe_line("|a |b|"), vec!["a", "b"]);
        assert_eq!(split_pipe_line("a|b"), vec!["a", "b"]);
        // An interior empty field is preserved, only edge fields are dropped.
        assert_eq!(split_pipe_line("|a||c|"), vec!["a", "", "c"]);
    }
}
