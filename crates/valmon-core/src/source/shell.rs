//! Validator data source backed by `docker exec` into the miner container.
//!
//! Every getter shells out to `docker exec <container> miner ...` and
//! feeds the raw stdout through the pure parsers in [`crate::parse`].
//! The pure per-command helpers are kept free of I/O so they can be
//! tested against fixture strings.

use chrono::{DateTime, Utc};

use crate::model::{ContainerUptime, HbbftPerfRow, HeightInfo, LedgerValidatorRow, PeerBookSelf};
use crate::parse::{parse_hbbft_csv, parse_kv_lines, parse_pipe_table};
use crate::parse::value::coerce;
use crate::source::{SourceError, ValidatorSource, strip_p2p_prefix};
use crate::util::run_command;

/// Columns in the peer-book main table.
const PEER_BOOK_COLS: usize = 8;
/// Columns in the peer-book sessions table.
const SESSION_COLS: usize = 6;
/// Columns in the `ledger balance` table.
const BALANCE_COLS: usize = 3;

/// Shell-exec backed data source.
pub struct ShellSource {
    container: String,
}

impl ShellSource {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
        }
    }

    /// Runs `miner <args>` inside the container and returns its stdout.
    fn miner(&self, args: &[&str]) -> Result<String, SourceError> {
        let mut full = vec!["exec", self.container.as_str(), "miner"];
        full.extend_from_slice(args);
        run_command("docker", &full).map_err(|e| SourceError::Exec(e.to_string()))
    }

    /// Fetches the bracketed key/value identity blob.
    fn print_keys(&self, key: &str) -> Result<String, SourceError> {
        let output = self.miner(&["print_keys"])?;
        parse_kv_lines(&output)
            .remove(key)
            .ok_or_else(|| SourceError::Missing(format!("print_keys {}", key)))
    }

    /// Measures the data directory inside the container.
    fn miner_container_du(&self) -> Result<String, SourceError> {
        run_command(
            "docker",
            &["exec", self.container.as_str(), "du", "-sb", "/var/data"],
        )
        .map_err(|e| SourceError::Exec(e.to_string()))
    }
}

impl ValidatorSource for ShellSource {
    fn name(&self) -> Result<String, SourceError> {
        self.print_keys("name")
    }

    fn address(&self) -> Result<String, SourceError> {
        self.print_keys("address").map(|a| strip_p2p_prefix(&a))
    }

    fn height(&self) -> Result<HeightInfo, SourceError> {
        let output = self.miner(&["info", "height"])?;
        parse_height_output(&output)
            .ok_or_else(|| SourceError::Parse(format!("info height: {:?}", output.trim())))
    }

    fn in_consensus(&self) -> Result<bool, SourceError> {
        let output = self.miner(&["info", "in_consensus"])?;
        Ok(output.trim() == "true")
    }

    fn block_age(&self) -> Result<u64, SourceError> {
        let output = self.miner(&["info", "block_age"])?;
        output
            .trim()
            .parse()
            .map_err(|_| SourceError::Parse(format!("info block_age: {:?}", output.trim())))
    }

    fn hbbft_perf(&self) -> Result<Vec<HbbftPerfRow>, SourceError> {
        let output = self.miner(&["hbbft", "perf", "--format", "csv"])?;
        Ok(parse_hbbft_csv(&output))
    }

    fn peer_book_self(&self) -> Result<PeerBookSelf, SourceError> {
        let output = self.miner(&["peer", "book", "-s"])?;
        parse_peer_book(&output).ok_or_else(|| SourceError::Missing("peer book self row".to_string()))
    }

    fn ledger_validators(&self) -> Result<Vec<LedgerValidatorRow>, SourceError> {
        let output = self.miner(&["ledger", "validators"])?;
        Ok(parse_pipe_table(&output, LedgerValidatorRow::TABLE_COLS)
            .iter()
            .filter_map(|fields| LedgerValidatorRow::from_table_row(fields))
            .collect())
    }

    fn ledger_balance(&self, address: &str) -> Result<u64, SourceError> {
        let output = self.miner(&["ledger", "balance", address])?;
        parse_balance_table(&output, address)
            .ok_or_else(|| SourceError::Missing(format!("balance row for {}", address)))
    }

    fn version(&self) -> Result<String, SourceError> {
        let output = self.miner(&["versions"])?;
        let version = output.trim();
        if version.is_empty() {
            return Err(SourceError::Missing("miner version".to_string()));
        }
        Ok(version.to_string())
    }

    fn container_uptime(&self) -> Result<Option<ContainerUptime>, SourceError> {
        let output = run_command(
            "docker",
            &[
                "inspect",
                "-f",
                "{{.Created}}|{{.State.StartedAt}}",
                self.container.as_str(),
            ],
        )
        .map_err(|e| SourceError::Exec(e.to_string()))?;

        let uptime = parse_inspect_times(&output, Utc::now())
            .ok_or_else(|| SourceError::Parse(format!("docker inspect: {:?}", output.trim())))?;
        Ok(Some(uptime))
    }

    fn disk_usage_bytes(&self) -> Result<Option<u64>, SourceError> {
        let output = self.miner_container_du()?;
        let bytes = parse_du_output(&output)
            .ok_or_else(|| SourceError::Parse(format!("du output: {:?}", output.trim())))?;
        Ok(Some(bytes))
    }
}

/// Parses `miner info height` output.
///
/// The command prints `<epoch> <height>`; very old builds print only the
/// height.
fn parse_height_output(output: &str) -> Option<HeightInfo> {
    let tokens: Vec<&str> = output.split_whitespace().collect();
    match tokens.as_slice() {
        [height] => Some(HeightInfo {
            height: height.parse().ok()?,
            sync_height: None,
            epoch: None,
        }),
        [epoch, height, ..] => Some(HeightInfo {
            height: height.parse().ok()?,
            sync_height: None,
            epoch: epoch.parse().ok(),
        }),
        [] => None,
    }
}

/// Extracts this node's peer-book summary from the `peer book -s` blob.
///
/// The blob holds two tables: the 8-column self row and a 6-column
/// session listing. Header rows are recognized by their first field.
fn parse_peer_book(output: &str) -> Option<PeerBookSelf> {
    let self_row = parse_pipe_table(output, PEER_BOOK_COLS)
        .into_iter()
        .find(|fields| fields[0] != "address")?;
    let connections = coerce(&self_row[3]).as_i64()? as u64;

    let sessions = parse_pipe_table(output, SESSION_COLS)
        .into_iter()
        .filter(|fields| fields[0] != "local")
        .count() as u64;

    Some(PeerBookSelf {
        connections,
        sessions,
    })
}

/// Finds the balance (base units) for `address` in the balance table.
fn parse_balance_table(output: &str, address: &str) -> Option<u64> {
    parse_pipe_table(output, BALANCE_COLS)
        .into_iter()
        .find(|fields| fields[0] == address)
        .and_then(|fields| coerce(&fields[2]).as_i64())
        .map(|v| v as u64)
}

/// Parses `docker inspect` `Created|StartedAt` timestamps into uptimes.
fn parse_inspect_times(output: &str, now: DateTime<Utc>) -> Option<ContainerUptime> {
    let (created, started) = output.trim().split_once('|')?;
    let created = DateTime::parse_from_rfc3339(created.trim()).ok()?;
    let started = DateTime::parse_from_rfc3339(started.trim()).ok()?;

    Some(ContainerUptime {
        create_seconds: (now - created.with_timezone(&Utc)).num_seconds(),
        start_seconds: (now - started.with_timezone(&Utc)).num_seconds(),
    })
}

/// Parses `du -sb <dir>` output (size is the first token).
fn parse_du_output(output: &str) -> Option<u64> {
    output.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_height_output() {
        let info = parse_height_output("22\t992928\n").unwrap();
        assert_eq!(info.height, 992928);
        assert_eq!(info.epoch, Some(22));

        let old = parse_height_output("992928\n").unwrap();
        assert_eq!(old.height, 992928);
        assert_eq!(old.epoch, None);

        assert!(parse_height_output("").is_none());
        assert!(parse_height_output("22 oops").is_none());
    }

    #[test]
    fn test_parse_peer_book() {
        let blob = "\
+----------+-----------------+---------------+--------------+------+---------------+--------+-----------+
|address   |name             |listen_addrs   |connections   |nat   |last_updated   |height  |protocol   |
+----------+-----------------+---------------+--------------+------+---------------+--------+-----------+
|/p2p/11a  |curly-peach-owl  |1              |17            |none  |293.032s       |992928  |1.7        |
+----------+-----------------+---------------+--------------+------+---------------+--------+-----------+

+--------+---------+----------+-----------------+--------+-------+
|local   |remote   |p2p       |name             |type    |bytes  |
+--------+---------+----------+-----------------+--------+-------+
|/ip4/a  |/ip4/b   |/p2p/11b  |quiet-lava-fox   |inbound |123    |
|/ip4/a  |/ip4/c   |/p2p/11c  |tiny-mint-crane  |outbound|456    |
+--------+---------+----------+-----------------+--------+-------+
";
        let book = parse_peer_book(blob).unwrap();
        assert_eq!(book.connections, 17);
        assert_eq!(book.sessions, 2);
    }

    #[test]
    fn test_parse_peer_book_empty() {
        assert!(parse_peer_book("").is_none());
    }

    #[test]
    fn test_parse_balance_table() {
        let blob = "\
+----------+--------+------------+
|address   |block   |balance     |
+----------+--------+------------+
|11abcdef  |992928  |123456789   |
+----------+--------+------------+
";
        assert_eq!(parse_balance_table(blob, "11abcdef"), Some(123456789));
        assert_eq!(parse_balance_table(blob, "11nope"), None);
    }

    #[test]
    fn test_parse_inspect_times() {
        let now = Utc.with_ymd_and_hms(2021, 7, 1, 12, 0, 0).unwrap();
        let output = "2021-07-01T10:00:00.123456789Z|2021-07-01T11:30:00Z\n";

        let uptime = parse_inspect_times(output, now).unwrap();
        assert_eq!(uptime.create_seconds, 7199);
        assert_eq!(uptime.start_seconds, 1800);
    }

    #[test]
    fn test_parse_du_output() {
        assert_eq!(parse_du_output("48151623424\t/var/data\n"), Some(48151623424));
        assert_eq!(parse_du_output(""), None);
        assert_eq!(parse_du_output("not-a-number /var/data"), None);
    }
}
