//! In-memory data source for testing the poll loop without a validator.
//!
//! Returns canned values for every getter and supports per-getter
//! failure injection, so tests can exercise the failure-isolation and
//! sticky-last-good behavior of the orchestrator.

use std::collections::HashSet;

use crate::model::{ContainerUptime, HbbftPerfRow, HeightInfo, LedgerValidatorRow, PeerBookSelf};
use crate::source::{SourceError, ValidatorSource};

/// Canned data source with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    pub name: String,
    pub address: String,
    pub height: HeightInfo,
    pub in_consensus: bool,
    pub block_age: u64,
    pub hbbft_rows: Vec<HbbftPerfRow>,
    pub peer_book: PeerBookSelf,
    pub ledger_rows: Vec<LedgerValidatorRow>,
    pub balance: u64,
    pub version: String,
    pub uptime: Option<ContainerUptime>,
    pub disk_usage: Option<u64>,
    failing: HashSet<&'static str>,
}

impl MockSource {
    /// A plausible healthy validator, in the consensus group.
    pub fn healthy() -> Self {
        let name = "curly-peach-owl".to_string();
        Self {
            name: name.clone(),
            address: "11abcdef".to_string(),
            height: HeightInfo {
                height: 992928,
                sync_height: None,
                epoch: Some(22),
            },
            in_consensus: true,
            block_age: 42,
            hbbft_rows: vec![HbbftPerfRow {
                name: name.clone(),
                bba_votes: 11,
                bba_total: 11,
                seen_votes: 368,
                seen_total: 368,
                bba_last: 0,
                seen_last: 0,
                tenure: 2.91,
                penalty: 1.86,
            }],
            peer_book: PeerBookSelf {
                connections: 17,
                sessions: 2,
            },
            ledger_rows: vec![LedgerValidatorRow {
                address: "11abcdef".to_string(),
                name,
                last_heartbeat: 992900,
                stake: 10000,
                status: "staked".to_string(),
                version: "3.0.0".to_string(),
                tenure_penalty: 1.0,
                dkg_penalty: 0.0,
                performance_penalty: 0.86,
                total_penalty: 1.86,
            }],
            balance: 123456789,
            version: "3.0.0".to_string(),
            uptime: Some(ContainerUptime {
                create_seconds: 7200,
                start_seconds: 1800,
            }),
            disk_usage: Some(48_151_623_424),
            failing: HashSet::new(),
        }
    }

    /// Makes the named getter fail with a transport error.
    ///
    /// Getter names match the trait methods (`"height"`, `"hbbft_perf"`, ...).
    pub fn with_failure(mut self, getter: &'static str) -> Self {
        self.failing.insert(getter);
        self
    }

    /// Clears a previously injected failure.
    pub fn clear_failure(&mut self, getter: &'static str) {
        self.failing.remove(getter);
    }

    fn check(&self, getter: &'static str) -> Result<(), SourceError> {
        if self.failing.contains(getter) {
            return Err(SourceError::Transport(format!(
                "injected failure: {}",
                getter
            )));
        }
        Ok(())
    }
}

impl ValidatorSource for MockSource {
    fn name(&self) -> Result<String, SourceError> {
        self.check("name")?;
        Ok(self.name.clone())
    }

    fn address(&self) -> Result<String, SourceError> {
        self.check("address")?;
        Ok(self.address.clone())
    }

    fn height(&self) -> Result<HeightInfo, SourceError> {
        self.check("height")?;
        Ok(self.height)
    }

    fn in_consensus(&self) -> Result<bool, SourceError> {
        self.check("in_consensus")?;
        Ok(self.in_consensus)
    }

    fn block_age(&self) -> Result<u64, SourceError> {
        self.check("block_age")?;
        Ok(self.block_age)
    }

    fn hbbft_perf(&self) -> Result<Vec<HbbftPerfRow>, SourceError> {
        self.check("hbbft_perf")?;
        Ok(self.hbbft_rows.clone())
    }

    fn peer_book_self(&self) -> Result<PeerBookSelf, SourceError> {
        self.check("peer_book_self")?;
        Ok(self.peer_book)
    }

    fn ledger_validators(&self) -> Result<Vec<LedgerValidatorRow>, SourceError> {
        self.check("ledger_validators")?;
        Ok(self.ledger_rows.clone())
    }

    fn ledger_balance(&self, _address: &str) -> Result<u64, SourceError> {
        self.check("ledger_balance")?;
        Ok(self.balance)
    }

    fn version(&self) -> Result<String, SourceError> {
        self.check("version")?;
        Ok(self.version.clone())
    }

    fn container_uptime(&self) -> Result<Option<ContainerUptime>, SourceError> {
        self.check("container_uptime")?;
        Ok(self.uptime)
    }

    fn disk_usage_bytes(&self) -> Result<Option<u64>, SourceError> {
        self.check("disk_usage_bytes")?;
        Ok(self.disk_usage)
    }
}
