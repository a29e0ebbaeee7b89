//! Collection orchestrator: drives one poll cycle with failure isolation.
//!
//! Identity resolution is the only fatal-per-cycle step; every other
//! collector is individually wrapped so a failing one is logged and its
//! gauges keep the previous cycle's values (sticky-last-good), while all
//! other collectors still run.

pub mod system;

use tracing::{debug, error, warn};

use crate::api::ChainApi;
use crate::metrics::ValidatorMetrics;
use crate::model::{Identity, scale_bones};
use crate::source::{SourceError, ValidatorSource};
use system::{FileSystem, SystemCollector};

/// Error that aborts a whole poll cycle.
#[derive(Debug)]
pub enum CycleError {
    /// Validator name/address could not be resolved. Nothing can be
    /// published without the name label, so the cycle is skipped.
    Identity(SourceError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Identity(err) => write!(f, "identity resolution failed: {}", err),
        }
    }
}

impl std::error::Error for CycleError {}

/// Outcome summary for one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleReport {
    pub collectors_ok: u32,
    pub collectors_failed: u32,
}

/// Matches a (possibly truncated) display name from a legacy table
/// against the canonical validator name.
///
/// Exact match wins; otherwise a candidate ending in `..` or `…` is
/// treated as a truncation and matched by prefix. No fuzzy matching.
fn name_matches(candidate: &str, name: &str) -> bool {
    if candidate == name {
        return true;
    }
    for marker in ["...", "..", "\u{2026}"] {
        if let Some(prefix) = candidate.strip_suffix(marker) {
            return !prefix.is_empty() && name.starts_with(prefix);
        }
    }
    false
}

/// Runs collectors against a data source and publishes gauge updates.
pub struct Exporter<S: ValidatorSource, F: FileSystem> {
    source: S,
    api: Option<ChainApi>,
    metrics: ValidatorMetrics,
    system: SystemCollector<F>,
    /// Resolved once, then reused: name and address rarely change.
    identity: Option<Identity>,
    last_version: Option<String>,
    all_penalties: bool,
}

impl<S: ValidatorSource, F: FileSystem> Exporter<S, F> {
    pub fn new(
        source: S,
        api: Option<ChainApi>,
        metrics: ValidatorMetrics,
        system: SystemCollector<F>,
        all_penalties: bool,
    ) -> Self {
        Self {
            source,
            api,
            metrics,
            system,
            identity: None,
            last_version: None,
            all_penalties,
        }
    }

    /// Runs one poll cycle.
    ///
    /// Returns `Err` only when identity resolution fails; individual
    /// collector failures are logged and reflected in the report.
    pub fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let identity = self.resolve_identity()?;
        let mut report = CycleReport::default();

        let result = self.collect_height(&identity);
        note(&mut report, "height", result);

        let result = self.collect_in_consensus(&identity);
        note(&mut report, "in_consensus", result);

        let result = self.collect_block_age(&identity);
        note(&mut report, "block_age", result);

        let result = self.collect_hbbft(&identity);
        note(&mut report, "hbbft_perf", result);

        let result = self.collect_ledger(&identity);
        note(&mut report, "ledger_validators", result);

        let result = self.collect_peer_book(&identity);
        note(&mut report, "peer_book", result);

        let result = self.collect_balance(&identity);
        note(&mut report, "balance", result);

        let result = self.collect_version(&identity);
        note(&mut report, "version", result);

        let result = self.collect_uptime(&identity);
        note(&mut report, "container_uptime", result);

        let result = self.collect_disk_usage(&identity);
        note(&mut report, "disk_usage", result);

        let result = self.collect_chain_stats();
        note(&mut report, "chain_stats", result);

        self.collect_system();
        report.collectors_ok += 1;

        Ok(report)
    }

    /// Resolves and caches the validator identity.
    fn resolve_identity(&mut self) -> Result<Identity, CycleError> {
        if let Some(ref identity) = self.identity {
            return Ok(identity.clone());
        }

        let name = self.source.name().map_err(CycleError::Identity)?;
        let address = self.source.address().map_err(CycleError::Identity)?;
        let identity = Identity { name, address };
        debug!(
            "resolved identity: {} ({})",
            identity.name, identity.address
        );

        self.identity = Some(identity.clone());
        Ok(identity)
    }

    fn collect_height(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let info = self.source.height()?;
        let labels = &[identity.name.as_str()];

        self.metrics
            .height
            .with_label_values(labels)
            .set(info.validator_height() as i64);
        self.metrics
            .block_height
            .with_label_values(labels)
            .set(info.height as i64);
        if let Some(epoch) = info.epoch {
            self.metrics.epoch.with_label_values(labels).set(epoch as i64);
        }
        Ok(())
    }

    fn collect_in_consensus(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let in_consensus = self.source.in_consensus()?;
        self.metrics
            .in_consensus
            .with_label_values(&[identity.name.as_str()])
            .set(in_consensus as i64);
        Ok(())
    }

    fn collect_block_age(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let age = self.source.block_age()?;
        self.metrics
            .block_age
            .with_label_values(&[identity.name.as_str()])
            .set(age as i64);
        Ok(())
    }

    /// Publishes the hbbft group, applying the consensus-group reset rule.
    ///
    /// A successful fetch with no row for this validator is a confirmed
    /// absence from the group: every hbbft gauge is set to zero. A failed
    /// fetch propagates as an error and the gauges keep their previous
    /// values.
    fn collect_hbbft(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let rows = self.source.hbbft_perf()?;

        match rows.iter().find(|r| name_matches(&r.name, &identity.name)) {
            Some(row) => self.metrics.set_hbbft(&identity.name, row),
            None => {
                debug!("not in consensus group, zeroing hbbft metrics");
                self.metrics.reset_hbbft(&identity.name);
            }
        }
        Ok(())
    }

    fn collect_ledger(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let rows = self.source.ledger_validators()?;

        let own = rows.iter().find(|r| {
            r.address == identity.address || name_matches(&r.name, &identity.name)
        });
        match own {
            Some(row) => {
                self.metrics.set_penalties(&identity.name, &row.penalty());
                self.metrics
                    .last_heartbeat
                    .with_label_values(&[identity.name.as_str()])
                    .set(row.last_heartbeat as i64);
            }
            None => {
                // Not in the ledger table (e.g. recently unstaked); the
                // public API may still know the heartbeat.
                debug!("validator not present in ledger validators output");
                if let Some(ref api) = self.api {
                    match api.validator(&identity.address) {
                        Ok(v) => {
                            if let Some(heartbeat) = v.last_heartbeat {
                                self.metrics
                                    .last_heartbeat
                                    .with_label_values(&[identity.name.as_str()])
                                    .set(heartbeat as i64);
                            }
                        }
                        Err(e) => warn!("chain api validator lookup failed: {}", e),
                    }
                }
            }
        }

        if self.all_penalties {
            for row in rows.iter().filter(|r| r.total_penalty > 0.0) {
                self.metrics.set_penalties(&row.name, &row.penalty());
            }
        }
        Ok(())
    }

    fn collect_peer_book(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let book = self.source.peer_book_self()?;
        let labels = &[identity.name.as_str()];

        self.metrics
            .connections
            .with_label_values(labels)
            .set(book.connections as i64);
        self.metrics
            .sessions
            .with_label_values(labels)
            .set(book.sessions as i64);
        Ok(())
    }

    /// Balance comes from the public API when configured (authoritative
    /// for the owner account), falling back to the node's own ledger.
    fn collect_balance(&mut self, identity: &Identity) -> Result<(), Box<dyn std::error::Error>> {
        let raw = match self.api {
            Some(ref api) => api.account_balance(&identity.address)?,
            None => self.source.ledger_balance(&identity.address)?,
        };

        self.metrics
            .balance
            .with_label_values(&[identity.name.as_str()])
            .set(scale_bones(raw));
        Ok(())
    }

    fn collect_version(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let version = self.source.version()?;
        self.metrics
            .set_version(&identity.name, self.last_version.as_deref(), &version);
        self.last_version = Some(version);
        Ok(())
    }

    fn collect_uptime(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let Some(uptime) = self.source.container_uptime()? else {
            debug!("container uptime not available for this source");
            return Ok(());
        };

        self.metrics
            .uptime_seconds
            .with_label_values(&[identity.name.as_str(), "create"])
            .set(uptime.create_seconds);
        self.metrics
            .uptime_seconds
            .with_label_values(&[identity.name.as_str(), "start"])
            .set(uptime.start_seconds);
        Ok(())
    }

    fn collect_disk_usage(&mut self, identity: &Identity) -> Result<(), SourceError> {
        let Some(bytes) = self.source.disk_usage_bytes()? else {
            debug!("disk usage not available for this source");
            return Ok(());
        };

        self.metrics
            .disk_usage_bytes
            .with_label_values(&[identity.name.as_str()])
            .set(bytes as i64);
        Ok(())
    }

    fn collect_chain_stats(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(ref api) = self.api else {
            debug!("chain api not configured, skipping chain stats");
            return Ok(());
        };

        let height = api.height()?;
        self.metrics.chain_height.set(height as i64);

        let staked = api.staked_validator_count()?;
        self.metrics.chain_staked_validators.set(staked as i64);
        Ok(())
    }

    /// Host usage never fails as a whole; unavailable readings stay unset.
    fn collect_system(&mut self) {
        let usage = self.system.collect();

        let set = |resource: &str, value: Option<f64>| {
            if let Some(value) = value {
                self.metrics
                    .system_usage
                    .with_label_values(&[resource])
                    .set(value);
            }
        };

        set("CPU", usage.cpu_percent);
        set("CPUSteal", usage.cpu_steal_percent);
        set("Memory", usage.mem_percent);
        set("Processes", usage.process_count.map(|c| c as f64));
        set("DiskUsed", usage.disk_used_ratio);
        set("DiskFree", usage.disk_free_ratio);
    }
}

/// Records one collector outcome, logging failures without propagating.
fn note<E: std::fmt::Display>(report: &mut CycleReport, collector: &str, result: Result<(), E>) {
    match result {
        Ok(()) => report.collectors_ok += 1,
        Err(e) => {
            report.collectors_failed += 1;
            error!("collector {} failed: {}", collector, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HbbftPerfRow;
    use crate::source::MockSource;
    use prometheus::Registry;
    use system::MockFs;

    fn exporter(source: MockSource) -> (Exporter<MockSource, MockFs>, ValidatorMetrics) {
        let metrics = ValidatorMetrics::new(&Registry::new()).unwrap();
        let system = SystemCollector::new(MockFs::new(), "/proc", None);
        let exporter = Exporter::new(source, None, metrics.clone(), system, false);
        (exporter, metrics)
    }

    #[test]
    fn test_name_matches() {
        assert!(name_matches("curly-peach-owl", "curly-peach-owl"));
        assert!(name_matches("curly-peach..", "curly-peach-owl"));
        assert!(name_matches("curly-peach-o…", "curly-peach-owl"));
        assert!(!name_matches("curly-peach", "curly-peach-owl"));
        assert!(!name_matches("other-owl", "curly-peach-owl"));
        assert!(!name_matches("..", "curly-peach-owl"));
    }

    #[test]
    fn test_healthy_cycle_updates_everything() {
        let (mut exporter, metrics) = exporter(MockSource::healthy());
        let report = exporter.run_cycle().unwrap();

        assert_eq!(report.collectors_failed, 0);
        assert_eq!(metrics.height.with_label_values(&["curly-peach-owl"]).get(), 992928);
        assert_eq!(metrics.in_consensus.with_label_values(&["curly-peach-owl"]).get(), 1);
        assert_eq!(metrics.block_age.with_label_values(&["curly-peach-owl"]).get(), 42);
        assert_eq!(
            metrics.hbbft_penalty.with_label_values(&["curly-peach-owl"]).get(),
            1.86
        );
        assert_eq!(
            metrics.balance.with_label_values(&["curly-peach-owl"]).get(),
            1.23456789
        );
        assert_eq!(
            metrics
                .ledger_penalty
                .with_label_values(&["curly-peach-owl", "total"])
                .get(),
            1.86
        );
        assert_eq!(
            metrics.connections.with_label_values(&["curly-peach-owl"]).get(),
            17
        );
        assert_eq!(
            metrics
                .uptime_seconds
                .with_label_values(&["curly-peach-owl", "start"])
                .get(),
            1800
        );
    }

    #[test]
    fn test_failing_collector_is_isolated() {
        // First cycle publishes a height; a failing height collector in the
        // second cycle must leave it untouched while others keep updating.
        let (mut exporter, metrics) = exporter(MockSource::healthy());
        exporter.run_cycle().unwrap();

        exporter.source = MockSource::healthy().with_failure("height");
        exporter.source.block_age = 99;
        let report = exporter.run_cycle().unwrap();

        assert_eq!(report.collectors_failed, 1);
        assert_eq!(metrics.height.with_label_values(&["curly-peach-owl"]).get(), 992928);
        assert_eq!(metrics.block_age.with_label_values(&["curly-peach-owl"]).get(), 99);
    }

    #[test]
    fn test_hbbft_zeroed_when_absent_from_group() {
        let (mut exporter, metrics) = exporter(MockSource::healthy());
        exporter.run_cycle().unwrap();
        assert_eq!(
            metrics.hbbft_bba_votes.with_label_values(&["curly-peach-owl"]).get(),
            11
        );

        // Fetch succeeds but this validator has no row: confirmed absence.
        exporter.source.hbbft_rows = vec![HbbftPerfRow {
            name: "some-other-bird".to_string(),
            ..HbbftPerfRow::default()
        }];
        exporter.run_cycle().unwrap();

        assert_eq!(
            metrics.hbbft_bba_votes.with_label_values(&["curly-peach-owl"]).get(),
            0
        );
        assert_eq!(
            metrics.hbbft_penalty.with_label_values(&["curly-peach-owl"]).get(),
            0.0
        );
    }

    #[test]
    fn test_hbbft_retained_on_fetch_failure() {
        let (mut exporter, metrics) = exporter(MockSource::healthy());
        exporter.run_cycle().unwrap();

        exporter.source = MockSource::healthy().with_failure("hbbft_perf");
        let report = exporter.run_cycle().unwrap();

        assert_eq!(report.collectors_failed, 1);
        assert_eq!(
            metrics.hbbft_bba_votes.with_label_values(&["curly-peach-owl"]).get(),
            11
        );
        assert_eq!(
            metrics.hbbft_penalty.with_label_values(&["curly-peach-owl"]).get(),
            1.86
        );
    }

    #[test]
    fn test_ledger_absent_row_keeps_heartbeat() {
        // A validator missing from the ledger table (and no chain api to
        // ask) is not a collector failure; the heartbeat gauge just keeps
        // its previous value.
        let (mut exporter, metrics) = exporter(MockSource::healthy());
        exporter.run_cycle().unwrap();
        assert_eq!(
            metrics.last_heartbeat.with_label_values(&["curly-peach-owl"]).get(),
            992900
        );

        exporter.source.ledger_rows.clear();
        let report = exporter.run_cycle().unwrap();

        assert_eq!(report.collectors_failed, 0);
        assert_eq!(
            metrics.last_heartbeat.with_label_values(&["curly-peach-owl"]).get(),
            992900
        );
    }

    #[test]
    fn test_identity_failure_aborts_cycle() {
        let (mut exporter, metrics) = exporter(MockSource::healthy().with_failure("name"));
        assert!(exporter.run_cycle().is_err());
        // Nothing was published.
        assert_eq!(metrics.block_age.with_label_values(&["curly-peach-owl"]).get(), 0);
    }

    #[test]
    fn test_identity_is_cached_across_cycles() {
        let (mut exporter, _metrics) = exporter(MockSource::healthy());
        exporter.run_cycle().unwrap();

        // Identity getters failing after the first resolve must not matter.
        exporter.source = MockSource::healthy()
            .with_failure("name")
            .with_failure("address");
        assert!(exporter.run_cycle().is_ok());
    }

    #[test]
    fn test_all_penalties_mode_publishes_other_validators() {
        let metrics = ValidatorMetrics::new(&Registry::new()).unwrap();
        let system = SystemCollector::new(MockFs::new(), "/proc", None);
        let mut source = MockSource::healthy();
        let mut other = source.ledger_rows[0].clone();
        other.name = "quiet-lava-fox".to_string();
        other.address = "11fox".to_string();
        other.total_penalty = 4.2;
        source.ledger_rows.push(other);

        let mut exporter = Exporter::new(source, None, metrics.clone(), system, true);
        exporter.run_cycle().unwrap();

        assert_eq!(
            metrics
                .ledger_penalty
                .with_label_values(&["quiet-lava-fox", "total"])
                .get(),
            4.2
        );
    }
}
