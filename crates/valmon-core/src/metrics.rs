//! Prometheus gauge definitions and update helpers.
//!
//! Gauges keep their last value until explicitly set again, which gives
//! the sticky-last-good behavior for free: a collector that fails this
//! cycle simply does not touch its gauges. The one exception is the
//! hbbft group, which `reset_hbbft` zeroes when the validator is
//! confirmed out of the consensus group.

use prometheus::{GaugeVec, IntGauge, IntGaugeVec, Opts, Registry};

use crate::model::{HbbftPerfRow, LedgerPenalty};

/// All gauges exported by the daemon.
#[derive(Clone)]
pub struct ValidatorMetrics {
    pub height: IntGaugeVec,
    pub block_height: IntGaugeVec,
    pub epoch: IntGaugeVec,
    pub in_consensus: IntGaugeVec,
    pub block_age: IntGaugeVec,

    pub hbbft_bba_votes: IntGaugeVec,
    pub hbbft_bba_total: IntGaugeVec,
    pub hbbft_seen_votes: IntGaugeVec,
    pub hbbft_seen_total: IntGaugeVec,
    pub hbbft_bba_last: IntGaugeVec,
    pub hbbft_seen_last: IntGaugeVec,
    pub hbbft_tenure: GaugeVec,
    pub hbbft_penalty: GaugeVec,

    pub ledger_penalty: GaugeVec,
    pub connections: IntGaugeVec,
    pub sessions: IntGaugeVec,
    pub balance: GaugeVec,
    pub last_heartbeat: IntGaugeVec,
    pub version_info: GaugeVec,
    pub disk_usage_bytes: IntGaugeVec,
    pub uptime_seconds: IntGaugeVec,

    pub system_usage: GaugeVec,
    pub chain_height: IntGauge,
    pub chain_staked_validators: IntGauge,
}

fn int_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<IntGaugeVec> {
    let gauge = IntGaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn float_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl ValidatorMetrics {
    /// Creates and registers all gauges on the given registry.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let chain_height = IntGauge::new("chain_height", "Current height of the blockchain")?;
        registry.register(Box::new(chain_height.clone()))?;
        let chain_staked_validators = IntGauge::new(
            "chain_staked_validators",
            "Number of staked validators on chain",
        )?;
        registry.register(Box::new(chain_staked_validators.clone()))?;

        Ok(Self {
            height: int_vec(
                registry,
                "validator_height",
                "Height of this validator (sync height while catching up)",
                &["name"],
            )?,
            block_height: int_vec(
                registry,
                "validator_block_height",
                "Chain height as seen by this validator",
                &["name"],
            )?,
            epoch: int_vec(registry, "validator_epoch", "Current election epoch", &["name"])?,
            in_consensus: int_vec(
                registry,
                "validator_inconsensus",
                "Whether the validator is currently in the consensus group",
                &["name"],
            )?,
            block_age: int_vec(
                registry,
                "validator_block_age",
                "Age of the current block in seconds",
                &["name"],
            )?,
            hbbft_bba_votes: int_vec(
                registry,
                "validator_hbbft_bba_votes",
                "BBA votes cast in the current consensus group",
                &["name"],
            )?,
            hbbft_bba_total: int_vec(
                registry,
                "validator_hbbft_bba_total",
                "BBA rounds in the current consensus group",
                &["name"],
            )?,
            hbbft_seen_votes: int_vec(
                registry,
                "validator_hbbft_seen_votes",
                "Seen votes cast in the current consensus group",
                &["name"],
            )?,
            hbbft_seen_total: int_vec(
                registry,
                "validator_hbbft_seen_total",
                "Seen vote rounds in the current consensus group",
                &["name"],
            )?,
            hbbft_bba_last: int_vec(
                registry,
                "validator_hbbft_bba_last",
                "Rounds since the last BBA vote",
                &["name"],
            )?,
            hbbft_seen_last: int_vec(
                registry,
                "validator_hbbft_seen_last",
                "Rounds since the last seen vote",
                &["name"],
            )?,
            hbbft_tenure: float_vec(
                registry,
                "validator_hbbft_tenure",
                "Tenure score in the current consensus group",
                &["name"],
            )?,
            hbbft_penalty: float_vec(
                registry,
                "validator_hbbft_penalty",
                "HBBFT penalty from the performance table",
                &["name"],
            )?,
            ledger_penalty: float_vec(
                registry,
                "validator_ledger_penalty",
                "Ledger penalty components",
                &["name", "kind"],
            )?,
            connections: int_vec(
                registry,
                "validator_connections",
                "Libp2p connection count",
                &["name"],
            )?,
            sessions: int_vec(
                registry,
                "validator_sessions",
                "Libp2p session count",
                &["name"],
            )?,
            balance: float_vec(
                registry,
                "validator_balance",
                "Owner account balance in whole tokens",
                &["name"],
            )?,
            last_heartbeat: int_vec(
                registry,
                "validator_last_heartbeat",
                "Block height of the last heartbeat",
                &["name"],
            )?,
            version_info: float_vec(
                registry,
                "validator_version",
                "Running miner version (info-style, value is always 1)",
                &["name", "version"],
            )?,
            disk_usage_bytes: int_vec(
                registry,
                "validator_disk_usage_bytes",
                "Size of the validator data directory",
                &["name"],
            )?,
            uptime_seconds: int_vec(
                registry,
                "validator_uptime_seconds",
                "Container uptime per lifecycle state",
                &["name", "state"],
            )?,
            system_usage: float_vec(
                registry,
                "system_usage",
                "Host resource usage",
                &["resource_type"],
            )?,
            chain_height,
            chain_staked_validators,
        })
    }

    /// Publishes the full hbbft group for this validator.
    pub fn set_hbbft(&self, name: &str, row: &HbbftPerfRow) {
        let l = &[name];
        self.hbbft_bba_votes.with_label_values(l).set(row.bba_votes as i64);
        self.hbbft_bba_total.with_label_values(l).set(row.bba_total as i64);
        self.hbbft_seen_votes.with_label_values(l).set(row.seen_votes as i64);
        self.hbbft_seen_total.with_label_values(l).set(row.seen_total as i64);
        self.hbbft_bba_last.with_label_values(l).set(row.bba_last as i64);
        self.hbbft_seen_last.with_label_values(l).set(row.seen_last as i64);
        self.hbbft_tenure.with_label_values(l).set(row.tenure);
        self.hbbft_penalty.with_label_values(l).set(row.penalty);
    }

    /// Zeroes the full hbbft group.
    ///
    /// Called when the perf fetch succeeded but this validator has no
    /// row, i.e. it is confirmed out of the consensus group. Dashboards
    /// must not keep showing stale in-group values.
    pub fn reset_hbbft(&self, name: &str) {
        self.set_hbbft(name, &HbbftPerfRow::default());
    }

    /// Publishes the four penalty components as one unit.
    pub fn set_penalties(&self, name: &str, penalty: &LedgerPenalty) {
        self.ledger_penalty
            .with_label_values(&[name, "tenure"])
            .set(penalty.tenure);
        self.ledger_penalty
            .with_label_values(&[name, "dkg"])
            .set(penalty.dkg);
        self.ledger_penalty
            .with_label_values(&[name, "performance"])
            .set(penalty.performance);
        self.ledger_penalty
            .with_label_values(&[name, "total"])
            .set(penalty.total);
    }

    /// Publishes the version info gauge, dropping the previous version's
    /// label series so only one version reads 1 at a time.
    pub fn set_version(&self, name: &str, previous: Option<&str>, version: &str) {
        if let Some(previous) = previous {
            if previous != version {
                let _ = self.version_info.remove_label_values(&[name, previous]);
            }
        }
        self.version_info.with_label_values(&[name, version]).set(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ValidatorMetrics {
        ValidatorMetrics::new(&Registry::new()).unwrap()
    }

    #[test]
    fn test_set_and_reset_hbbft() {
        let m = metrics();
        let row = HbbftPerfRow {
            name: "owl".to_string(),
            bba_votes: 11,
            bba_total: 11,
            seen_votes: 368,
            seen_total: 368,
            bba_last: 0,
            seen_last: 0,
            tenure: 2.91,
            penalty: 1.86,
        };

        m.set_hbbft("owl", &row);
        assert_eq!(m.hbbft_bba_votes.with_label_values(&["owl"]).get(), 11);
        assert_eq!(m.hbbft_penalty.with_label_values(&["owl"]).get(), 1.86);

        m.reset_hbbft("owl");
        assert_eq!(m.hbbft_bba_votes.with_label_values(&["owl"]).get(), 0);
        assert_eq!(m.hbbft_seen_total.with_label_values(&["owl"]).get(), 0);
        assert_eq!(m.hbbft_tenure.with_label_values(&["owl"]).get(), 0.0);
        assert_eq!(m.hbbft_penalty.with_label_values(&["owl"]).get(), 0.0);
    }

    #[test]
    fn test_penalties_published_together() {
        let m = metrics();
        m.set_penalties(
            "owl",
            &LedgerPenalty {
                tenure: 1.0,
                dkg: 0.5,
                performance: 0.36,
                total: 1.86,
            },
        );

        for (kind, expected) in [
            ("tenure", 1.0),
            ("dkg", 0.5),
            ("performance", 0.36),
            ("total", 1.86),
        ] {
            assert_eq!(
                m.ledger_penalty.with_label_values(&["owl", kind]).get(),
                expected
            );
        }
    }

    #[test]
    fn test_version_change_drops_old_series() {
        let m = metrics();
        m.set_version("owl", None, "3.0.0");
        m.set_version("owl", Some("3.0.0"), "3.1.0");

        assert_eq!(m.version_info.with_label_values(&["owl", "3.1.0"]).get(), 1.0);
        // Re-creating the old series reads its default, proving it was removed.
        assert_eq!(m.version_info.with_label_values(&["owl", "3.0.0"]).get(), 0.0);
    }

    #[test]
    fn test_all_gauges_register_without_collision() {
        let registry = Registry::new();
        ValidatorMetrics::new(&registry).unwrap();
        assert!(!registry.gather().is_empty());
    }
}
