//! Shared data model for validator measurements.
//!
//! These structs are the normalized form every data source converges on:
//! the RPC source deserializes them from JSON, the shell source builds
//! them from parsed table/CSV rows.

use serde::Deserialize;

use crate::parse::value::coerce;

/// Base currency units per whole token.
pub const BONES_PER_HNT: f64 = 100_000_000.0;

/// Scales a raw integer balance (base units) to a decimal token amount.
pub fn scale_bones(raw: u64) -> f64 {
    raw as f64 / BONES_PER_HNT
}

/// Resolved validator identity. Name and address rarely change, so this
/// is resolved once and cached by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub address: String,
}

/// Height information reported by the node.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HeightInfo {
    /// Chain height as seen by this node.
    pub height: u64,
    /// Present (and lower than `height`) while the node is catching up.
    #[serde(default)]
    pub sync_height: Option<u64>,
    #[serde(default)]
    pub epoch: Option<u64>,
}

impl HeightInfo {
    /// The height this validator is actually at: sync height while
    /// catching up, chain height otherwise.
    pub fn validator_height(&self) -> u64 {
        self.sync_height.unwrap_or(self.height)
    }
}

/// One validator's hbbft participation metrics for the current consensus
/// group window.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HbbftPerfRow {
    pub name: String,
    pub bba_votes: u64,
    pub bba_total: u64,
    pub seen_votes: u64,
    pub seen_total: u64,
    #[serde(default)]
    pub bba_last: u64,
    #[serde(default)]
    pub seen_last: u64,
    #[serde(default)]
    pub tenure: f64,
    pub penalty: f64,
}

/// The four ledger penalty components, always published together.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerPenalty {
    pub tenure: f64,
    pub dkg: f64,
    pub performance: f64,
    pub total: f64,
}

/// One row of `ledger validators` output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerValidatorRow {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub last_heartbeat: u64,
    #[serde(default)]
    pub stake: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub tenure_penalty: f64,
    #[serde(default)]
    pub dkg_penalty: f64,
    #[serde(default)]
    pub performance_penalty: f64,
    #[serde(default)]
    pub total_penalty: f64,
}

impl LedgerValidatorRow {
    /// Number of columns in the bordered `ledger validators` table.
    pub const TABLE_COLS: usize = 12;

    /// Builds a row from a 12-column pipe-table row.
    ///
    /// The four penalty fields must all coerce numerically; this also
    /// filters out the header row. Heartbeat and stake fall back to zero
    /// when the field is not numeric.
    pub fn from_table_row(fields: &[String]) -> Option<Self> {
        if fields.len() != Self::TABLE_COLS {
            return None;
        }

        let tenure_penalty = coerce(&fields[7]).as_f64()?;
        let dkg_penalty = coerce(&fields[8]).as_f64()?;
        let performance_penalty = coerce(&fields[9]).as_f64()?;
        let total_penalty = coerce(&fields[10]).as_f64()?;

        Some(Self {
            address: fields[0].clone(),
            name: fields[1].clone(),
            last_heartbeat: coerce(&fields[3]).as_i64().unwrap_or(0) as u64,
            stake: coerce(&fields[4]).as_i64().unwrap_or(0) as u64,
            status: fields[5].clone(),
            version: fields[6].clone(),
            tenure_penalty,
            dkg_penalty,
            performance_penalty,
            total_penalty,
        })
    }

    pub fn penalty(&self) -> LedgerPenalty {
        LedgerPenalty {
            tenure: self.tenure_penalty,
            dkg: self.dkg_penalty,
            performance: self.performance_penalty,
            total: self.total_penalty,
        }
    }
}

/// One peer-book entry from the RPC `peer_book` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerBookEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connection_count: u64,
    #[serde(default)]
    pub sessions: Vec<serde_json::Value>,
}

/// This validator's own peer-book summary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeerBookSelf {
    pub connections: u64,
    pub sessions: u64,
}

/// Container lifecycle uptimes, seconds since each docker timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerUptime {
    pub create_seconds: i64,
    pub start_seconds: i64,
}

/// Host-level resource usage. Fields are `None` when the reading is not
/// yet available (e.g. CPU deltas need two samples).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemUsage {
    pub cpu_percent: Option<f64>,
    pub cpu_steal_percent: Option<f64>,
    pub mem_percent: Option<f64>,
    pub process_count: Option<u64>,
    pub disk_used_ratio: Option<f64>,
    pub disk_free_ratio: Option<f64>,
}

/// Chain-wide statistics from the public API.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChainStats {
    pub height: u64,
    pub staked_validators: u64,
}
