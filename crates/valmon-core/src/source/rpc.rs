//! Validator data source backed by the node's JSON-RPC endpoint.

use serde::Deserialize;
use serde_json::json;

use crate::model::{ContainerUptime, HbbftPerfRow, HeightInfo, LedgerValidatorRow, PeerBookEntry, PeerBookSelf};
use crate::rpc::RpcClient;
use crate::source::{SourceError, ValidatorSource, strip_p2p_prefix};

#[derive(Deserialize)]
struct NameResult {
    name: String,
}

#[derive(Deserialize)]
struct PeerAddrResult {
    peer_addr: String,
}

#[derive(Deserialize)]
struct InConsensusResult {
    in_consensus: bool,
}

#[derive(Deserialize)]
struct BlockAgeResult {
    block_age: u64,
}

#[derive(Deserialize)]
struct BalanceResult {
    balance: u64,
}

#[derive(Deserialize)]
struct SummaryResult {
    version: String,
}

/// JSON-RPC backed data source.
pub struct RpcSource {
    client: RpcClient,
}

impl RpcSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: RpcClient::new(endpoint)?,
        })
    }
}

impl ValidatorSource for RpcSource {
    fn name(&self) -> Result<String, SourceError> {
        let result: NameResult = self.client.call_as("info_name", None)?;
        Ok(result.name)
    }

    fn address(&self) -> Result<String, SourceError> {
        let result: PeerAddrResult = self.client.call_as("peer_addr", None)?;
        Ok(strip_p2p_prefix(&result.peer_addr))
    }

    fn height(&self) -> Result<HeightInfo, SourceError> {
        Ok(self.client.call_as("info_height", None)?)
    }

    fn in_consensus(&self) -> Result<bool, SourceError> {
        let result: InConsensusResult = self.client.call_as("info_in_consensus", None)?;
        Ok(result.in_consensus)
    }

    fn block_age(&self) -> Result<u64, SourceError> {
        let result: BlockAgeResult = self.client.call_as("info_block_age", None)?;
        Ok(result.block_age)
    }

    fn hbbft_perf(&self) -> Result<Vec<HbbftPerfRow>, SourceError> {
        Ok(self.client.call_as("hbbft_perf", None)?)
    }

    fn peer_book_self(&self) -> Result<PeerBookSelf, SourceError> {
        let entries: Vec<PeerBookEntry> = self
            .client
            .call_as("peer_book", Some(json!({"addr": "self"})))?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Missing("peer_book self entry".to_string()))?;

        Ok(PeerBookSelf {
            connections: entry.connection_count,
            sessions: entry.sessions.len() as u64,
        })
    }

    fn ledger_validators(&self) -> Result<Vec<LedgerValidatorRow>, SourceError> {
        Ok(self.client.call_as("ledger_validators", None)?)
    }

    fn ledger_balance(&self, address: &str) -> Result<u64, SourceError> {
        let result: BalanceResult = self
            .client
            .call_as("ledger_balance", Some(json!({"address": address})))?;
        Ok(result.balance)
    }

    fn version(&self) -> Result<String, SourceError> {
        let result: SummaryResult = self.client.call_as("info_summary", None)?;
        Ok(result.version)
    }

    fn container_uptime(&self) -> Result<Option<ContainerUptime>, SourceError> {
        // No container to inspect over RPC.
        Ok(None)
    }

    fn disk_usage_bytes(&self) -> Result<Option<u64>, SourceError> {
        Ok(None)
    }
}
