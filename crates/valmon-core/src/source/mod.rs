//! Abstraction over how validator data is obtained.
//!
//! The same exporter logic runs against a local JSON-RPC endpoint
//! (`RpcSource`), a `docker exec` shell into the validator container
//! (`ShellSource`), or canned in-memory data for tests (`MockSource`).
//! Which one is used is a configuration choice, not a code path fork.

mod mock;
mod rpc;
mod shell;

pub use mock::MockSource;
pub use rpc::RpcSource;
pub use shell::ShellSource;

use crate::model::{ContainerUptime, HbbftPerfRow, HeightInfo, LedgerValidatorRow, PeerBookSelf};
use crate::rpc::RpcError;

/// Error type for data-source operations.
#[derive(Debug)]
pub enum SourceError {
    /// Running the container command failed (spawn error, non-zero exit).
    Exec(String),
    /// HTTP-level failure talking to the RPC endpoint.
    Transport(String),
    /// The RPC endpoint answered with an error payload.
    Rpc(serde_json::Value),
    /// Output was fetched but could not be interpreted.
    Parse(String),
    /// A required field was absent from otherwise valid output.
    Missing(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Exec(msg) => write!(f, "exec failed: {}", msg),
            SourceError::Transport(msg) => write!(f, "transport failed: {}", msg),
            SourceError::Rpc(payload) => write!(f, "rpc error: {}", payload),
            SourceError::Parse(msg) => write!(f, "unparseable output: {}", msg),
            SourceError::Missing(what) => write!(f, "missing field: {}", what),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<RpcError> for SourceError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(msg) => SourceError::Transport(msg),
            RpcError::Rpc(payload) => SourceError::Rpc(payload),
            RpcError::MalformedResponse(msg) => SourceError::Parse(msg),
        }
    }
}

/// Capability the collectors are written against.
///
/// Every getter is a single fetch with no internal retry; failures are
/// isolated per collector by the poll loop.
pub trait ValidatorSource {
    /// The validator's human-readable animal name.
    fn name(&self) -> Result<String, SourceError>;

    /// The validator's cryptographic address (without the `/p2p/` prefix).
    fn address(&self) -> Result<String, SourceError>;

    /// Chain/sync height and epoch as seen by the node.
    fn height(&self) -> Result<HeightInfo, SourceError>;

    /// Whether the validator is currently in the consensus group.
    fn in_consensus(&self) -> Result<bool, SourceError>;

    /// Age of the newest block, in seconds.
    fn block_age(&self) -> Result<u64, SourceError>;

    /// Per-validator hbbft performance rows for the current group.
    ///
    /// `Ok` with no row for this validator means it is not in the group
    /// (a confirmed absence); `Err` means the fetch itself failed. The
    /// poll loop treats those two cases differently.
    fn hbbft_perf(&self) -> Result<Vec<HbbftPerfRow>, SourceError>;

    /// This node's own peer-book summary.
    fn peer_book_self(&self) -> Result<PeerBookSelf, SourceError>;

    /// All validators known to the ledger.
    fn ledger_validators(&self) -> Result<Vec<LedgerValidatorRow>, SourceError>;

    /// Account balance in base units for the given address.
    fn ledger_balance(&self, address: &str) -> Result<u64, SourceError>;

    /// The miner software version string.
    fn version(&self) -> Result<String, SourceError>;

    /// Container create/start uptimes; `None` when the source has no
    /// container to inspect (RPC mode).
    fn container_uptime(&self) -> Result<Option<ContainerUptime>, SourceError>;

    /// Size of the validator data directory; `None` when unsupported.
    fn disk_usage_bytes(&self) -> Result<Option<u64>, SourceError>;
}

/// Strips the multiaddr `/p2p/` prefix from a peer address.
pub(crate) fn strip_p2p_prefix(full: &str) -> String {
    full.trim()
        .strip_prefix("/p2p/")
        .unwrap_or(full.trim())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_p2p_prefix() {
        assert_eq!(strip_p2p_prefix("/p2p/11abcdef"), "11abcdef");
        assert_eq!(strip_p2p_prefix("11abcdef"), "11abcdef");
        assert_eq!(strip_p2p_prefix(" /p2p/11abcdef\n"), "11abcdef");
    }

    #[test]
    fn test_rpc_error_conversion() {
        let err: SourceError = RpcError::Transport("refused".to_string()).into();
        assert!(matches!(err, SourceError::Transport(_)));

        let err: SourceError = RpcError::Rpc(serde_json::json!({"code": -1})).into();
        assert!(matches!(err, SourceError::Rpc(_)));
    }
}
