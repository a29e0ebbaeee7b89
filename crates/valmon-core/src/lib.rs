//! valmon-core — shared library for the validator monitor.
//!
//! Provides:
//! - `parse` — parsers for legacy CLI output (pipe tables, hbbft CSV, df, key tuples)
//! - `model` — normalized validator measurements
//! - `rpc` — JSON-RPC 2.0 client for the node endpoint
//! - `source` — data source abstraction (RPC, shell-exec, mock)
//! - `api` — public chain API client
//! - `metrics` — prometheus gauge definitions and update helpers
//! - `collect` — poll-cycle orchestrator and host usage collection
//! - `util` — helper utilities

pub mod api;
pub mod collect;
pub mod metrics;
pub mod model;
pub mod parse;
pub mod rpc;
pub mod source;
pub mod util;
