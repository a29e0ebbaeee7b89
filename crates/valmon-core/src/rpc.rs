//! Synchronous JSON-RPC 2.0 client for the validator node.
//!
//! Each call posts `{"jsonrpc":"2.0","id":N,"method":M,"params":P?}` and
//! extracts the `result` field. Server-side errors and transport errors
//! are distinguished so the poll loop can treat both as skip-this-cycle.
//! The client never retries; a failed call is simply retried on the next
//! poll cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::trace;

/// JSON-RPC protocol version sent with every request.
const JSONRPC_VERSION: &str = "2.0";

/// Per-call HTTP timeout. Bounds how long one collector can block a cycle.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for RPC calls.
#[derive(Debug)]
pub enum RpcError {
    /// Connection refused, timeout, or a body that is not JSON.
    Transport(String),
    /// The server answered with an `error` object; payload attached.
    Rpc(Value),
    /// The response parsed as JSON but had no usable `result`.
    MalformedResponse(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Transport(msg) => write!(f, "rpc transport error: {}", msg),
            RpcError::Rpc(payload) => write!(f, "rpc error response: {}", payload),
            RpcError::MalformedResponse(msg) => write!(f, "malformed rpc response: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}

/// JSON-RPC client bound to a single endpoint.
pub struct RpcClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issues a call and returns the raw `result` value.
    pub fn call(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "method": method,
        });
        if let Some(params) = params {
            body["params"] = params;
        }

        trace!("rpc call #{}: {}", id, method);
        let response: Value = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| RpcError::Transport(e.to_string()))?
            .json()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        extract_result(response)
    }

    /// Issues a call and deserializes the `result` into `T`.
    pub fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, RpcError> {
        let result = self.call(method, params)?;
        serde_json::from_value(result).map_err(|e| RpcError::MalformedResponse(e.to_string()))
    }
}

/// Splits a parsed response body into result or typed failure.
fn extract_result(body: Value) -> Result<Value, RpcError> {
    if let Some(error) = body.get("error") {
        if !error.is_null() {
            return Err(RpcError::Rpc(error.clone()));
        }
    }
    match body.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(RpcError::MalformedResponse(
            "response has neither result nor error".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_result_ok() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": {"height": 42}});
        let result = extract_result(body).unwrap();
        assert_eq!(result["height"], 42);
    }

    #[test]
    fn test_extract_result_error_payload() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "method not found"}});
        match extract_result(body) {
            Err(RpcError::Rpc(payload)) => assert_eq!(payload["code"], -32601),
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_result_missing_both() {
        let body = json!({"jsonrpc": "2.0", "id": 1});
        assert!(matches!(
            extract_result(body),
            Err(RpcError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_null_error_is_not_a_failure() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": null, "result": true});
        assert_eq!(extract_result(body).unwrap(), json!(true));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let client = RpcClient::new("http://127.0.0.1:4467").unwrap();
        let a = client.next_id.fetch_add(1, Ordering::Relaxed);
        let b = client.next_id.fetch_add(1, Ordering::Relaxed);
        assert!(b > a);
    }
}
