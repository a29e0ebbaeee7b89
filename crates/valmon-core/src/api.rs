//! Client for the public chain HTTP API.
//!
//! All endpoints wrap their payload in a `data` object. Any non-200
//! status or transport failure is surfaced as an error and the caller
//! treats the metric group as absent for this cycle.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for chain API calls.
#[derive(Debug)]
pub enum ApiError {
    /// Non-200 response.
    Status(u16),
    /// Connection or protocol failure.
    Transport(String),
    /// Response body did not have the expected shape.
    Shape(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Status(code) => write!(f, "chain api returned status {}", code),
            ApiError::Transport(msg) => write!(f, "chain api transport error: {}", msg),
            ApiError::Shape(msg) => write!(f, "unexpected chain api payload: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Deserialize)]
struct HeightData {
    height: u64,
}

#[derive(Deserialize)]
struct StakedData {
    count: u64,
}

#[derive(Deserialize)]
struct StatsData {
    staked: StakedData,
}

/// Per-validator details from `/validators/{address}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiValidator {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_heartbeat: Option<u64>,
    #[serde(default)]
    pub penalty: Option<f64>,
}

#[derive(Deserialize)]
struct AccountData {
    #[serde(default)]
    balance: u64,
}

/// Blocking client for the public chain API.
pub struct ChainApi {
    http: reqwest::blocking::Client,
    base: String,
}

impl ChainApi {
    /// Creates a client for the given base URL (e.g. `https://api.helium.io/v1`).
    pub fn new(base: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Current chain height.
    pub fn height(&self) -> Result<u64, ApiError> {
        let data: HeightData = self.get_data("/blocks/height")?;
        Ok(data.height)
    }

    /// Number of currently staked validators.
    pub fn staked_validator_count(&self) -> Result<u64, ApiError> {
        let data: StatsData = self.get_data("/validators/stats")?;
        Ok(data.staked.count)
    }

    /// Details for one validator.
    pub fn validator(&self, address: &str) -> Result<ApiValidator, ApiError> {
        self.get_data(&format!("/validators/{}", address))
    }

    /// Account balance in base units.
    pub fn account_balance(&self, address: &str) -> Result<u64, ApiError> {
        let data: AccountData = self.get_data(&format!("/accounts/{}", address))?;
        Ok(data.balance)
    }

    /// Fetches `{base}{path}` and unwraps the `data` envelope.
    fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        unwrap_data(body)
    }
}

/// Unwraps the API's `{"data": ...}` envelope into `T`.
fn unwrap_data<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    let data = body
        .get("data")
        .cloned()
        .ok_or_else(|| ApiError::Shape("missing data envelope".to_string()))?;
    serde_json::from_value(data).map_err(|e| ApiError::Shape(e.to_string()))
}
