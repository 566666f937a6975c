pub mod abi;
pub mod contract;
pub mod provider;
pub mod utils;
pub mod wallet;

use serde::{Deserialize, Serialize};

/// Outcome of executing a function form against the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub transaction_hash: Option<String>,
}

impl CallResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            transaction_hash: None,
        }
    }
}

/// A transaction sent during this session, newest first in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastTransaction {
    pub hash: String,
    pub method: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Progress of the connect and bytecode-validation steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Success,
    Error,
}
