use alloy::{
    primitives::{Address, Bytes, TxHash},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::ethereum::utils;

/// Read-only JSON-RPC access to the endpoint the session is connected to.
#[derive(Debug, Clone)]
pub struct RpcProvider {
    provider: RootProvider<Http<Client>>,
    rpc_url: reqwest::Url,
}

impl RpcProvider {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let rpc_url = utils::validate_rpc_url(rpc_url)?;
        let provider = ProviderBuilder::new().on_http(rpc_url.clone());

        Ok(Self { provider, rpc_url })
    }

    pub fn rpc_url(&self) -> &reqwest::Url {
        &self.rpc_url
    }

    pub async fn check_connection(&self) -> Result<bool> {
        match self.provider.get_block_number().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!("Connection check failed for {}: {}", self.rpc_url, e);
                Ok(false)
            }
        }
    }

    pub async fn get_chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(|e| {
            anyhow!(
                "Failed to fetch chain id: {}",
                utils::interpret_rpc_error(&e.to_string())
            )
        })
    }

    /// Deployed bytecode at `address`; empty when no contract lives there.
    pub async fn get_code(&self, address: Address) -> Result<Bytes> {
        tracing::debug!("Fetching bytecode for contract: {:?}", address);
        self.provider.get_code_at(address).await.map_err(|e| {
            tracing::error!("RPC error details: {}", e);
            anyhow!(
                "Failed to fetch contract bytecode: {}",
                utils::interpret_rpc_error(&e.to_string())
            )
        })
    }

    /// `eth_call` with the given calldata.
    pub async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default().to(to).input(calldata.into());
        self.provider
            .call(&request)
            .await
            .map_err(|e| anyhow!(utils::interpret_rpc_error(&e.to_string())))
    }

    /// Transaction and receipt for `hash`, as JSON.
    pub async fn get_transaction(&self, hash: TxHash) -> Result<Value> {
        let transaction = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to fetch transaction details: {}",
                    utils::interpret_rpc_error(&e.to_string())
                )
            })?
            .ok_or_else(|| anyhow!("Transaction {:#x} not found", hash))?;

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to fetch transaction receipt: {}",
                    utils::interpret_rpc_error(&e.to_string())
                )
            })?;

        let mut details = serde_json::to_value(&transaction)?;
        if let Value::Object(fields) = &mut details {
            fields.insert("receipt".to_string(), serde_json::to_value(&receipt)?);
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = RpcProvider::new("http://127.0.0.1:8545").unwrap();
        assert_eq!(provider.rpc_url().as_str(), "http://127.0.0.1:8545/");
    }

    #[test]
    fn test_provider_rejects_bad_url() {
        assert!(RpcProvider::new("").is_err());
        assert!(RpcProvider::new("ftp://example.org").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_disconnected() {
        // Nothing listens on port 9 (discard) on a test machine
        let provider = RpcProvider::new("http://127.0.0.1:9").unwrap();
        assert!(!provider.check_connection().await.unwrap());
    }
}
