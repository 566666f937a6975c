use alloy::primitives::{Address, TxHash};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Validates and normalizes a contract or account address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Invalid contract address."));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    // Mixed-case input must carry a valid EIP-55 checksum
    let is_mixed_case = hex_part.chars().any(|c| c.is_ascii_lowercase())
        && hex_part.chars().any(|c| c.is_ascii_uppercase());
    if is_mixed_case {
        return Address::parse_checksummed(address, None)
            .map_err(|e| anyhow!("Invalid address checksum: '{}'. Error: {}", address, e));
    }

    Address::from_str(address)
        .map_err(|e| anyhow!("Invalid Ethereum address: '{}'. Error: {}", address, e))
}

/// Validates an RPC endpoint URL
pub fn validate_rpc_url(rpc_url: &str) -> Result<reqwest::Url> {
    let rpc_url = rpc_url.trim();
    if rpc_url.is_empty() {
        return Err(anyhow!("RPC URL is required."));
    }

    let url: reqwest::Url = rpc_url
        .parse()
        .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", rpc_url, e))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!(
            "Unsupported RPC URL scheme '{}'. Use an http:// or https:// endpoint",
            other
        )),
    }
}

/// Validates a transaction hash
pub fn validate_tx_hash(hash: &str) -> Result<TxHash> {
    let hash = hash.trim();
    if hash.len() != 66 || !(hash.starts_with("0x") || hash.starts_with("0X")) {
        return Err(anyhow!(
            "Invalid transaction hash: '{}'. Expected 0x followed by 64 hex characters",
            hash
        ));
    }
    TxHash::from_str(hash).map_err(|e| anyhow!("Invalid transaction hash: '{}'. Error: {}", hash, e))
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        format!(
            "Transaction failed: The contract function reverted execution. {}",
            if error.contains("revert") {
                "This usually means the function's requirements were not met or an assertion failed."
            } else {
                "Check your parameters and try again."
            }
        )
    } else if error.contains("insufficient funds") {
        "Transaction failed: Insufficient funds to cover gas costs. Make sure your account has enough ETH for gas fees.".to_string()
    } else if error.contains("gas required exceeds allowance") {
        "Transaction failed: Gas limit too low. Try increasing the gas limit for this transaction."
            .to_string()
    } else if error.contains("nonce too low") {
        "Transaction failed: Nonce too low. This usually means another transaction was already mined with this nonce.".to_string()
    } else if error.contains("replacement transaction underpriced") {
        "Transaction failed: Gas price too low to replace pending transaction. Increase the gas price.".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Network error: Cannot connect to RPC endpoint. Check the RPC URL and that the node is running.".to_string()
    } else if error.contains("timeout") {
        "Network error: Request timed out. The RPC endpoint may be overloaded or unreachable."
            .to_string()
    } else if error.contains("rate limit") {
        "Rate limit error: Too many requests to the RPC endpoint. Try again in a few moments or use a different endpoint.".to_string()
    } else if error.contains("method not found") {
        "RPC error: The requested method is not supported by this RPC endpoint. Try using a different endpoint.".to_string()
    } else {
        format!("RPC error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        // Valid addresses
        assert!(validate_address("0x742d35cc6435c9c1c72c5e7b18bab7e1db7a5d6e").is_ok());
        assert!(validate_address("0x0000000000000000000000000000000000000000").is_ok());
        assert!(validate_address("0x5FbDB2315678afecb367f032d93F642f64180aa3").is_ok());

        // Invalid addresses
        assert!(validate_address("").is_err());
        assert!(validate_address("not_an_address").is_err());
        assert!(validate_address("0x123").is_err()); // Too short
        assert!(validate_address("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err()); // Missing 0x
        assert!(validate_address("0xgg2d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err()); // Invalid hex
        assert!(validate_address("0x5fbDB2315678afecb367f032d93F642f64180aa3").is_err()); // Bad checksum
    }

    #[test]
    fn test_validate_rpc_url() {
        assert!(validate_rpc_url("http://127.0.0.1:8545").is_ok());
        assert!(validate_rpc_url("https://rpc.example.org/v1").is_ok());

        assert_eq!(
            validate_rpc_url("  ").unwrap_err().to_string(),
            "RPC URL is required."
        );
        assert!(validate_rpc_url("ws://localhost:8546").is_err());
        assert!(validate_rpc_url("not a url").is_err());
    }

    #[test]
    fn test_validate_tx_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(validate_tx_hash(&hash).is_ok());
        assert!(validate_tx_hash("0x1234").is_err());
        assert!(validate_tx_hash(&format!("0x{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn test_interpret_rpc_error() {
        assert!(interpret_rpc_error("error: execution reverted: not owner")
            .starts_with("Transaction failed"));
        assert!(interpret_rpc_error("tcp connect error: connection refused")
            .starts_with("Network error"));
        assert_eq!(interpret_rpc_error("boom"), "RPC error: boom");
    }
}
