use alloy::{
    network::EthereumWallet,
    primitives::Address,
    signers::{local::PrivateKeySigner, Signer},
};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Local signing key standing in for a browser wallet.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let private_key = private_key.trim();
        let private_key = private_key
            .strip_prefix("0x")
            .or_else(|| private_key.strip_prefix("0X"))
            .unwrap_or(private_key);

        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;
        tracing::info!("Wallet connected: {:?}", signer.address());

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.signer.chain_id()
    }

    /// Bind the signer to `chain_id` when it is on a different network.
    pub fn switch_chain(&mut self, chain_id: u64) {
        if self.chain_id() != Some(chain_id) {
            tracing::info!(
                "Switching wallet from chain {:?} to chain {}",
                self.chain_id(),
                chain_id
            );
            self.signer.set_chain_id(Some(chain_id));
        }
    }

    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // First well-known development account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_address() {
        let wallet = Wallet::from_private_key(DEV_KEY).unwrap();
        assert_eq!(
            wallet.address(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
        assert_eq!(wallet.chain_id(), None);
    }

    #[test]
    fn test_switch_chain() {
        let mut wallet = Wallet::from_private_key(&DEV_KEY[2..]).unwrap();
        wallet.switch_chain(31337);
        assert_eq!(wallet.chain_id(), Some(31337));
    }

    #[test]
    fn test_invalid_key() {
        assert!(Wallet::from_private_key("not-a-key").is_err());
        assert!(Wallet::from_private_key("").is_err());
    }
}
