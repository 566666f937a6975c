use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint used when no session value has been saved yet
    pub rpc_url: String,
    pub security: SecurityConfig,
    pub gas: GasConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas limit used when estimation fails
    pub default_gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Remember the endpoint, contract address and ABI between runs
    pub persist: bool,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    pub private_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            security: SecurityConfig {
                allow_write_operations: false,
            },
            gas: GasConfig {
                default_gas_limit: 300_000,
            },
            session: SessionConfig {
                persist: true,
                path: None,
            },
            wallet: WalletConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::load_from_file(&path).await.unwrap_or_else(|e| {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }),
                _ => Self::default(),
            },
        };

        config.apply_env_vars();
        config
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_vars(&mut self) {
        if let Ok(rpc_url) = std::env::var("EXPLORER_RPC_URL") {
            tracing::info!("Using EXPLORER_RPC_URL environment variable as default endpoint");
            self.rpc_url = rpc_url;
        }

        if let Ok(private_key) = std::env::var("EXPLORER_PRIVATE_KEY") {
            tracing::debug!("EXPLORER_PRIVATE_KEY found, will be used for wallet connection");
            self.wallet.private_key = Some(private_key);
        } else if self.wallet.private_key.is_some() {
            tracing::warn!("Private key is stored in the config file; prefer EXPLORER_PRIVATE_KEY");
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("contract-explorer").join("config.toml"))
    }

    /// Where the session file lives: the configured path, else the user data directory
    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session.path {
            return Ok(path.clone());
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("contract-explorer").join("session.json"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# Contract Explorer Configuration File

# Endpoint used until a session value is saved
rpc_url = "http://127.0.0.1:8545"

# Security settings
[security]
allow_write_operations = false

# Gas settings for write calls
[gas]
default_gas_limit = 300000  # used when estimation fails

# Session persistence (RPC URL, contract address and ABI)
[session]
persist = true
# path = "/path/to/session.json"

# Wallet used for write calls
[wallet]
# private_key = "0x..."  # prefer the EXPLORER_PRIVATE_KEY environment variable

# Environment variables that can be used:
# EXPLORER_RPC_URL - Default RPC endpoint
# EXPLORER_PRIVATE_KEY - Private key of the account that signs write calls
"#;
        sample_config.to_string()
    }
}
