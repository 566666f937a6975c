use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// User inputs remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub rpc_url: String,
    pub contract_address: String,
    pub abi: String,
}

/// JSON file holding the last endpoint, contract address and ABI text.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved values, or `None` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<SavedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| anyhow!("Failed to read session file {:?}: {}", self.path, e))?;
        let saved: SavedSession = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse session file {:?}: {}", self.path, e))?;

        debug!("Restored session from {:?}", self.path);
        Ok(Some(saved))
    }

    pub async fn save(&self, session: &SavedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create session directory {:?}: {}", parent, e)
                })?;
            }
        }

        let content = serde_json::to_string_pretty(session)
            .map_err(|e| anyhow!("Failed to serialize session: {}", e))?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| anyhow!("Failed to write session file {:?}: {}", self.path, e))?;

        debug!("Saved session to {:?}", self.path);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .await
                .map_err(|e| anyhow!("Failed to remove session file {:?}: {}", self.path, e))?;
        }
        Ok(())
    }
}
