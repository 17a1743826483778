use std::path::Path;
use std::path::PathBuf;

use eyre::Result;
use eyre::WrapErr;
use tracing::debug;

use crate::token_record::TokenRecord;

/// On-disk JSON copy of the last token record, shared by every session of the process.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<TokenRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).wrap_err(format!("Failed to read {}", self.path.display()));
            }
        };
        let token = serde_json::from_slice(&bytes)
            .wrap_err(format!("Failed to parse {}", self.path.display()))?;
        debug!("Loaded cached token from {}", self.path.display());
        Ok(Some(token))
    }

    pub async fn save(&self, token: &TokenRecord) -> Result<()> {
        tokio::fs::write(&self.path, serde_json::to_string_pretty(token)?)
            .await
            .wrap_err(format!("Failed to write {}", self.path.display()))?;
        debug!("Saved token to {}", self.path.display());
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).wrap_err(format!("Failed to remove {}", self.path.display())),
        }
    }
}
