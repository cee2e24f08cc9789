use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use dbcourier_core::{Error, Result, TargetStore};
use tracing::debug;

/// File-backed target list: one YAML document holding an ordered list of
/// database names.
#[derive(Debug, Clone)]
pub struct FileTargetStore {
    path: PathBuf,
}

impl FileTargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a target, preserving order. Duplicates are rejected since a
    /// second entry would only waste a backup slot.
    pub async fn add(&self, target: &str) -> Result<Vec<String>> {
        let mut targets = self.load().await?;
        if targets.iter().any(|t| t == target) {
            return Err(Error::Configuration(format!(
                "Target '{}' is already configured",
                target
            )));
        }
        targets.push(target.to_string());
        self.save(&targets).await?;
        Ok(targets)
    }

    pub async fn remove(&self, target: &str) -> Result<Vec<String>> {
        let mut targets = self.load().await?;
        let before = targets.len();
        targets.retain(|t| t != target);
        if targets.len() == before {
            return Err(Error::Configuration(format!(
                "Target '{}' is not configured",
                target
            )));
        }
        self.save(&targets).await?;
        Ok(targets)
    }
}

#[async_trait]
impl TargetStore for FileTargetStore {
    async fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            debug!("{} does not exist yet; empty target list", self.path.display());
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
            .map_err(Error::Generic)?;
        let targets: Vec<String> = serde_yaml::from_str(&content).map_err(|e| {
            Error::Configuration(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(targets)
    }

    async fn save(&self, targets: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))
                .map_err(Error::Generic)?;
        }

        let content = serde_yaml::to_string(&targets)
            .map_err(|e| anyhow!("Failed to serialize target list: {}", e))
            .map_err(Error::Generic)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
            .map_err(Error::Generic)?;
        Ok(())
    }
}
