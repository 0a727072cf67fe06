// Assets read from a local directory laid out like the web root
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::AssetSource;
use crate::error::{AudioError, Result};
use crate::sound::SoundId;

#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
    extension: String,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
        }
    }

    pub fn path_for(&self, id: &SoundId) -> Option<PathBuf> {
        id.asset_path(&self.extension).map(|rel| self.root.join(rel))
    }
}

#[async_trait]
impl AssetSource for DirAssets {
    async fn fetch(&self, id: &SoundId) -> Result<Vec<u8>> {
        let path = self
            .path_for(id)
            .ok_or_else(|| AudioError::fetch(id, "not a preset sound"))?;

        debug!(path = %path.display(), "Reading sound asset");
        tokio::fs::read(&path)
            .await
            .map_err(|e| AudioError::fetch(id, format!("{}: {}", path.display(), e)))
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}
