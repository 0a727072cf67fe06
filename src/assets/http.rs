// Assets served by the web origin, `GET <base>/sounds/<id>.<ext>`
use async_trait::async_trait;
use tracing::debug;

use super::AssetSource;
use crate::error::{AudioError, Result};
use crate::sound::SoundId;

#[derive(Debug, Clone)]
pub struct HttpAssets {
    client: reqwest::Client,
    base_url: String,
    extension: String,
}

impl HttpAssets {
    pub fn new(base_url: &str, extension: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, extension)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, extension: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn url_for(&self, id: &SoundId) -> Option<String> {
        id.asset_path(&self.extension)
            .map(|rel| format!("{}/{}", self.base_url, rel))
    }
}

#[async_trait]
impl AssetSource for HttpAssets {
    async fn fetch(&self, id: &SoundId) -> Result<Vec<u8>> {
        let url = self
            .url_for(id)
            .ok_or_else(|| AudioError::fetch(id, "not a preset sound"))?;

        debug!(%url, "Fetching sound asset");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AudioError::fetch(id, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AudioError::fetch(id, format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AudioError::fetch(id, e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}
