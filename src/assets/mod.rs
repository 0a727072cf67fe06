// Sound asset sources
// Fetches encoded sound files for presets from a directory or an HTTP origin

pub mod dir;
pub mod http;

pub use dir::DirAssets;
pub use http::HttpAssets;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::sound::SoundId;

pub const DEFAULT_EXTENSION: &str = "mp3";

#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Raw encoded bytes of `sounds/<id>.<ext>`
    async fn fetch(&self, id: &SoundId) -> Result<Vec<u8>>;

    /// File extension of the assets, used as a decoder hint
    fn extension(&self) -> &str;
}

/// Pick a source from a location string: URLs go over HTTP, anything else is a directory
pub fn from_location(location: &str, extension: &str) -> Arc<dyn AssetSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpAssets::new(location, extension))
    } else {
        Arc::new(DirAssets::new(location, extension))
    }
}
