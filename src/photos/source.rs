//! Frame-facing image source
//!
//! The synchronizer only needs two operations from its collaborator: the
//! authoritative id list and storage-sized image bytes. `ImageSource` is that
//! seam; `FrameSource` is the HTTP implementation against the proxy surface
//! (`GET /images`, `GET /image/{id}?w=&h=`).

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::client::send_get;
use super::errors::ApiError;
use super::types::{ImageId, ImageList};
use crate::config::ClientConfig;

/// Where the synchronizer gets ids and image bytes from
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Current authoritative id list. Never cached between calls.
    async fn list_image_ids(&self) -> Result<Vec<ImageId>, ApiError>;

    /// Image bytes sized by the source to fit within `width` x `height`
    async fn fetch_image(&self, id: &str, width: u32, height: u32) -> Result<Vec<u8>, ApiError>;
}

/// HTTP image source backed by the frame API
#[derive(Clone)]
pub struct FrameSource {
    http_client: Client,
    config: ClientConfig,
    list_path: String,
}

impl FrameSource {
    pub fn new(config: ClientConfig, list_path: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http_client: config.http_client()?,
            config,
            list_path: list_path.to_string(),
        })
    }
}

#[async_trait]
impl ImageSource for FrameSource {
    async fn list_image_ids(&self) -> Result<Vec<ImageId>, ApiError> {
        let response = send_get(&self.http_client, &self.config.url(&self.list_path)).await?;
        let list: ImageList = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        debug!(count = list.uuid.len(), "Fetched remote image list");
        Ok(list.uuid)
    }

    async fn fetch_image(&self, id: &str, width: u32, height: u32) -> Result<Vec<u8>, ApiError> {
        let path = format!("image/{}?w={}&h={}", urlencoding::encode(id), width, height);
        let response = send_get(&self.http_client, &self.config.url(&path)).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
