//! Photo Server API Client
//!
//! Read-only access to the upstream photo server: album membership, asset
//! metadata and preview-sized image bytes.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::errors::ApiError;
use super::types::{AlbumResponse, AssetRecord, ImageId};
use crate::config::ClientConfig;

/// Photo server client used by the transform proxy
#[derive(Clone)]
pub struct PhotoClient {
    /// HTTP client (carries the API key header and timeout)
    http_client: Client,
    /// Immutable connection settings
    config: ClientConfig,
}

impl PhotoClient {
    /// Create a client from connection settings
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = config.http_client()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// List the ids of image assets in an album
    pub async fn album_image_ids(&self, album_id: &str) -> Result<Vec<ImageId>, ApiError> {
        let path = format!("albums/{}", urlencoding::encode(album_id));
        let album: AlbumResponse = self.get_json(&path).await?;
        let ids = album.image_ids();
        debug!(album = album_id, count = ids.len(), "Listed album images");
        Ok(ids)
    }

    /// Fetch metadata for one asset
    pub async fn asset(&self, id: &str) -> Result<AssetRecord, ApiError> {
        let path = format!("assets/{}", urlencoding::encode(id));
        let asset: AssetRecord = self.get_json(&path).await?;
        debug!(asset = %asset.id, taken = %asset.local_date_time, "Fetched asset metadata");
        Ok(asset)
    }

    /// Fetch the preview-sized rendition of an asset
    pub async fn thumbnail(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        let path = format!("assets/{}/thumbnail?size=preview", urlencoding::encode(id));
        let response = self.get(&path).await?;
        let bytes = response.bytes().await?;
        debug!(asset = id, size = bytes.len(), "Downloaded preview");
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.get(path).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Response, ApiError> {
        send_get(&self.http_client, &self.config.url(path)).await
    }
}

/// Issue a GET and turn non-success statuses into `ApiError::Status`
pub(crate) async fn send_get(client: &Client, url: &str) -> Result<Response, ApiError> {
    debug!(url = %url, "GET");
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status.as_u16(), &body));
    }

    Ok(response)
}
