//! Photo API types
//!
//! Wire types for the photo server and for the frame-facing id listing.

use serde::{Deserialize, Serialize};

/// Stable identifier issued by the photo server, also used as the cache file stem
pub type ImageId = String;

/// Asset type that is eligible for display
pub const IMAGE_ASSET_TYPE: &str = "IMAGE";

/// Id listing served to frames: `{ "uuid": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageList {
    pub uuid: Vec<ImageId>,
}

/// Response from `GET /albums/{id}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumResponse {
    #[serde(default)]
    pub assets: Vec<AlbumAsset>,
}

/// One asset inside an album listing
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumAsset {
    pub id: ImageId,
    /// "IMAGE", "VIDEO", ...
    #[serde(rename = "type")]
    pub kind: String,
}

impl AlbumResponse {
    /// Ids of the image assets, in album order
    pub fn image_ids(self) -> Vec<ImageId> {
        self.assets
            .into_iter()
            .filter(|a| a.kind == IMAGE_ASSET_TYPE)
            .map(|a| a.id)
            .collect()
    }
}

/// Response from `GET /assets/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: ImageId,
    /// Capture timestamp in the asset's local time, e.g. "2023-06-01T14:03:11.000Z"
    #[serde(default)]
    pub local_date_time: String,
    #[serde(default)]
    pub exif_info: Option<ExifInfo>,
}

/// Location subset of the asset's EXIF block
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExifInfo {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}
