//! Photo server API clients
//!
//! `PhotoClient` talks to the upstream photo server (album listing, asset
//! metadata, preview thumbnails). `FrameSource` talks to the frame-facing
//! surface the proxy exposes and is what the cache synchronizer consumes.

pub mod client;
pub mod errors;
pub mod source;
pub mod types;

pub use client::PhotoClient;
pub use errors::ApiError;
pub use source::{FrameSource, ImageSource};
pub use types::*;
