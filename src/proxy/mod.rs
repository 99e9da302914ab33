//! Transform proxy
//!
//! HTTP front for the photo server that frames talk to: relabels the album
//! listing and serves composed, captioned JPEGs. Holds no state between
//! requests.

pub mod caption;
pub mod errors;
pub mod server;

pub use server::{ProxyServer, ProxyState};
