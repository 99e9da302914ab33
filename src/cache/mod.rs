//! Local image cache
//!
//! A directory of `{id}.jpg` files mirroring the remote collection, kept in
//! step with it by the `Synchronizer`.

pub mod errors;
pub mod store;
pub mod sync;

pub use store::CacheStore;
pub use sync::Synchronizer;
