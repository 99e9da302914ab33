//! Cache Synchronizer
//!
//! Keeps the cache directory equal to the remote id set using only adds and
//! removes. Each tick re-reads both sides; nothing is remembered between
//! ticks.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::errors::CacheError;
use super::store::CacheStore;
use crate::photos::{ApiError, ImageId, ImageSource};

/// Result of one reconciliation pass
#[derive(Debug)]
pub enum SyncOutcome {
    /// The id list could not be fetched; nothing was touched
    RemoteUnavailable(ApiError),
    /// The remote reported no images; nothing was touched
    RemoteEmpty,
    /// Removals and downloads were applied
    Applied(SyncReport),
}

/// What a pass changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub removed: Vec<ImageId>,
    pub downloaded: Vec<ImageId>,
    /// Ids whose removal or download failed, with the reason
    pub failed: Vec<(ImageId, String)>,
    /// Ids present on both sides
    pub unchanged: usize,
}

impl SyncReport {
    /// True when the pass made no filesystem changes
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.downloaded.is_empty()
    }
}

/// Mirrors a remote image collection into a `CacheStore`
pub struct Synchronizer {
    source: Arc<dyn ImageSource>,
    store: CacheStore,
    /// Storage resolution requested from the source
    image_width: u32,
    image_height: u32,
    /// Pause after each tick
    refresh_interval: Duration,
}

impl Synchronizer {
    pub fn new(
        source: Arc<dyn ImageSource>,
        store: CacheStore,
        image_width: u32,
        image_height: u32,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            image_width,
            image_height,
            refresh_interval,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Run one reconciliation pass
    ///
    /// Only an unreadable cache directory is returned as an error. Remote
    /// outages and empty listings are reported as outcomes and leave the
    /// cache untouched; per-id failures are collected in the report.
    pub async fn reconcile(&self) -> Result<SyncOutcome, CacheError> {
        let local = self.store.list_ids()?;

        let remote = match self.source.list_image_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Failed to fetch remote image list, skipping tick"
                );
                return Ok(SyncOutcome::RemoteUnavailable(e));
            }
        };

        // An empty listing is far more likely to be an upstream hiccup than a
        // deliberately emptied collection
        if remote.is_empty() {
            warn!(local = local.len(), "Remote image list is empty, skipping tick");
            return Ok(SyncOutcome::RemoteEmpty);
        }

        let remote: BTreeSet<ImageId> = remote.into_iter().collect();
        let mut report = SyncReport {
            unchanged: local.intersection(&remote).count(),
            ..Default::default()
        };

        // Removals first so disk usage does not spike during a collection swap
        for id in local.difference(&remote) {
            match self.store.remove(id) {
                Ok(()) => report.removed.push(id.clone()),
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to remove cached image");
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }

        for id in remote.difference(&local) {
            match self.download(id).await {
                Ok(()) => report.downloaded.push(id.clone()),
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to download image");
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }

        Ok(SyncOutcome::Applied(report))
    }

    async fn download(&self, id: &str) -> Result<(), CacheError> {
        // Reject unusable ids before spending a request on them
        self.store.path_for(id)?;

        let data = self
            .source
            .fetch_image(id, self.image_width, self.image_height)
            .await?;
        self.store.store(id, &data)?;

        debug!(id = id, size = data.len(), "Downloaded image");
        Ok(())
    }

    /// Run one tick and log its outcome; never fails
    pub async fn tick(&self) {
        match self.reconcile().await {
            Ok(SyncOutcome::Applied(report)) => {
                if report.is_noop() && report.failed.is_empty() {
                    debug!(images = report.unchanged, "Cache up to date");
                } else {
                    info!(
                        removed = report.removed.len(),
                        downloaded = report.downloaded.len(),
                        failed = report.failed.len(),
                        unchanged = report.unchanged,
                        "Cache synchronized"
                    );
                }
            }
            Ok(SyncOutcome::RemoteEmpty) | Ok(SyncOutcome::RemoteUnavailable(_)) => {}
            Err(e) => {
                error!(
                    cache_dir = %self.store.cache_dir().display(),
                    error = %e,
                    "Failed to read cache directory"
                );
            }
        }
    }

    /// Reconcile, then sleep the refresh interval, until `shutdown` fires
    ///
    /// Shutdown interrupts the sleep only; a tick in progress runs to
    /// completion first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            cache_dir = %self.store.cache_dir().display(),
            interval = %humantime::format_duration(self.refresh_interval),
            "Starting cache synchronizer"
        );

        while !*shutdown.borrow() {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.refresh_interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Cache synchronizer stopped");
    }
}
