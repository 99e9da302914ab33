//! Cache error types

use std::path::PathBuf;

use crate::photos::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid image id {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CacheError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
