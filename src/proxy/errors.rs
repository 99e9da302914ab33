//! Proxy error types and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::compose::ComposeError;
use crate::photos::ApiError;

/// Failure while serving one request; never outlives that request
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Photo server request failed: {0}")]
    Upstream(#[from] ApiError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("Composition task failed: {0}")]
    Task(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(ApiError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(e) if e.status() == Some(404) => StatusCode::NOT_FOUND,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            // The upstream handed us bytes that are not an image
            ProxyError::Compose(ComposeError::Decode(_)) => StatusCode::BAD_GATEWAY,
            ProxyError::Compose(ComposeError::InvalidSize { .. }) => StatusCode::BAD_REQUEST,
            ProxyError::Compose(_) | ProxyError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self, "Request failed");
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ProxyError::from(ApiError::from_status(404, "")), StatusCode::NOT_FOUND),
            (ProxyError::from(ApiError::from_status(500, "")), StatusCode::BAD_GATEWAY),
            (ProxyError::from(ApiError::Timeout), StatusCode::GATEWAY_TIMEOUT),
            (ProxyError::from(ApiError::Transport("x".into())), StatusCode::BAD_GATEWAY),
            (ProxyError::from(ComposeError::Decode("x".into())), StatusCode::BAD_GATEWAY),
            (
                ProxyError::from(ComposeError::InvalidSize { width: 0, height: 1 }),
                StatusCode::BAD_REQUEST,
            ),
            (ProxyError::Task("panic".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{}", error);
        }
    }
}
