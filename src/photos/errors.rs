//! Photo API Error Types
//!
//! Structured error handling for calls to the photo server.
//! Separates transport failures from non-success statuses so callers can
//! tell an outage apart from a bad request.

/// Photo API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Create an ApiError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            408 => ApiError::Timeout,
            _ => ApiError::Status {
                status,
                body: body.to_string(),
            },
        }
    }

    /// Whether repeating the same call later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Timeout => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::InvalidResponse(_) => false,
        }
    }

    /// Upstream status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Timeout => Some(408),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status.as_u16(), &e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(ApiError::from_status(408, ""), ApiError::Timeout));
        assert!(matches!(
            ApiError::from_status(404, "missing"),
            ApiError::Status { status: 404, .. }
        ));
        assert!(ApiError::from_status(503, "").is_transient());
        assert!(ApiError::from_status(429, "").is_transient());
        assert!(!ApiError::from_status(401, "").is_transient());
        assert!(!ApiError::InvalidResponse("x".into()).is_transient());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(ApiError::from_status(404, "").status(), Some(404));
        assert_eq!(ApiError::Transport("refused".into()).status(), None);
    }
}
