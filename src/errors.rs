use std::fmt;
use thiserror::Error;

/// Error reported by a [`Connection`](crate::client::Connection).
///
/// Carries the HTTP-style status code returned by the service so callers can
/// tell a missing resource apart from every other failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    /// Create a new ApiError with a specific status and message.
    pub fn new(status: u16, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(404, msg)
    }

    /// Shortcut for 409 Conflict (resource already exists)
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(409, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(400, msg)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("required key `{0}` missing from resource")]
    KeyNotFound(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("api error: {0}")]
    Api(ApiError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DatasetError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::KeyNotFound(key.into())
    }
}

impl From<ApiError> for DatasetError {
    fn from(err: ApiError) -> Self {
        if err.is_not_found() {
            DatasetError::NotFound(err.message)
        } else {
            DatasetError::Api(err)
        }
    }
}

pub type DatasetResult<T> = Result<T, DatasetError>;
