//! Member directory client error types.

use memcat_core::MemberId;
use memcat_engine::DirectoryError;

/// Errors from member directory HTTP calls.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The directory returned a non-2xx status.
    #[error("member directory {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl DirectoryClientError {
    /// HTTP status of an `ApiError`, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map into the gateway error for a write concerning `member_id`.
    ///
    /// 404 means the member is unknown; any other 4xx is a rejection of this
    /// one write; everything else means the directory is unavailable.
    pub(crate) fn into_write_error(self, member_id: &MemberId) -> DirectoryError {
        match self {
            Self::ApiError { status: 404, .. } => DirectoryError::NotFound(member_id.clone()),
            Self::ApiError { status, body, .. } if (400..500).contains(&status) => {
                DirectoryError::Rejected {
                    member_id: member_id.clone(),
                    reason: format!("HTTP {status}: {body}"),
                }
            }
            other => DirectoryError::Unavailable(other.to_string()),
        }
    }
}

impl From<DirectoryClientError> for DirectoryError {
    fn from(e: DirectoryClientError) -> Self {
        DirectoryError::Unavailable(e.to_string())
    }
}
