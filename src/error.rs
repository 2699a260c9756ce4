//! Error types for the gsuite_groups crate.

use thiserror::Error;

/// Errors that can occur when talking to the Directory / Groups Settings APIs.
#[derive(Error, Debug)]
pub enum GroupsError {
    #[error("Failed to read credentials file: {0}")]
    CredentialsFileError(#[from] std::io::Error),

    #[error("Failed to parse credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError {
        status: u16,
        /// Google error `reason` code (e.g. "notFound", "duplicate"), when present.
        reason: Option<String>,
        message: String,
    },

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),
}

/// Result type alias for GroupsError.
pub type Result<T> = std::result::Result<T, GroupsError>;

/// Closed set of failure causes recorded in the facade's operation log.
///
/// Derived once from the HTTP status and the Google error `reason` code where
/// the response is decoded, so call sites never have to pattern-match on
/// free-text error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Group or member does not exist.
    NotFound,
    /// Group or membership entry already exists.
    AlreadyExists,
    /// The member cannot be added as requested (bad address or role).
    InvalidMember,
    /// Transient server-side error; the settings fetch retries these.
    Backend,
    /// Local argument validation failed before any request was issued.
    Validation,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// Map an HTTP status plus Google's error `reason` code to a cause.
    pub fn classify(status: u16, reason: Option<&str>) -> Self {
        match (status, reason) {
            (404, _) | (_, Some("notFound")) => FailureKind::NotFound,
            (409, _) | (_, Some("duplicate")) => FailureKind::AlreadyExists,
            (400, Some("invalid")) | (400, Some("required")) => FailureKind::InvalidMember,
            (_, Some("backendError")) => FailureKind::Backend,
            (500..=599, _) => FailureKind::Backend,
            _ => FailureKind::Other,
        }
    }
}

impl From<&GroupsError> for FailureKind {
    fn from(err: &GroupsError) -> Self {
        match err {
            GroupsError::ApiError { status, reason, .. } => {
                FailureKind::classify(*status, reason.as_deref())
            }
            _ => FailureKind::Other,
        }
    }
}
