//! Closed error taxonomy for the request and credential layers.

use std::fmt;

/// Categories of failure surfaced by the dispatcher and credential store.
///
/// Callers switch on the variant, never on message text. Nothing here is
/// fatal to the process; every failure is a value the caller handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response reached the client at all (DNS, connection refused,
    /// timeout).
    NetworkUnavailable { message: String, timed_out: bool },
    /// The server answered 401 or 403. Callers typically force a logout;
    /// retrying is never correct here.
    AuthorizationExpired { status: u16, message: String },
    /// Any other non-2xx response.
    RequestFailed { status: u16, message: String },
    /// Credential persistence I/O failed on write. Reads fail open and
    /// never produce this.
    StorageUnavailable { message: String },
    /// Attempt to store an empty or malformed token.
    InvalidCredential { message: String },
}

impl ApiError {
    /// Creates a transport error for a request that never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::NetworkUnavailable {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Creates a transport error for a timed-out request.
    pub fn timeout(message: impl Into<String>) -> Self {
        ApiError::NetworkUnavailable {
            message: message.into(),
            timed_out: true,
        }
    }

    /// Creates a credential persistence error.
    pub fn storage(message: impl Into<String>) -> Self {
        ApiError::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates an error for a rejected token value.
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        ApiError::InvalidCredential {
            message: message.into(),
        }
    }

    /// True when the server rejected the attached credential (401/403).
    pub fn is_authorization_expired(&self) -> bool {
        matches!(self, ApiError::AuthorizationExpired { .. })
    }

    /// HTTP status for response-level failures, if there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthorizationExpired { status, .. }
            | ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NetworkUnavailable {
                message,
                timed_out: true,
            } => write!(f, "network timeout: {message}"),
            ApiError::NetworkUnavailable { message, .. } => {
                write!(f, "network unavailable: {message}")
            }
            ApiError::AuthorizationExpired { status, message } => {
                write!(f, "authorization expired (HTTP {status}): {message}")
            }
            ApiError::RequestFailed { status, message } => {
                write!(f, "request failed (HTTP {status}): {message}")
            }
            ApiError::StorageUnavailable { message } => {
                write!(f, "credential storage unavailable: {message}")
            }
            ApiError::InvalidCredential { message } => {
                write!(f, "invalid credential: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Result type for dispatcher and store operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
