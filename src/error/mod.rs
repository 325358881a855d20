//! Error handling for the record stores and the relational mirror.

use std::io;

/// Specialized error type for store and mirror operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing data does not match the expected schema
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// File, document or row could not be located
    #[error("not found: {0}")]
    NotFound(String),

    /// Backing file is locked or otherwise not writable
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Cloud transport rejected the supplied credentials
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A record field failed validation
    #[error("validation failed for {field}: {reason}")]
    ValidationFailed {
        /// Column label of the offending field
        field: String,
        /// Operator-facing reason
        reason: String,
    },

    /// No worksheet exists for the year of the incident date
    #[error("no worksheet for year {year} (available: {available:?})")]
    PartitionNotFound {
        /// Year derived from the incident date
        year: i32,
        /// Years that do have a worksheet
        available: Vec<i32>,
    },

    /// Database constraint rejected the record
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// Connection to the database or cloud endpoint failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Environment or document configuration is incomplete
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Any other failure, message preserved verbatim
    #[error("{0}")]
    Unexpected(String),
}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(error.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(error.to_string()),
            _ => Self::Unexpected(format!("io error: {error}")),
        }
    }
}

impl From<umya_spreadsheet::XlsxError> for StoreError {
    fn from(error: umya_spreadsheet::XlsxError) -> Self {
        match error {
            umya_spreadsheet::XlsxError::Io(e) => Self::from(e),
            other => Self::InvalidFormat(format!("workbook: {other}")),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Self::AuthenticationFailed(error.to_string());
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Self::NotFound(error.to_string());
            }
        }
        if error.is_connect() || error.is_timeout() {
            return Self::ConnectionFailed(error.to_string());
        }
        Self::Unexpected(format!("http error: {error}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                Self::IntegrityViolation(db.message().to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
                Self::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Configuration(_) => Self::Configuration(error.to_string()),
            _ => Self::Unexpected(format!("database error: {error}")),
        }
    }
}

/// Result type for store and mirror operations
pub type Result<T> = std::result::Result<T, StoreError>;
