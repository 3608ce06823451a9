//! Errors surfaced by the template and repository layers.

use thiserror::Error;

use crate::client::{ClientError, ErrorCode};
use crate::mapping::MappingError;

/// Result type for data access operations.
pub type DataResult<T> = Result<T, DataError>;

/// Data access errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Raised by the database client, passed through unchanged.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// A single-key read found no row.
    #[error("no row in {table} for key {key}")]
    NotFound { table: String, key: String },

    /// Unrecognized operation kind or malformed query configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DataError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Check if this error reports a missing row, from this layer or from
    /// the client.
    pub fn is_not_found(&self) -> bool {
        match self {
            DataError::NotFound { .. } => true,
            DataError::Client(err) => err.code == ErrorCode::NotFound,
            _ => false,
        }
    }
}
