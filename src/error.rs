//! Error types for AtlasORM
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using OrmError
pub type Result<T> = std::result::Result<T, OrmError>;

/// Unified error type for AtlasORM operations
#[derive(Debug, Error)]
pub enum OrmError {
    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("{0} is not serialisable")]
    NotSerialisable(String),

    #[error("Format mismatch: expected codec {expected:?}, found {found:?}")]
    FormatMismatch { expected: String, found: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Entity not found: {table}/{id}")]
    NotFound { table: String, id: String },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrmError {
    /// Shorthand for a NotFound error
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        OrmError::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    /// True if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrmError::NotFound { .. })
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for OrmError {
    fn from(err: bincode::Error) -> Self {
        OrmError::Store(format!("snapshot encoding failed: {}", err))
    }
}
