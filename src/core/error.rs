//! Error types and handling for the scene prefab bridge
//!
//! This module defines all error types used throughout the system. Only
//! persistence and configuration problems are fatal to an operation;
//! unresolvable references and missing live data are recovered locally
//! by the prefab engine and never surface here.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scene prefab bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scene inspector errors
    #[error("Inspector error: {0}")]
    Inspector(#[from] InspectorError),

    /// Asset store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Errors raised while reading the live scene graph
#[derive(Error, Debug)]
pub enum InspectorError {
    /// The inspector has no data for the requested node
    #[error("Node unavailable: {id}")]
    NodeUnavailable {
        /// Identifier of the node that could not be read
        id: String,
    },

    /// A query did not complete within its deadline
    #[error("Inspector query timed out after {millis}ms")]
    Timeout {
        /// Deadline that expired, in milliseconds
        millis: u64,
    },

    /// The inspection service could not be reached or answered garbage
    #[error("Inspector transport error: {0}")]
    Transport(String),
}

/// Asset store errors, carrying the collaborator's message
#[derive(Error, Debug)]
pub enum StorageError {
    /// Creating the asset failed
    #[error("Asset create failed for {path}: {message}")]
    CreateFailed {
        /// Asset path
        path: String,
        /// Message reported by the store
        message: String,
    },

    /// Writing asset content failed
    #[error("Asset write failed for {path}: {message}")]
    WriteFailed {
        /// Asset path
        path: String,
        /// Message reported by the store
        message: String,
    },

    /// Writing asset metadata failed
    #[error("Metadata write failed for {uuid}: {message}")]
    MetadataFailed {
        /// Canonical identifier of the asset
        uuid: String,
        /// Message reported by the store
        message: String,
    },

    /// Re-import was rejected
    #[error("Reimport failed for {path}: {message}")]
    ReimportFailed {
        /// Asset path
        path: String,
        /// Message reported by the store
        message: String,
    },

    /// No asset exists at the path or identifier
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Disk I/O operation failed
    #[error("Disk I/O failed: {0}")]
    DiskIo(#[from] std::io::Error),
}

/// Serialization/deserialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(SerializationError::Json(err))
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Inspector(InspectorError::Timeout { .. })
                | Error::Inspector(InspectorError::Transport(_))
                | Error::Storage(StorageError::DiskIo(_))
        )
    }

    /// Check if this is a client error (4xx equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::NotFound(_)
                | Error::Storage(StorageError::NotFound(_))
                | Error::Inspector(InspectorError::NodeUnavailable { .. })
        )
    }

    /// Check if this is a server error (5xx equivalent)
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}
