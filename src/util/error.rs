//! Error types for the exporter.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Output or input path cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Scene source document is malformed
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// A key or identifier does not name an object in the graph
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Another export run holds the process-wide export flag
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Technique payload carries indices that do not fit its own arrays
    #[error("Invalid extension payload: {0}")]
    InvalidExtension(String),

    /// Hard shader/technique backend failure for one material
    #[error("Technique compilation failed for '{asset}': {reason}")]
    Compilation { asset: String, reason: String },

    /// Same serialized type name bound to two different constructors
    #[error("Type '{type_name}' registered as {existing} and {incoming}")]
    DuplicateType {
        type_name: String,
        existing: String,
        incoming: String,
    },

    /// Type register manifests were already emitted for this run
    #[error("Type register manifests are finalized")]
    ManifestFinalized,

    /// Serialized type has no constructor in any manifest
    #[error("Unknown type '{type_name}' for object {object}")]
    UnknownType { type_name: String, object: String },

    /// Compact sync record is truncated or malformed
    #[error("Invalid sync record: {0}")]
    InvalidRecord(String),

    /// Settings file could not be parsed
    #[error("Invalid settings: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid scene error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidScene(msg.into())
    }

    /// Create an invalid record error.
    pub fn record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::ExportInProgress;
        assert!(e.to_string().contains("in progress"));

        let e = Error::UnknownType {
            type_name: "Rotator".into(),
            object: "abc".into(),
        };
        assert!(e.to_string().contains("Rotator"));
        assert!(e.to_string().contains("abc"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let err: Error = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }
}
