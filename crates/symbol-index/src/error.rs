use thiserror::Error;

/// Result type for symbol index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised while assembling a symbol index.
///
/// Lookup misses (unknown ids, unmatched references) are not errors; they are
/// logged and skipped. Only malformed inputs surface here.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A raw index document could not be decoded
    #[error("Malformed index document: {0}")]
    MalformedDocument(String),

    /// A file URI could not be converted to or from a filesystem path
    #[error("Invalid file URI: {0}")]
    InvalidUri(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    /// Create a malformed document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create an invalid URI error
    pub fn invalid_uri(uri: impl Into<String>) -> Self {
        Self::InvalidUri(uri.into())
    }
}
