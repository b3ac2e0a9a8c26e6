/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use unialert_storage::error::StorageError;
///
/// let err = StorageError::Crypto("invalid nonce".to_string());
/// assert!(err.to_string().contains("nonce"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// Reading or writing a local file (e.g. the secret key) failed.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored value is not a valid UTF-8 string.
    #[error("Storage: invalid UTF-8 in column '{column}': {source}")]
    InvalidUtf8 {
        column: &'static str,
        source: std::string::FromUtf8Error,
    },

    /// Secret encryption or decryption failed.
    #[error("Storage: crypto error: {0}")]
    Crypto(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
