use thiserror::Error;

/// Errors that can arise while reading or mutating stored sheet, campaign and user records.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around JSON serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes were not valid UTF-8.
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when creating a record whose key or name is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rejected input (bad level, unknown attribute, invalid name...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stored data could not be reconciled (e.g. a roster with no characters).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Password hashing or hash parsing failure
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// The acting user may not perform this operation.
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// A roster must keep at least one character.
    #[error("cannot delete the last remaining character")]
    LastCharacter,
}
