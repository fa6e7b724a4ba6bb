//! Error types for the timedfile library
//!
//! Every public operation returns [`Result<T>`]. Failures from the commit
//! store or the working file are surfaced as-is and never retried; the
//! variants below tell the caller which part of the system failed.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the timedfile library
pub type Result<T> = std::result::Result<T, TimedFileError>;

/// Main error type for all timedfile operations
#[derive(Debug, Error)]
pub enum TimedFileError {
    /// I/O errors on the working file or the versions directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors during bincode serialization/deserialization
    #[error("Bincode error: {0}")]
    Bincode(String),

    /// The tracked working file does not exist
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    /// Commit record missing from the store
    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    /// Content object missing from the store
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Store layout exists but cannot be trusted
    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    /// History could not be loaded when the handle was created.
    ///
    /// Once a handle has reported this error every later operation on it
    /// reports it too.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Decompression errors
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Content that cannot be word-diffed
    #[error("Binary content cannot be diffed: {0:?}")]
    BinaryContent(PathBuf),

    /// Diff operation failed
    #[error("Diff failed: {0}")]
    DiffFailed(String),

    /// Author missing a name or email
    #[error("Invalid author: {0}")]
    InvalidAuthor(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A handle was created outside of a Tokio runtime
    #[error("No Tokio runtime available to load history")]
    NoRuntime,

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::error::DecodeError> for TimedFileError {
    fn from(err: bincode::error::DecodeError) -> Self {
        TimedFileError::Bincode(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for TimedFileError {
    fn from(err: bincode::error::EncodeError) -> Self {
        TimedFileError::Bincode(err.to_string())
    }
}

impl TimedFileError {
    /// Create a corrupt store error with a custom message
    pub fn corrupt(msg: impl Into<String>) -> Self {
        TimedFileError::CorruptStore(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        TimedFileError::Internal(msg.into())
    }

    /// Map an I/O error on the working file, turning `NotFound` into
    /// [`TimedFileError::FileNotFound`]
    pub fn from_working_file(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            TimedFileError::FileNotFound(path.to_path_buf())
        } else {
            TimedFileError::Io(err)
        }
    }

    /// Check if this error came from the readiness load
    pub fn is_initialization(&self) -> bool {
        matches!(self, TimedFileError::Initialization(_))
    }

    /// Check if this error is an I/O failure on the file or the store
    pub fn is_io(&self) -> bool {
        matches!(self, TimedFileError::Io(_) | TimedFileError::FileNotFound(_))
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            TimedFileError::FileNotFound(path) => {
                format!("Tracked file {:?} does not exist. Create it before saving.", path)
            }
            TimedFileError::Initialization(msg) => {
                format!(
                    "Could not load history ({}). Check the versions directory; this handle is unusable.",
                    msg
                )
            }
            TimedFileError::InvalidAuthor(_) => {
                "Both author name and email are required to save.".to_string()
            }
            TimedFileError::BinaryContent(path) => {
                format!("{:?} looks like a binary file; only text can be diffed.", path)
            }
            _ => self.to_string(),
        }
    }
}
