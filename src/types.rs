//! Core data types used throughout the timedfile library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **History**: `CommitId`, `Commit`, `Author` - immutable snapshots of the tracked file
//! - **Undo state**: `RollEntry` - what a rollback replaced, so it can be redone
//! - **Diff output**: `Hunk`, `DiffSummary`, `DiffOptions`
//! - **Configuration**: `TimedFileConfig`, `StoreMetadata`
//!
//! ## Examples
//!
//! ```rust
//! use timedfile::types::{Author, Hunk};
//!
//! let author = Author::new("Ada", "ada@example.com");
//! assert!(author.validate().is_ok());
//!
//! let hunk = Hunk::added("Line 3\n", 4);
//! assert!(hunk.is_added());
//! assert_eq!(hunk.count(), 4);
//! ```

use crate::error::{Result, TimedFileError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identity attached to every commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

impl Author {
    /// Create a new author
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Reject authors with an empty name or email
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TimedFileError::InvalidAuthor("name is empty".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(TimedFileError::InvalidAuthor("email is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Opaque reference to a commit in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitId(pub String);

impl CommitId {
    /// Wrap an id read back from the store
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for logs and the CLI
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable, attributed snapshot of the tracked file
///
/// Commits are created only by `save` and never mutated afterwards. The
/// content itself lives in the object store under `content_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Unique identifier for this commit
    pub id: CommitId,
    /// Previous commit for the same file (None for the first one)
    pub parent: Option<CommitId>,
    /// Who saved it
    pub author: Author,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// SHA-256 of the saved content
    pub content_hash: String,
    /// Size of the saved content in bytes
    pub size: u64,
    /// Index in the file's history (append order)
    pub position: usize,
    /// Path of the tracked file at save time
    pub path: PathBuf,
}

/// One pending redo, recorded by `rollback` and consumed by `fastforward`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollEntry {
    /// Commit that was the effective HEAD before the rollback
    pub restored_from: CommitId,
    /// Working file content that the rollback overwrote
    pub working_content: Vec<u8>,
}

/// One contiguous run of tokens produced by the diff engine
///
/// Adjacent tokens with the same classification are always coalesced, so
/// two neighbouring hunks never share a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Hunk {
    /// Tokens present in both the baseline and the working file
    Unchanged {
        /// Concatenated token text
        value: String,
        /// Number of tokens
        count: usize,
    },
    /// Tokens only present in the working file
    Added {
        /// Concatenated token text
        value: String,
        /// Number of tokens
        count: usize,
    },
    /// Tokens only present in the baseline
    Removed {
        /// Concatenated token text
        value: String,
        /// Number of tokens
        count: usize,
    },
}

impl Hunk {
    /// Build an unchanged hunk
    pub fn unchanged(value: impl Into<String>, count: usize) -> Self {
        Hunk::Unchanged { value: value.into(), count }
    }

    /// Build an added hunk
    pub fn added(value: impl Into<String>, count: usize) -> Self {
        Hunk::Added { value: value.into(), count }
    }

    /// Build a removed hunk
    pub fn removed(value: impl Into<String>, count: usize) -> Self {
        Hunk::Removed { value: value.into(), count }
    }

    /// Concatenated token text
    pub fn value(&self) -> &str {
        match self {
            Hunk::Unchanged { value, .. } | Hunk::Added { value, .. } | Hunk::Removed { value, .. } => value,
        }
    }

    /// Number of tokens in this hunk
    pub fn count(&self) -> usize {
        match self {
            Hunk::Unchanged { count, .. } | Hunk::Added { count, .. } | Hunk::Removed { count, .. } => *count,
        }
    }

    /// Whether the tokens exist only in the working file
    pub fn is_added(&self) -> bool {
        matches!(self, Hunk::Added { .. })
    }

    /// Whether the tokens exist only in the baseline
    pub fn is_removed(&self) -> bool {
        matches!(self, Hunk::Removed { .. })
    }

    /// Whether the tokens exist on both sides
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Hunk::Unchanged { .. })
    }
}

/// Token counts over a hunk sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Tokens only in the working file
    pub tokens_added: usize,
    /// Tokens only in the baseline
    pub tokens_removed: usize,
    /// Tokens on both sides
    pub tokens_unchanged: usize,
}

impl DiffSummary {
    /// Tally a hunk sequence
    pub fn from_hunks(hunks: &[Hunk]) -> Self {
        hunks.iter().fold(Self::default(), |mut acc, hunk| {
            match hunk {
                Hunk::Unchanged { count, .. } => acc.tokens_unchanged += count,
                Hunk::Added { count, .. } => acc.tokens_added += count,
                Hunk::Removed { count, .. } => acc.tokens_removed += count,
            }
            acc
        })
    }

    /// Check if the working file differs from the baseline
    pub fn has_changes(&self) -> bool {
        self.tokens_added > 0 || self.tokens_removed > 0
    }
}

/// Options for diff generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Treat any two whitespace tokens as equal
    pub ignore_whitespace: bool,
    /// Maximum size of either side in bytes
    pub max_file_size: u64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_whitespace: false,
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// Configuration for a `TimedFile` handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedFileConfig {
    /// Absolute path of the tracked working file
    pub file_full_path: PathBuf,
    /// Absolute path of the directory holding the commit store
    pub versions_path: PathBuf,
    /// Compression strategy name ("none", "fast" or "adaptive")
    pub compression_strategy: String,
    /// Options used by `diff`
    pub diff_options: DiffOptions,
}

impl TimedFileConfig {
    /// Check that both paths are present and absolute
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("file_full_path", &self.file_full_path),
            ("versions_path", &self.versions_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(TimedFileError::InvalidConfiguration(format!("{} is required", name)));
            }
            if !path.is_absolute() {
                return Err(TimedFileError::InvalidConfiguration(format!(
                    "{} must be absolute, got {:?}",
                    name, path
                )));
            }
        }
        Ok(())
    }
}

/// Metadata persisted at the root of a versions directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// On-disk layout version
    pub format_version: u32,
    /// Version of the crate that created the store
    pub timedfile_version: String,
    /// When the store was created
    pub created_at: DateTime<Utc>,
    /// Last time a commit was written
    pub last_written: DateTime<Utc>,
}
