//! # TimedFile - Save, diff and undo for a single file
//!
//! A small versioning library that keeps the edit history of one file in a
//! content-addressed commit store and layers an undo/redo model on top.
//!
//! ## Overview
//!
//! TimedFile lets you:
//! - Save the current content of a file as an immutable, attributed commit
//! - See a word-level diff between the last commit and the file on disk
//! - Roll the file back to the previous commit, and fast forward again
//! - Reset the file to the last commit, discarding uncommitted edits
//!
//! ## Architecture
//!
//! - **Commit Store**: append-only commit log per file path on top of
//!   content-addressable, LZ4-framed objects ([`storage`])
//! - **Timeline**: the in-memory history, effective HEAD and roll stack ([`timeline`])
//! - **Diff Engine**: word-tokenized Myers alignment producing tagged hunks ([`diff`])
//! - **Controller**: [`TimedFile`], which loads history asynchronously on
//!   construction and makes every operation wait for that load
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use timedfile::{Author, TimedFile};
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = TimedFile::new(
//!     PathBuf::from("/home/ada/notes.txt"),
//!     PathBuf::from("/home/ada/.versions"),
//! )?;
//!
//! // Safe to call right away; the history load is awaited internally
//! let author = Author::new("Ada", "ada@example.com");
//! file.save(&author).await?;
//!
//! // ...edit notes.txt...
//! for hunk in file.diff().await? {
//!     println!("{:?}", hunk);
//! }
//!
//! // Undo and redo
//! file.rollback().await?;
//! file.fastforward().await?;
//!
//! // Throw away uncommitted edits
//! file.reset().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### History and HEAD
//!
//! Every `save` appends one commit, even if the content did not change.
//! HEAD is the commit the working file was last saved from or restored to;
//! `diff` compares against it and `reset` restores it.
//!
//! ### Roll Stack
//!
//! `rollback` moves HEAD one commit back and pushes a redo entry;
//! `fastforward` pops it. `reset` and `save` never touch the stack. The
//! stack lives only as long as the [`TimedFile`] handle.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, TimedFileError>`. A handle whose history
//! could not be loaded reports [`TimedFileError::Initialization`] from every
//! operation.
//!
//! ## Module Organization
//!
//! - [`timed_file`]: The controller and its builder
//! - [`storage`]: Snapshot store trait and on-disk commit store
//! - [`timeline`]: History, HEAD and roll stack
//! - [`diff`]: Word-level diff engine
//! - [`compression`]: Compression strategies and engine
//! - [`types`]: Common types and data structures
//! - [`error`]: Error types and handling

// Public API modules
pub mod compression;
pub mod diff;
pub mod error;
pub mod storage;
pub mod timed_file;
pub mod timeline;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use compression::{CompressionEngine, CompressionStrategy};
pub use error::{Result, TimedFileError};
pub use storage::{CommitStore, SnapshotStore};
pub use timed_file::{TimedFile, TimedFileBuilder};
pub use timeline::Timeline;
pub use types::*;
