//! The TimedFile controller
//!
//! A [`TimedFile`] binds one working file to one versions directory and
//! exposes `save`, `diff`, `rollback`, `fastforward` and `reset` on top of a
//! [`SnapshotStore`].
//!
//! ## Readiness
//!
//! Construction spawns the history load on the current Tokio runtime and
//! returns immediately. Every operation first waits for that load, so a
//! `diff()` issued right after construction sees the same history as one
//! issued a second later. The load runs exactly once; if it fails, every
//! operation on the handle reports [`TimedFileError::Initialization`].
//!
//! The same lock serializes operations, so at most one is in flight per
//! handle.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use timedfile::{Author, TimedFile};
//! use std::path::PathBuf;
//!
//! # async fn example() -> timedfile::Result<()> {
//! let file = TimedFile::new(
//!     PathBuf::from("/data/notes.txt"),
//!     PathBuf::from("/data/.versions"),
//! )?;
//!
//! file.save(&Author::new("Ada", "ada@example.com")).await?;
//! for hunk in file.diff().await? {
//!     if hunk.is_added() {
//!         println!("+ {}", hunk.value());
//!     }
//! }
//!
//! file.rollback().await?;
//! assert_eq!(file.roll_depth().await?, 1);
//! file.fastforward().await?;
//! # Ok(())
//! # }
//! ```

use crate::compression::CompressionStrategy;
use crate::diff::diff_contents;
use crate::error::{Result, TimedFileError};
use crate::storage::{CommitStore, SnapshotStore};
use crate::timeline::Timeline;
use crate::types::{Author, Commit, CommitId, DiffOptions, Hunk, RollEntry, TimedFileConfig};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::runtime::Handle;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Where a handle is in its lifecycle
enum Phase {
    /// History is still being read from the store
    Loading(JoinHandle<Result<Vec<CommitId>>>),
    /// History is loaded and operations may proceed
    Ready(Timeline),
    /// The load failed; the handle is unusable
    Failed(String),
}

/// Versioned handle on a single file
///
/// History, HEAD and the roll stack belong to this handle alone. Two handles
/// on the same file and versions directory are not synchronised with each
/// other and should not be used at the same time.
pub struct TimedFile {
    config: TimedFileConfig,
    store: Arc<dyn SnapshotStore>,
    phase: Mutex<Phase>,
}

impl std::fmt::Debug for TimedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self.phase.try_lock() {
            Ok(guard) => match &*guard {
                Phase::Loading(_) => "loading",
                Phase::Ready(_) => "ready",
                Phase::Failed(_) => "failed",
            },
            Err(_) => "busy",
        };
        f.debug_struct("TimedFile")
            .field("file", &self.config.file_full_path)
            .field("versions", &self.config.versions_path)
            .field("phase", &phase)
            .finish()
    }
}

impl TimedFile {
    /// Track `file_full_path` with history kept in `versions_path`
    ///
    /// Both paths must be absolute. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// - [`TimedFileError::InvalidConfiguration`] for missing or relative paths
    /// - [`TimedFileError::NoRuntime`] outside a Tokio runtime
    pub fn new(file_full_path: PathBuf, versions_path: PathBuf) -> Result<Self> {
        TimedFileBuilder::new().build(file_full_path, versions_path)
    }

    /// Create a handle from a full configuration
    pub fn from_config(config: TimedFileConfig) -> Result<Self> {
        let strategy: CompressionStrategy = config.compression_strategy.parse()?;
        let store = Arc::new(CommitStore::new(
            config.file_full_path.clone(),
            config.versions_path.clone(),
            strategy,
        ));
        Self::with_store(config, store)
    }

    /// Create a handle over any [`SnapshotStore`] and start loading its history
    pub fn with_store(config: TimedFileConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| TimedFileError::NoRuntime)?;

        let loader = Arc::clone(&store);
        let load = runtime.spawn(async move { loader.list_snapshots().await });
        debug!("Started history load for {:?}", config.file_full_path);

        Ok(Self {
            config,
            store,
            phase: Mutex::new(Phase::Loading(load)),
        })
    }

    /// Tracked working file
    pub fn file_path(&self) -> &Path {
        &self.config.file_full_path
    }

    /// Versions directory
    pub fn versions_path(&self) -> &Path {
        &self.config.versions_path
    }

    /// Active configuration
    pub fn config(&self) -> &TimedFileConfig {
        &self.config
    }

    /// Wait for the history load and lock the timeline
    async fn ready(&self) -> Result<MappedMutexGuard<'_, Timeline>> {
        let mut phase = self.phase.lock().await;

        if let Phase::Loading(load) = &mut *phase {
            let loaded = match load.await {
                Ok(result) => result,
                Err(e) => Err(TimedFileError::Initialization(format!(
                    "history load aborted: {}",
                    e
                ))),
            };
            *phase = match loaded {
                Ok(history) => Phase::Ready(Timeline::from_history(history)),
                Err(e) => {
                    warn!("Failed to load history for {:?}: {}", self.config.file_full_path, e);
                    Phase::Failed(e.to_string())
                }
            };
        }

        MutexGuard::try_map(phase, |phase| match phase {
            Phase::Ready(timeline) => Some(timeline),
            _ => None,
        })
        .map_err(|phase| match &*phase {
            Phase::Failed(reason) => TimedFileError::Initialization(reason.clone()),
            _ => TimedFileError::internal("history load did not settle"),
        })
    }

    async fn read_working_file(&self) -> Result<Vec<u8>> {
        fs::read(&self.config.file_full_path)
            .await
            .map_err(|e| TimedFileError::from_working_file(e, &self.config.file_full_path))
    }

    /// Snapshot the working file as a new commit
    ///
    /// Always appends, even if nothing changed since the last save. HEAD
    /// moves to the new commit; pending redos are kept.
    #[instrument(skip(self), fields(file = ?self.config.file_full_path))]
    pub async fn save(&self, author: &Author) -> Result<CommitId> {
        let mut timeline = self.ready().await?;
        let id = self.store.create_snapshot(author).await?;
        timeline.record_save(id.clone());

        info!(
            "Saved {} ({} commits)",
            id.short(),
            timeline.history().len()
        );
        Ok(id)
    }

    /// Word-level diff from the HEAD commit to the working file
    ///
    /// With no commits the baseline is empty, so everything shows as added.
    /// Content that is not valid UTF-8 is rejected as binary.
    #[instrument(skip(self), fields(file = ?self.config.file_full_path))]
    pub async fn diff(&self) -> Result<Vec<Hunk>> {
        let timeline = self.ready().await?;

        let baseline = match timeline.head_commit() {
            Some(head) => self.store.read_snapshot_content(head).await?,
            None => Vec::new(),
        };
        let current = self.read_working_file().await?;

        let hunks = diff_contents(
            &self.config.file_full_path,
            &baseline,
            &current,
            &self.config.diff_options,
        )?;
        debug!("Diff produced {} hunks", hunks.len());
        Ok(hunks)
    }

    /// Restore the commit before HEAD, remembering how to redo it
    ///
    /// Does nothing when HEAD is the first commit or nothing has been saved.
    #[instrument(skip(self), fields(file = ?self.config.file_full_path))]
    pub async fn rollback(&self) -> Result<()> {
        let mut timeline = self.ready().await?;

        let Some(plan) = timeline.plan_rollback() else {
            debug!("No earlier commit to roll back to");
            return Ok(());
        };

        let working_content = match fs::read(&self.config.file_full_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        self.store.checkout_snapshot(&plan.target).await?;
        timeline.commit_rollback(
            RollEntry {
                restored_from: plan.current.clone(),
                working_content,
            },
            plan.target_index,
        );

        info!(
            "Rolled back {} -> {} ({} pending)",
            plan.current.short(),
            plan.target.short(),
            timeline.roll_depth()
        );
        Ok(())
    }

    /// Undo the most recent rollback
    ///
    /// Restores the commit that was HEAD before that rollback. Uncommitted
    /// edits the rollback replaced are not written back; they stay readable
    /// as [`RollEntry::working_content`] through [`TimedFile::rolls`] until
    /// this call pops the entry. Does nothing when there is no rollback to
    /// undo.
    #[instrument(skip(self), fields(file = ?self.config.file_full_path))]
    pub async fn fastforward(&self) -> Result<()> {
        let mut timeline = self.ready().await?;

        let Some(target) = timeline.peek_roll().map(|entry| entry.restored_from.clone()) else {
            debug!("Nothing to fast forward");
            return Ok(());
        };

        self.store.checkout_snapshot(&target).await?;
        timeline.commit_fastforward();

        info!(
            "Fast forwarded to {} ({} pending)",
            target.short(),
            timeline.roll_depth()
        );
        Ok(())
    }

    /// Discard uncommitted edits by restoring the HEAD commit
    ///
    /// History and the roll stack are left untouched.
    #[instrument(skip(self), fields(file = ?self.config.file_full_path))]
    pub async fn reset(&self) -> Result<()> {
        let timeline = self.ready().await?;

        let Some(head) = timeline.head_commit() else {
            debug!("Nothing saved yet, reset is a no-op");
            return Ok(());
        };

        self.store.checkout_snapshot(head).await?;
        info!("Reset working file to {}", head.short());
        Ok(())
    }

    /// Pending redos, oldest first
    pub async fn rolls(&self) -> Result<Vec<RollEntry>> {
        Ok(self.ready().await?.rolls().to_vec())
    }

    /// Number of pending redos
    pub async fn roll_depth(&self) -> Result<usize> {
        Ok(self.ready().await?.roll_depth())
    }

    /// Commit ids, oldest first
    pub async fn history(&self) -> Result<Vec<CommitId>> {
        Ok(self.ready().await?.history().to_vec())
    }

    /// The commit the working file was last saved from or restored to
    pub async fn head(&self) -> Result<Option<CommitId>> {
        Ok(self.ready().await?.head_commit().cloned())
    }

    /// Full commit records, oldest first
    pub async fn log(&self) -> Result<Vec<Commit>> {
        let timeline = self.ready().await?;
        let mut commits = Vec::with_capacity(timeline.history().len());
        for id in timeline.history() {
            commits.push(self.store.load_commit(id).await?);
        }
        Ok(commits)
    }
}

/// Builder for configuring a [`TimedFile`]
///
/// # Default Values
///
/// - `compression_strategy`: `CompressionStrategy::Fast`
/// - `ignore_whitespace`: false
/// - `max_diff_size`: 10 MiB
/// - `store`: a [`CommitStore`] in the versions directory
pub struct TimedFileBuilder {
    compression_strategy: CompressionStrategy,
    diff_options: DiffOptions,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl std::fmt::Debug for TimedFileBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedFileBuilder")
            .field("compression_strategy", &self.compression_strategy)
            .field("diff_options", &self.diff_options)
            .field("custom_store", &self.store.is_some())
            .finish()
    }
}

impl TimedFileBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            compression_strategy: CompressionStrategy::default(),
            diff_options: DiffOptions::default(),
            store: None,
        }
    }

    /// Set compression strategy for stored contents
    ///
    /// ```rust
    /// use timedfile::{CompressionStrategy, TimedFileBuilder};
    ///
    /// let builder = TimedFileBuilder::new()
    ///     .compression_strategy(CompressionStrategy::Adaptive { min_size: 1024 });
    /// ```
    pub fn compression_strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.compression_strategy = strategy;
        self
    }

    /// Treat any two runs of whitespace as equal when diffing
    pub fn ignore_whitespace(mut self, ignore: bool) -> Self {
        self.diff_options.ignore_whitespace = ignore;
        self
    }

    /// Refuse to diff contents larger than `size` bytes
    pub fn max_diff_size(mut self, size: u64) -> Self {
        self.diff_options.max_file_size = size;
        self
    }

    /// Use a custom snapshot store instead of the on-disk one
    pub fn store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the handle and start loading history
    ///
    /// # Errors
    ///
    /// - [`TimedFileError::InvalidConfiguration`] for missing or relative paths
    /// - [`TimedFileError::NoRuntime`] outside a Tokio runtime
    pub fn build(self, file_full_path: PathBuf, versions_path: PathBuf) -> Result<TimedFile> {
        let config = TimedFileConfig {
            file_full_path,
            versions_path,
            compression_strategy: self.compression_strategy.name().to_string(),
            diff_options: self.diff_options,
        };

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(CommitStore::new(
                config.file_full_path.clone(),
                config.versions_path.clone(),
                self.compression_strategy,
            )),
        };

        TimedFile::with_store(config, store)
    }
}

impl Default for TimedFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
