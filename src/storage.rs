//! Commit storage for a single tracked file
//!
//! The controller never touches the versions directory directly; it talks to
//! a [`SnapshotStore`]. [`CommitStore`] is the on-disk implementation: an
//! append-only commit log per tracked path on top of a content-addressable
//! object store.
//!
//! ## Architecture
//!
//! ```text
//! versions_path/
//! ├── metadata.json          # Store metadata (format version, timestamps)
//! ├── objects/               # Content-addressable blobs (sharded)
//! │   └── <prefix>/          # First 2 chars of hash
//! │       └── <suffix>       # Remaining hash chars, LZ4-framed
//! ├── commits/
//! │   └── <commit_id>.bin    # Commit record (bincode)
//! └── logs/
//!     └── <path_key>.log     # Commit ids for one file, oldest first
//! ```
//!
//! Nothing under `objects/`, `commits/` or an existing log line is ever
//! rewritten. Saving identical content twice stores one object but appends
//! two commits.
//!
//! ## Thread Safety
//!
//! A single `CommitStore` may be shared between tasks. Two stores pointed at
//! the same file and versions directory are not synchronised with each other.

use crate::compression::{CompressionEngine, CompressionStrategy};
use crate::error::{Result, TimedFileError};
use crate::types::{Author, Commit, CommitId, StoreMetadata};
use crate::utils::{atomic_write, hash_data};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace, warn};

/// On-disk layout version written to `metadata.json`
pub const FORMAT_VERSION: u32 = 1;

/// Commit-oriented backing store for one tracked file
///
/// Implementations own durability and content addressing. Ids returned by
/// [`SnapshotStore::list_snapshots`] are ordered oldest first.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Snapshot the working file's current content, attributed to `author`
    async fn create_snapshot(&self, author: &Author) -> Result<CommitId>;

    /// All commits for the tracked file, oldest first
    async fn list_snapshots(&self) -> Result<Vec<CommitId>>;

    /// Content saved by a commit
    async fn read_snapshot_content(&self, id: &CommitId) -> Result<Vec<u8>>;

    /// Commit record for an id
    async fn load_commit(&self, id: &CommitId) -> Result<Commit>;

    /// Overwrite the working file with a commit's content
    async fn checkout_snapshot(&self, id: &CommitId) -> Result<()>;
}

/// File-backed [`SnapshotStore`]
pub struct CommitStore {
    /// Root directory for storage
    root: PathBuf,
    /// Working file tracked by this store
    file_path: PathBuf,
    /// Log file name derived from `file_path`
    log_key: String,
    /// Compression engine for stored contents
    compression: Arc<Mutex<CompressionEngine>>,
    /// Commit records already read or written
    commit_cache: Arc<DashMap<CommitId, Commit>>,
    /// Validated store metadata, once known
    metadata: Arc<RwLock<Option<StoreMetadata>>>,
}

impl std::fmt::Debug for CommitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitStore")
            .field("root", &self.root)
            .field("file_path", &self.file_path)
            .field("log_key", &self.log_key)
            .field("cached_commits", &self.commit_cache.len())
            .finish()
    }
}

impl CommitStore {
    /// Bind a store to a working file and a versions directory
    ///
    /// No I/O happens here: the directory layout is created by the first
    /// [`SnapshotStore::create_snapshot`], and an existing layout is
    /// validated by the first read.
    pub fn new(file_path: PathBuf, root: PathBuf, strategy: CompressionStrategy) -> Self {
        let log_key = hash_data(file_path.to_string_lossy().as_bytes());
        Self {
            root,
            file_path,
            log_key,
            compression: Arc::new(Mutex::new(CompressionEngine::new(strategy))),
            commit_cache: Arc::new(DashMap::new()),
            metadata: Arc::new(RwLock::new(None)),
        }
    }

    /// Root of the versions directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working file tracked by this store
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join("metadata.json")
    }

    fn log_path(&self) -> PathBuf {
        self.root.join("logs").join(format!("{}.log", self.log_key))
    }

    fn commit_path(&self, id: &CommitId) -> PathBuf {
        self.root.join("commits").join(format!("{}.bin", id.as_str()))
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        let (prefix, suffix) = hash.split_at(2.min(hash.len()));
        self.root.join("objects").join(prefix).join(suffix)
    }

    /// Read and validate `metadata.json` if present
    ///
    /// Returns `Ok(false)` when the store has never been written to.
    async fn verify_metadata(&self) -> Result<bool> {
        if self.metadata.read().is_some() {
            return Ok(true);
        }

        let json = match fs::read_to_string(self.metadata_path()).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let metadata: StoreMetadata = serde_json::from_str(&json)
            .map_err(|e| TimedFileError::corrupt(format!("metadata.json: {}", e)))?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(TimedFileError::corrupt(format!(
                "unsupported format version {} (expected {})",
                metadata.format_version, FORMAT_VERSION
            )));
        }

        debug!(
            "Opened store at {:?} (created by timedfile {})",
            self.root, metadata.timedfile_version
        );
        *self.metadata.write() = Some(metadata);
        Ok(true)
    }

    /// Create the directory layout and metadata on first write
    async fn ensure_layout(&self) -> Result<()> {
        if self.verify_metadata().await? {
            return Ok(());
        }

        fs::create_dir_all(self.root.join("objects")).await?;
        fs::create_dir_all(self.root.join("commits")).await?;
        fs::create_dir_all(self.root.join("logs")).await?;

        let metadata = StoreMetadata {
            format_version: FORMAT_VERSION,
            timedfile_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            last_written: Utc::now(),
        };
        atomic_write(&self.metadata_path(), serde_json::to_string_pretty(&metadata)?.as_bytes()).await?;
        *self.metadata.write() = Some(metadata);

        info!("Initialized versions store at {:?}", self.root);
        Ok(())
    }

    async fn touch_metadata(&self) -> Result<()> {
        let metadata = {
            let mut guard = self.metadata.write();
            match guard.as_mut() {
                Some(metadata) => {
                    metadata.last_written = Utc::now();
                    metadata.clone()
                }
                None => return Ok(()),
            }
        };
        atomic_write(&self.metadata_path(), serde_json::to_string_pretty(&metadata)?.as_bytes()).await
    }

    /// Store content under its hash, skipping the write if it already exists
    async fn store_object(&self, content: &[u8]) -> Result<String> {
        let hash = hash_data(content);
        let object_path = self.object_path(&hash);

        if fs::try_exists(&object_path).await? {
            trace!("Object {} already exists", &hash[..8]);
            return Ok(hash);
        }

        let framed = self.compression.lock().compress(content);
        atomic_write(&object_path, &framed).await?;

        trace!("Stored object {} ({} bytes on disk)", &hash[..8], framed.len());
        Ok(hash)
    }

    /// Load content by hash, checking it still matches
    async fn load_object(&self, hash: &str) -> Result<Vec<u8>> {
        let framed = match fs::read(self.object_path(hash)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TimedFileError::ObjectNotFound(hash.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let content = self.compression.lock().decompress(&framed)?;
        let actual = hash_data(&content);
        if actual != hash {
            return Err(TimedFileError::corrupt(format!(
                "object {} hashes to {}",
                hash, actual
            )));
        }
        Ok(content)
    }

    async fn append_to_log(&self, id: &CommitId) -> Result<()> {
        let mut log = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        log.write_all(format!("{}\n", id.as_str()).as_bytes()).await?;
        log.sync_data().await?;
        Ok(())
    }
}

/// Commit id: SHA-256 over everything that identifies the commit
fn compute_commit_id(
    parent: Option<&CommitId>,
    author: &Author,
    timestamp: &chrono::DateTime<Utc>,
    content_hash: &str,
    path: &Path,
) -> CommitId {
    let material = format!(
        "parent {}\nauthor {}\ntime {}\ncontent {}\npath {}\n",
        parent.map(CommitId::as_str).unwrap_or("-"),
        author,
        timestamp.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        content_hash,
        path.to_string_lossy()
    );
    CommitId(hash_data(material.as_bytes()))
}

fn is_commit_id(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[async_trait]
impl SnapshotStore for CommitStore {
    async fn create_snapshot(&self, author: &Author) -> Result<CommitId> {
        author.validate()?;

        let content = fs::read(&self.file_path)
            .await
            .map_err(|e| TimedFileError::from_working_file(e, &self.file_path))?;

        self.ensure_layout().await?;

        let history = self.list_snapshots().await?;
        let parent = history.last().cloned();
        let content_hash = self.store_object(&content).await?;
        let timestamp = Utc::now();
        let id = compute_commit_id(parent.as_ref(), author, &timestamp, &content_hash, &self.file_path);

        let commit = Commit {
            id: id.clone(),
            parent,
            author: author.clone(),
            timestamp,
            content_hash,
            size: content.len() as u64,
            position: history.len(),
            path: self.file_path.clone(),
        };

        let record = bincode::serde::encode_to_vec(&commit, bincode::config::standard())?;
        atomic_write(&self.commit_path(&id), &record).await?;
        self.append_to_log(&id).await?;
        self.commit_cache.insert(id.clone(), commit);

        if let Err(e) = self.touch_metadata().await {
            warn!("Failed to update store metadata: {}", e);
        }

        debug!("Created commit {} at position {}", id.short(), history.len());
        Ok(id)
    }

    async fn list_snapshots(&self) -> Result<Vec<CommitId>> {
        if !self.verify_metadata().await? {
            trace!("No store at {:?} yet, history is empty", self.root);
            return Ok(vec![]);
        }

        let log = match fs::read_to_string(self.log_path()).await {
            Ok(log) => log,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        log.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if is_commit_id(line) {
                    Ok(CommitId::from_string(line))
                } else {
                    Err(TimedFileError::corrupt(format!("bad log entry '{}'", line)))
                }
            })
            .collect()
    }

    async fn read_snapshot_content(&self, id: &CommitId) -> Result<Vec<u8>> {
        let commit = self.load_commit(id).await?;
        self.load_object(&commit.content_hash).await
    }

    async fn load_commit(&self, id: &CommitId) -> Result<Commit> {
        if let Some(commit) = self.commit_cache.get(id) {
            return Ok(commit.clone());
        }

        let record = match fs::read(self.commit_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TimedFileError::CommitNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let (commit, _): (Commit, _) =
            bincode::serde::decode_from_slice(&record, bincode::config::standard())?;
        if &commit.id != id {
            return Err(TimedFileError::corrupt(format!(
                "commit file {} holds commit {}",
                id, commit.id
            )));
        }

        self.commit_cache.insert(id.clone(), commit.clone());
        Ok(commit)
    }

    async fn checkout_snapshot(&self, id: &CommitId) -> Result<()> {
        let content = self.read_snapshot_content(id).await?;
        atomic_write(&self.file_path, &content).await?;
        debug!("Checked out {} ({} bytes) to {:?}", id.short(), content.len(), self.file_path);
        Ok(())
    }
}
