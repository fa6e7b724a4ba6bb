//! In-memory history and redo state for one tracked file
//!
//! The timeline mirrors the store's commit log and adds two things the store
//! does not know about: the effective HEAD (which commit the working file was
//! last restored to or saved from) and the roll stack of pending redos.
//!
//! ## Structure
//!
//! ```text
//! history:  c0 ── c1 ── c2 ── c3
//!                        ▲      ▲
//!                      head    tail
//! rolls:    [ {restored_from: c3}, ]
//! ```
//!
//! All methods are synchronous and free of I/O. Operations that touch the
//! working file are split into a `plan_*`/`peek_*` step and a `commit_*`
//! step so the caller can apply state changes only after its write succeeds.
//!
//! ## Examples
//!
//! ```rust
//! use timedfile::timeline::Timeline;
//! use timedfile::types::{CommitId, RollEntry};
//!
//! let mut timeline = Timeline::new();
//! timeline.record_save(CommitId::from_string("a"));
//! timeline.record_save(CommitId::from_string("b"));
//!
//! let plan = timeline.plan_rollback().unwrap();
//! assert_eq!(plan.target.as_str(), "a");
//! timeline.commit_rollback(
//!     RollEntry { restored_from: plan.current, working_content: vec![] },
//!     plan.target_index,
//! );
//! assert_eq!(timeline.roll_depth(), 1);
//! assert_eq!(timeline.head_commit().unwrap().as_str(), "a");
//! ```

use crate::types::{CommitId, RollEntry};
use tracing::{debug, trace};

/// What a rollback would do from the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackPlan {
    /// Effective HEAD before the rollback
    pub current: CommitId,
    /// Commit the working file will be restored to
    pub target: CommitId,
    /// History index of `target`
    pub target_index: usize,
}

/// History, effective HEAD and roll stack for one tracked file
///
/// # Thread Safety
///
/// Timeline is not thread-safe. The controller keeps it behind its
/// readiness mutex.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    /// Commit ids, oldest first
    history: Vec<CommitId>,
    /// Index of the effective HEAD in `history`
    head: Option<usize>,
    /// Pending redos, most recent last
    rolls: Vec<RollEntry>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline for a history loaded from the store, HEAD at the tail
    pub fn from_history(history: Vec<CommitId>) -> Self {
        let head = history.len().checked_sub(1);
        debug!("Timeline loaded with {} commits", history.len());
        Self {
            history,
            head,
            rolls: Vec::new(),
        }
    }

    /// Commit ids, oldest first
    pub fn history(&self) -> &[CommitId] {
        &self.history
    }

    /// Index of the effective HEAD
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    /// Commit the working file was last saved from or restored to
    pub fn head_commit(&self) -> Option<&CommitId> {
        self.head.and_then(|idx| self.history.get(idx))
    }

    /// Pending redos, oldest first
    pub fn rolls(&self) -> &[RollEntry] {
        &self.rolls
    }

    /// Number of pending redos
    pub fn roll_depth(&self) -> usize {
        self.rolls.len()
    }

    /// Check if nothing has been saved yet
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a freshly saved commit and move HEAD to it
    ///
    /// The roll stack is left alone.
    pub fn record_save(&mut self, id: CommitId) {
        trace!("Recording save of {}", id.short());
        self.history.push(id);
        self.head = Some(self.history.len() - 1);
    }

    /// Work out the rollback from the current HEAD, if there is an earlier commit
    pub fn plan_rollback(&self) -> Option<RollbackPlan> {
        let head = self.head?;
        let target_index = head.checked_sub(1)?;
        Some(RollbackPlan {
            current: self.history[head].clone(),
            target: self.history[target_index].clone(),
            target_index,
        })
    }

    /// Push a redo entry and move HEAD to the rolled-back commit
    pub fn commit_rollback(&mut self, entry: RollEntry, target_index: usize) {
        debug_assert!(target_index < self.history.len());
        self.rolls.push(entry);
        self.head = Some(target_index);
    }

    /// Most recent redo entry, without removing it
    pub fn peek_roll(&self) -> Option<&RollEntry> {
        self.rolls.last()
    }

    /// Pop the most recent redo entry and move HEAD to the commit it restores
    pub fn commit_fastforward(&mut self) -> Option<RollEntry> {
        let entry = self.rolls.pop()?;
        if let Some(idx) = self.history.iter().rposition(|id| *id == entry.restored_from) {
            self.head = Some(idx);
        }
        Some(entry)
    }
}
