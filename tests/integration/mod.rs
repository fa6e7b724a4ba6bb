//! Integration tests for TimedFile
//!
//! Walks a tracked file through the save/diff/rollback/fastforward/reset
//! scenarios and checks the working copy and roll stack after each step.

use ::timedfile::*;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;
use tracing::info;

/// Test harness owning a temp directory, a tracked file and its handle
pub struct TimedFileHarness {
    pub temp_dir: TempDir,
    pub file: PathBuf,
    pub versions: PathBuf,
    pub timed: TimedFile,
}

impl TimedFileHarness {
    /// Create a harness with an empty tracked file
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file_to_version.txt");
        let versions = temp_dir.path().join(".versions");
        fs::write(&file, "").await.unwrap();

        let timed = TimedFile::new(file.clone(), versions.clone()).unwrap();
        Self {
            temp_dir,
            file,
            versions,
            timed,
        }
    }

    /// Open another handle on the same file and versions directory
    pub fn reopen(&self) -> TimedFile {
        TimedFile::new(self.file.clone(), self.versions.clone()).unwrap()
    }

    pub fn author() -> Author {
        Author::new("Test Author", "author@example.com")
    }

    pub async fn append(&self, text: &str) {
        let mut content = self.content().await;
        content.push_str(text);
        fs::write(&self.file, content).await.unwrap();
    }

    pub async fn content(&self) -> String {
        fs::read_to_string(&self.file).await.unwrap()
    }

    pub async fn save(&self) -> CommitId {
        self.timed.save(&Self::author()).await.unwrap()
    }

    pub async fn rolls(&self) -> usize {
        self.timed.roll_depth().await.unwrap()
    }
}

/// Two saves, an uncommitted append, then the undo/redo cycle
#[tokio::test]
async fn test_full_scenario() {
    let harness = TimedFileHarness::new().await;

    // Save and diff with one line
    harness.append("Line 1\n").await;
    harness.save().await;
    assert_eq!(
        harness.timed.diff().await.unwrap(),
        vec![Hunk::unchanged("Line 1\n", 4)]
    );

    // Save and diff with two lines
    harness.append("Line 2\n").await;
    harness.save().await;
    assert_eq!(
        harness.timed.diff().await.unwrap(),
        vec![Hunk::unchanged("Line 1\nLine 2\n", 8)]
    );

    // Uncommitted append shows as added
    harness.append("Line 3\n").await;
    assert_eq!(
        harness.timed.diff().await.unwrap(),
        vec![
            Hunk::unchanged("Line 1\nLine 2\n", 8),
            Hunk::added("Line 3\n", 4),
        ]
    );

    // Reset discards it
    harness.timed.reset().await.unwrap();
    assert_eq!(harness.content().await, "Line 1\nLine 2\n");
    assert_eq!(harness.rolls().await, 0);

    // Roll back to the first save
    harness.timed.rollback().await.unwrap();
    assert_eq!(harness.content().await, "Line 1\n");
    assert_eq!(harness.rolls().await, 1);

    // And forward again
    harness.timed.fastforward().await.unwrap();
    assert_eq!(harness.content().await, "Line 1\nLine 2\n");
    assert_eq!(harness.rolls().await, 0);

    // Nothing left to fast forward
    harness.timed.fastforward().await.unwrap();
    assert_eq!(harness.content().await, "Line 1\nLine 2\n");
    assert_eq!(harness.rolls().await, 0);

    info!("History: {:?}", harness.timed.history().await.unwrap());
}

#[tokio::test]
async fn test_reset_without_rolling_back() {
    let harness = TimedFileHarness::new().await;

    harness.append("Line 1\n").await;
    harness.save().await;
    harness.append("Line 2\n").await;
    harness.save().await;

    harness.timed.rollback().await.unwrap();
    assert_eq!(harness.rolls().await, 1);

    harness.timed.reset().await.unwrap();
    assert_eq!(harness.content().await, "Line 1\n");
    assert_eq!(harness.rolls().await, 1);
}

#[tokio::test]
async fn test_reset_with_pending_rolls_discards_edits() {
    let harness = TimedFileHarness::new().await;

    for line in ["a\n", "b\n", "c\n"] {
        harness.append(line).await;
        harness.save().await;
    }

    harness.timed.rollback().await.unwrap();
    harness.append("scratch\n").await;
    assert!(harness
        .timed
        .diff()
        .await
        .unwrap()
        .iter()
        .any(Hunk::is_added));

    harness.timed.reset().await.unwrap();
    assert_eq!(harness.content().await, "a\nb\n");
    assert_eq!(harness.rolls().await, 1);

    harness.timed.fastforward().await.unwrap();
    assert_eq!(harness.content().await, "a\nb\nc\n");
}

#[tokio::test]
async fn test_diff_after_rollback_uses_restored_commit() {
    let harness = TimedFileHarness::new().await;

    harness.append("Line 1\n").await;
    harness.save().await;
    harness.append("Line 2\n").await;
    harness.save().await;
    harness.timed.rollback().await.unwrap();

    assert_eq!(
        harness.timed.diff().await.unwrap(),
        vec![Hunk::unchanged("Line 1\n", 4)]
    );
}

#[tokio::test]
async fn test_save_with_unchanged_content_still_appends() {
    let harness = TimedFileHarness::new().await;
    harness.append("same\n").await;

    let first = harness.save().await;
    let second = harness.save().await;

    assert_ne!(first, second);
    assert_eq!(harness.timed.history().await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let harness = TimedFileHarness::new().await;
    harness.append("Line 1\n").await;
    let first = harness.save().await;
    harness.append("Line 2\n").await;
    let second = harness.save().await;
    harness.append("Line 3\n").await;

    let reopened = harness.reopen();
    assert_eq!(reopened.history().await.unwrap(), vec![first, second]);
    assert_eq!(reopened.roll_depth().await.unwrap(), 0);
    assert_eq!(
        reopened.diff().await.unwrap(),
        vec![
            Hunk::unchanged("Line 1\nLine 2\n", 8),
            Hunk::added("Line 3\n", 4),
        ]
    );
}

/// A diff issued right after construction matches one issued later
#[tokio::test]
async fn test_diff_is_independent_of_readiness_timing() {
    let harness = TimedFileHarness::new().await;
    harness.append("Line 1\n").await;
    harness.save().await;
    harness.append("Line 2\n").await;

    let eager = harness.reopen().diff().await.unwrap();

    let patient = harness.reopen();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let delayed = patient.diff().await.unwrap();

    assert_eq!(eager, delayed);
    assert_eq!(
        eager,
        vec![Hunk::unchanged("Line 1\n", 4), Hunk::added("Line 2\n", 4)]
    );
}

#[tokio::test]
async fn test_corrupt_store_fails_initialization() {
    let harness = TimedFileHarness::new().await;
    fs::create_dir_all(&harness.versions).await.unwrap();
    fs::write(harness.versions.join("metadata.json"), "{ not json")
        .await
        .unwrap();

    let timed = harness.reopen();
    let err = timed.diff().await.unwrap_err();
    assert!(err.is_initialization());
    assert!(timed.rollback().await.unwrap_err().is_initialization());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_deep_rollback_chain() {
        let harness = TimedFileHarness::new().await;

        let mut snapshots = Vec::new();
        for i in 0..10 {
            harness.append(&format!("Line {}\n", i)).await;
            harness.save().await;
            snapshots.push(harness.content().await);
        }

        // Walk all the way back
        for depth in 1..10 {
            harness.timed.rollback().await.unwrap();
            assert_eq!(harness.content().await, snapshots[9 - depth]);
            assert_eq!(harness.rolls().await, depth);
        }

        // At the first commit further rollbacks do nothing
        harness.timed.rollback().await.unwrap();
        assert_eq!(harness.rolls().await, 9);
        assert_eq!(harness.content().await, snapshots[0]);

        // And all the way forward
        for depth in (0..9).rev() {
            harness.timed.fastforward().await.unwrap();
            assert_eq!(harness.content().await, snapshots[9 - depth]);
            assert_eq!(harness.rolls().await, depth);
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_log_reports_authors_in_order() {
        let harness = TimedFileHarness::new().await;

        harness.append("one\n").await;
        harness.timed.save(&Author::new("First", "first@example.com")).await.unwrap();
        harness.append("two\n").await;
        harness.timed.save(&Author::new("Second", "second@example.com")).await.unwrap();

        let log = harness.timed.log().await.unwrap();
        let names: Vec<_> = log.iter().map(|c| c.author.name.as_str()).collect();
        assert_eq!(names, ["First", "Second"]);
        assert_eq!(log[1].size, 8);
        assert!(log[0].timestamp <= log[1].timestamp);
    }
}
