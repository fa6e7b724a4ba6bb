//! Main test module for TimedFile
//!
//! This module includes all test suites:
//! - Integration tests for save/diff/rollback/fastforward/reset scenarios
//! - Property-based tests for history and roll stack invariants

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::timedfile::*;
    use tempfile::TempDir;
    use tokio::fs;

    #[tokio::test]
    async fn test_missing_working_file() {
        let temp_dir = TempDir::new().unwrap();
        let timed = TimedFile::new(
            temp_dir.path().join("absent.txt"),
            temp_dir.path().join(".versions"),
        )
        .unwrap();

        let err = timed
            .save(&Author::new("Test Author", "author@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, TimedFileError::FileNotFound(_)));

        let err = timed.diff().await.unwrap_err();
        assert!(matches!(err, TimedFileError::FileNotFound(_)));

        // A failed save leaves history alone
        assert!(timed.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_binary_content_is_not_diffed() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("blob.bin");
        fs::write(&file, b"\x00\x01\x02binary").await.unwrap();

        let timed = TimedFile::new(file.clone(), temp_dir.path().join(".versions")).unwrap();
        timed
            .save(&Author::new("Test Author", "author@example.com"))
            .await
            .unwrap();

        let err = timed.diff().await.unwrap_err();
        assert!(matches!(err, TimedFileError::BinaryContent(_)));
    }

    #[tokio::test]
    async fn test_oversized_diff_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("big.txt");
        fs::write(&file, "word ".repeat(100)).await.unwrap();

        let timed = TimedFileBuilder::new()
            .max_diff_size(64)
            .build(file, temp_dir.path().join(".versions"))
            .unwrap();

        let err = timed.diff().await.unwrap_err();
        assert!(matches!(err, TimedFileError::DiffFailed(_)));
    }

    #[tokio::test]
    async fn test_unicode_content() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("unicode.txt");
        let timed = TimedFile::new(file.clone(), temp_dir.path().join(".versions")).unwrap();
        let author = Author::new("Тест", "тест@example.com");

        fs::write(&file, "Привет мир\n").await.unwrap();
        timed.save(&author).await.unwrap();
        fs::write(&file, "Привет мир\n你好 世界\n").await.unwrap();

        let hunks = timed.diff().await.unwrap();
        assert_eq!(
            hunks,
            vec![
                Hunk::unchanged("Привет мир\n", 4),
                Hunk::added("你好 世界\n", 4),
            ]
        );
    }

    #[tokio::test]
    async fn test_separate_files_share_a_versions_directory() {
        let temp_dir = TempDir::new().unwrap();
        let versions = temp_dir.path().join(".versions");
        let author = Author::new("Test Author", "author@example.com");

        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        fs::write(&a, "alpha\n").await.unwrap();
        fs::write(&b, "beta\n").await.unwrap();

        let timed_a = TimedFile::new(a, versions.clone()).unwrap();
        let timed_b = TimedFile::new(b, versions).unwrap();
        timed_a.save(&author).await.unwrap();
        timed_a.save(&author).await.unwrap();
        timed_b.save(&author).await.unwrap();

        assert_eq!(timed_a.history().await.unwrap().len(), 2);
        assert_eq!(timed_b.history().await.unwrap().len(), 1);
    }
}
