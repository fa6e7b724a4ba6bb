//! Property-based testing for TimedFile
//!
//! Uses proptest to check the history and roll stack invariants over
//! random edit sequences, and the diff engine over random texts.

use ::timedfile::diff::{baseline_text, current_text, diff_words, tokenize};
use ::timedfile::*;
use proptest::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// One step applied to a tracked file
#[derive(Debug, Clone)]
pub enum Step {
    Write(String),
    Save,
    Rollback,
    Fastforward,
    Reset,
}

/// Short multi-line texts built from a small vocabulary
fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,6}",
            Just(" ".to_string()),
            Just("\n".to_string()),
            Just("  ".to_string()),
            "[.,;!()]",
            "[0-9]{1,3}",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => text_strategy().prop_map(Step::Write),
        3 => Just(Step::Save),
        2 => Just(Step::Rollback),
        1 => Just(Step::Fastforward),
        1 => Just(Step::Reset),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn author() -> Author {
    Author::new("Property Tester", "prop@example.com")
}

async fn open(dir: &Path) -> TimedFile {
    let file = dir.join("tracked.txt");
    tokio::fs::write(&file, "").await.unwrap();
    TimedFile::new(file, dir.join(".versions")).unwrap()
}

async fn apply(timed: &TimedFile, step: &Step) {
    match step {
        Step::Write(text) => tokio::fs::write(timed.file_path(), text).await.unwrap(),
        Step::Save => {
            timed.save(&author()).await.unwrap();
        }
        Step::Rollback => timed.rollback().await.unwrap(),
        Step::Fastforward => timed.fastforward().await.unwrap(),
        Step::Reset => timed.reset().await.unwrap(),
    }
}

async fn working_content(timed: &TimedFile) -> String {
    tokio::fs::read_to_string(timed.file_path()).await.unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// History grows by exactly one per save and never otherwise
    #[test]
    fn history_is_append_only(steps in prop::collection::vec(step_strategy(), 1..25)) {
        let temp_dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let timed = open(temp_dir.path()).await;
            let mut saves = 0;
            let mut previous: Vec<CommitId> = Vec::new();

            for step in &steps {
                apply(&timed, step).await;
                if matches!(step, Step::Save) {
                    saves += 1;
                }

                let history = timed.history().await.unwrap();
                assert_eq!(history.len(), saves);
                assert_eq!(&history[..previous.len()], &previous[..]);
                previous = history;
            }
        });
    }

    /// Right after a save the diff reports no changes
    #[test]
    fn diff_is_clean_after_save(steps in prop::collection::vec(step_strategy(), 0..15), text in text_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let timed = open(temp_dir.path()).await;
            for step in &steps {
                apply(&timed, step).await;
            }

            tokio::fs::write(timed.file_path(), &text).await.unwrap();
            timed.save(&author()).await.unwrap();

            let hunks = timed.diff().await.unwrap();
            assert!(hunks.iter().all(Hunk::is_unchanged));
            assert_eq!(current_text(&hunks), text);
        });
    }

    /// Rollback then fastforward restores content and roll depth
    #[test]
    fn rollback_fastforward_round_trip(
        steps in prop::collection::vec(step_strategy(), 0..15),
        first in text_strategy(),
        second in text_strategy(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let timed = open(temp_dir.path()).await;
            for step in &steps {
                apply(&timed, step).await;
            }

            // Guarantee at least one commit before HEAD
            tokio::fs::write(timed.file_path(), &first).await.unwrap();
            timed.save(&author()).await.unwrap();
            tokio::fs::write(timed.file_path(), &second).await.unwrap();
            timed.save(&author()).await.unwrap();

            let content_before = working_content(&timed).await;
            let depth_before = timed.roll_depth().await.unwrap();

            timed.rollback().await.unwrap();
            assert_eq!(working_content(&timed).await, first);
            assert_eq!(timed.roll_depth().await.unwrap(), depth_before + 1);

            timed.fastforward().await.unwrap();
            assert_eq!(working_content(&timed).await, content_before);
            assert_eq!(timed.roll_depth().await.unwrap(), depth_before);
        });
    }

    /// Reset is idempotent and never touches the roll stack
    #[test]
    fn reset_is_idempotent_and_keeps_rolls(
        steps in prop::collection::vec(step_strategy(), 0..20),
        edit in text_strategy(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let timed = open(temp_dir.path()).await;
            for step in &steps {
                apply(&timed, step).await;
            }
            tokio::fs::write(timed.file_path(), &edit).await.unwrap();

            let rolls_before = timed.rolls().await.unwrap();
            let history_before = timed.history().await.unwrap();

            timed.reset().await.unwrap();
            let once = working_content(&timed).await;
            assert_eq!(timed.rolls().await.unwrap(), rolls_before);

            timed.reset().await.unwrap();
            assert_eq!(working_content(&timed).await, once);
            assert_eq!(timed.rolls().await.unwrap(), rolls_before);
            assert_eq!(timed.history().await.unwrap(), history_before);
        });
    }

    /// Hunks always rebuild both sides of the diff
    #[test]
    fn diff_reconstructs_both_sides(old in text_strategy(), new in text_strategy()) {
        let hunks = diff_words(&old, &new, &DiffOptions::default());

        prop_assert_eq!(baseline_text(&hunks), old.clone());
        prop_assert_eq!(current_text(&hunks), new.clone());

        // Neighbouring hunks never share a kind
        for pair in hunks.windows(2) {
            prop_assert_ne!(
                std::mem::discriminant(&pair[0]),
                std::mem::discriminant(&pair[1])
            );
        }

        let summary = DiffSummary::from_hunks(&hunks);
        prop_assert_eq!(summary.tokens_unchanged + summary.tokens_removed, tokenize(&old).len());
        prop_assert_eq!(summary.tokens_unchanged + summary.tokens_added, tokenize(&new).len());
    }

    /// Tokens concatenate back to the input
    #[test]
    fn tokenize_is_lossless(text in "\\PC{0,80}") {
        prop_assert_eq!(tokenize(&text).concat(), text);
    }
}
