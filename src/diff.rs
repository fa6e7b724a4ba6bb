//! Word-level diff computation for text files
//!
//! This module compares the last saved version of the tracked file with the
//! working copy and reports the result as an ordered list of [`Hunk`]s.
//!
//! ## Tokens
//!
//! Text is split into maximal runs of word characters, maximal runs of
//! whitespace, single bracket or quote characters, and maximal runs of any
//! other punctuation. Newlines are whitespace, so both word and line
//! boundaries survive as token boundaries:
//!
//! ```rust
//! use timedfile::diff::tokenize;
//!
//! assert_eq!(tokenize("Line 1\n"), vec!["Line", " ", "1", "\n"]);
//! assert_eq!(tokenize("f(x)"), vec!["f", "(", "x", ")"]);
//! ```
//!
//! ## Alignment
//!
//! Tokens are aligned with Myers' O(ND) algorithm, so memory stays linear in
//! the number of tokens. Very dissimilar inputs that exceed the time budget
//! still get a valid, if not minimal, alignment. Between two matched tokens,
//! removed tokens are always reported before added ones.
//!
//! ```rust
//! use timedfile::diff::diff_words;
//! use timedfile::types::{DiffOptions, Hunk};
//!
//! let hunks = diff_words("Line 1\nLine 2\n", "Line 1\nLine 2\nLine 3\n", &DiffOptions::default());
//! assert_eq!(hunks, vec![
//!     Hunk::unchanged("Line 1\nLine 2\n", 8),
//!     Hunk::added("Line 3\n", 4),
//! ]);
//! ```

use crate::error::{Result, TimedFileError};
use crate::types::{DiffOptions, Hunk};
use similar::{capture_diff_slices_deadline, Algorithm, DiffTag};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::trace;

/// Time after which alignment stops looking for a minimal edit script
const ALIGNMENT_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Space,
    Punct,
    // brackets and quotes never merge with their neighbours
    Single,
}

fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else if matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '"') {
        CharClass::Single
    } else {
        CharClass::Punct
    }
}

/// Split text into diff tokens
///
/// Concatenating the returned tokens always yields the input again.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev: Option<CharClass> = None;

    for (idx, c) in text.char_indices() {
        let class = classify(c);
        if let Some(prev_class) = prev {
            if prev_class != class || class == CharClass::Single {
                tokens.push(&text[start..idx]);
                start = idx;
            }
        }
        prev = Some(class);
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}

/// Represents a change operation in the diff
#[derive(Debug, Clone, Copy)]
enum ChangeOp {
    Keep(usize, usize), // (old_idx, new_idx)
    Delete(usize),      // old_idx
    Insert(usize),      // new_idx
}

/// Compute the word-level diff between two texts
///
/// Pure function: identical inputs always produce identical hunks.
pub fn diff_words(old: &str, new: &str, options: &DiffOptions) -> Vec<Hunk> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);

    if old_tokens.is_empty() && new_tokens.is_empty() {
        return vec![];
    }

    let changes = compute_changes(&old_tokens, &new_tokens, options.ignore_whitespace);
    trace!(
        "Diffed {} old tokens against {} new tokens ({} ops)",
        old_tokens.len(),
        new_tokens.len(),
        changes.len()
    );

    let mut builder = HunkBuilder::default();
    for change in changes {
        match change {
            // Matched tokens take the working copy's text
            ChangeOp::Keep(_, new_idx) => builder.push(Kind::Unchanged, new_tokens[new_idx]),
            ChangeOp::Delete(old_idx) => builder.push(Kind::Removed, old_tokens[old_idx]),
            ChangeOp::Insert(new_idx) => builder.push(Kind::Added, new_tokens[new_idx]),
        }
    }
    builder.finish()
}

/// Diff raw file contents, rejecting binary or oversized input
///
/// `path` is only used for error reporting.
pub fn diff_contents(
    path: &Path,
    old_content: &[u8],
    new_content: &[u8],
    options: &DiffOptions,
) -> Result<Vec<Hunk>> {
    let largest = old_content.len().max(new_content.len()) as u64;
    if largest > options.max_file_size {
        return Err(TimedFileError::DiffFailed(format!(
            "{:?} is {} bytes, limit is {} bytes",
            path, largest, options.max_file_size
        )));
    }

    if is_binary_content(old_content) || is_binary_content(new_content) {
        return Err(TimedFileError::BinaryContent(path.to_path_buf()));
    }

    let (Ok(old_text), Ok(new_text)) = (
        std::str::from_utf8(old_content),
        std::str::from_utf8(new_content),
    ) else {
        return Err(TimedFileError::BinaryContent(path.to_path_buf()));
    };

    Ok(diff_words(old_text, new_text, options))
}

/// Check if content appears to be binary
pub fn is_binary_content(content: &[u8]) -> bool {
    // Simple heuristic: check for null bytes in first 8KB
    let check_len = content.len().min(8192);
    content[..check_len].contains(&0)
}

/// Rebuild the baseline text from a hunk sequence
pub fn baseline_text(hunks: &[Hunk]) -> String {
    hunks
        .iter()
        .filter(|h| !h.is_added())
        .map(|h| h.value())
        .collect()
}

/// Rebuild the working copy text from a hunk sequence
pub fn current_text(hunks: &[Hunk]) -> String {
    hunks
        .iter()
        .filter(|h| !h.is_removed())
        .map(|h| h.value())
        .collect()
}

fn is_space_token(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_whitespace)
}

/// Text a token is compared by
fn comparison_key(token: &str, ignore_whitespace: bool) -> &str {
    if ignore_whitespace && is_space_token(token) {
        " "
    } else {
        token
    }
}

/// Compute the sequence of change operations
///
/// Between two matched tokens every deletion is emitted before any insertion.
fn compute_changes(old: &[&str], new: &[&str], ignore_whitespace: bool) -> Vec<ChangeOp> {
    let old_keys: Vec<&str> = old.iter().map(|t| comparison_key(t, ignore_whitespace)).collect();
    let new_keys: Vec<&str> = new.iter().map(|t| comparison_key(t, ignore_whitespace)).collect();

    let deadline = Instant::now() + ALIGNMENT_DEADLINE;
    let ops = capture_diff_slices_deadline(Algorithm::Myers, &old_keys, &new_keys, Some(deadline));

    let mut changes = Vec::with_capacity(old.len().max(new.len()));
    let mut pending_inserts = Vec::new();
    for op in ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                changes.append(&mut pending_inserts);
                changes.extend(old_range.zip(new_range).map(|(o, n)| ChangeOp::Keep(o, n)));
            }
            DiffTag::Delete => changes.extend(old_range.map(ChangeOp::Delete)),
            DiffTag::Insert => pending_inserts.extend(new_range.map(ChangeOp::Insert)),
            DiffTag::Replace => {
                changes.extend(old_range.map(ChangeOp::Delete));
                pending_inserts.extend(new_range.map(ChangeOp::Insert));
            }
        }
    }
    changes.append(&mut pending_inserts);

    changes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unchanged,
    Added,
    Removed,
}

/// Coalesces consecutive tokens of the same kind into hunks
#[derive(Default)]
struct HunkBuilder {
    hunks: Vec<Hunk>,
    current: Option<(Kind, String, usize)>,
}

impl HunkBuilder {
    fn push(&mut self, kind: Kind, token: &str) {
        match &mut self.current {
            Some((current_kind, value, count)) if *current_kind == kind => {
                value.push_str(token);
                *count += 1;
            }
            _ => {
                self.flush();
                self.current = Some((kind, token.to_string(), 1));
            }
        }
    }

    fn flush(&mut self) {
        if let Some((kind, value, count)) = self.current.take() {
            self.hunks.push(match kind {
                Kind::Unchanged => Hunk::unchanged(value, count),
                Kind::Added => Hunk::added(value, count),
                Kind::Removed => Hunk::removed(value, count),
            });
        }
    }

    fn finish(mut self) -> Vec<Hunk> {
        self.flush();
        self.hunks
    }
}
