//! Unified diff parsing.
//!
//! Turns `git diff` output into one [`FileChange`] per file, with hunks and
//! the raw added/removed line text. The parser is permissive: anything it does
//! not recognise is skipped. It fails when the input cannot be read line by
//! line at all, or when a hunk header's line numbers do not fit in `usize`.
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::model::{ChangeKind, FileChange, Hunk};

/// Longest line the scanner accepts before treating the input as unreadable.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiffError {
    #[error("malformed diff at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Compiled diff patterns, built once and owned by the parser.
pub struct DiffPatterns {
    file_header: Regex,
    hunk_header: Regex,
    new_file: Regex,
    deleted_file: Regex,
}

impl DiffPatterns {
    pub fn new() -> Self {
        Self {
            // diff --git a/path b/path
            file_header: Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap(),
            // @@ -old_start[,old_count] +new_start[,new_count] @@
            hunk_header: Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap(),
            new_file: Regex::new(r"^new file mode").unwrap(),
            deleted_file: Regex::new(r"^deleted file mode").unwrap(),
        }
    }

    /// Parse a hunk header; `Err` carries the reason a header is unusable.
    fn hunk(&self, line: &str) -> Result<Option<Hunk>, String> {
        let Some(caps) = self.hunk_header.captures(line) else {
            return Ok(None);
        };
        let number = |idx: usize, default: usize| -> Result<usize, String> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| format!("hunk number {} out of range", m.as_str())),
                None => Ok(default),
            }
        };
        let hunk = Hunk {
            old_start: number(1, 0)?,
            old_count: number(2, 1)?,
            new_start: number(3, 0)?,
            new_count: number(4, 1)?,
        };
        if hunk.old_start.checked_add(hunk.old_count).is_none()
            || hunk.new_start.checked_add(hunk.new_count).is_none()
        {
            return Err("hunk range overflows".to_string());
        }
        Ok(Some(hunk))
    }
}

impl Default for DiffPatterns {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DiffParser {
    patterns: DiffPatterns,
}

impl DiffParser {
    pub fn new() -> Self {
        Self::with_patterns(DiffPatterns::new())
    }

    pub fn with_patterns(patterns: DiffPatterns) -> Self {
        Self { patterns }
    }

    /// Parse unified diff text into per-file change records.
    ///
    /// Text without any `diff --git` header yields an empty list.
    pub fn parse(&self, diff: &str) -> Result<Vec<FileChange>, DiffError> {
        let mut files: Vec<FileChange> = Vec::new();
        let mut current: Option<FileAccumulator> = None;

        for (idx, line) in diff.lines().enumerate() {
            let line_no = idx + 1;
            if line.len() > MAX_LINE_LEN {
                return Err(DiffError::Malformed {
                    line: line_no,
                    reason: format!("line exceeds {MAX_LINE_LEN} bytes"),
                });
            }
            if line.contains('\0') {
                return Err(DiffError::Malformed {
                    line: line_no,
                    reason: "NUL byte in diff text".to_string(),
                });
            }

            if let Some(caps) = self.patterns.file_header.captures(line) {
                if let Some(acc) = current.take() {
                    push_change(&mut files, acc.finish());
                }
                current = Some(FileAccumulator::new(&caps[1], &caps[2]));
                continue;
            }

            if let Some(acc) = current.as_mut() {
                acc.feed(line, &self.patterns)
                    .map_err(|reason| DiffError::Malformed {
                        line: line_no,
                        reason,
                    })?;
            }
        }

        if let Some(acc) = current.take() {
            push_change(&mut files, acc.finish());
        }

        debug!("Parsed {} file changes from diff", files.len());
        Ok(files)
    }
}

impl Default for DiffParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper around [`DiffParser::parse`].
pub fn parse(diff: &str) -> Result<Vec<FileChange>, DiffError> {
    DiffParser::new().parse(diff)
}

/// Check raw command output is text. Non-UTF-8 input is rejected at the line
/// holding the first bad byte.
pub fn decode(raw: &[u8]) -> Result<&str, DiffError> {
    std::str::from_utf8(raw).map_err(|e| DiffError::Malformed {
        line: raw[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1,
        reason: "invalid UTF-8".to_string(),
    })
}

/// The file record being built while its lines are scanned.
struct FileAccumulator {
    change: FileChange,
    old_remaining: usize,
    new_remaining: usize,
}

impl FileAccumulator {
    fn new(old_path: &str, new_path: &str) -> Self {
        Self {
            change: FileChange::new(old_path, new_path),
            old_remaining: 0,
            new_remaining: 0,
        }
    }

    fn in_hunk_body(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn feed(&mut self, line: &str, patterns: &DiffPatterns) -> Result<(), String> {
        // Inside a hunk the counts say exactly which lines belong to it, so a
        // removed line whose text starts with "--" is not mistaken for a header.
        if self.in_hunk_body() {
            match line.as_bytes().first() {
                Some(b'+') => {
                    self.new_remaining = self.new_remaining.saturating_sub(1);
                    self.change.added_lines.push(line[1..].to_string());
                    return Ok(());
                }
                Some(b'-') => {
                    self.old_remaining = self.old_remaining.saturating_sub(1);
                    self.change.removed_lines.push(line[1..].to_string());
                    return Ok(());
                }
                Some(b' ') | None => {
                    self.old_remaining = self.old_remaining.saturating_sub(1);
                    self.new_remaining = self.new_remaining.saturating_sub(1);
                    return Ok(());
                }
                // "\ No newline at end of file"
                Some(b'\\') => return Ok(()),
                _ => {
                    self.old_remaining = 0;
                    self.new_remaining = 0;
                }
            }
        }

        if let Some(hunk) = patterns.hunk(line)? {
            self.old_remaining = hunk.old_count;
            self.new_remaining = hunk.new_count;
            self.change.hunks.push(hunk);
            return Ok(());
        }

        // Mode lines belong to the extended header, before any hunk.
        if self.change.hunks.is_empty() {
            if patterns.new_file.is_match(line) {
                self.change.change_kind = ChangeKind::Added;
                return Ok(());
            }
            if patterns.deleted_file.is_match(line) {
                self.change.change_kind = ChangeKind::Deleted;
                return Ok(());
            }
        }

        if let Some(rest) = line.strip_prefix('+') {
            if !line.starts_with("+++") {
                self.change.added_lines.push(rest.to_string());
            }
        } else if let Some(rest) = line.strip_prefix('-') {
            if !line.starts_with("---") {
                self.change.removed_lines.push(rest.to_string());
            }
        }
        Ok(())
    }

    fn finish(mut self) -> FileChange {
        normalize_hunks(&mut self.change.hunks);
        self.change
    }
}

/// Append a change, folding it into an earlier record for the same path pair.
fn push_change(files: &mut Vec<FileChange>, change: FileChange) {
    let existing = files
        .iter_mut()
        .find(|f| f.old_path == change.old_path && f.new_path == change.new_path);

    match existing {
        Some(prev) => {
            debug!("Merging repeated diff section for {}", change.new_path);
            if prev.change_kind == ChangeKind::Modified {
                prev.change_kind = change.change_kind;
            }
            prev.hunks.extend(change.hunks);
            normalize_hunks(&mut prev.hunks);
            prev.added_lines.extend(change.added_lines);
            prev.removed_lines.extend(change.removed_lines);
        }
        None => files.push(change),
    }
}

/// Sort hunks by `new_start` and coalesce any whose new ranges overlap.
fn normalize_hunks(hunks: &mut Vec<Hunk>) {
    hunks.sort_by_key(|h| (h.new_start, h.old_start));

    let mut merged: Vec<Hunk> = Vec::with_capacity(hunks.len());
    for hunk in hunks.drain(..) {
        if let Some(last) = merged.last_mut() {
            if hunk.new_start < last.new_end() {
                let new_end = last.new_end().max(hunk.new_end());
                let old_start = last.old_start.min(hunk.old_start);
                let old_end = last.old_end().max(hunk.old_end());
                last.old_start = old_start;
                last.old_count = old_end - old_start;
                last.new_count = new_end - last.new_start;
                continue;
            }
        }
        merged.push(hunk);
    }
    *hunks = merged;
}
