//! Value records passed between the pipeline stages.
//!
//! Every record is produced by one pass and consumed by the next; nothing
//! here is persisted.
use std::fmt;

use serde::{Deserialize, Serialize};

/// How a file (or a symbol inside it) changed in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous changed region from a `@@ -a,b +c,d @@` header.
///
/// Starts are 1-based; a count of zero means the side is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

impl Hunk {
    /// Saturates at `usize::MAX`.
    pub fn new_end(&self) -> usize {
        self.new_start.saturating_add(self.new_count)
    }

    pub fn old_end(&self) -> usize {
        self.old_start.saturating_add(self.old_count)
    }

    /// Whether the hunk adds or keeps any line in `start..=end` of the new file.
    pub fn touches(&self, start: usize, end: usize) -> bool {
        self.new_count > 0 && self.new_start <= end && start < self.new_end()
    }
}

/// One file's portion of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub old_path: String,
    pub new_path: String,
    pub change_kind: ChangeKind,
    /// Ordered by `new_start`, never overlapping.
    pub hunks: Vec<Hunk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_lines: Vec<String>,
}

impl FileChange {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            change_kind: ChangeKind::Modified,
            hunks: Vec::new(),
            added_lines: Vec::new(),
            removed_lines: Vec::new(),
        }
    }

    /// The path that identifies the file: the old path for deletions, the new one otherwise.
    pub fn path(&self) -> &str {
        match self.change_kind {
            ChangeKind::Deleted => &self.old_path,
            _ => &self.new_path,
        }
    }

    pub fn is_rename(&self) -> bool {
        self.old_path != self.new_path
    }
}

/// The declaration families the extractor recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    #[serde(rename = "type")]
    TypeDecl,
    Const,
    Var,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::TypeDecl => "type",
            SymbolKind::Const => "const",
            SymbolKind::Var => "var",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level declaration touched by a diff.
///
/// Lines refer to the new file, or to the old file for deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedSymbol {
    pub file: String,
    pub name: String,
    pub kind: SymbolKind,
    pub change_kind: ChangeKind,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub old_code: String,
    #[serde(default)]
    pub new_code: String,
}

impl ChangedSymbol {
    /// The most recent code for the symbol: new code, or old code for deletions.
    pub fn code(&self) -> &str {
        if self.new_code.is_empty() {
            &self.old_code
        } else {
            &self.new_code
        }
    }
}

/// Where a documentation segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    #[default]
    Markdown,
    GoDoc,
}

/// A heading-delimited unit of documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSegment {
    pub file: String,
    pub heading: String,
    pub level: usize,
    pub start_line: usize,
    pub end_line: usize,
    /// Raw text from the heading line on, fences included.
    pub content: String,
    #[serde(default)]
    pub kind: DocKind,
}

/// An explicit link from a marked documentation block to one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub doc_file: String,
    /// Line of the `bindCode` marker.
    pub doc_line: usize,
    /// Line of the closing marker.
    pub end_line: usize,
    /// Source path relative to the repository root.
    pub code_file: String,
    pub kind: SymbolKind,
    pub symbol: String,
    /// Block text after the marker, trimmed.
    pub doc_content: String,
}

impl Binding {
    /// The documented block as a segment headed by the bound symbol.
    pub fn segment(&self) -> DocSegment {
        DocSegment {
            file: self.doc_file.clone(),
            heading: self.symbol.clone(),
            level: 0,
            start_line: self.doc_line,
            end_line: self.end_line,
            content: self.doc_content.clone(),
            kind: DocKind::Markdown,
        }
    }
}

/// A scored pairing of a changed symbol with a documentation segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub symbol: ChangedSymbol,
    pub segment: DocSegment,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
}
