//! Changed-symbol extraction.
//!
//! Correlates the line ranges of a diff with the top-level declarations of
//! each touched source file and reports the declarations that overlap.
pub mod declarations;
pub mod languages;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::diff::{DiffError, DiffParser};
use crate::model::{ChangeKind, ChangedSymbol, FileChange};
use crate::vcs::{VcsError, VersionControl};
use declarations::{Declaration, DeclarationParser};
use languages::LanguageConfig;

pub const DEFAULT_BASE_REVISION: &str = "HEAD";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("failed to parse {path} (line {line})")]
    Parse { path: String, line: usize },

    #[error("grammar setup failed: {0}")]
    Language(String),

    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Counters for one extraction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    pub files_seen: usize,
    pub files_skipped: usize,
    pub symbols: usize,
}

/// Keep only the changes whose new path is a hand-written source file.
pub fn filter_source_changes(changes: Vec<FileChange>, config: &LanguageConfig) -> Vec<FileChange> {
    changes
        .into_iter()
        .filter(|c| config.is_source_path(&c.new_path))
        .collect()
}

pub struct SymbolExtractor<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
    diff_parser: DiffParser,
    declarations: DeclarationParser,
    base_revision: String,
}

impl<'a, V: VersionControl + ?Sized> SymbolExtractor<'a, V> {
    pub fn new(vcs: &'a V) -> Result<Self, ExtractError> {
        Self::with_language(vcs, LanguageConfig::go())
    }

    pub fn with_language(vcs: &'a V, config: LanguageConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            vcs,
            diff_parser: DiffParser::new(),
            declarations: DeclarationParser::new(config)?,
            base_revision: DEFAULT_BASE_REVISION.to_string(),
        })
    }

    /// Revision that holds the pre-change text of modified and deleted files.
    #[must_use]
    pub fn with_base(mut self, revision: impl Into<String>) -> Self {
        self.base_revision = revision.into();
        self
    }

    /// Extract every declaration touched by `diff`.
    ///
    /// Only a diff that cannot be scanned is an error; files that fail to load
    /// or parse are skipped.
    pub fn extract(&mut self, diff: &str) -> Result<Vec<ChangedSymbol>, ExtractError> {
        self.extract_with_stats(diff).map(|(symbols, _)| symbols)
    }

    pub fn extract_with_stats(
        &mut self,
        diff: &str,
    ) -> Result<(Vec<ChangedSymbol>, ExtractionStats), ExtractError> {
        let changes = self.diff_parser.parse(diff)?;
        let sources = filter_source_changes(changes, self.declarations.config());

        let mut stats = ExtractionStats::default();
        let mut symbols = Vec::new();
        for change in &sources {
            stats.files_seen += 1;
            match self.extract_file(change) {
                Ok(found) => {
                    debug!("{}: {} changed symbols", change.path(), found.len());
                    symbols.extend(found);
                }
                Err(e) => {
                    stats.files_skipped += 1;
                    warn!("Skipping {}: {e}", change.path());
                }
            }
        }
        stats.symbols = symbols.len();

        info!(
            "Extracted {} changed symbols from {} source files ({} skipped)",
            stats.symbols, stats.files_seen, stats.files_skipped
        );
        Ok((symbols, stats))
    }

    /// Extract the changed symbols of a single file record.
    pub fn extract_file(&mut self, change: &FileChange) -> Result<Vec<ChangedSymbol>, ExtractError> {
        match change.change_kind {
            ChangeKind::Added => {
                let source = self.vcs.current_file(&change.new_path)?;
                self.extract_all(&change.new_path, &source, ChangeKind::Added)
            }
            ChangeKind::Deleted => {
                let source = self
                    .vcs
                    .file_at_revision(&change.old_path, &self.base_revision)?;
                self.extract_all(&change.old_path, &source, ChangeKind::Deleted)
            }
            ChangeKind::Modified => self.extract_modified(change),
        }
    }

    fn extract_all(
        &mut self,
        path: &str,
        source: &str,
        change_kind: ChangeKind,
    ) -> Result<Vec<ChangedSymbol>, ExtractError> {
        let decls = self.declarations.parse(path, source)?;
        let mut symbols = Vec::new();
        for decl in &decls {
            let code = decl.code().to_string();
            let (old_code, new_code) = match change_kind {
                ChangeKind::Deleted => (code, String::new()),
                _ => (String::new(), code),
            };
            for name in decl.names() {
                symbols.push(symbol_for(path, name, decl, change_kind, &old_code, &new_code));
            }
        }
        Ok(symbols)
    }

    fn extract_modified(&mut self, change: &FileChange) -> Result<Vec<ChangedSymbol>, ExtractError> {
        let source = self.vcs.current_file(&change.new_path)?;
        let decls = self.declarations.parse(&change.new_path, &source)?;

        let hits: Vec<&Declaration> = decls
            .iter()
            .filter(|d| d.span().overlaps(&change.hunks))
            .collect();
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let old_decls = self.old_declarations(&change.old_path);
        let mut symbols = Vec::new();
        for decl in hits {
            for name in decl.names() {
                let old_code = declarations::find(&old_decls, name, decl.kind())
                    .map(|d| d.code())
                    .unwrap_or_default();
                symbols.push(symbol_for(
                    &change.new_path,
                    name,
                    decl,
                    ChangeKind::Modified,
                    old_code,
                    decl.code(),
                ));
            }
        }
        Ok(symbols)
    }

    /// Declarations of the pre-change file; empty when it cannot be loaded or parsed.
    fn old_declarations(&mut self, path: &str) -> Vec<Declaration> {
        let source = match self.vcs.file_at_revision(path, &self.base_revision) {
            Ok(source) => source,
            Err(VcsError::NotFound { .. }) => {
                debug!("{path} has no version at {}", self.base_revision);
                return Vec::new();
            }
            Err(e) => {
                warn!("Could not load {path} at {}: {e}", self.base_revision);
                return Vec::new();
            }
        };
        self.declarations.parse(path, &source).unwrap_or_else(|e| {
            debug!("Old version unusable: {e}");
            Vec::new()
        })
    }
}

fn symbol_for(
    path: &str,
    name: &str,
    decl: &Declaration,
    change_kind: ChangeKind,
    old_code: &str,
    new_code: &str,
) -> ChangedSymbol {
    let span = decl.span();
    ChangedSymbol {
        file: path.to_string(),
        name: name.to_string(),
        kind: decl.kind(),
        change_kind,
        start_line: span.start,
        end_line: span.end,
        old_code: old_code.to_string(),
        new_code: new_code.to_string(),
    }
}
