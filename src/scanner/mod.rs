//! Documentation scanning: markdown files and Go doc comments into
//! heading-delimited [`DocSegment`]s, plus explicit [`Binding`] blocks.
pub mod binding;
pub mod godoc;
pub mod markdown;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extractor::languages::LanguageConfig;
use crate::model::{Binding, DocSegment};
pub use binding::BindingScanner;
pub use godoc::GoDocScanner;
pub use markdown::{MarkdownScanner, scan};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid doc pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to parse {path}")]
    Parse { path: String },

    #[error("grammar setup failed: {0}")]
    Language(String),
}

/// Which documentation sources to collect under a root directory.
#[derive(Debug, Clone, Default)]
pub struct DocSources {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Also read doc comments from Go sources.
    pub go_comments: bool,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| ScanError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

fn relative_label(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// List documentation files under `root`, sorted by relative path.
///
/// Markdown files must match an include pattern; Go sources are listed when
/// `go_comments` is set. Exclude patterns win over both.
pub fn discover(root: &Path, sources: &DocSources) -> Result<Vec<PathBuf>, ScanError> {
    let include = build_globset(&sources.include)?;
    let exclude = build_globset(&sources.exclude)?;
    let go = LanguageConfig::go();

    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .filter_entry(|e| e.file_name() != ".git")
        .build();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let label = relative_label(root, path);
        if exclude.is_match(&label) {
            continue;
        }

        let wanted = if has_extension(path, MARKDOWN_EXTENSIONS) {
            include.is_match(&label)
        } else {
            sources.go_comments && go.is_source_path(&label)
        };
        if wanted {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    debug!("Discovered {} documentation files under {}", files.len(), root.display());
    Ok(files)
}

/// Scan every documentation file under `root`.
///
/// Unreadable or unparseable files are logged and skipped.
pub fn scan_paths(root: &Path, sources: &DocSources) -> Result<Vec<DocSegment>, ScanError> {
    let files = discover(root, sources)?;
    let markdown = MarkdownScanner::new();
    let mut godoc = if sources.go_comments {
        Some(GoDocScanner::new()?)
    } else {
        None
    };

    let mut segments = Vec::new();
    for path in &files {
        let label = relative_label(root, path);
        let result = if has_extension(path, MARKDOWN_EXTENSIONS) {
            markdown.scan_file(path, &label)
        } else if let Some(scanner) = godoc.as_mut() {
            read(path).and_then(|text| scanner.scan(&label, &text))
        } else {
            continue;
        };
        match result {
            Ok(found) => segments.extend(found),
            Err(e) => warn!("Skipping {label}: {e}"),
        }
    }

    info!(
        "Scanned {} documentation segments from {} files",
        segments.len(),
        files.len()
    );
    Ok(segments)
}

/// Scan explicit files; the label of each segment is the path as given.
pub fn scan_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DocSegment>, ScanError> {
    let markdown = MarkdownScanner::new();
    let mut godoc: Option<GoDocScanner> = None;
    let mut segments = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let label = path.to_string_lossy().replace('\\', "/");
        if has_extension(path, &["go"]) {
            if godoc.is_none() {
                godoc = Some(GoDocScanner::new()?);
            }
            if let Some(scanner) = godoc.as_mut() {
                segments.extend(scanner.scan(&label, &read(path)?)?);
            }
        } else {
            segments.extend(markdown.scan_file(path, &label)?);
        }
    }
    Ok(segments)
}

/// Bindings declared in explicit markdown files, labelled by the path as given.
pub fn scan_bindings<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Binding>, ScanError> {
    let scanner = BindingScanner::new();
    let mut bindings = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let label = path.to_string_lossy().replace('\\', "/");
        bindings.extend(scanner.scan_file(path, &label)?);
    }
    Ok(bindings)
}

/// Bindings of every markdown file `sources` selects under `root`.
///
/// Unreadable files are logged and skipped.
pub fn discover_bindings(root: &Path, sources: &DocSources) -> Result<Vec<Binding>, ScanError> {
    let files = discover(root, sources)?;
    let scanner = BindingScanner::new();
    let mut bindings = Vec::new();
    for path in files.iter().filter(|p| has_extension(p, MARKDOWN_EXTENSIONS)) {
        let label = relative_label(root, path);
        match scanner.scan_file(path, &label) {
            Ok(found) => bindings.extend(found),
            Err(e) => warn!("Skipping {label}: {e}"),
        }
    }
    info!("Found {} bindings in {} files", bindings.len(), files.len());
    Ok(bindings)
}

fn read(path: &Path) -> Result<String, ScanError> {
    fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.display().to_string(),
        source,
    })
}
