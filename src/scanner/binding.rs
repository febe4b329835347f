//! Explicit doc-to-code bindings written as HTML comments in markdown:
//!
//! ```text
//! <!-- docuguard:start -->
//! <!-- docuguard:bindCode path="shop/fees.go" func="CalculateShipping" -->
//! Orders of 500 or more ship free.
//! <!-- docuguard:end -->
//! ```
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use super::ScanError;
use crate::model::{Binding, SymbolKind};

/// Compiled marker patterns for binding blocks.
pub struct BindingScanner {
    start: Regex,
    end: Regex,
    bind: Regex,
}

/// A `bindCode` marker seen inside an open block.
struct OpenBinding<'t> {
    line: usize,
    code_file: &'t str,
    kind: SymbolKind,
    symbol: &'t str,
    lines: Vec<&'t str>,
}

impl Default for BindingScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingScanner {
    pub fn new() -> Self {
        Self {
            start: Regex::new(r"<!--\s*docuguard:start\s*-->").unwrap(),
            end: Regex::new(r"<!--\s*docuguard:end\s*-->").unwrap(),
            bind: Regex::new(r#"<!--\s*docuguard:bindCode\s+path="([^"]+)"\s+(\w+)="([^"]+)"\s*-->"#)
                .unwrap(),
        }
    }

    /// Collect every closed binding block of `text`.
    ///
    /// A block without a `bindCode` marker, or one never closed, yields
    /// nothing. Lines before the marker are not part of the binding's text.
    pub fn scan(&self, file: &str, text: &str) -> Vec<Binding> {
        let mut bindings = Vec::new();
        let mut in_block = false;
        let mut current: Option<OpenBinding> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;

            if self.start.is_match(line) {
                in_block = true;
                current = None;
                continue;
            }

            if self.end.is_match(line) {
                if let Some(open) = current.take() {
                    bindings.push(Binding {
                        doc_file: file.to_string(),
                        doc_line: open.line,
                        end_line: line_no,
                        code_file: open.code_file.to_string(),
                        kind: open.kind,
                        symbol: open.symbol.to_string(),
                        doc_content: open.lines.join("\n").trim().to_string(),
                    });
                }
                in_block = false;
                continue;
            }

            if !in_block {
                continue;
            }
            if let Some(caps) = self.bind.captures(line) {
                let (_, [code_file, kind, symbol]) = caps.extract();
                current = Some(OpenBinding {
                    line: line_no,
                    code_file,
                    kind: binding_kind(kind),
                    symbol,
                    lines: Vec::new(),
                });
            } else if let Some(open) = current.as_mut() {
                open.lines.push(line);
            }
        }

        debug!("Found {} bindings in {file}", bindings.len());
        bindings
    }

    pub fn scan_file(&self, path: &Path, label: &str) -> Result<Vec<Binding>, ScanError> {
        let text = fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self.scan(label, &text))
    }
}

/// Declaration family named by a marker attribute; unknown names mean a function.
fn binding_kind(attr: &str) -> SymbolKind {
    match attr.to_ascii_lowercase().as_str() {
        "struct" | "type" => SymbolKind::TypeDecl,
        "const" => SymbolKind::Const,
        "var" => SymbolKind::Var,
        _ => SymbolKind::Function,
    }
}
