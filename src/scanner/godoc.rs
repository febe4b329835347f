use tree_sitter::{Node, Parser};

use super::ScanError;
use crate::extractor::languages::LanguageConfig;
use crate::model::{DocKind, DocSegment};

/// Extracts doc comments from Go source: the package comment and the comment
/// block directly above each top-level function, method and type.
pub struct GoDocScanner {
    parser: Parser,
}

impl GoDocScanner {
    pub fn new() -> Result<Self, ScanError> {
        let mut parser = Parser::new();
        parser
            .set_language(&LanguageConfig::go().language)
            .map_err(|e| ScanError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    pub fn scan(&mut self, file: &str, source: &str) -> Result<Vec<DocSegment>, ScanError> {
        let tree = self
            .parser
            .parse(source, None)
            .filter(|t| !t.root_node().has_error())
            .ok_or_else(|| ScanError::Parse {
                path: file.to_string(),
            })?;
        let root = tree.root_node();

        let mut segments = Vec::new();
        let mut block: Vec<Node> = Vec::new();
        let mut code_end_row: Option<usize> = None;

        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            if node.kind() == "comment" {
                let start = node.start_position().row;
                // Trailing comment on a line of code.
                if code_end_row == Some(start) {
                    continue;
                }
                let contiguous = block
                    .last()
                    .is_some_and(|prev| prev.end_position().row + 1 >= start);
                if !contiguous {
                    block.clear();
                }
                block.push(node);
                continue;
            }

            let attached = block
                .last()
                .is_some_and(|c| c.end_position().row + 1 == node.start_position().row);
            if attached {
                for (heading, level) in headings_for(node, source) {
                    if let Some(seg) = doc_segment(file, &block, source, heading, level) {
                        segments.push(seg);
                    }
                }
            }
            block.clear();
            code_end_row = Some(node.end_position().row);
        }

        Ok(segments)
    }
}

fn headings_for(node: Node, source: &str) -> Vec<(String, usize)> {
    match node.kind() {
        "package_clause" => {
            let mut cursor = node.walk();
            let name = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "package_identifier")
                .map(|c| text(c, source));
            name.map(|n| vec![(format!("Package {n}"), 1)])
                .unwrap_or_default()
        }
        "function_declaration" | "method_declaration" => node
            .child_by_field_name("name")
            .map(|n| vec![(format!("func {}", text(n, source)), 2)])
            .unwrap_or_default(),
        "type_declaration" => {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|c| matches!(c.kind(), "type_spec" | "type_alias"))
                .filter_map(|spec| spec.child_by_field_name("name"))
                .map(|n| (format!("type {}", text(n, source)), 2))
                .collect()
        }
        _ => Vec::new(),
    }
}

fn doc_segment(
    file: &str,
    block: &[Node],
    source: &str,
    heading: String,
    level: usize,
) -> Option<DocSegment> {
    let first = block.first()?;
    let last = block.last()?;
    let content = block
        .iter()
        .flat_map(|c| comment_lines(&text(*c, source)))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if content.is_empty() {
        return None;
    }
    Some(DocSegment {
        file: file.to_string(),
        heading,
        level,
        start_line: first.start_position().row + 1,
        end_line: last.end_position().row + 1,
        content,
        kind: DocKind::GoDoc,
    })
}

/// Comment text without its markers; compiler directives are dropped.
fn comment_lines(raw: &str) -> Vec<String> {
    if let Some(line) = raw.strip_prefix("//") {
        if line.starts_with("go:") {
            return Vec::new();
        }
        return vec![line.strip_prefix(' ').unwrap_or(line).trim_end().to_string()];
    }
    let body = raw
        .strip_prefix("/*")
        .and_then(|b| b.strip_suffix("*/"))
        .unwrap_or(raw);
    body.lines().map(|l| l.trim().to_string()).collect()
}

fn text(node: Node, source: &str) -> String {
    source
        .get(node.byte_range())
        .unwrap_or_default()
        .to_string()
}
