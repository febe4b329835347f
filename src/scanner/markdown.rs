use std::fs;
use std::path::Path;

use regex::Regex;

use super::ScanError;
use crate::model::{DocKind, DocSegment};

/// Compiled line patterns for markdown scanning.
pub struct MarkdownScanner {
    heading: Regex,
    fence: Regex,
}

/// An open code fence: marker character and run length.
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

struct OpenSegment<'t> {
    heading: String,
    level: usize,
    start_line: usize,
    lines: Vec<&'t str>,
}

impl<'t> OpenSegment<'t> {
    /// Close the segment at `end_line`; a heading with no body yields nothing.
    fn close(self, file: &str, end_line: usize) -> Option<DocSegment> {
        let has_body = self.lines.iter().skip(1).any(|l| !l.trim().is_empty());
        if !has_body {
            return None;
        }
        Some(DocSegment {
            file: file.to_string(),
            heading: self.heading,
            level: self.level,
            start_line: self.start_line,
            end_line,
            content: self.lines.join("\n").trim_end().to_string(),
            kind: DocKind::Markdown,
        })
    }
}

impl Default for MarkdownScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownScanner {
    pub fn new() -> Self {
        Self {
            heading: Regex::new(r"^(#{1,6})\s+(.+)$").unwrap(),
            fence: Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap(),
        }
    }

    /// Split `text` into heading-delimited segments.
    ///
    /// Lines before the first heading belong to no segment. Headings inside
    /// fenced code blocks are copied as content.
    pub fn scan(&self, file: &str, text: &str) -> Vec<DocSegment> {
        let mut segments = Vec::new();
        let mut current: Option<OpenSegment> = None;
        let mut fence: Option<Fence> = None;
        let mut last_line = 0;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;

            if let Some(open) = fence {
                if self.closes(line, open) {
                    fence = None;
                }
            } else if let Some(opened) = self.opens(line) {
                fence = Some(opened);
            } else if let Some(caps) = self.heading.captures(line) {
                if let Some(seg) = current.take().and_then(|s| s.close(file, line_no - 1)) {
                    segments.push(seg);
                }
                current = Some(OpenSegment {
                    heading: caps[2].trim().to_string(),
                    level: caps[1].len(),
                    start_line: line_no,
                    lines: vec![line],
                });
                continue;
            }

            if let Some(seg) = current.as_mut() {
                seg.lines.push(line);
            }
        }

        if let Some(seg) = current.and_then(|s| s.close(file, last_line)) {
            segments.push(seg);
        }
        segments
    }

    pub fn scan_file<P: AsRef<Path>>(&self, path: P, label: &str) -> Result<Vec<DocSegment>, ScanError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self.scan(label, &text))
    }

    fn opens(&self, line: &str) -> Option<Fence> {
        let caps = self.fence.captures(line)?;
        let run = &caps[1];
        let marker = run.chars().next()?;
        // Backtick fences may not carry backticks in their info string.
        if marker == '`' && line[caps.get(0)?.end()..].contains('`') {
            return None;
        }
        Some(Fence {
            marker,
            len: run.len(),
        })
    }

    fn closes(&self, line: &str, open: Fence) -> bool {
        let Some(caps) = self.fence.captures(line) else {
            return false;
        };
        let run = &caps[1];
        run.starts_with(open.marker)
            && run.len() >= open.len
            && line[caps[0].len()..].trim().is_empty()
    }
}

/// Scan markdown text with no file label.
pub fn scan(text: &str) -> Vec<DocSegment> {
    MarkdownScanner::new().scan("", text)
}
