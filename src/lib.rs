//! # docdrift: documentation drift detector
//!
//! Finds documentation sections that may have gone stale after a code change:
//! reads a unified diff, extracts the Go declarations it touches, locates the
//! doc segments that talk about them, and optionally asks a language model
//! whether each pair still agrees.
//!
//! ## Architecture
//!
//! - **[`diff`]** - Unified diff parsing into per-file hunks
//! - **[`extractor`]** - Tree-sitter declaration lookup and changed symbol extraction
//! - **[`scanner`]** - Markdown and Go doc comment segmentation, doc discovery
//! - **[`matcher`]** - Keyword heuristics pairing symbols with segments
//! - **[`judge`]** - Semantic consistency judge (OpenAI-compatible or mock)
//! - **[`engine`]** - The check pipeline and its report
//! - **[`report`]** - Text, JSON and GitHub Actions rendering
//! - **[`vcs`]** - Git access behind a trait
//! - **[`config`]** - Configuration loading and validation

pub mod config;
pub mod diff;
pub mod engine;
pub mod extractor;
pub mod judge;
pub mod matcher;
pub mod model;
pub mod report;
pub mod scanner;
pub mod vcs;
