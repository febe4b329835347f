//! Semantic judge trait and shared request/verdict types.
//!
//! A judge decides whether a documentation segment describes a changed symbol
//! and whether the two still agree.
pub mod mock;
pub mod openai;
pub mod prompt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ChangedSymbol, DocSegment};

/// Errors that can occur while consulting a judge.
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no response from API")]
    EmptyResponse,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("judge unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for JudgeError {
    fn from(e: reqwest::Error) -> Self {
        JudgeError::Request(e.to_string())
    }
}

fn default_true() -> bool {
    true
}

/// The judge's answer for one symbol/segment pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default = "default_true")]
    pub related: bool,
    #[serde(default = "default_true")]
    pub consistent: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
}

impl Verdict {
    pub fn consistent(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            related: true,
            consistent: true,
            confidence,
            reason: reason.into(),
            suggestion: String::new(),
        }
    }

    pub fn inconsistent(
        confidence: f64,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            related: true,
            consistent: false,
            confidence,
            reason: reason.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Clamp the confidence into `[0, 1]`; an unrelated pair is never inconsistent.
    pub fn normalized(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !self.related {
            self.consistent = true;
        }
        self
    }
}

/// Fields sent to the judge for a consistency check.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub doc_content: &'a str,
    pub code_content: &'a str,
    pub code_symbol: &'a str,
    pub code_file: &'a str,
}

impl<'a> AnalyzeRequest<'a> {
    pub fn new(symbol: &'a ChangedSymbol, segment: &'a DocSegment) -> Self {
        Self {
            doc_content: &segment.content,
            code_content: symbol.code(),
            code_symbol: &symbol.name,
            code_file: &symbol.file,
        }
    }
}

/// Trait for semantic judge implementations.
pub trait SemanticJudge: Send + Sync {
    fn name(&self) -> &str;

    /// Judge whether the documentation still matches the code.
    fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<Verdict, JudgeError>;

    /// Indices of `candidates` that specifically describe `symbol`.
    fn check_relevance_batch(
        &self,
        symbol: &ChangedSymbol,
        candidates: &[DocSegment],
    ) -> Result<Vec<usize>, JudgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_defaults() {
        let verdict: Verdict = serde_json::from_str(r#"{"consistent": false, "confidence": 0.9}"#).unwrap();
        assert!(verdict.related);
        assert!(!verdict.consistent);
        assert!(verdict.reason.is_empty());
    }

    #[test]
    fn test_normalized_verdict() {
        let verdict = Verdict {
            related: false,
            consistent: false,
            confidence: 1.7,
            reason: "other function".into(),
            suggestion: String::new(),
        }
        .normalized();
        assert!(verdict.consistent);
        assert_eq!(verdict.confidence, 1.0);

        let nan = Verdict::consistent(f64::NAN, "x").normalized();
        assert_eq!(nan.confidence, 0.0);
    }
}
