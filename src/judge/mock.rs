//! Mock judge for testing purposes.
//!
//! Returns scripted verdicts and relevance answers and counts its calls.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{AnalyzeRequest, JudgeError, SemanticJudge, Verdict};
use crate::model::{ChangedSymbol, DocSegment};

pub struct MockJudge {
    verdict: Verdict,
    by_symbol: HashMap<String, Verdict>,
    relevant: Option<Vec<usize>>,
    analyze_error: Option<String>,
    batch_error: Option<String>,
    analyze_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl Default for MockJudge {
    fn default() -> Self {
        Self::new(Verdict::consistent(0.9, "documentation matches the code"))
    }
}

impl MockJudge {
    /// A judge that answers every pair with `verdict` and keeps every candidate.
    #[must_use]
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            by_symbol: HashMap::new(),
            relevant: None,
            analyze_error: None,
            batch_error: None,
            analyze_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// A judge whose every call fails.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::default()
            .with_analyze_error(message)
            .with_batch_error(message)
    }

    #[must_use]
    pub fn with_verdict_for(mut self, symbol: &str, verdict: Verdict) -> Self {
        self.by_symbol.insert(symbol.to_string(), verdict);
        self
    }

    /// Keep only these candidate indices in batch answers.
    #[must_use]
    pub fn with_relevant(mut self, indices: Vec<usize>) -> Self {
        self.relevant = Some(indices);
        self
    }

    #[must_use]
    pub fn with_analyze_error(mut self, message: &str) -> Self {
        self.analyze_error = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn with_batch_error(mut self, message: &str) -> Self {
        self.batch_error = Some(message.to_string());
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::Relaxed)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }
}

impl SemanticJudge for MockJudge {
    fn name(&self) -> &str {
        "mock"
    }

    fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<Verdict, JudgeError> {
        self.analyze_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.analyze_error {
            return Err(JudgeError::Unavailable(message.clone()));
        }
        Ok(self
            .by_symbol
            .get(request.code_symbol)
            .unwrap_or(&self.verdict)
            .clone())
    }

    fn check_relevance_batch(
        &self,
        _symbol: &ChangedSymbol,
        candidates: &[DocSegment],
    ) -> Result<Vec<usize>, JudgeError> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.batch_error {
            return Err(JudgeError::Unavailable(message.clone()));
        }
        Ok(match &self.relevant {
            Some(indices) => indices
                .iter()
                .copied()
                .filter(|&i| i < candidates.len())
                .collect(),
            None => (0..candidates.len()).collect(),
        })
    }
}
