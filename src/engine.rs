//! End-to-end check: diff → changed symbols → candidate doc segments →
//! consistency verdicts. Explicit bindings skip the matching step.
use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff;
use crate::extractor::declarations::{self, Declaration, DeclarationParser};
use crate::extractor::languages::LanguageConfig;
use crate::extractor::{ExtractError, ExtractionStats, SymbolExtractor};
use crate::judge::{AnalyzeRequest, SemanticJudge, Verdict};
use crate::matcher::{self, Aggregation};
use crate::model::{Binding, ChangeKind, ChangedSymbol, DocSegment, RelevanceResult};
use crate::vcs::VersionControl;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const JUDGE_CONFIRMED_REASON: &str = "confirmed relevant by judge";
pub const BINDING_REASON: &str = "explicit binding";

/// Verdict for one symbol/segment pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub symbol: ChangedSymbol,
    pub segment: DocSegment,
    pub related: bool,
    pub consistent: bool,
    pub confidence: f64,
    /// Score assigned by the matcher before any judgement.
    pub match_confidence: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
}

impl CheckResult {
    /// Inconsistent with enough confidence to report.
    pub fn is_violation(&self, threshold: f64) -> bool {
        self.related && !self.consistent && self.confidence >= threshold
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total_symbols: usize,
    pub total_segments: usize,
    pub relevant_pairs: usize,
    pub inconsistent: usize,
    /// Source files that could not be read or parsed.
    pub skipped_files: usize,
    pub results: Vec<CheckResult>,
    pub execution_time_ms: u64,
}

impl Report {
    pub fn has_inconsistencies(&self) -> bool {
        self.inconsistent > 0
    }
}

/// Joins extraction, matching and the optional semantic judge.
///
/// Without a judge the cheap keyword pass decides relevance and every pair is
/// reported as consistent; with one, the broad pass feeds a batch relevance
/// filter and a per-pair consistency check.
pub struct Pipeline<'a> {
    vcs: &'a dyn VersionControl,
    judge: Option<&'a dyn SemanticJudge>,
    base: String,
    confidence_threshold: f64,
}

impl<'a> Pipeline<'a> {
    pub fn new(vcs: &'a dyn VersionControl) -> Self {
        Self {
            vcs,
            judge: None,
            base: crate::extractor::DEFAULT_BASE_REVISION.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_judge(mut self, judge: &'a dyn SemanticJudge) -> Self {
        self.judge = Some(judge);
        self
    }

    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    #[must_use]
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Diff against the base revision, or of the uncommitted work.
    pub fn fetch_diff(&self, uncommitted: bool) -> Result<String> {
        let raw = if uncommitted {
            self.vcs
                .uncommitted_diff()
                .context("Failed to read uncommitted changes")?
        } else {
            self.vcs
                .diff(&self.base)
                .with_context(|| format!("Failed to diff against {}", self.base))?
        };
        let text = diff::decode(&raw).context("Diff output is not readable")?;
        Ok(text.to_string())
    }

    pub fn changed_symbols(&self, diff: &str) -> Result<(Vec<ChangedSymbol>, ExtractionStats)> {
        let mut extractor = SymbolExtractor::new(self.vcs)
            .context("Failed to initialize symbol extractor")?
            .with_base(self.base.clone());
        extractor
            .extract_with_stats(diff)
            .context("Failed to extract changed symbols")
    }

    /// Candidate pairs for the configured mode.
    pub fn find_pairs(&self, symbols: &[ChangedSymbol], segments: &[DocSegment]) -> Vec<RelevanceResult> {
        let Some(judge) = self.judge else {
            return matcher::quick_match(symbols, segments);
        };

        let candidates = matcher::reduce_results(
            matcher::broad_match(symbols, segments),
            Aggregation::KeepMax,
        );
        debug!("Broad match produced {} candidates", candidates.len());

        let mut pairs = Vec::new();
        for group in matcher::group_by_symbol(candidates) {
            match judge.check_relevance_batch(&group.symbol, &group.segments()) {
                Ok(indices) => {
                    let mut candidates: Vec<Option<RelevanceResult>> =
                        group.candidates.into_iter().map(Some).collect();
                    for idx in indices {
                        if let Some(mut pair) = candidates.get_mut(idx).and_then(Option::take) {
                            pair.reason = format!("{JUDGE_CONFIRMED_REASON} ({})", pair.reason);
                            pairs.push(pair);
                        }
                    }
                }
                Err(e) => {
                    warn!("Relevance check failed for {}: {e}", group.symbol.name);
                    pairs.extend(group.candidates.into_iter().map(|mut pair| {
                        pair.reason = format!("{} (relevance check failed: {e})", pair.reason);
                        pair
                    }));
                }
            }
        }
        pairs
    }

    /// Run the whole check over `diff` against already scanned segments.
    pub fn check(&self, diff: &str, segments: &[DocSegment]) -> Result<Report> {
        let start = Instant::now();
        let (symbols, stats) = self.changed_symbols(diff)?;

        let mut report = Report {
            total_symbols: symbols.len(),
            total_segments: segments.len(),
            skipped_files: stats.files_skipped,
            ..Report::default()
        };

        if !symbols.is_empty() && !segments.is_empty() {
            let pairs = self.find_pairs(&symbols, segments);
            report.relevant_pairs = pairs.len();
            for pair in pairs {
                let result = self.judge_pair(pair);
                if result.is_violation(self.confidence_threshold) {
                    report.inconsistent += 1;
                }
                report.results.push(result);
            }
        }

        report.execution_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Checked {} symbols against {} segments: {} pairs, {} inconsistent",
            report.total_symbols, report.total_segments, report.relevant_pairs, report.inconsistent
        );
        Ok(report)
    }

    /// Judge each explicitly bound declaration against its documented block.
    ///
    /// Declarations are read from the working tree. A symbol missing from its
    /// file is reported as inconsistent with full confidence; bindings to a
    /// file that cannot be read or parsed are skipped.
    pub fn check_bindings(&self, bindings: &[Binding]) -> Result<Report> {
        let start = Instant::now();
        let mut parser = DeclarationParser::new(LanguageConfig::go())
            .context("Failed to initialize declaration parser")?;
        let mut sources: HashMap<&str, Option<Vec<Declaration>>> = HashMap::new();

        let mut report = Report {
            total_symbols: bindings.len(),
            total_segments: bindings.len(),
            ..Report::default()
        };

        for binding in bindings {
            let path = binding.code_file.as_str();
            if !sources.contains_key(path) {
                let parsed = self
                    .vcs
                    .current_file(path)
                    .map_err(ExtractError::from)
                    .and_then(|text| parser.parse(path, &text));
                let decls = match parsed {
                    Ok(decls) => Some(decls),
                    Err(e) => {
                        warn!("Skipping bindings to {path}: {e}");
                        report.skipped_files += 1;
                        None
                    }
                };
                sources.insert(path, decls);
            }
            let Some(Some(decls)) = sources.get(path) else {
                continue;
            };

            let found = declarations::find(decls, &binding.symbol, binding.kind);
            let symbol = bound_symbol(binding, found);
            let segment = binding.segment();
            let result = if found.is_some() {
                self.judge_pair(RelevanceResult {
                    symbol,
                    segment,
                    confidence: 1.0,
                    reason: BINDING_REASON.to_string(),
                })
            } else {
                CheckResult {
                    related: true,
                    consistent: false,
                    confidence: 1.0,
                    match_confidence: 1.0,
                    reason: format!("symbol {} not found in file {}", binding.symbol, path),
                    suggestion: String::new(),
                    symbol,
                    segment,
                }
            };
            if result.is_violation(self.confidence_threshold) {
                report.inconsistent += 1;
            }
            report.results.push(result);
        }

        report.relevant_pairs = report.results.len();
        report.execution_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Checked {} bindings: {} inconsistent, {} files skipped",
            bindings.len(),
            report.inconsistent,
            report.skipped_files
        );
        Ok(report)
    }

    fn judge_pair(&self, pair: RelevanceResult) -> CheckResult {
        let Some(judge) = self.judge else {
            return CheckResult {
                related: true,
                consistent: true,
                confidence: pair.confidence,
                match_confidence: pair.confidence,
                reason: format!("{}; semantic check skipped", pair.reason),
                suggestion: String::new(),
                symbol: pair.symbol,
                segment: pair.segment,
            };
        };

        let verdict = judge
            .analyze(&AnalyzeRequest::new(&pair.symbol, &pair.segment))
            .map(Verdict::normalized);
        match verdict {
            Ok(v) => CheckResult {
                related: v.related,
                consistent: v.consistent,
                confidence: v.confidence,
                match_confidence: pair.confidence,
                reason: v.reason,
                suggestion: v.suggestion,
                symbol: pair.symbol,
                segment: pair.segment,
            },
            Err(e) => {
                warn!(
                    "Judge {} failed on {} / {}: {e}",
                    judge.name(),
                    pair.symbol.name,
                    pair.segment.heading
                );
                CheckResult {
                    related: true,
                    consistent: true,
                    confidence: pair.confidence,
                    match_confidence: pair.confidence,
                    reason: format!("judge failed ({e}); falling back to matcher score: {}", pair.reason),
                    suggestion: String::new(),
                    symbol: pair.symbol,
                    segment: pair.segment,
                }
            }
        }
    }
}

/// The bound declaration in its current form; without one only the name is known.
fn bound_symbol(binding: &Binding, decl: Option<&Declaration>) -> ChangedSymbol {
    let (start_line, end_line) = decl.map_or((0, 0), |d| (d.span().start, d.span().end));
    ChangedSymbol {
        file: binding.code_file.clone(),
        name: binding.symbol.clone(),
        kind: binding.kind,
        change_kind: ChangeKind::Modified,
        start_line,
        end_line,
        old_code: String::new(),
        new_code: decl.map(|d| d.code().to_string()).unwrap_or_default(),
    }
}
