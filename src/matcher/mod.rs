//! Relevance scoring between changed symbols and documentation segments.
//!
//! Two independent confidence models are offered: the broad multi-heuristic
//! pass ([`broad_match`]) feeding a semantic judge, and the cheaper keyword
//! pass ([`quick_match`]) used when no judge runs.
pub mod keywords;

use std::collections::HashMap;

use regex::Regex;

use crate::model::{ChangeKind, ChangedSymbol, DocSegment, RelevanceResult};
pub use keywords::split_camel_case;

pub const QUICK_MATCH_REASON: &str = "keyword match";

/// A single scoring rule of the broad pass, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    ExactName,
    CodeFence,
    Keyword,
    PartialPrefix,
}

impl Heuristic {
    pub const ALL: [Heuristic; 4] = [
        Heuristic::ExactName,
        Heuristic::CodeFence,
        Heuristic::Keyword,
        Heuristic::PartialPrefix,
    ];

    /// Maximum contribution of the heuristic.
    pub fn weight(&self) -> f64 {
        match self {
            Heuristic::ExactName => 1.0,
            Heuristic::CodeFence => 0.8,
            Heuristic::Keyword => 0.5,
            Heuristic::PartialPrefix => 0.3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Heuristic::ExactName => "exact name match",
            Heuristic::CodeFence => "found in code block",
            Heuristic::Keyword => "keyword match",
            Heuristic::PartialPrefix => "partial name match",
        }
    }
}

/// One heuristic firing for a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub heuristic: Heuristic,
    pub contribution: f64,
}

/// How several scores for the same pair are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Add the scores and clamp to 1.
    Sum,
    KeepMax,
}

impl Aggregation {
    pub fn combine<I: IntoIterator<Item = f64>>(&self, scores: I) -> f64 {
        let combined = match self {
            Aggregation::Sum => scores.into_iter().sum::<f64>(),
            Aggregation::KeepMax => scores.into_iter().fold(0.0, f64::max),
        };
        combined.clamp(0.0, 1.0)
    }
}

/// Lowercased views of a segment shared by all heuristics.
struct SegmentText {
    heading: String,
    content: String,
}

impl SegmentText {
    fn new(segment: &DocSegment) -> Self {
        Self {
            heading: segment.heading.to_lowercase(),
            content: segment.content.to_lowercase(),
        }
    }

    fn contains(&self, needle: &str) -> bool {
        self.content.contains(needle) || self.heading.contains(needle)
    }
}

/// The multi-heuristic, high-recall scorer.
pub struct BroadMatcher {
    code_fence: Regex,
}

impl Default for BroadMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadMatcher {
    pub fn new() -> Self {
        Self {
            code_fence: Regex::new(r"(?s)```[^\n]*\n(.*?)```|~~~[^\n]*\n(.*?)~~~").unwrap(),
        }
    }

    /// Every heuristic that fires for the pair, in evaluation order.
    pub fn hits(&self, symbol: &ChangedSymbol, segment: &DocSegment) -> Vec<Hit> {
        if symbol.name.is_empty() {
            return Vec::new();
        }
        let name = symbol.name.to_lowercase();
        let text = SegmentText::new(segment);

        Heuristic::ALL
            .iter()
            .filter_map(|&heuristic| {
                let contribution = match heuristic {
                    Heuristic::ExactName => text.contains(&name).then_some(1.0),
                    Heuristic::CodeFence => self.in_code_block(&segment.content, &name).then_some(1.0),
                    Heuristic::Keyword => keyword_ratio(&symbol.name, &text),
                    // Body text only; a heading alone is not enough.
                    Heuristic::PartialPrefix => partial_prefix(&symbol.name)
                        .is_some_and(|prefix| text.content.contains(&prefix))
                        .then_some(1.0),
                }?;
                Some(Hit {
                    heuristic,
                    contribution: contribution * heuristic.weight(),
                })
            })
            .collect()
    }

    /// Score one pair; `None` when nothing fires.
    pub fn score(&self, symbol: &ChangedSymbol, segment: &DocSegment) -> Option<RelevanceResult> {
        let hits = self.hits(symbol, segment);
        if hits.is_empty() {
            return None;
        }
        let confidence = Aggregation::Sum.combine(hits.iter().map(|h| h.contribution));
        let reason = hits
            .iter()
            .map(|h| h.heuristic.label())
            .collect::<Vec<_>>()
            .join(", ");
        Some(RelevanceResult {
            symbol: symbol.clone(),
            segment: segment.clone(),
            confidence,
            reason,
        })
    }

    pub fn match_all(&self, symbols: &[ChangedSymbol], segments: &[DocSegment]) -> Vec<RelevanceResult> {
        symbols
            .iter()
            .flat_map(|sym| segments.iter().filter_map(move |seg| self.score(sym, seg)))
            .collect()
    }

    fn in_code_block(&self, content: &str, name: &str) -> bool {
        self.code_fence.captures_iter(content).any(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .is_some_and(|body| body.as_str().to_lowercase().contains(name))
        })
    }
}

/// Fraction of the name's sub-words found in the segment, if any is.
fn keyword_ratio(name: &str, text: &SegmentText) -> Option<f64> {
    let words = split_camel_case(name);
    let matched = words
        .iter()
        .filter(|w| keywords::is_significant(w) && text.contains(w))
        .count();
    (matched > 0).then(|| matched as f64 / words.len() as f64)
}

/// Lowercase first half of names longer than five characters.
fn partial_prefix(name: &str) -> Option<String> {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= 5 {
        return None;
    }
    let prefix: String = chars[..chars.len() / 2].iter().collect::<String>().to_lowercase();
    (prefix.chars().count() > 3).then_some(prefix)
}

/// Broad pass over every pair; no threshold is applied.
pub fn broad_match(symbols: &[ChangedSymbol], segments: &[DocSegment]) -> Vec<RelevanceResult> {
    BroadMatcher::new().match_all(symbols, segments)
}

/// Keyword-only pass: the name and its sub-words are the terms, and the
/// confidence is the fraction of terms found in the segment.
pub fn quick_match(symbols: &[ChangedSymbol], segments: &[DocSegment]) -> Vec<RelevanceResult> {
    let mut results = Vec::new();
    for sym in symbols {
        if sym.name.is_empty() {
            continue;
        }
        let mut terms = split_camel_case(&sym.name);
        terms.push(sym.name.to_lowercase());

        for seg in segments {
            let text = SegmentText::new(seg);
            let matched = terms
                .iter()
                .filter(|t| keywords::is_significant(t) && text.contains(t))
                .count();
            if matched == 0 {
                continue;
            }
            results.push(RelevanceResult {
                symbol: sym.clone(),
                segment: seg.clone(),
                confidence: (matched as f64 / terms.len() as f64).clamp(0.0, 1.0),
                reason: QUICK_MATCH_REASON.to_string(),
            });
        }
    }
    results
}

type PairKey = (String, String, ChangeKind, String, usize);

fn pair_key(result: &RelevanceResult) -> PairKey {
    (
        result.symbol.file.clone(),
        result.symbol.name.clone(),
        result.symbol.change_kind,
        result.segment.file.clone(),
        result.segment.start_line,
    )
}

/// Collapse results for the same symbol/segment pair, keeping first-seen order.
pub fn reduce_results(results: Vec<RelevanceResult>, aggregation: Aggregation) -> Vec<RelevanceResult> {
    let mut index: HashMap<PairKey, usize> = HashMap::new();
    let mut reduced: Vec<RelevanceResult> = Vec::new();

    for result in results {
        let key = pair_key(&result);
        let Some(&slot) = index.get(&key) else {
            index.insert(key, reduced.len());
            reduced.push(result);
            continue;
        };
        let existing = &mut reduced[slot];
        match aggregation {
            Aggregation::Sum => {
                existing.confidence = aggregation.combine([existing.confidence, result.confidence]);
                for reason in result.reason.split(", ") {
                    if !existing.reason.split(", ").any(|r| r == reason) {
                        existing.reason.push_str(", ");
                        existing.reason.push_str(reason);
                    }
                }
            }
            Aggregation::KeepMax => {
                if result.confidence > existing.confidence {
                    *existing = result;
                }
            }
        }
    }
    reduced
}

/// One symbol's candidate segments, for batch review.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    pub symbol: ChangedSymbol,
    pub candidates: Vec<RelevanceResult>,
}

impl CandidateGroup {
    pub fn segments(&self) -> Vec<DocSegment> {
        self.candidates.iter().map(|c| c.segment.clone()).collect()
    }
}

/// Group results by `(symbol.file, symbol.name)` in first-seen order.
pub fn group_by_symbol(results: Vec<RelevanceResult>) -> Vec<CandidateGroup> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<CandidateGroup> = Vec::new();

    for result in results {
        let key = (result.symbol.file.clone(), result.symbol.name.clone());
        match index.get(&key) {
            Some(&slot) => groups[slot].candidates.push(result),
            None => {
                index.insert(key, groups.len());
                groups.push(CandidateGroup {
                    symbol: result.symbol.clone(),
                    candidates: vec![result],
                });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocKind, SymbolKind};

    fn symbol(name: &str) -> ChangedSymbol {
        ChangedSymbol {
            file: "shop/shipping.go".into(),
            name: name.into(),
            kind: SymbolKind::Function,
            change_kind: ChangeKind::Modified,
            start_line: 1,
            end_line: 5,
            old_code: String::new(),
            new_code: format!("func {name}() {{}}"),
        }
    }

    fn segment(heading: &str, content: &str) -> DocSegment {
        DocSegment {
            file: "docs/shipping.md".into(),
            heading: heading.into(),
            level: 2,
            start_line: 10,
            end_line: 20,
            content: content.into(),
            kind: DocKind::Markdown,
        }
    }

    fn contribution(hits: &[Hit], heuristic: Heuristic) -> Option<f64> {
        hits.iter()
            .find(|h| h.heuristic == heuristic)
            .map(|h| h.contribution)
    }

    #[test]
    fn test_exact_name_clamps_to_one() {
        let seg = segment(
            "Shipping Rules",
            "## Shipping Rules\nCalculateShipping returns 0 when amount >= 500",
        );
        let result = BroadMatcher::new()
            .score(&symbol("CalculateShipping"), &seg)
            .unwrap();
        assert_eq!(result.confidence, 1.0);
        assert_eq!(
            result.reason,
            "exact name match, keyword match, partial name match"
        );
    }

    #[test]
    fn test_decomposed_keyword_contribution() {
        let matcher = BroadMatcher::new();
        let seg = segment("Overview", "minimum");
        let hits = matcher.hits(&symbol("MinimumNArgs"), &seg);

        // One of three sub-words; "n" is too short to count.
        let keyword = contribution(&hits, Heuristic::Keyword).unwrap();
        assert!((keyword - 0.5 / 3.0).abs() < 1e-9);

        // "minimu" is also found, so the prefix rule fires too.
        let prefix = contribution(&hits, Heuristic::PartialPrefix).unwrap();
        assert!((prefix - 0.3).abs() < 1e-9);

        let result = matcher.score(&symbol("MinimumNArgs"), &seg).unwrap();
        assert!((result.confidence - (0.5 / 3.0 + 0.3)).abs() < 1e-9);
        assert_eq!(result.reason, "keyword match, partial name match");

        // The heading supplies a second sub-word.
        let hits = matcher.hits(&symbol("MinimumNArgs"), &segment("Args", "minimum"));
        let keyword = contribution(&hits, Heuristic::Keyword).unwrap();
        assert!((keyword - 0.5 * 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_prefix_ignores_heading() {
        let matcher = BroadMatcher::new();
        let hits = matcher.hits(&symbol("MinimumNArgs"), &segment("Minimum", "see below"));
        assert!(contribution(&hits, Heuristic::Keyword).is_some());
        assert!(contribution(&hits, Heuristic::PartialPrefix).is_none());
    }

    #[test]
    fn test_code_fence_heuristic() {
        let seg = segment(
            "Usage",
            "## Usage\n```go\nfee := calcfee(order)\n```\n\n~~~\nother\n~~~",
        );
        let hits = BroadMatcher::new().hits(&symbol("CalcFee"), &seg);
        let labels: Vec<Heuristic> = hits.iter().map(|h| h.heuristic).collect();
        assert_eq!(
            labels,
            vec![Heuristic::ExactName, Heuristic::CodeFence, Heuristic::Keyword]
        );
        assert_eq!(contribution(&hits, Heuristic::CodeFence), Some(0.8));
    }

    #[test]
    fn test_unrelated_pair_is_excluded() {
        let results = broad_match(
            &[symbol("CalculateShipping")],
            &[segment("Payments", "Refunds are processed weekly.")],
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_scores_are_bounded_and_monotone() {
        let matcher = BroadMatcher::new();
        let names = ["CalculateShipping", "MinimumNArgs", "Fee", "max_retry_count", "X"];
        let segments = [
            segment("Shipping", "calculate the fee"),
            segment("Retry", "```\nmax_retry_count = 3\n```"),
            segment("Args", "MinimumNArgs(2) requires minimum args"),
            segment("", ""),
        ];
        for name in names {
            for seg in &segments {
                let hits = matcher.hits(&symbol(name), seg);
                let mut previous = 0.0;
                for n in 0..=hits.len() {
                    let score = Aggregation::Sum.combine(hits[..n].iter().map(|h| h.contribution));
                    assert!((0.0..=1.0).contains(&score));
                    assert!(score >= previous);
                    previous = score;
                }
            }
        }
    }

    #[test]
    fn test_quick_match_uses_term_fraction() {
        let seg = segment("Limits", "minimum number of args");
        let results = quick_match(&[symbol("MinimumNArgs")], &[seg]);
        assert_eq!(results.len(), 1);
        // Terms: minimum, n, args, minimumnargs.
        assert!((results[0].confidence - 0.5).abs() < 1e-9);
        assert_eq!(results[0].reason, QUICK_MATCH_REASON);

        // No code-fence or prefix contribution.
        let seg = segment("Code", "```\ncalcul\n```");
        assert!(quick_match(&[symbol("CalculateShipping")], &[seg]).is_empty());
    }

    #[test]
    fn test_underscore_names_are_not_split() {
        let sym = symbol("max_retry_count");
        let prose = segment("Retries", "The max retry count is 3.");
        assert!(quick_match(std::slice::from_ref(&sym), &[prose.clone()]).is_empty());
        assert!(BroadMatcher::new().hits(&sym, &prose).is_empty());

        let literal = segment("Retries", "Set max_retry_count to 3.");
        let results = quick_match(&[sym], &[literal]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, 1.0);
    }

    #[test]
    fn test_reduce_results() {
        let sym = symbol("CalculateShipping");
        let seg = segment("Shipping", "text");
        let make = |confidence: f64, reason: &str| RelevanceResult {
            symbol: sym.clone(),
            segment: seg.clone(),
            confidence,
            reason: reason.to_string(),
        };
        let mut other = make(0.2, "keyword match");
        other.segment.start_line = 40;

        let input = vec![
            make(0.4, "keyword match"),
            other.clone(),
            make(0.7, "exact name match"),
        ];

        let max = reduce_results(input.clone(), Aggregation::KeepMax);
        assert_eq!(max.len(), 2);
        assert_eq!(max[0].confidence, 0.7);
        assert_eq!(max[0].reason, "exact name match");
        assert_eq!(max[1], other);

        let sum = reduce_results(input, Aggregation::Sum);
        assert_eq!(sum[0].confidence, 1.0);
        assert_eq!(sum[0].reason, "keyword match, exact name match");
    }

    #[test]
    fn test_group_by_symbol_keeps_first_seen_order() {
        let segs = [segment("A", "fee shipping"), segment("B", "shipping fee")];
        let results = broad_match(&[symbol("ShippingFee"), symbol("Fee")], &segs);
        let groups = group_by_symbol(results);
        let names: Vec<&str> = groups.iter().map(|g| g.symbol.name.as_str()).collect();
        assert_eq!(names, vec!["ShippingFee", "Fee"]);
        assert_eq!(groups[0].segments().len(), 2);
    }
}
