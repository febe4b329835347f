/// End-to-end integration tests for the docdrift pipeline.
///
/// Tests the complete flow:
///   Config → Scanner → Diff → Extractor → Matcher → Judge → Report
use docdrift::config::Config;
use docdrift::engine::Pipeline;
use docdrift::judge::Verdict;
use docdrift::judge::mock::MockJudge;
use docdrift::model::{ChangeKind, DocKind, SymbolKind};
use docdrift::report::{OutputFormat, render};
use docdrift::scanner::{self, DocSources};
use docdrift::vcs::memory::MemoryRepo;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SHIPPING_GO: &str = "package shop

// CalculateShipping returns the fee for an order total.
func CalculateShipping(total float64) float64 {
	if total >= 1000 {
		return 0
	}
	return 50
}
";

const GUIDE_MD: &str = "# Guide

Intro text.

## Shipping

Call `CalculateShipping` to get the fee. Orders of 500 or more ship free.

## Returns

Returns are accepted within 30 days.
";

const DIFF: &str = "diff --git a/shop/shipping.go b/shop/shipping.go
index 1111111..2222222 100644
--- a/shop/shipping.go
+++ b/shop/shipping.go
@@ -5,1 +5,1 @@ func CalculateShipping(total float64) float64 {
-	if total >= 500 {
+	if total >= 1000 {
";

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// Project tree on disk plus a repository holding the same sources.
fn setup(root: &Path) -> MemoryRepo {
    write(root, "README.md", "# Shop\n\nA tiny shop.\n");
    write(root, "docs/guide.md", GUIDE_MD);
    write(root, "shop/shipping.go", SHIPPING_GO);

    MemoryRepo::new()
        .with_diff(DIFF)
        .with_file("shop/shipping.go", SHIPPING_GO)
        .with_revision("main", "shop/shipping.go", SHIPPING_GO.replace(">= 1000", ">= 500"))
}

fn sources(go_comments: bool) -> DocSources {
    DocSources {
        include: vec!["README.md".into(), "docs/**/*.md".into()],
        exclude: Vec::new(),
        go_comments,
    }
}

/// Full pipeline with a judge: broad match → batch filter → verdict → report
#[test]
fn test_stale_section_is_reported() {
    let temp_dir = tempdir().unwrap();
    let repo = setup(temp_dir.path());

    let segments = scanner::scan_paths(temp_dir.path(), &sources(true)).unwrap();
    assert!(segments.iter().any(|s| s.kind == DocKind::GoDoc && s.heading == "func CalculateShipping"));
    assert!(segments.iter().any(|s| s.file == "docs/guide.md" && s.heading == "Shipping"));

    // Keep only the first candidate of each symbol's batch (the guide section).
    let judge = MockJudge::default()
        .with_relevant(vec![0])
        .with_verdict_for(
            "CalculateShipping",
            Verdict::inconsistent(
                0.92,
                "free shipping now starts at 1000, the guide says 500",
                "Change 500 to 1000 in the Shipping section",
            ),
        );
    let pipeline = Pipeline::new(&repo).with_judge(&judge).with_base("main");

    let diff = pipeline.fetch_diff(false).unwrap();
    let report = pipeline.check(&diff, &segments).unwrap();

    assert_eq!(report.total_symbols, 1, "Only CalculateShipping changed");
    assert_eq!(report.total_segments, segments.len());
    assert_eq!(report.relevant_pairs, 1);
    assert_eq!(report.inconsistent, 1);
    assert!(report.has_inconsistencies());

    let result = &report.results[0];
    assert_eq!(result.symbol.name, "CalculateShipping");
    assert_eq!(result.symbol.kind, SymbolKind::Function);
    assert_eq!(result.symbol.change_kind, ChangeKind::Modified);
    assert_eq!((result.symbol.start_line, result.symbol.end_line), (4, 9));
    assert!(result.symbol.old_code.contains(">= 500"));
    assert!(result.symbol.new_code.contains(">= 1000"));
    assert_eq!(result.segment.file, "docs/guide.md");
    assert_eq!(result.segment.start_line, 5);
    assert_eq!(judge.batch_calls(), 1);
    assert_eq!(judge.analyze_calls(), 1);

    let annotations = render(&report, OutputFormat::GithubActions, 0.8).unwrap();
    assert!(annotations.starts_with("::error file=docs/guide.md,line=5,"));
    assert!(annotations.contains("Change 500 to 1000"));
    assert!(annotations.trim_end().ends_with("::error::Found 1 documentation inconsistencies"));
}

/// Without a judge every keyword match passes through as consistent
#[test]
fn test_quick_mode_lists_related_sections() {
    let temp_dir = tempdir().unwrap();
    let repo = setup(temp_dir.path());

    let segments = scanner::scan_paths(temp_dir.path(), &sources(false)).unwrap();
    assert!(segments.iter().all(|s| s.kind == DocKind::Markdown));

    let pipeline = Pipeline::new(&repo).with_base("main");
    let report = pipeline.check(DIFF, &segments).unwrap();

    assert_eq!(report.relevant_pairs, 1);
    assert_eq!(report.inconsistent, 0);
    assert_eq!(report.results[0].segment.heading, "Shipping");
    assert_eq!(report.results[0].confidence, 1.0);

    let text = render(&report, OutputFormat::Text, 0.8).unwrap();
    assert!(text.contains("[1] [PASS]"));
    assert!(text.contains("CalculateShipping (function, modified)"));
}

/// Configuration file drives discovery
#[test]
fn test_config_file_selects_documents() {
    let temp_dir = tempdir().unwrap();
    setup(temp_dir.path());
    write(temp_dir.path(), "docs/draft/notes.md", "# Notes\n\nCalculateShipping draft.\n");

    let config_path = temp_dir.path().join(".docdrift.yaml");
    fs::write(
        &config_path,
        "base: main\ndocs:\n  include: [\"docs/**/*.md\"]\n  exclude: [\"docs/draft/**\"]\n  go_comments: true\n",
    )
    .unwrap();

    let config = Config::load_file(&config_path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.base, "main");

    let files = scanner::discover(temp_dir.path(), &config.docs.sources()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["docs/guide.md", "shop/shipping.go"]);
}

/// A deleted function still finds the docs that describe it
#[test]
fn test_deleted_symbol_matches_docs() {
    let temp_dir = tempdir().unwrap();
    setup(temp_dir.path());
    let segments = scanner::scan_paths(temp_dir.path(), &sources(false)).unwrap();

    let diff = "diff --git a/shop/shipping.go b/shop/shipping.go
deleted file mode 100644
--- a/shop/shipping.go
+++ /dev/null
@@ -1,9 +0,0 @@
-package shop
-
-// CalculateShipping returns the fee for an order total.
-func CalculateShipping(total float64) float64 {
-	if total >= 1000 {
-		return 0
-	}
-	return 50
-}
";
    let repo = MemoryRepo::new().with_revision("main", "shop/shipping.go", SHIPPING_GO);
    let judge = MockJudge::new(Verdict::inconsistent(0.85, "function was removed", "Remove the section"));
    let report = Pipeline::new(&repo)
        .with_judge(&judge)
        .with_base("main")
        .check(diff, &segments)
        .unwrap();

    assert_eq!(report.total_symbols, 1);
    assert!(report.results.iter().all(|r| r.symbol.change_kind == ChangeKind::Deleted));
    assert!(report.results.iter().any(|r| r.segment.heading == "Shipping"));
    assert_eq!(report.inconsistent, report.results.len());
}

/// Explicit binding blocks are checked against the bound declaration
#[test]
fn test_bound_block_is_checked() {
    let temp_dir = tempdir().unwrap();
    let repo = setup(temp_dir.path());
    write(
        temp_dir.path(),
        "docs/fees.md",
        "# Fees\n\n<!-- docuguard:start -->\n<!-- docuguard:bindCode path=\"shop/shipping.go\" func=\"CalculateShipping\" -->\nOrders of 500 or more ship free.\n<!-- docuguard:end -->\n",
    );

    let bindings = scanner::discover_bindings(temp_dir.path(), &sources(false)).unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].doc_file, "docs/fees.md");

    let judge = MockJudge::new(Verdict::inconsistent(0.9, "threshold is 1000", "Change 500 to 1000"));
    let report = Pipeline::new(&repo)
        .with_judge(&judge)
        .check_bindings(&bindings)
        .unwrap();

    assert_eq!(report.inconsistent, 1);
    assert_eq!(judge.batch_calls(), 0, "Bindings skip the relevance filter");
    assert_eq!(report.results[0].symbol.start_line, 4);

    let annotations = render(&report, OutputFormat::GithubActions, 0.8).unwrap();
    assert!(annotations.starts_with("::error file=docs/fees.md,line=4,"));
}
