use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docdrift::config::{CONFIG_FILE_NAMES, Config};
use docdrift::engine::{Pipeline, Report};
use docdrift::judge::SemanticJudge;
use docdrift::judge::openai::OpenAiJudge;
use docdrift::report::{self, OutputFormat};
use docdrift::scanner;
use docdrift::vcs::git::GitCli;

#[derive(Parser)]
#[command(
    name = "docdrift",
    about = "Find documentation that may be stale after a code change",
    version
)]
struct Cli {
    /// Config file (default: .docdrift.yaml/.json in cwd, then home)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check documentation against the current changes, or the explicit
    /// bindings of the given markdown files
    Check {
        /// Markdown files whose binding blocks are checked
        files: Vec<PathBuf>,

        /// Check the binding blocks of every configured document
        #[arg(long, conflicts_with = "files")]
        all: bool,

        /// Revision to compare against (overrides `base` in config)
        #[arg(long)]
        base: Option<String>,

        /// Check staged and unstaged changes instead of the branch diff
        #[arg(long)]
        uncommitted: bool,

        /// Keyword matching only, no semantic judge
        #[arg(long)]
        quick: bool,

        /// Output format (overrides `output.format` in config)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Documentation patterns (override `docs.include` in config)
        #[arg(long = "docs", num_args = 1..)]
        docs: Vec<String>,
    },

    /// Print the changed symbols as JSON
    Symbols {
        #[arg(long)]
        base: Option<String>,

        #[arg(long)]
        uncommitted: bool,
    },

    /// Print the documentation segments of the given files as JSON
    Segments {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Write a default config file (the --config path, or .docdrift.yaml)
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Check {
            files,
            all,
            base,
            uncommitted,
            quick,
            format,
            docs,
        } => {
            let mut config = Config::load(config_path)?;
            if let Some(base) = base {
                config.base = base;
            }
            if let Some(format) = format {
                config.output.format = format;
            }
            if !docs.is_empty() {
                config.docs.include = docs;
            }
            config.validate()?;
            if all || !files.is_empty() {
                check_bindings(&config, &files, quick)
            } else {
                check(&config, uncommitted, quick)
            }
        }
        Command::Symbols { base, uncommitted } => {
            let mut config = Config::load(config_path)?;
            if let Some(base) = base {
                config.base = base;
            }
            let git = GitCli::discover(".")?;
            let pipeline = Pipeline::new(&git).with_base(revision(&config, uncommitted));
            let diff = pipeline.fetch_diff(uncommitted)?;
            let (symbols, _) = pipeline.changed_symbols(&diff)?;
            println!("{}", serde_json::to_string_pretty(&symbols)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Segments { paths } => {
            let segments = scanner::scan_files(&paths)?;
            println!("{}", serde_json::to_string_pretty(&segments)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { force } => {
            let path = config_path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAMES[0]), Path::to_path_buf);
            Config::write_default(&path, force)?;
            println!("Created {}", path.display());
            println!("Set OPENAI_API_KEY, or edit the file to configure the judge.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Uncommitted changes are relative to `HEAD` whatever the configured base.
fn revision(config: &Config, uncommitted: bool) -> String {
    if uncommitted {
        docdrift::extractor::DEFAULT_BASE_REVISION.to_string()
    } else {
        config.base.clone()
    }
}

fn build_judge(config: &Config) -> Result<Option<OpenAiJudge>> {
    if !config.llm.is_configured() {
        warn!("No API key configured, falling back to keyword matching");
        return Ok(None);
    }
    let judge = OpenAiJudge::new(
        &config.llm.base_url,
        &config.llm.api_key,
        &config.llm.model,
        config.llm.timeout(),
    )
    .context("Failed to initialize semantic judge")?;
    info!("Using {} model {}", judge.name(), judge.model());
    Ok(Some(judge))
}

fn check(config: &Config, uncommitted: bool, quick: bool) -> Result<ExitCode> {
    let git = GitCli::discover(".")?;
    let judge = if quick { None } else { build_judge(config)? };

    let mut pipeline = Pipeline::new(&git)
        .with_base(revision(config, uncommitted))
        .with_confidence_threshold(config.rules.confidence_threshold);
    if let Some(judge) = judge.as_ref() {
        pipeline = pipeline.with_judge(judge);
    }

    let diff = pipeline.fetch_diff(uncommitted)?;
    if diff.trim().is_empty() {
        info!("No changes to check");
    }

    let segments = scanner::scan_paths(Path::new("."), &config.docs.sources())
        .context("Failed to scan documentation")?;
    let report = pipeline.check(&diff, &segments)?;
    finish(config, &report)
}

/// Binding mode: explicit files, or every configured document when none are given.
fn check_bindings(config: &Config, files: &[PathBuf], quick: bool) -> Result<ExitCode> {
    let bindings = if files.is_empty() {
        let mut sources = config.docs.sources();
        sources.go_comments = false;
        scanner::discover_bindings(Path::new("."), &sources)
    } else {
        scanner::scan_bindings(files)
    }
    .context("Failed to read bindings")?;
    if bindings.is_empty() {
        info!("No bindings found");
    }

    let git = GitCli::new(".");
    let judge = if quick { None } else { build_judge(config)? };
    let mut pipeline = Pipeline::new(&git).with_confidence_threshold(config.rules.confidence_threshold);
    if let Some(judge) = judge.as_ref() {
        pipeline = pipeline.with_judge(judge);
    }

    let report = pipeline.check_bindings(&bindings)?;
    finish(config, &report)
}

fn finish(config: &Config, report: &Report) -> Result<ExitCode> {
    let rendered = report::render(report, config.output.format, config.rules.confidence_threshold)?;
    println!("{}", rendered.trim_end());

    if report.has_inconsistencies() && config.rules.fail_on_inconsistent {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
