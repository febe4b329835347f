//! Configuration module for docdrift.
//!
//! Handles loading, validating, and providing default configuration values.
//! Files are YAML or JSON; environment variables fill in credentials.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::report::OutputFormat;
use crate::scanner::DocSources;

/// File names searched in the working directory, then the home directory.
pub const CONFIG_FILE_NAMES: &[&str] = &[".docdrift.yaml", ".docdrift.yml", ".docdrift.json"];

/// Environment variable a freshly written config points its API key at.
pub const DEFAULT_API_KEY_VAR: &str = "OPENAI_API_KEY";

// ── Default value functions ──────────────────────────────────────────

fn default_base() -> String {
    "main".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_include() -> Vec<String> {
    vec!["README.md".to_string(), "docs/**/*.md".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f64 {
    crate::engine::DEFAULT_CONFIDENCE_THRESHOLD
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Revision the changes are compared against.
    #[serde(default = "default_base")]
    pub base: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub docs: DocsConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Literal key or `${ENV_VAR}` reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DocsConfig {
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Also check Go doc comments.
    #[serde(default)]
    pub go_comments: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RulesConfig {
    #[serde(default = "default_true")]
    pub fail_on_inconsistent: bool,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            base: default_base(),
            llm: LlmConfig::default(),
            docs: DocsConfig::default(),
            rules: RulesConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: Vec::new(),
            go_comments: false,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            fail_on_inconsistent: default_true(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl LlmConfig {
    /// Whether a semantic judge can be built from these settings.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DocsConfig {
    #[must_use]
    pub fn sources(&self) -> DocSources {
        DocSources {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            go_comments: self.go_comments,
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

impl Config {
    /// First existing config file in `dirs`, by [`CONFIG_FILE_NAMES`] order.
    pub fn find_in<P: AsRef<Path>>(dirs: &[P]) -> Option<PathBuf> {
        dirs.iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.as_ref().join(name)))
            .find(|path| path.is_file())
    }

    /// Look in the working directory, then the home directory.
    pub fn find() -> Option<PathBuf> {
        let mut dirs = vec![PathBuf::from(".")];
        if let Some(home) = dirs::home_dir() {
            dirs.push(home);
        }
        Self::find_in(&dirs)
    }

    /// Load configuration from `config_path`, or from the first file found by
    /// [`Config::find`], then apply environment overrides.
    ///
    /// A missing file yields defaults. A file that cannot be parsed is logged
    /// and replaced by defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => match Self::find() {
                Some(p) => p,
                None => {
                    info!("No config file found, using defaults");
                    let mut cfg = Self::default();
                    cfg.apply_env();
                    return Ok(cfg);
                }
            },
        };

        let mut cfg = Self::load_file(&path)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Read one config file without environment overrides.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let parsed = if is_yaml(path) {
            serde_yaml::from_str::<Config>(&data).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<Config>(&data).map_err(|e| e.to_string())
        };

        match parsed {
            Ok(cfg) => {
                info!("Loaded configuration from {}", path.display());
                Ok(cfg)
            }
            Err(e) => {
                warn!("Invalid config in {}: {e}", path.display());
                warn!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Save configuration; the format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = if is_yaml(path) {
            serde_yaml::to_string(self).context("failed to marshal config")?
        } else {
            serde_json::to_string_pretty(self).context("failed to marshal config")?
        };
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Write a starter config to `path`, keeping any existing file unless `force`.
    ///
    /// The API key is written as an `${OPENAI_API_KEY}` reference.
    pub fn write_default(path: &Path, force: bool) -> Result<Self> {
        anyhow::ensure!(
            force || !path.exists(),
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
        let mut config = Self::default();
        config.llm.api_key = format!("${{{DEFAULT_API_KEY_VAR}}}");
        config.save(path)?;
        info!("Wrote default config to {}", path.display());
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let key = self.llm.api_key.trim();
        if let Some(var) = key.strip_prefix("${").and_then(|k| k.strip_suffix('}')) {
            self.llm.api_key = non_empty(var).unwrap_or_default();
        }
        if self.llm.api_key.is_empty() {
            if let Some(key) = non_empty("DOCDRIFT_API_KEY").or_else(|| non_empty(DEFAULT_API_KEY_VAR)) {
                self.llm.api_key = key;
            }
        }
        if self.llm.base_url.is_empty() {
            if let Some(url) = non_empty("OPENAI_API_BASE") {
                self.llm.base_url = url;
            }
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.llm.model = model;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.base.trim().is_empty(), "base revision must not be empty");
        anyhow::ensure!(
            self.llm.provider == "openai",
            "unsupported llm.provider `{}` (expected `openai`)",
            self.llm.provider
        );
        anyhow::ensure!(self.llm.timeout_secs > 0, "llm.timeout_secs must be positive");
        anyhow::ensure!(
            !self.docs.include.is_empty() || self.docs.go_comments,
            "at least one documentation pattern must be specified"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.rules.confidence_threshold),
            "rules.confidence_threshold must be within [0, 1]"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base, "main");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.timeout(), Duration::from_secs(30));
        assert_eq!(config.docs.include, vec!["README.md", "docs/**/*.md"]);
        assert!(config.rules.fail_on_inconsistent);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(!config.llm.is_configured());
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = "base: develop\ndocs:\n  include: [\"guide/*.md\"]\n  go_comments: true\nrules:\n  confidence_threshold: 0.6\noutput:\n  format: github-actions\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.base, "develop");
        assert_eq!(config.docs.include, vec!["guide/*.md"]);
        assert!(config.docs.go_comments);
        assert_eq!(config.rules.confidence_threshold, 0.6);
        assert_eq!(config.output.format, OutputFormat::GithubActions);
        // Other fields should have defaults
        assert!(config.rules.fail_on_inconsistent);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"llm": {"model": "gpt-4o", "timeout_secs": 10}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.timeout_secs, 10);
        assert_eq!(config.base, "main");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.llm.api_key = "${MY_KEY}".to_string();
        config.apply_env_with(env(&[("MY_KEY", "secret"), ("OPENAI_MODEL", "gpt-4.1")]));
        assert_eq!(config.llm.api_key, "secret");
        assert_eq!(config.llm.model, "gpt-4.1");

        let mut config = Config::default();
        config.apply_env_with(env(&[
            ("DOCDRIFT_API_KEY", "dd"),
            ("OPENAI_API_KEY", "oa"),
            ("OPENAI_API_BASE", "http://localhost:11434/v1"),
        ]));
        assert_eq!(config.llm.api_key, "dd");
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");

        let mut config = Config::default();
        config.llm.api_key = "${UNSET}".to_string();
        config.apply_env_with(env(&[("OPENAI_API_KEY", "oa")]));
        assert_eq!(config.llm.api_key, "oa");
    }

    #[test]
    fn test_explicit_key_wins_over_env() {
        let mut config = Config::default();
        config.llm.api_key = "literal".to_string();
        config.apply_env_with(env(&[("OPENAI_API_KEY", "oa")]));
        assert_eq!(config.llm.api_key, "literal");
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.rules.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.docs.include.clear();
        assert!(config.validate().is_err());
        config.docs.go_comments = true;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.llm.provider = "anthropic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.base = "release".to_string();
        config.docs.exclude = vec!["docs/draft/**".to_string()];

        for name in [".docdrift.yaml", ".docdrift.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(Config::load_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_write_default_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAMES[0]);

        let written = Config::write_default(&path, false).unwrap();
        assert_eq!(written.llm.api_key, "${OPENAI_API_KEY}");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("OPENAI_API_KEY"));
        assert_eq!(Config::load_file(&path).unwrap(), written);

        std::fs::write(&path, "base: release\n").unwrap();
        let err = Config::write_default(&path, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "base: release\n");

        Config::write_default(&path, true).unwrap();
        assert_eq!(Config::load_file(&path).unwrap().base, "main");
    }

    #[test]
    fn test_find_prefers_yaml_in_first_dir() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        std::fs::write(second.path().join(".docdrift.yaml"), "base: x\n").unwrap();
        assert_eq!(
            Config::find_in(&[first.path(), second.path()]),
            Some(second.path().join(".docdrift.yaml"))
        );

        std::fs::write(first.path().join(".docdrift.json"), "{}").unwrap();
        assert_eq!(
            Config::find_in(&[first.path(), second.path()]),
            Some(first.path().join(".docdrift.json"))
        );
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".docdrift.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_file(&path).unwrap(), Config::default());

        let missing = dir.path().join("absent.yaml");
        assert_eq!(Config::load_file(&missing).unwrap(), Config::default());
    }
}
