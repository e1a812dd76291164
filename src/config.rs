//! TOML configuration parsing and validation.
//!
//! Every deployment-specific value (document directory, model identity,
//! model server URL, persona, bind address) lives in the config file; only
//! the `[corpus].dir` key is mandatory.
//!
//! ```toml
//! [corpus]
//! dir = "./science_directory"
//!
//! [llm]
//! model = "llama3.2"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Extensions the corpus loader knows how to extract text from.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tutor: TutorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub dir: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "llama3.2".to_string()
}
fn default_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}

/// Persona settings for the system turn of every conversation.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TutorConfig {
    /// Replaces the built-in science tutor persona when set.
    #[serde(default)]
    pub persona: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Config {
    /// Builds a config rooted at `dir` with every other section defaulted.
    pub fn with_corpus_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus: CorpusConfig {
                dir: dir.into(),
                extensions: default_extensions(),
            },
            llm: LlmConfig::default(),
            tutor: TutorConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parses and validates config text. Split out from [`load_config`] so the
/// validation rules can be exercised without touching the filesystem.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate corpus
    if config.corpus.extensions.is_empty() {
        anyhow::bail!("corpus.extensions must not be empty");
    }
    for ext in config.corpus.extensions.iter_mut() {
        let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&normalized.as_str()) {
            anyhow::bail!(
                "Unsupported document extension: '{}'. Must be one of: {}",
                ext,
                SUPPORTED_EXTENSIONS.join(", ")
            );
        }
        *ext = normalized;
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "disabled" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }
    if config.llm.is_enabled() && config.llm.model.trim().is_empty() {
        anyhow::bail!(
            "llm.model must be specified when provider is '{}'",
            config.llm.provider
        );
    }
    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    Ok(config)
}
