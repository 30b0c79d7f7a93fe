// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::services::classifier::{Classifier, ClassifierRule};

pub const PROJECT_CONFIG_FILE: &str = ".commitsplit.toml";

/// Commit message format configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFormat {
    /// Include body in commit message (default: true)
    #[serde(default = "default_true")]
    pub include_body: bool,

    /// Include scope in commit type, e.g., feat(scope): (default: true)
    #[serde(default = "default_true")]
    pub include_scope: bool,

    /// Enforce lowercase first character of subject (default: true)
    #[serde(default = "default_true")]
    pub lowercase_subject: bool,
}

impl Default for CommitFormat {
    fn default() -> Self {
        Self {
            include_body: true,
            include_scope: true,
            lowercase_subject: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    OpenAI,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            other => Err(Error::Config(format!(
                "unknown provider '{other}', expected ollama or openai"
            ))),
        }
    }
}

/// How much prose the generated message should carry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Concise,
    Detailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,

    /// Base URL for OpenAI-compatible APIs (default: https://api.openai.com/v1)
    #[serde(default)]
    pub openai_base_url: Option<String>,

    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Split threshold in added+removed lines
    #[serde(default = "default_max_commit_size")]
    pub max_commit_size: usize,

    /// Partitions below this size are folded into a neighbour when possible
    #[serde(default = "default_min_partition_size")]
    pub min_partition_size: usize,

    /// Maximum context characters for the prompt (~4 chars per token)
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Lines of each hunk shown to the model
    #[serde(default = "default_max_hunk_lines")]
    pub max_hunk_lines: usize,

    /// Provider request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Commit creation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub commit_timeout_secs: u64,

    /// LLM temperature (0.0-2.0, default 0.3)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Corrective re-prompts before giving up on a partition
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Extra provider calls after a transport failure
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,

    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    #[serde(default = "default_max_subject_len")]
    pub max_subject_len: usize,

    #[serde(default)]
    pub tone: Tone,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Commit message format options
    #[serde(default)]
    pub format: CommitFormat,

    /// Extra classification rules, checked before the built-in ones
    #[serde(default)]
    pub classifier_rules: Vec<ClassifierRule>,
}

fn default_model() -> String {
    "qwen3:4b".into()
}
fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_max_commit_size() -> usize {
    200
}
fn default_min_partition_size() -> usize {
    20
}
fn default_max_context_chars() -> usize {
    24_000
}
fn default_max_hunk_lines() -> usize {
    40
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    512
}
fn default_max_attempts() -> u32 {
    3
}
fn default_transport_retries() -> u32 {
    2
}
fn default_backoff_initial_ms() -> u64 {
    500
}
fn default_max_subject_len() -> usize {
    50
}
fn default_locale() -> String {
    "en".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            ollama_host: default_ollama_host(),
            openai_base_url: None,
            api_key: None,
            max_commit_size: default_max_commit_size(),
            min_partition_size: default_min_partition_size(),
            max_context_chars: default_max_context_chars(),
            max_hunk_lines: default_max_hunk_lines(),
            timeout_secs: default_timeout_secs(),
            commit_timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_attempts: default_max_attempts(),
            transport_retries: default_transport_retries(),
            backoff_initial_ms: default_backoff_initial_ms(),
            max_subject_len: default_max_subject_len(),
            tone: Tone::default(),
            locale: default_locale(),
            format: CommitFormat::default(),
            classifier_rules: Vec::new(),
        }
    }
}

impl Config {
    /// Load with priority: CLI > ENV > user config > project config > defaults
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_in(cli, &cwd)
    }

    /// Like [`Config::load`], reading the project file from `project_root`.
    pub fn load_in(cli: &Cli, project_root: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let project_config = project_root.join(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            debug!(path = %project_config.display(), "project config");
            figment = figment.merge(Toml::file(&project_config));
        }

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            debug!(path = %path.display(), "user config");
            figment = figment.merge(Toml::file(&path));
        }

        // COMMITSPLIT_MODEL, COMMITSPLIT_FORMAT__INCLUDE_BODY, ...
        figment = figment.merge(Env::prefixed("COMMITSPLIT_").split("__"));

        let mut config: Config = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.apply_cli(cli)?;
        config.resolve_api_key();
        config.validate()?;

        debug!(
            provider = %config.provider,
            model = %config.model,
            max_commit_size = config.max_commit_size,
            "config loaded"
        );
        Ok(config)
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "commitsplit").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    fn apply_cli(&mut self, cli: &Cli) -> Result<()> {
        if let Some(ref p) = cli.provider {
            self.provider = p.parse()?;
        }
        if let Some(ref m) = cli.model {
            self.model = m.clone();
        }
        if let Some(size) = cli.max_commit_size {
            self.max_commit_size = size;
        }
        Ok(())
    }

    fn resolve_api_key(&mut self) {
        if self.api_key.is_some() || self.provider == Provider::Ollama {
            return;
        }

        self.api_key = std::env::var("OPENAI_API_KEY").ok().map(SecretString::from);

        // Keyring fallback (if still no key and secure-storage feature is enabled)
        #[cfg(feature = "secure-storage")]
        if self.api_key.is_none()
            && let Ok(entry) = keyring::Entry::new("commitsplit", &self.provider.to_string())
            && let Ok(key) = entry.get_password()
        {
            self.api_key = Some(SecretString::from(key));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider != Provider::Ollama && self.api_key.is_none() {
            return Err(Error::Config(format!(
                "{} requires an API key. Set COMMITSPLIT_API_KEY or OPENAI_API_KEY",
                self.provider
            )));
        }

        if self.model.trim().is_empty() {
            return Err(Error::Config("model cannot be empty".into()));
        }

        if self.max_commit_size == 0 {
            return Err(Error::Config("max_commit_size must be at least 1".into()));
        }

        if self.min_partition_size > self.max_commit_size {
            return Err(Error::Config(format!(
                "min_partition_size ({}) cannot exceed max_commit_size ({})",
                self.min_partition_size, self.max_commit_size
            )));
        }

        check_range("max_context_chars", self.max_context_chars, 1_000..=200_000)?;
        check_range("max_hunk_lines", self.max_hunk_lines, 1..=1_000)?;
        check_range("timeout_secs", self.timeout_secs, 1..=3_600)?;
        check_range("commit_timeout_secs", self.commit_timeout_secs, 1..=3_600)?;
        check_range("max_tokens", self.max_tokens, 16..=32_768)?;
        check_range("max_attempts", self.max_attempts, 1..=10)?;
        check_range("transport_retries", self.transport_retries, 0..=10)?;
        check_range("backoff_initial_ms", self.backoff_initial_ms, 0..=60_000)?;
        check_range("max_subject_len", self.max_subject_len, 10..=200)?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be 0.0–2.0, got {}",
                self.temperature
            )));
        }

        if self.locale.trim().is_empty() {
            return Err(Error::Config("locale cannot be empty".into()));
        }

        check_http_url("ollama_host", &self.ollama_host)?;
        if let Some(ref base) = self.openai_base_url {
            check_http_url("openai_base_url", base)?;
        }

        Classifier::new(&self.classifier_rules)?;

        Ok(())
    }

    /// Create default config file with secure permissions
    pub fn create_default() -> Result<PathBuf> {
        let Some(dir) = Self::config_dir() else {
            return Err(Error::Config("Cannot determine config directory".into()));
        };
        Self::create_default_in(&dir)
    }

    pub fn create_default_in(dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let path = dir.join("config.toml");
        let content = r#"# commitsplit configuration

# Text generation provider: ollama, openai
provider = "ollama"

# Model name (for Ollama, use `ollama list` to see available)
model = "qwen3:4b"

# Ollama server URL
ollama_host = "http://localhost:11434"

# OpenAI-compatible endpoint; the key comes from COMMITSPLIT_API_KEY,
# OPENAI_API_KEY or the system keychain
# openai_base_url = "https://api.openai.com/v1"

# Split staged changes above this many added+removed lines
max_commit_size = 200

# Fold smaller groups into a neighbour of the same kind
min_partition_size = 20

# Prompt budget (~4 chars per token) and lines shown per hunk
# max_context_chars = 24000
# max_hunk_lines = 40

# Timeouts in seconds
# timeout_secs = 30
# commit_timeout_secs = 30

# Corrective re-prompts per commit, and retries after network failures
# max_attempts = 3
# transport_retries = 2

# Subject length limit, message tone (concise, detailed) and language
max_subject_len = 50
tone = "concise"
locale = "en"

# Commit message format options
[format]
# Include body/description in commit message
include_body = true

# Include scope in commit type, e.g., feat(scope): subject
include_scope = true

# Enforce lowercase first character of subject
lowercase_subject = true

# Extra classification rules, checked before the built-in ones
# [[classifier_rules]]
# category = "docs"
# globs = ["handbook/**"]
"#;

        fs::write(&path, content)?;

        // Set secure permissions (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(path)
    }
}

fn check_range<T>(name: &str, value: T, range: std::ops::RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{name} must be {}–{}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

fn check_http_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::Config(format!("{name} is not a valid URL ('{value}'): {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "{name} must start with http:// or https://, got '{value}'"
        )));
    }
    Ok(())
}
