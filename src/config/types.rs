//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::wiki::DEFAULT_MAX_RECENT;

/// AI provider kind.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Gemini,
    Claude,
    /// Local `claude` CLI in print mode.
    #[default]
    ClaudeCli,
}

/// Configuration for the language-model client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider to use.
    #[serde(default)]
    pub provider: ProviderKind,
    /// Model name passed to the provider.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Base URL for HTTP providers.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable name for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Path or name of the `claude` executable.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    /// Generate `architecture.md` when the wiki lacks architecture or patterns.
    #[serde(default = "default_true")]
    pub generate_architecture: bool,
}

fn default_model() -> String {
    "claude-haiku-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_cli_path() -> String {
    "claude".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            cli_path: default_cli_path(),
            generate_architecture: true,
        }
    }
}

/// Session analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum file changes before a session is recorded.
    pub min_changes_threshold: usize,
    /// Seconds to ignore further runs for the same project; 0 disables.
    pub cooldown_secs: u64,
    /// Transcript characters sent to the model.
    pub max_transcript_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_changes_threshold: 1,
            cooldown_secs: 0,
            max_transcript_chars: 40_000,
        }
    }
}

/// Wiki merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Merge into `context.md` instead of appending session entries.
    pub enabled: bool,
    /// Entries kept in `Recent Work`.
    pub max_recent_sessions: i64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_recent_sessions: DEFAULT_MAX_RECENT,
        }
    }
}

/// Git sync settings for the notes repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub enabled: bool,
    pub push: bool,
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            push: true,
            remote: "origin".to_string(),
        }
    }
}

/// Top-level configuration for the context tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Root of the notes repository; `~` is expanded.
    pub context_root: String,
    /// Prefixes classifying a project as work.
    pub work_path_patterns: Vec<String>,
    /// Prefixes classifying a project as personal.
    pub personal_path_patterns: Vec<String>,
    /// Prefixes never tracked.
    pub excluded_paths: Vec<String>,
    /// Topic label to path keywords. Empty uses the built-in table.
    pub topics: BTreeMap<String, Vec<String>>,
    /// File for persisted hook state. Defaults under the cache dir.
    pub state_file: Option<PathBuf>,
    pub session: SessionConfig,
    pub wiki: WikiConfig,
    pub ai: AiConfig,
    pub git: GitConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            context_root: "~/context".to_string(),
            work_path_patterns: Vec::new(),
            personal_path_patterns: Vec::new(),
            excluded_paths: Vec::new(),
            topics: BTreeMap::new(),
            state_file: None,
            session: SessionConfig::default(),
            wiki: WikiConfig::default(),
            ai: AiConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Context root with `~` expanded.
    #[must_use]
    pub fn context_root_path(&self) -> PathBuf {
        expand_tilde(&self.context_root)
    }

    /// Location of the hook state file.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("context-tracker")
                .join("state.json")
        })
    }
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
