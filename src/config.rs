use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::manifest::RequirementsSyntax;

/// Root configuration structure, deserialized from `.migration-miner/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External commit classifier settings.
    pub classifier: ClassifierConfig,
    /// Manifest parsing settings.
    pub manifest: ManifestConfig,
    /// Run log settings.
    pub log: LogConfig,
}

/// Where and how commit messages are classified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of an OpenAI-compatible API, without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 1.0,
            max_tokens: 128,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClassifierConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).with_context(|| {
            format!(
                "classifier API key not found: set the {} environment variable",
                self.api_key_env
            )
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// How `requirements.txt` lines are split into package names.
    pub requirements_syntax: RequirementsSyntax,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Append-only log file, relative to the corpus root. Empty disables it.
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: "log.txt".to_string(),
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<working_dir>/.migration-miner/config.toml`
/// 3. `~/.config/migration-miner/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(working_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = working_dir.join(".migration-miner").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("migration-miner")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
}
