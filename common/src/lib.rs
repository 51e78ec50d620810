/*!
common/src/lib.rs

Shared configuration types and helpers for ActuSynthèse.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- The persisted light/dark theme preference (see `theme`)
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod theme;

pub use theme::Theme;

/// Default Gemini REST endpoint (without the model path)
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model used for syntheses
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
/// Environment variable holding the API key when none is configured
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
/// Default location of the persisted theme preference
pub const DEFAULT_THEME_FILE: &str = ".actusynthese/theme";

/// Generative-AI provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Bound on the initial HTTP request (seconds, 0 disables)
    pub timeout_seconds: Option<u64>,
    /// Bound on the wait between two stream increments (seconds, 0 disables)
    pub stream_idle_timeout_seconds: Option<u64>,
}

impl ProviderConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.3)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    pub fn stream_idle_timeout_seconds(&self) -> u64 {
        self.stream_idle_timeout_seconds.unwrap_or(60)
    }
}

/// Terminal front-end configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Path of the file storing the "light"/"dark" preference
    pub theme_file: Option<String>,
}

impl UiConfig {
    pub fn theme_file(&self) -> &str {
        self.theme_file.as_deref().unwrap_or(DEFAULT_THEME_FILE)
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so with neither present this yields `Config::default()`.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_string_uses_defaults_for_missing_fields() {
        let toml = r#"
            [provider]
            model = "gemini-2.5-flash"
            stream_idle_timeout_seconds = 0
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.provider.model(), "gemini-2.5-flash");
        assert_eq!(cfg.provider.api_url(), DEFAULT_API_URL);
        assert_eq!(cfg.provider.api_key_env(), "API_KEY");
        assert_eq!(cfg.provider.stream_idle_timeout_seconds(), 0);
        assert!((cfg.provider.temperature() - 0.3).abs() < f32::EPSILON);
        assert_eq!(cfg.ui.theme_file(), DEFAULT_THEME_FILE);
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.provider.model(), DEFAULT_MODEL);
        assert_eq!(cfg.provider.timeout_seconds(), 30);
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        tokio::fs::write(
            &default_path,
            "[provider]\nmodel = \"base-model\"\ntimeout_seconds = 10\n",
        )
        .await
        .unwrap();
        tokio::fs::write(&override_path, "[provider]\nmodel = \"override-model\"\n")
            .await
            .unwrap();

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");
        assert_eq!(cfg.provider.model(), "override-model");
        // Untouched keys survive the merge
        assert_eq!(cfg.provider.timeout_seconds(), 10);
    }

    #[tokio::test]
    async fn missing_files_yield_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");

        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load config");
        assert_eq!(cfg.provider.model(), DEFAULT_MODEL);
    }
}
