//! Persisted light/dark theme preference.
//!
//! The preference is a single string ("light" or "dark") stored in a small
//! file. It is read once at startup and written on every change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Guess the terminal's color scheme from a `COLORFGBG` value ("fg;bg" or "fg;x;bg").
    /// Background colors 0-6 and 8 are dark; anything unparseable falls back to light.
    pub fn from_colorfgbg(value: Option<&str>) -> Self {
        let bg = value
            .and_then(|v| v.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok());
        match bg {
            Some(0..=6) | Some(8) => Theme::Dark,
            _ => Theme::Light,
        }
    }

    /// System color-scheme preference, as far as a terminal exposes it
    pub fn system_default() -> Self {
        Self::from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => anyhow::bail!("Unknown theme '{}', expected 'light' or 'dark'", other),
        }
    }
}

/// Read the stored preference, falling back to `fallback` when nothing valid is stored.
pub async fn load_theme<P: AsRef<Path>>(path: P, fallback: Theme) -> Result<Theme> {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(data) => Ok(data.parse().unwrap_or(fallback)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(fallback),
        Err(e) => Err(e).with_context(|| format!("Failed to read theme preference: {}", path.display())),
    }
}

/// Persist the preference, creating the parent directory if needed.
pub async fn save_theme<P: AsRef<Path>>(path: P, theme: Theme) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create preference directory: {}", parent.display())
        })?;
    }
    tokio::fs::write(path, theme.as_str())
        .await
        .with_context(|| format!("Failed to write theme preference: {}", path.display()))?;
    Ok(())
}
