use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    /// Username recorded on confirm, reject and derive when `--analyst` is absent.
    pub analyst: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/events.db".into(),
            analyst: None,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `reviewctl.toml` (or the explicit `config_path`), then
/// `APP__*` environment variables.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    build_settings(
        config_path,
        Environment::with_prefix("APP").separator("__"),
    )
}

fn build_settings(config_path: Option<&Path>, env: Environment) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let file = match config_path {
        Some(path) => File::from(path).required(true),
        None => File::with_name("reviewctl").required(false),
    };

    let settings = Config::builder()
        .set_default("database_url", defaults.database_url)?
        .set_default("log_filter", defaults.log_filter)?
        .add_source(file)
        .add_source(env)
        .build()
        .context("failed to read reviewctl settings")?
        .try_deserialize()
        .context("invalid reviewctl settings")?;
    Ok(settings)
}

/// Turns a plain path into a sqlite URL. The parent directory is created by
/// `Storage::new`.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_letter(path) {
            return format!("sqlite:{path}");
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    if has_drive_letter(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
