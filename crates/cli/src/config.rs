// Runtime configuration, read from the environment at startup

use anyhow::{Context, Result};
use panelcraft_core::domain::DEFAULT_MAX_CONCURRENT;
use panelcraft_infra_dashscope::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "~/.panelcraft/panelcraft.db";

pub const ENV_DB_PATH: &str = "PANELCRAFT_DB_PATH";
pub const ENV_MAX_CONCURRENT: &str = "PANELCRAFT_MAX_CONCURRENT";
pub const ENV_API_BASE: &str = "PANELCRAFT_API_BASE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "PANELCRAFT_HTTP_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "PANELCRAFT_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub max_concurrent: usize,
    pub api_base: String,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or blank values take the default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let raw_path = get(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = PathBuf::from(shellexpand::tilde(raw_path.trim()).into_owned());

        let max_concurrent = match get(ENV_MAX_CONCURRENT) {
            Some(raw) => parse_positive(ENV_MAX_CONCURRENT, &raw)?,
            None => DEFAULT_MAX_CONCURRENT,
        };

        let http_timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(ENV_HTTP_TIMEOUT_SECS, &raw)? as u64),
            None => DEFAULT_TIMEOUT,
        };

        let log_format = match get(ENV_LOG_FORMAT).as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            db_path,
            max_concurrent,
            api_base: get(ENV_API_BASE)
                .map(|base| base.trim().to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http_timeout,
            log_format,
        })
    }

    /// sqlx connection URL for the database file
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }

    /// Create the directory holding the database file
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(())
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a positive integer, got '{raw}'"))?;
    if value == 0 {
        anyhow::bail!("{name} must be at least 1");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.api_base, DEFAULT_BASE_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(120));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.db_path.ends_with(".panelcraft/panelcraft.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            (ENV_DB_PATH, "/tmp/pc/test.db"),
            (ENV_MAX_CONCURRENT, "5"),
            (ENV_API_BASE, "http://localhost:8080"),
            (ENV_HTTP_TIMEOUT_SECS, " 30 "),
            (ENV_LOG_FORMAT, "json"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/pc/test.db"));
        assert_eq!(config.database_url(), "sqlite:///tmp/pc/test.db");
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.api_base, "http://localhost:8080");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = config(&[(ENV_MAX_CONCURRENT, "  "), (ENV_API_BASE, "")]).unwrap();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.api_base, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(config(&[(ENV_MAX_CONCURRENT, "0")]).is_err());
        assert!(config(&[(ENV_MAX_CONCURRENT, "three")]).is_err());
        assert!(config(&[(ENV_HTTP_TIMEOUT_SECS, "-1")]).is_err());
    }
}
