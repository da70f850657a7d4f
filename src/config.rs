// ⚙️ Configuration - built once at startup, passed down explicitly

use crate::aggregator::DEFAULT_LARGE_EXPENSE_THRESHOLD;
use crate::parser::Heuristic;
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an optional JSON config file
pub const CONFIG_PATH_VAR: &str = "STATEMENT_INSIGHTS_CONFIG";

const ENV_PREFIX: &str = "STATEMENT_INSIGHTS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the server binds to
    pub bind_addr: String,

    /// Where uploads live while being analyzed
    pub upload_dir: PathBuf,

    /// Keys the session cookie tag
    pub secret_key: String,

    /// Expenses above this magnitude count as large
    pub large_expense_threshold: f64,

    pub heuristic: Heuristic,

    /// Multipart body limit in bytes
    pub max_upload_bytes: usize,

    /// Seconds a cached report survives without being rewritten
    pub session_ttl_secs: u64,

    /// Sessions held at once before the oldest is evicted
    pub max_sessions: usize,
}

/// Upper bound for `session_ttl_secs` (30 days)
pub const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0:3000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            secret_key: "change-me".to_string(),
            large_expense_threshold: DEFAULT_LARGE_EXPENSE_THRESHOLD,
            heuristic: Heuristic::default(),
            max_upload_bytes: 10 * 1024 * 1024,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Config {
    /// Load config from a JSON file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file named by `STATEMENT_INSIGHTS_CONFIG`, then
    /// individual `STATEMENT_INSIGHTS_*` variables
    pub fn load() -> Result<Self> {
        let base = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Config::from_file(path)?,
            Err(_) => Config::default(),
        };

        base.apply_env(|key| env::var(key).ok())
    }

    /// Override fields from a variable lookup (injectable for tests)
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(addr) = var("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(dir) = var("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(key) = var("SECRET_KEY") {
            self.secret_key = key;
        }
        if let Some(threshold) = var("THRESHOLD") {
            self.large_expense_threshold = threshold
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}THRESHOLD: {}", ENV_PREFIX, threshold))?;
        }
        if let Some(heuristic) = var("HEURISTIC") {
            self.heuristic = heuristic.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(limit) = var("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}MAX_UPLOAD_BYTES: {}", ENV_PREFIX, limit))?;
        }
        if let Some(ttl) = var("SESSION_TTL_SECS") {
            self.session_ttl_secs = ttl
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}SESSION_TTL_SECS: {}", ENV_PREFIX, ttl))?;
        }
        if let Some(sessions) = var("MAX_SESSIONS") {
            self.max_sessions = sessions
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}MAX_SESSIONS: {}", ENV_PREFIX, sessions))?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.large_expense_threshold.is_finite() || self.large_expense_threshold < 0.0 {
            bail!(
                "large_expense_threshold must be a non-negative number, got {}",
                self.large_expense_threshold
            );
        }
        if self.secret_key.is_empty() {
            bail!("secret_key must not be empty");
        }
        if self.max_upload_bytes == 0 {
            bail!("max_upload_bytes must be greater than zero");
        }
        if self.session_ttl_secs == 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            bail!(
                "session_ttl_secs must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS,
                self.session_ttl_secs
            );
        }
        if self.max_sessions == 0 {
            bail!("max_sessions must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.large_expense_threshold, 500.0);
        assert_eq!(config.heuristic, Heuristic::Signed);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .apply_env(lookup(&[
                ("STATEMENT_INSIGHTS_THRESHOLD", "100"),
                ("STATEMENT_INSIGHTS_HEURISTIC", "labelled"),
                ("STATEMENT_INSIGHTS_UPLOAD_DIR", "/tmp/uploads"),
                ("STATEMENT_INSIGHTS_MAX_SESSIONS", "50"),
                ("STATEMENT_INSIGHTS_SESSION_TTL_SECS", "600"),
            ]))
            .unwrap();

        assert_eq!(config.max_sessions, 50);
        assert_eq!(config.session_ttl_secs, 600);

        assert_eq!(config.large_expense_threshold, 100.0);
        assert_eq!(config.heuristic, Heuristic::Labelled);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_env_values_are_errors() {
        assert!(Config::default()
            .apply_env(lookup(&[("STATEMENT_INSIGHTS_THRESHOLD", "lots")]))
            .is_err());
        assert!(Config::default()
            .apply_env(lookup(&[("STATEMENT_INSIGHTS_THRESHOLD", "-1")]))
            .is_err());
        assert!(Config::default()
            .apply_env(lookup(&[("STATEMENT_INSIGHTS_HEURISTIC", "smart")]))
            .is_err());
        assert!(Config::default()
            .apply_env(lookup(&[("STATEMENT_INSIGHTS_SESSION_TTL_SECS", "0")]))
            .is_err());
        assert!(Config::default()
            .apply_env(lookup(&[("STATEMENT_INSIGHTS_MAX_SESSIONS", "0")]))
            .is_err());
    }

    #[test]
    fn test_partial_json_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("config-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{ "heuristic": "grouped", "large_expense_threshold": 100 }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.heuristic, Heuristic::Grouped);
        assert_eq!(config.large_expense_threshold, 100.0);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }
}
