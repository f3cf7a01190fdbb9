//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::Result;

pub const ENV_API_URL: &str = "SPPG_API_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "SPPG_REQUEST_TIMEOUT_SECS";
pub const ENV_DATA_DIR: &str = "SPPG_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend REST base URL, including any path prefix
    pub api_base_url: String,
    /// Upper bound for a single backend call
    pub request_timeout_secs: u64,
    /// Path to the session database file
    pub database_path: PathBuf,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: sppg_api::DEFAULT_TIMEOUT.as_secs(),
            database_path: data_dir.join("session.db"),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("SPPG"))
            .unwrap_or_else(|| PathBuf::from(".sppg"))
    }

    /// Defaults overridden by `SPPG_API_URL`, `SPPG_REQUEST_TIMEOUT_SECS`
    /// and `SPPG_DATA_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = value(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::data_dir);
        let mut config = Self::new(data_dir);

        if let Some(url) = value(ENV_API_URL) {
            config.api_base_url = url;
        }

        if let Some(raw) = value(ENV_REQUEST_TIMEOUT) {
            config.request_timeout_secs = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(CoreError::Config(format!(
                        "{ENV_REQUEST_TIMEOUT} must be a positive number of seconds, got {raw:?}"
                    )))
                }
            };
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for the per-user data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(
            target_os = "windows",
            target_os = "macos",
            target_os = "linux",
            target_os = "android"
        )))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/tmp/sppg"));
        assert_eq!(config.api_base_url, "http://localhost:3000/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.database_path, PathBuf::from("/tmp/sppg/session.db"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_API_URL, "https://sppg.example.org/api"),
            (ENV_REQUEST_TIMEOUT, "10"),
            (ENV_DATA_DIR, "/data/sppg"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://sppg.example.org/api");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.database_path, PathBuf::from("/data/sppg/session.db"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = Config::from_lookup(lookup(&[(ENV_API_URL, "  ")])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:3000/api");
    }

    #[test]
    fn test_invalid_timeout() {
        for raw in ["abc", "0", "-5"] {
            let err = Config::from_lookup(lookup(&[(ENV_REQUEST_TIMEOUT, raw)])).unwrap_err();
            assert!(matches!(err, CoreError::Config(_)));
        }
    }
}
