//! versionscraper configuration types and loading

use eyre::{Context, Result};
use reqsched::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream service connection
    pub service: ServiceConfig,

    /// Request scheduler throttles
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the credential environment variables are set and the base
    /// URL parses. Call this early in startup to fail fast.
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.service.base_url)
            .with_context(|| format!("Invalid base-url: {}", self.service.base_url))?;
        self.service.credentials()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .versionscraper.yml
        let local_config = PathBuf::from(".versionscraper.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/versionscraper/versionscraper.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("versionscraper").join("versionscraper.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Upstream service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service base URL; relative paths resolve against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the login form endpoint
    #[serde(rename = "login-path")]
    pub login_path: String,

    /// Environment variable containing the account e-mail
    #[serde(rename = "email-env")]
    pub email_env: String,

    /// Environment variable containing the account password
    #[serde(rename = "password-env")]
    pub password_env: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://versionista.com".to_string(),
            login_path: "/login".to_string(),
            email_env: "VERSIONISTA_EMAIL".to_string(),
            password_env: "VERSIONISTA_PASSWORD".to_string(),
            user_agent: concat!("versionscraper/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read (email, password) from the configured environment variables
    pub fn credentials(&self) -> Result<(String, String)> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// Read (email, password) through an arbitrary variable lookup
    pub fn credentials_from<F>(&self, lookup: F) -> Result<(String, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let email = lookup(&self.email_env)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| eyre::eyre!("Account e-mail not found. Set the {} environment variable.", self.email_env))?;
        let password = lookup(&self.password_env).filter(|v| !v.is_empty()).ok_or_else(|| {
            eyre::eyre!(
                "Account password not found. Set the {} environment variable.",
                self.password_env
            )
        })?;
        Ok((email, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "https://versionista.com");
        assert_eq!(config.service.login_path, "/login");
        assert_eq!(config.service.timeout(), Duration::from_secs(60));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_load_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "service:\n  base-url: http://127.0.0.1:8080\n  timeout-ms: 500\nscheduler:\n  max-concurrent: 2\n  max-requests-per-window: 30\n"
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.service.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.service.timeout_ms, 500);
        assert_eq!(config.service.email_env, "VERSIONISTA_EMAIL");
        assert_eq!(config.scheduler.max_concurrent, 2);
        assert_eq!(config.scheduler.window_limit(), Some(30));
        assert_eq!(config.scheduler.max_retries, 3);
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let missing = PathBuf::from("/nonexistent/versionscraper.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler: [not, a, map]").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_credentials_from_lookup() {
        let service = ServiceConfig::default();
        let vars: HashMap<&str, &str> = [("VERSIONISTA_EMAIL", "me@example.com"), ("VERSIONISTA_PASSWORD", "pw")].into();

        let (email, password) = service.credentials_from(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(email, "me@example.com");
        assert_eq!(password, "pw");

        let err = service
            .credentials_from(|k| (k == "VERSIONISTA_EMAIL").then(|| "me@example.com".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("VERSIONISTA_PASSWORD"));

        assert!(service.credentials_from(|_| Some(String::new())).is_err());
    }
}
