//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the path given with `--config`
//! 2. `$MAILORCA_CONFIG` (environment variable)
//! 3. `~/.config/mailorca/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailorca\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! Command-line flags override whatever the file says.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "MAILORCA_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of messages kept in memory.
    pub max_history: usize,
    /// SMTP listener settings.
    pub smtp: SmtpConfig,
    /// HTTP API listener settings.
    pub http: HttpConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
    /// Web UI settings.
    pub ui: UiConfig,
}

/// SMTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Name announced in the greeting and the HELO/EHLO reply.
    pub hostname: String,
    /// Largest accepted message in bytes (default: 10485760 = 10 MB).
    pub max_message_size: usize,
}

/// HTTP API listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Also write logs to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Web UI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Headers shown as columns of the message list.
    pub list_columns: Vec<String>,
    /// Headers shown above the body on the message page.
    pub detail_headers: Vec<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            max_history: 100,
            smtp: SmtpConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1025,
            hostname: "mailorca.local".to_string(),
            max_message_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8025,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            list_columns: ["Date", "Subject", "To", "From"]
                .map(String::from)
                .to_vec(),
            detail_headers: ["From", "To", "Cc", "Subject", "Date", "Message-ID"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Config {
    /// Validated store capacity.
    pub fn max_history(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.max_history).ok_or_else(|| {
            CaptureError::InvalidConfig("max_history must be a positive integer".to_string())
        })
    }

    /// `host:port` of the SMTP listener.
    pub fn smtp_addr(&self) -> String {
        format!("{}:{}", self.smtp.host, self.smtp.port)
    }

    /// `host:port` of the HTTP listener.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }

    /// Render as TOML (used by `--gen-config`).
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from `explicit` or the standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config(explicit: Option<&Path>) -> Config {
    let path = explicit.map(Path::to_path_buf).or_else(config_file_path);
    match path {
        Some(path) if path.exists() => load_from(&path),
        Some(path) => {
            if explicit.is_some() {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            }
            Config::default()
        }
        None => Config::default(),
    }
}

fn load_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailorca").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.max_history, 100);
        assert_eq!(cfg.smtp_addr(), "127.0.0.1:1025");
        assert_eq!(cfg.http_addr(), "127.0.0.1:8025");
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.max_history().unwrap().get(), 100);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = cfg.to_toml().expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.max_history, cfg.max_history);
        assert_eq!(parsed.smtp.hostname, cfg.smtp.hostname);
        assert_eq!(parsed.smtp.max_message_size, cfg.smtp.max_message_size);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
max_history = 5

[smtp]
port = 2525
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.max_history, 5);
        assert_eq!(cfg.smtp.port, 2525);
        // Other fields use defaults
        assert_eq!(cfg.smtp.host, "127.0.0.1");
        assert_eq!(cfg.http.port, 8025);
    }

    #[test]
    fn test_ui_columns_default_and_override() {
        let cfg = Config::default();
        assert_eq!(cfg.ui.list_columns, ["Date", "Subject", "To", "From"]);
        assert_eq!(
            cfg.ui.detail_headers,
            ["From", "To", "Cc", "Subject", "Date", "Message-ID"]
        );

        let cfg: Config = toml::from_str("[ui]\nlist_columns = [\"Subject\"]\n").expect("parse");
        assert_eq!(cfg.ui.list_columns, ["Subject"]);
        assert_eq!(cfg.ui.detail_headers.len(), 6);
    }

    #[test]
    fn test_zero_history_rejected() {
        let cfg = Config {
            max_history: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.max_history(), Err(CaptureError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mailorca.toml");
        std::fs::write(&path, "max_history = 7\n[http]\nport = 9000\n").expect("write");
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.max_history, 7);
        assert_eq!(cfg.http.port, 9000);
    }

    #[test]
    fn test_load_malformed_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "max_history = \"lots\"").expect("write");
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.max_history, 100);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(Some(&dir.path().join("nope.toml")));
        assert_eq!(cfg.smtp.port, 1025);
    }
}
