//! Configuration management for snipvault.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/snipvault/config.json`
//! 2. Environment variable: `SNIPVAULT_CONFIG_CONTENT`
//! 3. Project config: `snipvault.jsonc` or `snipvault.json` in the working directory
//!
//! Supports JSONC (JSON with comments) and variable substitution:
//! - `{env:VAR_NAME}` - Substitute environment variable
//! - `{file:path}` - Substitute file contents

use crate::error::{ConfigError, CoreResult};
use serde::{Deserialize, Serialize};
use snipvault_history::HistoryConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Address the server binds to when none is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8000";

/// Author recorded on commits when none is configured.
pub const DEFAULT_AUTHOR: &str = "snipvault";

static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(env|file):([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON Schema reference.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Directory holding snippet records and history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Author recorded on every history commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// HTTP server settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// History settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySection>,
}

/// Log level as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for snipvault_util::log::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:8000`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// History configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Unchanged lines shown around each change in diffs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<usize>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/snipvault/`
    /// 2. `SNIPVAULT_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    pub async fn load(project_dir: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = snipvault_util::path::config_dir() {
            for name in &["config.json", "snipvault.json", "snipvault.jsonc"] {
                let path = global_dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        if let Ok(content) = std::env::var("SNIPVAULT_CONFIG_CONTENT") {
            let content = Self::substitute_variables(&content, Path::new("."))?;
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            for name in &["snipvault.jsonc", "snipvault.json"] {
                let path = dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        Ok((config, sources))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content, path)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Save configuration as `snipvault.json` in `project_dir`.
    pub async fn save(&self, project_dir: &Path) -> CoreResult<PathBuf> {
        let path = project_dir.join("snipvault.json");

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidJson {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tokio::fs::write(&path, content).await?;
        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(path)
    }

    /// Parse JSONC (JSON with comments).
    pub fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = Self::strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Strip `//` and `/* */` comments outside of string literals.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escaped = false;

        while let Some(c) = chars.next() {
            if in_string {
                result.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }

            match (c, chars.peek().copied()) {
                ('"', _) => {
                    in_string = true;
                    result.push(c);
                }
                ('/', Some('/')) => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Keep line numbers stable for parse errors.
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => result.push(c),
            }
        }

        result
    }

    /// Substitute `{env:...}` and `{file:...}` references.
    ///
    /// File references are resolved relative to the config file.
    fn substitute_variables(content: &str, config_path: &Path) -> CoreResult<String> {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let mut result = content.to_string();

        for cap in var_regex().captures_iter(content) {
            let (Some(full), Some(kind), Some(value)) = (cap.get(0), cap.get(1), cap.get(2)) else {
                continue;
            };
            let value = value.as_str();

            let replacement = match kind.as_str() {
                "env" => std::env::var(value).map_err(|_| ConfigError::EnvVarNotFound {
                    name: value.to_string(),
                })?,
                "file" => {
                    let file_path = config_dir.join(value);
                    std::fs::read_to_string(&file_path)
                        .map(|v| v.trim().to_string())
                        .map_err(|_| ConfigError::FileRefNotFound {
                            path: file_path.display().to_string(),
                        })?
                }
                _ => continue,
            };

            result = result.replace(full.as_str(), &replacement);
        }

        Ok(result)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }

        self.server = match (self.server, other.server) {
            (Some(base), Some(other)) => Some(ServerConfig {
                address: merge_option(base.address, other.address),
            }),
            (base, other) => merge_option(base, other),
        };
        self.history = match (self.history, other.history) {
            (Some(base), Some(other)) => Some(HistorySection {
                context_lines: merge_option(base.context_lines, other.context_lines),
            }),
            (base, other) => merge_option(base, other),
        };

        self
    }

    /// Data directory, falling back to the platform data directory.
    pub fn data_dir(&self) -> CoreResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => snipvault_util::path::data_dir().ok_or_else(|| {
                ConfigError::InvalidPath("Could not determine data directory".to_string()).into()
            }),
        }
    }

    /// Author recorded on history commits.
    pub fn author(&self) -> &str {
        self.author.as_deref().unwrap_or(DEFAULT_AUTHOR)
    }

    /// Server listen address.
    pub fn server_address(&self) -> CoreResult<SocketAddr> {
        let raw = self
            .server
            .as_ref()
            .and_then(|s| s.address.as_deref())
            .unwrap_or(DEFAULT_ADDRESS);
        raw.parse().map_err(|e| {
            ConfigError::InvalidJson {
                path: "server.address".to_string(),
                message: format!("{raw}: {e}"),
            }
            .into()
        })
    }

    /// Settings handed to the history manager.
    pub fn history_config(&self) -> HistoryConfig {
        let defaults = HistoryConfig::default();
        HistoryConfig {
            author: self.author().to_string(),
            context_lines: self
                .history
                .as_ref()
                .and_then(|h| h.context_lines)
                .unwrap_or(defaults.context_lines),
        }
    }
}

fn merge_option<T>(base: Option<T>, other: Option<T>) -> Option<T> {
    match (base, other) {
        (_, Some(o)) => Some(o),
        (b, None) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let input = r#"{
            // Line comment
            "author": "alice", // trailing comment
            /* block comment */
            "data_dir": "/tmp/a/*not a comment*/b",
            "quoted": "say \"// hi\""
        }"#;

        let result = Config::strip_comments(input);
        assert!(!result.contains("Line comment"));
        assert!(!result.contains("trailing comment"));
        assert!(!result.contains("block comment"));
        assert!(result.contains("/tmp/a/*not a comment*/b"));
        assert!(result.contains(r#""say \"// hi\"""#));
    }

    #[test]
    fn test_parse_jsonc() {
        let input = r#"{
            // This is a comment
            "author": "alice",
            "log_level": "debug",
            "server": { "address": "0.0.0.0:9000" },
            "history": { "context_lines": 5 }
        }"#;

        let config = Config::parse_jsonc(input, "test").unwrap();
        assert_eq!(config.author(), "alice");
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert_eq!(config.server_address().unwrap().port(), 9000);
        assert_eq!(config.history_config().context_lines, 5);
    }

    #[test]
    fn test_invalid_json_reports_source() {
        let err = Config::parse_jsonc("{ nope", "snipvault.json").unwrap_err();
        assert!(err.to_string().contains("snipvault.json"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.author(), "snipvault");
        assert_eq!(
            config.server_address().unwrap(),
            "127.0.0.1:8000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.history_config().context_lines, 3);
        assert_eq!(config.history_config().author, "snipvault");
    }

    #[test]
    fn test_merge_config() {
        let base = Config {
            author: Some("alice".to_string()),
            server: Some(ServerConfig {
                address: Some("127.0.0.1:1".to_string()),
            }),
            history: Some(HistorySection {
                context_lines: Some(1),
            }),
            ..Default::default()
        };
        let other = Config {
            data_dir: Some(PathBuf::from("/srv/snippets")),
            history: Some(HistorySection::default()),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.author(), "alice");
        assert_eq!(merged.data_dir().unwrap(), PathBuf::from("/srv/snippets"));
        assert_eq!(merged.server_address().unwrap().port(), 1);
        assert_eq!(merged.history_config().context_lines, 1);
    }

    #[test]
    fn test_bad_address() {
        let config = Config {
            server: Some(ServerConfig {
                address: Some("not an address".to_string()),
            }),
            ..Default::default()
        };
        assert!(config.server_address().is_err());
    }

    #[test]
    fn test_file_substitution() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("author.txt"), "bob\n").unwrap();
        let config_path = dir.path().join("snipvault.json");

        let content =
            Config::substitute_variables(r#"{"author": "{file:author.txt}"}"#, &config_path)
                .unwrap();
        assert_eq!(content, r#"{"author": "bob"}"#);

        let err = Config::substitute_variables(r#"{"author": "{file:missing}"}"#, &config_path)
            .unwrap_err();
        assert!(err.to_string().contains("file reference not found"));
    }
}
