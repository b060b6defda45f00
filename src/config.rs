// ABOUTME: Configuration loading for calloop.
// ABOUTME: Reads ~/.calloop/config.toml; every section falls back to defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub window: WindowConfig,
    pub tools: ToolsConfig,
    pub log: LogConfig,
}

/// Agent loop limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Consecutive empty responses tolerated before the run crashes.
    pub max_empty_responses: u32,
    pub max_iterations: u32,
    /// Consecutive tool failures the default fallback handler absorbs.
    pub max_fallback_attempts: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_empty_responses: 3,
            max_iterations: 50,
            max_fallback_attempts: 3,
        }
    }
}

/// Conversation window bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub max_messages: usize,
    pub max_tokens: Option<usize>,
    /// Leading messages that trimming never removes.
    pub pinned_count: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            max_tokens: None,
            pinned_count: 1,
        }
    }
}

/// Tool flag overrides applied on top of each tool's registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub bundleable: Vec<String>,
    pub no_repeat: Vec<String>,
}

/// Logging and execution record output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Directory for JSONL execution records; records stay in memory when unset.
    pub records_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            records_dir: None,
        }
    }
}

impl Config {
    /// Load config from ~/.calloop/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Base directory for calloop files: ~/.calloop.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".calloop")
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.agent.max_empty_responses, 3);
        assert_eq!(config.agent.max_iterations, 50);
        assert_eq!(config.agent.max_fallback_attempts, 3);
        assert_eq!(config.window.max_messages, 100);
        assert_eq!(config.window.max_tokens, None);
        assert_eq!(config.window.pinned_count, 1);
        assert!(config.tools.bundleable.is_empty());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
[agent]
max_empty_responses = 5
max_iterations = 20

[window]
max_messages = 40
max_tokens = 8000
pinned_count = 2

[tools]
bundleable = ["read_file", "list_dir"]
no_repeat = ["search"]

[log]
level = "debug"
records_dir = "/tmp/calloop-records"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.max_empty_responses, 5);
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.window.max_messages, 40);
        assert_eq!(config.window.max_tokens, Some(8000));
        assert_eq!(config.window.pinned_count, 2);
        assert_eq!(config.tools.bundleable, vec!["read_file", "list_dir"]);
        assert_eq!(config.tools.no_repeat, vec!["search"]);
        assert_eq!(config.log.level, "debug");
        assert_eq!(
            config.log.records_dir,
            Some(PathBuf::from("/tmp/calloop-records"))
        );
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml_str = r#"
[agent]
max_iterations = 7
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.max_iterations, 7);
        assert_eq!(config.agent.max_empty_responses, 3);
        assert_eq!(config.window.max_messages, 100);
        assert!(config.log.records_dir.is_none());
    }

    #[test]
    fn load_from_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[window]\nmax_tokens = 123\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.window.max_tokens, Some(123));
    }

    #[test]
    fn load_from_rejects_bad_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[window\nmax_tokens = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn config_path_lives_under_config_dir() {
        assert!(Config::config_path().starts_with(Config::config_dir()));
        assert!(Config::config_path().ends_with("config.toml"));
    }
}
