//! Companion configuration.
//!
//! A single immutable [`CompanionConfig`] value is built at startup from
//! defaults, an optional TOML file, environment variables and CLI overrides
//! (in that order), validated once, and then shared with every component.

use crate::classifier::DEFAULT_CRISIS_PHRASES;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Environment variable {var} has invalid value {value:?}")]
    Env { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Conversation history limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Hard cap on turns held in the conversation log.
    pub max_turns: usize,

    /// How many of the oldest turns are folded into one summary turn when
    /// the cap is exceeded.
    pub summary_block: usize,

    /// How many recent turns are sent to the model as conversation context.
    pub recent_context: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: 50,
            summary_block: 20,
            recent_context: 20,
        }
    }
}

/// Configuration for the companion and its session.
#[derive(Debug, Clone)]
pub struct CompanionConfig {
    /// Model name passed to the LLM provider.
    pub model: String,

    /// Sampling temperature for replies.
    pub temperature: f32,

    /// Maximum tokens for a reply.
    pub max_tokens: usize,

    /// Conversation history limits.
    pub history: HistoryConfig,

    /// Concrete self-harm plan phrases that classify as urgency 5.
    pub crisis_phrases: Vec<String>,

    /// Root directory for profiles and transcripts.
    pub data_dir: PathBuf,

    /// Whether the conversation transcript is persisted between runs.
    pub transcripts: bool,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            model: gemini::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            history: HistoryConfig::default(),
            crisis_phrases: DEFAULT_CRISIS_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            data_dir: default_data_dir(),
            transcripts: true,
        }
    }
}

impl CompanionConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = file {
            config = config.merge_file(path)?;
        }
        config.apply_env(|var| std::env::var(var).ok())
    }

    /// Overlay values from a TOML file.
    pub fn merge_file(self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.merge(file))
    }

    /// Overlay `MODEL_NAME`, `TEMPERATURE`, `MAX_TOKENS` and `MYBRO_DATA_DIR`
    /// using the given lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("MODEL_NAME").filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(value) = lookup("TEMPERATURE") {
            self.temperature = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "TEMPERATURE",
                value,
            })?;
        }
        if let Some(value) = lookup("MAX_TOKENS") {
            self.max_tokens = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "MAX_TOKENS",
                value,
            })?;
        }
        if let Some(dir) = lookup("MYBRO_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(self)
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(history) = file.history {
            if let Some(v) = history.max_turns {
                self.history.max_turns = v;
            }
            if let Some(v) = history.summary_block {
                self.history.summary_block = v;
            }
            if let Some(v) = history.recent_context {
                self.history.recent_context = v;
            }
        }
        if let Some(phrases) = file.crisis_phrases {
            self.crisis_phrases = phrases;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(transcripts) = file.transcripts {
            self.transcripts = transcripts;
        }
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max tokens for replies.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set history limits.
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    /// Replace the crisis phrase list.
    pub fn with_crisis_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crisis_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Enable or disable transcript persistence.
    pub fn with_transcripts(mut self, enabled: bool) -> Self {
        self.transcripts = enabled;
        self
    }

    /// Directory holding one JSON file per user profile.
    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("profiles")
    }

    /// Directory holding one JSON transcript per user.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir.join("transcripts")
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model name is empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".into()));
        }

        let history = &self.history;
        // Folding fewer than two turns into one can't shrink the log.
        if history.summary_block < 2 {
            return Err(ConfigError::Invalid(
                "history.summary_block must be at least 2".into(),
            ));
        }
        if history.summary_block > history.max_turns {
            return Err(ConfigError::Invalid(format!(
                "history.summary_block ({}) exceeds history.max_turns ({})",
                history.summary_block, history.max_turns
            )));
        }
        if history.recent_context == 0 {
            return Err(ConfigError::Invalid(
                "history.recent_context must be positive".into(),
            ));
        }

        if self.crisis_phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid("crisis phrase list is empty".into()));
        }
        Ok(())
    }
}

/// On-disk shape of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    history: Option<HistoryFile>,
    crisis_phrases: Option<Vec<String>>,
    data_dir: Option<PathBuf>,
    transcripts: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HistoryFile {
    max_turns: Option<usize>,
    summary_block: Option<usize>,
    recent_context: Option<usize>,
}

/// Platform data directory for the app, or `.mybro` in the working directory.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "mybro")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".mybro"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = CompanionConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.history.max_turns, 50);
        assert_eq!(config.history.summary_block, 20);
        assert!(!config.crisis_phrases.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_builder() {
        let config = CompanionConfig::new()
            .with_model("gemini-2.5-pro")
            .with_temperature(0.3)
            .with_max_tokens(256)
            .with_data_dir("/tmp/mybro-test")
            .with_transcripts(false);

        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.profiles_dir(), PathBuf::from("/tmp/mybro-test/profiles"));
        assert!(!config.transcripts);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MODEL_NAME", "gemini-2.0-flash"),
            ("TEMPERATURE", "0.2"),
            ("MAX_TOKENS", "640"),
        ]
        .into_iter()
        .collect();

        let config = CompanionConfig::default()
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 640);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let err = CompanionConfig::default()
            .apply_env(|k| (k == "MAX_TOKENS").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "MAX_TOKENS", .. }));
    }

    #[test]
    fn test_merge_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mybro.toml");
        std::fs::write(
            &path,
            r#"
model = "gemini-2.5-pro"
temperature = 0.5
crisis_phrases = ["planning to kill myself"]

[history]
max_turns = 10
summary_block = 4
"#,
        )
        .unwrap();

        let config = CompanionConfig::default().merge_file(&path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.history.max_turns, 10);
        assert_eq!(config.history.summary_block, 4);
        assert_eq!(config.history.recent_context, 20);
        assert_eq!(config.crisis_phrases, vec!["planning to kill myself"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mybro.toml");
        std::fs::write(&path, "modle = \"typo\"\n").unwrap();

        let err = CompanionConfig::default().merge_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_history() {
        let config = CompanionConfig::default().with_history(HistoryConfig {
            max_turns: 10,
            summary_block: 1,
            recent_context: 5,
        });
        assert!(config.validate().is_err());

        let config = CompanionConfig::default().with_history(HistoryConfig {
            max_turns: 4,
            summary_block: 6,
            recent_context: 5,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_temperature() {
        assert!(CompanionConfig::default()
            .with_temperature(3.5)
            .validate()
            .is_err());
    }
}
