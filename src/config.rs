//! Runtime settings for hosted quizzes.
//!
//! Settings come from an optional RON file and are then overridden by
//! environment variables:
//!
//! ```ron
//! (
//!     session_ttl_secs: 1800,
//!     sweep_interval_secs: 60,
//!     generation_timeout_ms: Some(250),
//! )
//! ```

use crate::registry::SweepPolicy;
use schema::Difficulty;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "TYPE_QUIZ_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "type_quiz.ron";
pub const SESSION_TTL_VAR: &str = "TYPE_QUIZ_SESSION_TTL_SECS";
pub const SWEEP_INTERVAL_VAR: &str = "TYPE_QUIZ_SWEEP_INTERVAL_SECS";
pub const GENERATION_TIMEOUT_VAR: &str = "TYPE_QUIZ_GENERATION_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_grace_secs() -> u64 {
    30
}

fn default_question_count() -> usize {
    10
}

fn default_difficulty() -> Difficulty {
    Difficulty::Normal
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_sweep_grace_secs")]
    pub sweep_grace_secs: u64,
    /// Wall-clock cap on a single generation call. `None` disables it.
    #[serde(default)]
    pub generation_timeout_ms: Option<u64>,
    #[serde(default = "default_question_count")]
    pub default_question_count: usize,
    #[serde(default = "default_difficulty")]
    pub default_difficulty: Difficulty,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_grace_secs: default_sweep_grace_secs(),
            generation_timeout_ms: None,
            default_question_count: default_question_count(),
            default_difficulty: default_difficulty(),
        }
    }
}

impl QuizConfig {
    /// Load from the file named by `TYPE_QUIZ_CONFIG` (or `type_quiz.ron`),
    /// then apply environment overrides. A missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from any key/value lookup. `load` passes the process
    /// environment.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(SESSION_TTL_VAR) {
            self.session_ttl_secs = parse_number(SESSION_TTL_VAR, &value)?;
        }
        if let Some(value) = lookup(SWEEP_INTERVAL_VAR) {
            self.sweep_interval_secs = parse_number(SWEEP_INTERVAL_VAR, &value)?;
        }
        if let Some(value) = lookup(GENERATION_TIMEOUT_VAR) {
            self.generation_timeout_ms = match value.trim() {
                "" | "none" | "off" => None,
                other => Some(parse_number(GENERATION_TIMEOUT_VAR, other)?),
            };
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sweep_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if crate::generator::validate_count(self.default_question_count).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "default_question_count".to_string(),
                value: self.default_question_count.to_string(),
            });
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }

    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            interval: Duration::from_secs(self.sweep_interval_secs),
            ttl: Duration::from_secs(self.session_ttl_secs),
            grace: Duration::from_secs(self.sweep_grace_secs),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
