//! JSON configuration for the engine and the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alpha::DEFAULT_PRECISION;
use crate::scales::{OrdinalScale, ScaleLibrary};
use crate::schema::MissingValuePolicy;

/// Environment variable naming a config file to load by default.
pub const CONFIG_ENV_VAR: &str = "KALPHA_CONFIG";

const MAX_PRECISION: u32 = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaConfig {
    /// Decimal places for reported values.
    pub precision: u32,
    /// Project scales, searched before the built-in library.
    pub ordinal_scales: Vec<OrdinalScale>,
    /// Extra names recognised as the text column.
    pub text_column_aliases: Vec<String>,
    /// Extra names recognised as the word/token column.
    pub word_column_aliases: Vec<String>,
    pub missing_value_policy: MissingValuePolicy,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            ordinal_scales: Vec::new(),
            text_column_aliases: Vec::new(),
            word_column_aliases: Vec::new(),
            missing_value_policy: MissingValuePolicy::Ignore,
        }
    }
}

impl AlphaConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: AlphaConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load from `$KALPHA_CONFIG` if set, otherwise defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "precision must be at most {MAX_PRECISION}, got {}",
                self.precision
            )));
        }
        for scale in &self.ordinal_scales {
            if scale.name.trim().is_empty() {
                return Err(ConfigError::Invalid("ordinal scale name must be non-empty".to_string()));
            }
            scale
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        for alias in self.text_column_aliases.iter().chain(&self.word_column_aliases) {
            if alias.trim().is_empty() {
                return Err(ConfigError::Invalid("column aliases must be non-empty".to_string()));
            }
        }
        if let MissingValuePolicy::Fill(label) = &self.missing_value_policy {
            if label.trim().is_empty() {
                return Err(ConfigError::Invalid("fill value must be non-empty".to_string()));
            }
        }
        Ok(())
    }

    /// Built-in scales with the configured ones searched first.
    pub fn scale_library(&self) -> ScaleLibrary {
        ScaleLibrary::canonical().with_extra(self.ordinal_scales.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = AlphaConfig::from_json("{}").unwrap();
        assert_eq!(config, AlphaConfig::default());
        assert_eq!(config.precision, 3);
    }

    #[test]
    fn configured_scales_are_searched_first() {
        let config = AlphaConfig::from_json(
            r#"{"ordinal_scales":[{"name":"tri","labels":["Low","Mid","High"]}]}"#,
        )
        .unwrap();
        let library = config.scale_library();
        assert_eq!(library.scales()[0].name, "tri");
        assert_eq!(library.find_match(["low", "high"]).unwrap().name, "tri");
    }

    #[test]
    fn precision_is_bounded() {
        let err = AlphaConfig::from_json(r#"{"precision": 20}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn degenerate_scale_is_rejected() {
        let err = AlphaConfig::from_json(r#"{"ordinal_scales":[{"name":"x","labels":["a"]}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_policy_round_trips_through_json() {
        let config = AlphaConfig::from_json(
            r#"{"missing_value_policy":{"strategy":"fill","value":"none_given"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.missing_value_policy,
            MissingValuePolicy::Fill("none_given".into())
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AlphaConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
