//! Runtime parser configuration.
//!
//! A [`ParserConfig`] is built once, before parsing starts, and handed to the
//! parser by shared reference. Decoders read it but never change it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::limits::ParserLimits;

/// Whether names may contain U+0000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Utf8Policy {
    #[default]
    AllowNul,
    ForbidNul,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub utf8_policy: Utf8Policy,
    /// Reject memory maximums beyond the addressable page count instead of
    /// clamping them.
    pub strict_memory_growth: bool,
    pub check_duplicate_imports: bool,
    pub allow_empty_names: bool,
    pub limits: ParserLimits,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            utf8_policy: Utf8Policy::AllowNul,
            strict_memory_growth: true,
            check_duplicate_imports: false,
            allow_empty_names: true,
            limits: ParserLimits::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ParserConfig {
    pub fn from_json(json: &str) -> Result<ParserConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<ParserConfig, ConfigError> {
        let display = path.display().to_string();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        ParserConfig::from_json(&json).map_err(|source| ConfigError::Json { path: display, source })
    }
}
