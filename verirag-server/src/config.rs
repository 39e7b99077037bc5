//! Server settings read from the process environment.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_MAX_STEPS: usize = 10;
const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_steps: usize,
    pub top_k: usize,
    pub checkpoint_dir: Option<PathBuf>,
    pub sqlite_url: Option<String>,
    pub docs_dir: Option<PathBuf>,
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
            max_steps: DEFAULT_MAX_STEPS,
            top_k: DEFAULT_TOP_K,
            checkpoint_dir: None,
            sqlite_url: None,
            docs_dir: None,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    match parsed(lookup, var, "positive integer", default)? {
        0 => Err(ConfigError::Zero(var)),
        value => Ok(value),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds settings from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let defaults = Settings::default();

        Ok(Self {
            api_key: lookup("OPENAI_API_KEY"),
            base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            chat_model: lookup("OPENAI_CHAT_MODEL").unwrap_or(defaults.chat_model),
            temperature: parsed(&lookup, "VERIRAG_TEMPERATURE", "number", defaults.temperature)?,
            max_steps: positive(&lookup, "VERIRAG_MAX_STEPS", defaults.max_steps)?,
            top_k: positive(&lookup, "VERIRAG_TOP_K", defaults.top_k)?,
            checkpoint_dir: lookup("VERIRAG_CHECKPOINT_DIR").map(PathBuf::from),
            sqlite_url: lookup("VERIRAG_SQLITE_URL"),
            docs_dir: lookup("VERIRAG_DOCS_DIR").map(PathBuf::from),
            bind: lookup("VERIRAG_BIND").unwrap_or(defaults.bind),
        })
    }
}
