/// Runtime configuration from the environment
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::application::services::RetrievalConfig;
use crate::domain::base::DomainError;
use crate::domain::value_objects::ChunkingConfig;
use crate::infrastructure::llm::{DEFAULT_GROQ_MODEL, GROQ_API_BASE};
use crate::infrastructure::openfda::OPENFDA_LABEL_URL;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid chunking settings: {0}")]
    Chunking(#[from] DomainError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GROQ_MODEL.to_string(),
            api_base: GROQ_API_BASE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub groq: GroqConfig,
    pub retrieval: RetrievalConfig,
    pub openfda_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            groq: GroqConfig::default(),
            retrieval: RetrievalConfig::default(),
            openfda_base_url: OPENFDA_LABEL_URL.to_string(),
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse::<T>().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = AppConfig::default();
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chunking = ChunkingConfig::new(
            parse_or(&lookup, "MEDGUIDE_CHUNK_SIZE", ChunkingConfig::DEFAULT_CHUNK_SIZE)?,
            parse_or(&lookup, "MEDGUIDE_CHUNK_OVERLAP", ChunkingConfig::DEFAULT_OVERLAP)?,
        )?;

        Ok(Self {
            groq: GroqConfig {
                api_key: lookup("GROQ_API_KEY"),
                model: lookup("GROQ_MODEL").unwrap_or(defaults.groq.model),
                api_base: lookup("GROQ_API_BASE").unwrap_or(defaults.groq.api_base),
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "MEDGUIDE_HTTP_TIMEOUT_SECS",
                    defaults.groq.timeout.as_secs(),
                )?),
            },
            retrieval: RetrievalConfig {
                source_path: lookup("MEDGUIDE_GUIDELINES_PDF")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.retrieval.source_path),
                index_path: lookup("MEDGUIDE_INDEX_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.retrieval.index_path),
                chunking,
                top_k: parse_or(&lookup, "MEDGUIDE_TOP_K", defaults.retrieval.top_k)?,
            },
            openfda_base_url: lookup("OPENFDA_BASE_URL").unwrap_or(defaults.openfda_base_url),
        })
    }

    pub fn groq_api_key(&self) -> ConfigResult<&str> {
        self.groq
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing("GROQ_API_KEY"))
    }
}
