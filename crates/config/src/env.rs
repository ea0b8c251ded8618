//! `PILOT_*` environment overrides.
//!
//! Env values are applied after the config file and before validation.

use crate::schema::{PilotConfig, ValidatedPilotConfig};
use pilot_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;

/// Env var: model server URL.
pub const ENV_SERVER_URL: &str = "PILOT_SERVER_URL";
/// Env var: completion/chat model.
pub const ENV_MODEL: &str = "PILOT_MODEL";
/// Env var: embedding model.
pub const ENV_EMBEDDING_MODEL: &str = "PILOT_EMBEDDING_MODEL";
/// Env var: transport timeout in ms.
pub const ENV_TIMEOUT_MS: &str = "PILOT_TIMEOUT_MS";
/// Env var: lines per chunk.
pub const ENV_CHUNK_LINES: &str = "PILOT_CHUNK_LINES";
/// Env var: retrieved chunks per prompt.
pub const ENV_TOP_K: &str = "PILOT_TOP_K";
/// Env var: context lines before the cursor.
pub const ENV_CONTEXT_LINES: &str = "PILOT_CONTEXT_LINES";
/// Env var: chat transcript window.
pub const ENV_MAX_TRANSCRIPT: &str = "PILOT_MAX_TRANSCRIPT";

const ALL_VARS: [&str; 8] = [
    ENV_SERVER_URL,
    ENV_MODEL,
    ENV_EMBEDDING_MODEL,
    ENV_TIMEOUT_MS,
    ENV_CHUNK_LINES,
    ENV_TOP_K,
    ENV_CONTEXT_LINES,
    ENV_MAX_TRANSCRIPT,
];

/// Typed env-derived overrides for [`PilotConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PilotEnv {
    /// Override for `model.serverUrl`.
    pub server_url: Option<String>,
    /// Override for `model.model`.
    pub model: Option<String>,
    /// Override for `model.embeddingModel`.
    pub embedding_model: Option<String>,
    /// Override for `model.timeoutMs`.
    pub timeout_ms: Option<u64>,
    /// Override for `indexing.chunkLines`.
    pub chunk_lines: Option<u32>,
    /// Override for `completion.topK`.
    pub top_k: Option<u32>,
    /// Override for `completion.contextLines`.
    pub context_lines: Option<u32>,
    /// Override for `chat.maxTranscriptMessages`.
    pub max_transcript: Option<u32>,
}

impl PilotEnv {
    /// Parse overrides from a key/value map (tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            server_url: parse_string(map, ENV_SERVER_URL)?,
            model: parse_string(map, ENV_MODEL)?,
            embedding_model: parse_string(map, ENV_EMBEDDING_MODEL)?,
            timeout_ms: parse_int(map, ENV_TIMEOUT_MS)?,
            chunk_lines: parse_int(map, ENV_CHUNK_LINES)?,
            top_k: parse_int(map, ENV_TOP_K)?,
            context_lines: parse_int(map, ENV_CONTEXT_LINES)?,
            max_transcript: parse_int(map, ENV_MAX_TRANSCRIPT)?,
        })
    }

    /// Parse overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map = ALL_VARS
            .iter()
            .filter_map(|&name| std::env::var(name).ok().map(|value| (name.to_owned(), value)))
            .collect();
        Self::from_map(&map)
    }

    fn apply(&self, config: &mut PilotConfig) {
        if let Some(value) = &self.server_url {
            config.model.server_url.clone_from(value);
        }
        if let Some(value) = &self.model {
            config.model.model = Some(value.clone());
        }
        if let Some(value) = &self.embedding_model {
            config.model.embedding_model = Some(value.clone());
        }
        if let Some(value) = self.timeout_ms {
            config.model.timeout_ms = value;
        }
        if let Some(value) = self.chunk_lines {
            config.indexing.chunk_lines = value;
        }
        if let Some(value) = self.top_k {
            config.completion.top_k = value;
        }
        if let Some(value) = self.context_lines {
            config.completion.context_lines = value;
        }
        if let Some(value) = self.max_transcript {
            config.chat.max_transcript_messages = Some(value);
        }
    }
}

/// Apply env overrides, then validate and normalize.
pub fn apply_env_overrides(
    mut config: PilotConfig,
    env: &PilotEnv,
) -> Result<ValidatedPilotConfig, ErrorEnvelope> {
    env.apply(&mut config);
    config.validate_and_normalize().map_err(Into::into)
}

fn parse_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<String>, EnvParseError> {
    match map.get(var).map(|value| value.trim()) {
        None => Ok(None),
        Some("") => Err(EnvParseError::EmptyValue { var }),
        Some(value) => Ok(Some(value.to_owned())),
    }
}

fn parse_int<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<T>, EnvParseError> {
    parse_string(map, var)?
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| EnvParseError::InvalidInt { var, value })
        })
        .transpose()
}

/// Failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvParseError {
    /// Present but blank.
    #[error("{var} must be non-empty")]
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Not an unsigned integer.
    #[error("{var} must be an unsigned integer")]
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        match &error {
            EnvParseError::EmptyValue { var } => {
                Self::expected(ErrorCode::new("config", "empty_env_var"), error.to_string())
                    .with_metadata("env_var", *var)
            },
            EnvParseError::InvalidInt { var, value } => {
                Self::expected(ErrorCode::new("config", "invalid_env_int"), error.to_string())
                    .with_metadata("env_var", *var)
                    .with_metadata("value", value.clone())
            },
        }
    }
}
