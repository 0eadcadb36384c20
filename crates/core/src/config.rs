use crate::audio::DEFAULT_GAP_MS;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use url::Url;

pub const DEFAULT_OUTPUT_DIR: &str = "static/audio";
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const ENV_OUTPUT_DIR: &str = "EMPATHY_OUTPUT_DIR";
pub const ENV_API_TOKEN: &str = "EMPATHY_API_TOKEN";
pub const ENV_TTS_URL: &str = "EMPATHY_TTS_URL";
pub const ENV_CLASSIFIER_URL: &str = "EMPATHY_CLASSIFIER_URL";
pub const ENV_PIPER_BINARY: &str = "PIPER_BINARY";
pub const ENV_PIPER_MODEL: &str = "PIPER_MODEL";
pub const DEFAULT_PIPER_BINARY: &str = "piper";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SynthesizerBackend {
    Tone,
    Piper { binary: PathBuf, model: PathBuf },
    Http { endpoint: Url, voice: Option<String> },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClassifierBackend {
    Keyword,
    Http { endpoint: Url },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Concurrency(usize);

impl Concurrency {
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self(limit))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self(DEFAULT_MAX_CONCURRENCY)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryAttempts(u32);

impl RetryAttempts {
    pub fn new(attempts: u32) -> Result<Self, ConfigError> {
        if attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        Ok(Self(attempts))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for RetryAttempts {
    fn default() -> Self {
        Self(DEFAULT_RETRY_ATTEMPTS)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub gap_ms: u32,
    pub max_concurrency: Concurrency,
    pub retry_attempts: RetryAttempts,
    pub synthesizer: SynthesizerBackend,
    pub classifier: ClassifierBackend,
    pub api_token: Option<ApiKey>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            gap_ms: DEFAULT_GAP_MS,
            max_concurrency: Concurrency::default(),
            retry_attempts: RetryAttempts::default(),
            synthesizer: SynthesizerBackend::Tone,
            classifier: ClassifierBackend::Keyword,
            api_token: None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("concurrency must be > 0")]
    ZeroConcurrency,
    #[error("retry attempts must be > 0")]
    ZeroRetryAttempts,
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("{0} is required for the selected backend")]
    Missing(&'static str),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

/// CLI value, then environment; the result must parse as a URL.
pub fn resolve_endpoint(
    cli_value: Option<String>,
    env_key: &'static str,
    env: &impl Env,
) -> Result<Url, ConfigError> {
    let raw = resolve_optional_string(cli_value, env_key, env).ok_or(ConfigError::Missing(env_key))?;
    Ok(Url::parse(raw.trim())?)
}
