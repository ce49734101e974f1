//! Run configuration and credential loading.
//!
//! # Responsibility
//! - Describe where credentials, the story store, images and logs live.
//! - Load the API key from a JSON credentials file.
//!
//! # Invariants
//! - The API key never appears in `Debug` output or log events.
//! - A blank `KEY` is rejected at load time.

use crate::extract::instruction::DEFAULT_INSTRUCTION_MAX_LEN;
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_CREDENTIALS_FILE: &str = "data.json";
pub const DEFAULT_DB_FILE: &str = "story_data.db";
pub const DEFAULT_IMAGE_DIR: &str = "Images";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo-1106";
pub const DEFAULT_IMAGE_SIZE: &str = "256x256";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryConfig {
    /// JSON file holding at least `{"KEY": "..."}`.
    pub credentials_path: PathBuf,
    /// SQLite store path; created when missing.
    pub db_path: PathBuf,
    /// Directory receiving `<story id>.png` downloads.
    pub image_dir: PathBuf,
    /// Base URL of the OpenAI-compatible API, without trailing slash.
    pub api_base: String,
    pub chat_model: String,
    /// Image dimensions accepted by the image endpoint, e.g. `256x256`.
    pub image_size: String,
    pub instruction_max_len: usize,
    /// Rolling log directory; must be absolute by the time logging starts.
    pub log_dir: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            api_base: DEFAULT_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            instruction_max_len: DEFAULT_INSTRUCTION_MAX_LEN,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: default_log_level().to_string(),
        }
    }
}

/// API credentials read from the credentials file.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "KEY")]
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Reads and validates a JSON credentials file.
    ///
    /// # Errors
    /// - `ConfigError::Io` when the file cannot be read.
    /// - `ConfigError::Parse` when it is not JSON or lacks `KEY`.
    /// - `ConfigError::EmptyApiKey` when `KEY` is blank.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    /// Parses credentials from JSON text. Unknown fields are ignored.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let credentials: Credentials =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })?;
        if credentials.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(credentials)
    }

    pub fn api_key(&self) -> &str {
        self.api_key.trim()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    EmptyApiKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read credentials `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "invalid credentials `{}`: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "invalid credentials: {source}"),
            Self::EmptyApiKey => write!(f, "credentials field `KEY` must not be empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::EmptyApiKey => None,
        }
    }
}
