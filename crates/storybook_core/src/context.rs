//! Explicit run context replacing process-wide client and cursor.
//!
//! # Responsibility
//! - Acquire credentials, the API client and the store for one run.
//! - Release the store explicitly via `close`, or on drop for error paths.
//!
//! # Invariants
//! - The context owns the only connection used during a run.
//! - Acquisition order is credentials -> client -> store; a failure in any
//!   step releases everything acquired before it.

use crate::client::{ApiError, OpenAiClient};
use crate::config::{ConfigError, Credentials, StoryConfig};
use crate::db::{close_db, open_db, DbError, DbResult};
use crate::repo::story_repo::SqliteStoryRepository;
use crate::service::story_service::StoryService;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ContextError {
    Config(ConfigError),
    Client(ApiError),
    Db(DbError),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Client(err) => write!(f, "failed to build API client: {err}"),
            Self::Db(err) => write!(f, "failed to open story store: {err}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Client(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ContextError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ApiError> for ContextError {
    fn from(value: ApiError) -> Self {
        Self::Client(value)
    }
}

impl From<DbError> for ContextError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Resources held for one generation run.
pub struct StoryContext {
    config: StoryConfig,
    api: OpenAiClient,
    conn: Connection,
}

impl StoryContext {
    /// Loads credentials from `config.credentials_path` and opens the store.
    pub fn open(config: StoryConfig) -> Result<Self, ContextError> {
        let credentials = Credentials::load(&config.credentials_path)?;
        Self::open_with_credentials(config, credentials)
    }

    /// Opens the store with already-loaded credentials.
    pub fn open_with_credentials(
        config: StoryConfig,
        credentials: Credentials,
    ) -> Result<Self, ContextError> {
        let api = OpenAiClient::new(&config, credentials)?;
        let conn = open_db(&config.db_path)?;
        Ok(Self { config, api, conn })
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Borrows the context as a ready-to-run generation service.
    pub fn story_service(&self) -> StoryService<SqliteStoryRepository<'_>, &OpenAiClient> {
        StoryService::new(
            SqliteStoryRepository::new(&self.conn),
            &self.api,
            self.config.image_dir.clone(),
            self.config.instruction_max_len,
        )
    }

    /// Releases the store, reporting close failures.
    pub fn close(self) -> DbResult<()> {
        close_db(self.conn)
    }
}
