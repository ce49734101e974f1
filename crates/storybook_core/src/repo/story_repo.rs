//! Story repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist one `stories` row per completed run.
//! - Read rows back for verification.
//!
//! # Invariants
//! - Write paths call `NewStory::validate()` before SQL mutations.
//! - Rows are never updated or deleted.

use crate::db::DbError;
use crate::model::story::{NewStory, StoryId, StoryRecord, StoryValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STORY_SELECT_SQL: &str = "SELECT
    id,
    story_type,
    setting,
    characters,
    chat_response,
    image_url
FROM stories";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for story persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(StoryValidationError),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid story: {err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<StoryValidationError> for RepoError {
    fn from(value: StoryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for story rows.
pub trait StoryRepository {
    /// Inserts one story and returns its row id.
    fn insert_story(&self, story: &NewStory) -> RepoResult<StoryId>;
    /// Gets one story by row id.
    fn get_story(&self, id: StoryId) -> RepoResult<Option<StoryRecord>>;
    /// Returns the number of stored stories.
    fn count_stories(&self) -> RepoResult<u64>;
}

/// SQLite-backed story repository.
pub struct SqliteStoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStoryRepository<'conn> {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StoryRepository for SqliteStoryRepository<'_> {
    fn insert_story(&self, story: &NewStory) -> RepoResult<StoryId> {
        story.validate()?;

        self.conn.execute(
            "INSERT INTO stories (
                story_type,
                setting,
                characters,
                chat_response,
                image_url
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                story.request.story_type.as_str(),
                story.request.setting.as_str(),
                story.request.characters.as_str(),
                story.chat_response.as_str(),
                story.image_url.as_str(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_story(&self, id: StoryId) -> RepoResult<Option<StoryRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{STORY_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_story_row,
            )
            .optional()?;
        Ok(record)
    }

    fn count_stories(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM stories;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

// Columns are nullable in stores created by earlier tooling.
fn parse_story_row(row: &Row<'_>) -> rusqlite::Result<StoryRecord> {
    Ok(StoryRecord {
        id: row.get("id")?,
        story_type: text_or_empty(row, "story_type")?,
        setting: text_or_empty(row, "setting")?,
        characters: text_or_empty(row, "characters")?,
        chat_response: text_or_empty(row, "chat_response")?,
        image_url: text_or_empty(row, "image_url")?,
    })
}

fn text_or_empty(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(column)?.unwrap_or_default())
}
