//! Core logic for StoryBook: prompts, instruction extraction, generative API
//! calls and the story store.

pub mod client;
pub mod config;
pub mod context;
pub mod db;
pub mod extract;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use client::{ApiError, ApiResult, GenerativeApi, OpenAiClient};
pub use config::{ConfigError, Credentials, StoryConfig};
pub use context::{ContextError, StoryContext};
pub use extract::instruction::{
    extract_image_instructions, extract_parts, truncate_at_word_boundary, InstructionParts,
    DEFAULT_INSTRUCTION_MAX_LEN,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::story::{
    summary_prompt, NewStory, StoryId, StoryRecord, StoryRequest, StoryValidationError,
};
pub use repo::story_repo::{RepoError, RepoResult, SqliteStoryRepository, StoryRepository};
pub use service::story_service::{
    GenerationOutcome, SavedStory, ServiceError, SkipReason, StoryService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
