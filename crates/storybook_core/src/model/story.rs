//! Story request/record model and prompt builders.
//!
//! # Responsibility
//! - Carry the three user preferences through the generation flow.
//! - Define the write model (`NewStory`) and read model (`StoryRecord`).
//!
//! # Invariants
//! - `NewStory::validate()` must pass before persistence.
//! - The summary prompt never exceeds `SUMMARY_PROMPT_MAX_LEN` chars.

use crate::extract::instruction::truncate_at_word_boundary;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Auto-increment row id of the `stories` table.
pub type StoryId = i64;

/// Character budget for the summary prompt.
pub const SUMMARY_PROMPT_MAX_LEN: usize = 800;

/// User preferences collected before generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRequest {
    /// Genre or kind of story, e.g. `adventure`.
    pub story_type: String,
    /// Where the story takes place.
    pub setting: String,
    /// Free-text character list.
    pub characters: String,
}

impl StoryRequest {
    pub fn new(
        story_type: impl Into<String>,
        setting: impl Into<String>,
        characters: impl Into<String>,
    ) -> Self {
        Self {
            story_type: story_type.into(),
            setting: setting.into(),
            characters: characters.into(),
        }
    }

    /// Builds the story prompt for the first chat completion.
    pub fn story_prompt(&self) -> String {
        format!(
            "Craft a child's {} story set in {} with characters {}.",
            self.story_type, self.setting, self.characters
        )
    }
}

/// Builds the bounded summarization prompt for a generated story.
pub fn summary_prompt(story_text: &str) -> String {
    let prompt = format!(
        "Images should be child appropriate. Summarize this text {story_text}. \
         Encapsulate the essence of the story with a response no more than {SUMMARY_PROMPT_MAX_LEN} characters."
    );
    truncate_at_word_boundary(&prompt, SUMMARY_PROMPT_MAX_LEN).to_string()
}

/// Write model for one completed generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub request: StoryRequest,
    /// Story text returned by the first chat completion.
    pub chat_response: String,
    /// URL returned by the image-generation endpoint.
    pub image_url: String,
}

impl NewStory {
    /// Validates write invariants.
    pub fn validate(&self) -> Result<(), StoryValidationError> {
        if self.chat_response.trim().is_empty() {
            return Err(StoryValidationError::EmptyChatResponse);
        }
        if self.image_url.trim().is_empty() {
            return Err(StoryValidationError::EmptyImageUrl);
        }
        Ok(())
    }
}

/// Read model for one persisted `stories` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: StoryId,
    pub story_type: String,
    pub setting: String,
    pub characters: String,
    pub chat_response: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryValidationError {
    EmptyChatResponse,
    EmptyImageUrl,
}

impl Display for StoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyChatResponse => write!(f, "chat_response must not be empty"),
            Self::EmptyImageUrl => write!(f, "image_url must not be empty"),
        }
    }
}

impl Error for StoryValidationError {}
