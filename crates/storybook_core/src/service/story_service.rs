//! Story generation use-case service.
//!
//! # Responsibility
//! - Run story -> summary -> instruction -> image -> save -> download.
//! - Turn API failures and blank API payloads into explicit skip outcomes.
//!
//! # Invariants
//! - A skipped run writes nothing to the store or the image directory.
//! - A saved run has exactly one row; the image file is named `<id>.png`.
//! - The store is written before the download starts.

use crate::client::{ApiError, GenerativeApi};
use crate::extract::instruction::{extract_image_instructions, truncate_at_word_boundary};
use crate::model::story::{summary_prompt, NewStory, StoryId, StoryRecord, StoryRequest};
use crate::repo::story_repo::{RepoError, StoryRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

/// Why a run stopped before anything was saved.
#[derive(Debug)]
pub enum SkipReason {
    /// The story chat completion failed.
    StoryFailed(ApiError),
    /// The summary chat completion failed.
    SummaryFailed(ApiError),
    /// The summary was blank, leaving nothing to draw.
    NoInstruction,
    /// The image generation call failed.
    ImageFailed(ApiError),
}

impl SkipReason {
    fn code(&self) -> &'static str {
        match self {
            Self::StoryFailed(_) => "story_failed",
            Self::SummaryFailed(_) => "summary_failed",
            Self::NoInstruction => "no_instruction",
            Self::ImageFailed(_) => "image_failed",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoryFailed(err) => write!(f, "story generation failed: {err}"),
            Self::SummaryFailed(err) => write!(f, "story summary failed: {err}"),
            Self::NoInstruction => write!(f, "summary was empty; no image instruction"),
            Self::ImageFailed(err) => write!(f, "image generation failed: {err}"),
        }
    }
}

/// Result of a completed and persisted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedStory {
    pub record: StoryRecord,
    /// Instruction sent to the image endpoint.
    pub instruction: String,
    /// Local copy of the generated image.
    pub image_path: PathBuf,
}

#[derive(Debug)]
pub enum GenerationOutcome {
    Saved(SavedStory),
    Skipped(SkipReason),
}

/// Failures that are not plain API misses.
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    /// The row was committed but the image could not be saved locally.
    Download { story_id: StoryId, source: ApiError },
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Download { story_id, source } => {
                write!(f, "story {story_id} saved but image download failed: {source}")
            }
            Self::InconsistentState(details) => write!(f, "inconsistent story state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Download { source, .. } => Some(source),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Generation flow over a repository and a generative API.
pub struct StoryService<R: StoryRepository, A: GenerativeApi> {
    repo: R,
    api: A,
    image_dir: PathBuf,
    instruction_max_len: usize,
}

impl<R: StoryRepository, A: GenerativeApi> StoryService<R, A> {
    pub fn new(
        repo: R,
        api: A,
        image_dir: impl Into<PathBuf>,
        instruction_max_len: usize,
    ) -> Self {
        Self {
            repo,
            api,
            image_dir: image_dir.into(),
            instruction_max_len,
        }
    }

    /// Runs one full generation for `request`.
    ///
    /// # Errors
    /// - `ServiceError::Repo` when the row cannot be written or read back.
    /// - `ServiceError::Download` when the committed run's image cannot be saved.
    pub fn generate(&self, request: &StoryRequest) -> Result<GenerationOutcome, ServiceError> {
        let started_at = Instant::now();
        info!("event=story_generate module=service status=start");

        let outcome = self.run(request);
        match &outcome {
            Ok(GenerationOutcome::Saved(saved)) => info!(
                "event=story_generate module=service status=ok duration_ms={} story_id={}",
                started_at.elapsed().as_millis(),
                saved.record.id
            ),
            Ok(GenerationOutcome::Skipped(reason)) => warn!(
                "event=story_generate module=service status=skipped duration_ms={} reason={} detail={}",
                started_at.elapsed().as_millis(),
                reason.code(),
                reason
            ),
            Err(err) => warn!(
                "event=story_generate module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        outcome
    }

    fn run(&self, request: &StoryRequest) -> Result<GenerationOutcome, ServiceError> {
        let story_text = match self
            .api
            .chat_completion(&request.story_prompt())
            .and_then(|text| non_blank(text, "story text"))
        {
            Ok(text) => text,
            Err(err) => return Ok(GenerationOutcome::Skipped(SkipReason::StoryFailed(err))),
        };

        let summary = match self.api.chat_completion(&summary_prompt(&story_text)) {
            Ok(text) => text,
            Err(err) => return Ok(GenerationOutcome::Skipped(SkipReason::SummaryFailed(err))),
        };

        let instruction = self.image_instruction(&summary);
        if instruction.is_empty() {
            return Ok(GenerationOutcome::Skipped(SkipReason::NoInstruction));
        }

        let image_url = match self
            .api
            .generate_image(&instruction)
            .and_then(|url| non_blank(url, "image url"))
        {
            Ok(url) => url,
            Err(err) => return Ok(GenerationOutcome::Skipped(SkipReason::ImageFailed(err))),
        };

        let story_id = self.repo.insert_story(&NewStory {
            request: request.clone(),
            chat_response: story_text,
            image_url,
        })?;
        let record = self
            .repo
            .get_story(story_id)?
            .ok_or(ServiceError::InconsistentState(
                "inserted story not found in read-back",
            ))?;

        let image_path = self.image_path_for(story_id);
        self.api
            .download_image(&record.image_url, &image_path)
            .map_err(|source| ServiceError::Download { story_id, source })?;

        Ok(GenerationOutcome::Saved(SavedStory {
            record,
            instruction,
            image_path,
        }))
    }

    // Summaries without recognizable phrases fall back to the bounded summary.
    fn image_instruction(&self, summary: &str) -> String {
        let extracted = extract_image_instructions(Some(summary), self.instruction_max_len);
        if !extracted.is_empty() {
            return extracted;
        }
        let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_at_word_boundary(&collapsed, self.instruction_max_len).to_string()
    }

    fn image_path_for(&self, story_id: StoryId) -> PathBuf {
        self.image_dir.join(format!("{story_id}.png"))
    }
}

// A blank payload counts as no payload, so the dependent steps never run.
fn non_blank(value: String, what: &'static str) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::EmptyResponse(what));
    }
    Ok(value)
}
