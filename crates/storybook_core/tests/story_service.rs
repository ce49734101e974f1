use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use storybook_core::db::open_db_in_memory;
use storybook_core::{
    ApiError, ApiResult, GenerationOutcome, GenerativeApi, ServiceError, SkipReason,
    SqliteStoryRepository, StoryRepository, StoryRequest, StoryService,
    DEFAULT_INSTRUCTION_MAX_LEN,
};

const STORY_TEXT: &str = "Once upon a time a tall woman found a lantern in a dark forest.";
const SUMMARY_TEXT: &str =
    "A tall woman standing near a castle in a dark forest holding a lantern.";
const IMAGE_URL: &str = "https://img.example/generated.png";

/// Scripted stand-in for the hosted endpoints.
#[derive(Default)]
struct FakeApi {
    chat_replies: RefCell<VecDeque<ApiResult<String>>>,
    image_reply: RefCell<Option<ApiResult<String>>>,
    fail_download: bool,
    chat_prompts: RefCell<Vec<String>>,
    image_prompts: RefCell<Vec<String>>,
    downloads: RefCell<Vec<(String, PathBuf)>>,
}

impl FakeApi {
    fn new(chat_replies: Vec<ApiResult<String>>, image_reply: ApiResult<String>) -> Self {
        Self {
            chat_replies: RefCell::new(chat_replies.into()),
            image_reply: RefCell::new(Some(image_reply)),
            ..Self::default()
        }
    }

    fn happy() -> Self {
        Self::new(
            vec![Ok(STORY_TEXT.to_string()), Ok(SUMMARY_TEXT.to_string())],
            Ok(IMAGE_URL.to_string()),
        )
    }
}

impl GenerativeApi for FakeApi {
    fn chat_completion(&self, prompt: &str) -> ApiResult<String> {
        self.chat_prompts.borrow_mut().push(prompt.to_string());
        self.chat_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(ApiError::EmptyResponse("scripted chat reply")))
    }

    fn generate_image(&self, prompt: &str) -> ApiResult<String> {
        self.image_prompts.borrow_mut().push(prompt.to_string());
        self.image_reply
            .borrow_mut()
            .take()
            .unwrap_or(Err(ApiError::EmptyResponse("scripted image reply")))
    }

    fn download_image(&self, url: &str, dest: &Path) -> ApiResult<u64> {
        self.downloads
            .borrow_mut()
            .push((url.to_string(), dest.to_path_buf()));
        if self.fail_download {
            return Err(ApiError::Status {
                status: 404,
                body: "gone".to_string(),
            });
        }
        std::fs::create_dir_all(dest.parent().unwrap())?;
        std::fs::write(dest, b"png-bytes")?;
        Ok(9)
    }
}

fn request() -> StoryRequest {
    StoryRequest::new("adventure", "a dark forest", "a tall woman")
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        body: "upstream unavailable".to_string(),
    }
}

#[test]
fn successful_run_saves_row_and_downloads_image() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::happy();
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    let saved = match outcome {
        GenerationOutcome::Saved(saved) => saved,
        other => panic!("expected saved outcome, got {other:?}"),
    };

    assert_eq!(
        saved.instruction,
        "in a dark forest, a tall woman, holding a lantern"
    );
    assert_eq!(saved.record.chat_response, STORY_TEXT);
    assert_eq!(saved.record.image_url, IMAGE_URL);
    assert_eq!(saved.record.story_type, "adventure");
    assert_eq!(
        saved.image_path,
        image_dir.path().join(format!("{}.png", saved.record.id))
    );
    assert_eq!(std::fs::read(&saved.image_path).unwrap(), b"png-bytes");

    let prompts = api.chat_prompts.borrow();
    assert_eq!(
        prompts[0],
        "Craft a child's adventure story set in a dark forest with characters a tall woman."
    );
    assert!(prompts[1].starts_with("Images should be child appropriate."));
    assert!(prompts[1].contains(STORY_TEXT));
    assert_eq!(*api.image_prompts.borrow(), vec![saved.instruction.clone()]);

    let repo = SqliteStoryRepository::new(&conn);
    assert_eq!(repo.count_stories().unwrap(), 1);
}

#[test]
fn failed_story_call_skips_everything() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(vec![Err(server_error())], Ok(IMAGE_URL.to_string()));
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::Skipped(SkipReason::StoryFailed(ApiError::Status { status: 500, .. }))
    ));
    assert_eq!(api.chat_prompts.borrow().len(), 1);
    assert!(api.image_prompts.borrow().is_empty());
    assert_eq!(SqliteStoryRepository::new(&conn).count_stories().unwrap(), 0);
}

#[test]
fn failed_summary_call_skips_image_and_save() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(
        vec![Ok(STORY_TEXT.to_string()), Err(server_error())],
        Ok(IMAGE_URL.to_string()),
    );
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::Skipped(SkipReason::SummaryFailed(_))
    ));
    assert!(api.image_prompts.borrow().is_empty());
    assert_eq!(SqliteStoryRepository::new(&conn).count_stories().unwrap(), 0);
}

#[test]
fn failed_image_call_skips_save_and_download() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(
        vec![Ok(STORY_TEXT.to_string()), Ok(SUMMARY_TEXT.to_string())],
        Err(ApiError::EmptyResponse("image url")),
    );
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::Skipped(SkipReason::ImageFailed(ApiError::EmptyResponse(_)))
    ));
    assert!(api.downloads.borrow().is_empty());
    assert_eq!(SqliteStoryRepository::new(&conn).count_stories().unwrap(), 0);
    assert_eq!(std::fs::read_dir(image_dir.path()).unwrap().count(), 0);
}

#[test]
fn summary_without_phrases_falls_back_to_summary_text() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(
        vec![
            Ok(STORY_TEXT.to_string()),
            Ok("Two friends   share\nwarm soup.".to_string()),
        ],
        Ok(IMAGE_URL.to_string()),
    );
    let service = StoryService::new(SqliteStoryRepository::new(&conn), &api, image_dir.path(), 15);

    let outcome = service.generate(&request()).unwrap();
    let saved = match outcome {
        GenerationOutcome::Saved(saved) => saved,
        other => panic!("expected saved outcome, got {other:?}"),
    };
    assert_eq!(saved.instruction, "Two friends");
}

#[test]
fn blank_summary_is_skipped() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(
        vec![Ok(STORY_TEXT.to_string()), Ok("  \n ".to_string())],
        Ok(IMAGE_URL.to_string()),
    );
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::Skipped(SkipReason::NoInstruction)
    ));
    assert!(api.image_prompts.borrow().is_empty());
}

#[test]
fn failed_download_reports_committed_story_id() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi {
        fail_download: true,
        ..FakeApi::happy()
    };
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let err = service.generate(&request()).unwrap_err();
    let story_id = match err {
        ServiceError::Download { story_id, .. } => story_id,
        other => panic!("expected download error, got {other}"),
    };

    let repo = SqliteStoryRepository::new(&conn);
    let stored = repo.get_story(story_id).unwrap().unwrap();
    assert_eq!(stored.image_url, IMAGE_URL);
    assert_eq!(api.downloads.borrow()[0].0, IMAGE_URL);
}

#[test]
fn blank_story_text_skips_summary_and_image() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(vec![Ok(" \n".to_string())], Ok(IMAGE_URL.to_string()));
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::Skipped(SkipReason::StoryFailed(ApiError::EmptyResponse(_)))
    ));
    assert_eq!(api.chat_prompts.borrow().len(), 1);
    assert!(api.image_prompts.borrow().is_empty());
    assert_eq!(SqliteStoryRepository::new(&conn).count_stories().unwrap(), 0);
}

#[test]
fn blank_image_url_skips_save_and_download() {
    let conn = open_db_in_memory().unwrap();
    let image_dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(
        vec![Ok(STORY_TEXT.to_string()), Ok(SUMMARY_TEXT.to_string())],
        Ok(String::new()),
    );
    let service = StoryService::new(
        SqliteStoryRepository::new(&conn),
        &api,
        image_dir.path(),
        DEFAULT_INSTRUCTION_MAX_LEN,
    );

    let outcome = service.generate(&request()).unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::Skipped(SkipReason::ImageFailed(ApiError::EmptyResponse(_)))
    ));
    assert_eq!(api.image_prompts.borrow().len(), 1);
    assert!(api.downloads.borrow().is_empty());
    assert_eq!(SqliteStoryRepository::new(&conn).count_stories().unwrap(), 0);
}
