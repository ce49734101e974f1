//! StoryBook command-line entry point.
//!
//! # Responsibility
//! - Collect story preferences from flags or console prompts.
//! - Run one generation and print the story, image instruction and URL.
//!
//! # Invariants
//! - The story store is closed on every exit path after it was opened.
//! - A skipped run exits successfully after printing the reason.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storybook_core::config::{
    DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_CREDENTIALS_FILE, DEFAULT_DB_FILE,
    DEFAULT_IMAGE_DIR, DEFAULT_IMAGE_SIZE, DEFAULT_LOG_DIR,
};
use storybook_core::{
    core_version, default_log_level, init_logging, GenerationOutcome, StoryConfig, StoryContext,
    StoryRequest, DEFAULT_INSTRUCTION_MAX_LEN,
};

/// Generate a children's story and a matching picture.
///
/// Missing story fields are asked for on the console.
#[derive(Parser, Debug)]
#[command(name = "storybook", version = core_version())]
struct Args {
    /// JSON credentials file containing `{"KEY": "<api key>"}`
    #[arg(long, default_value = DEFAULT_CREDENTIALS_FILE, env = "STORYBOOK_CREDENTIALS")]
    credentials: PathBuf,

    /// SQLite store recording every saved story
    #[arg(long, default_value = DEFAULT_DB_FILE, env = "STORYBOOK_DB")]
    db: PathBuf,

    /// Directory receiving downloaded images as `<story id>.png`
    #[arg(long, default_value = DEFAULT_IMAGE_DIR, env = "STORYBOOK_IMAGE_DIR")]
    image_dir: PathBuf,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Chat model used for the story and its summary
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    model: String,

    /// Generated image size
    #[arg(long, default_value = DEFAULT_IMAGE_SIZE)]
    image_size: String,

    /// Maximum characters of the image instruction
    #[arg(long, default_value_t = DEFAULT_INSTRUCTION_MAX_LEN)]
    max_instruction_len: usize,

    /// Directory for rolling log files, resolved against the working directory
    #[arg(long, default_value = DEFAULT_LOG_DIR, env = "STORYBOOK_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, default_value = default_log_level())]
    log_level: String,

    /// Kind of story, e.g. `adventure`
    #[arg(long)]
    story_type: Option<String>,

    /// Where the story takes place
    #[arg(long)]
    setting: Option<String>,

    /// Who appears in the story
    #[arg(long)]
    characters: Option<String>,
}

impl Args {
    fn story_config(&self) -> Result<StoryConfig> {
        Ok(StoryConfig {
            credentials_path: self.credentials.clone(),
            db_path: self.db.clone(),
            image_dir: self.image_dir.clone(),
            api_base: self.api_base.clone(),
            chat_model: self.model.clone(),
            image_size: self.image_size.clone(),
            instruction_max_len: self.max_instruction_len,
            log_dir: resolve_log_dir(&self.log_dir)?,
            log_level: self.log_level.clone(),
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.story_config()?;
    // Logging is best-effort; the story run does not depend on it.
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    let context = StoryContext::open(config).context("failed to prepare story run")?;
    let result = collect_request(args).and_then(|request| generate(&context, &request));
    let closed = context.close().context("failed to close story store");

    result.and(closed)
}

fn generate(context: &StoryContext, request: &StoryRequest) -> Result<()> {
    let outcome = context
        .story_service()
        .generate(request)
        .context("story generation failed")?;

    match outcome {
        GenerationOutcome::Saved(saved) => {
            println!("\nImage text: {}", saved.instruction);
            println!("\nStory: {}", saved.record.chat_response);
            println!("\nGenerated Image URL: {}", saved.record.image_url);
            println!("\nSaved image: {}", saved.image_path.display());
            info!(
                "event=cli_run module=cli status=ok story_id={}",
                saved.record.id
            );
        }
        GenerationOutcome::Skipped(reason) => {
            println!("\nNothing saved: {reason}");
            warn!("event=cli_run module=cli status=skipped");
        }
    }
    Ok(())
}

fn collect_request(args: &Args) -> Result<StoryRequest> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    Ok(StoryRequest::new(
        field_or_prompt(args.story_type.as_deref(), "What kind of story do you want? ", &mut input)?,
        field_or_prompt(args.setting.as_deref(), "What is the setting of the story? ", &mut input)?,
        field_or_prompt(
            args.characters.as_deref(),
            "Who are the characters in the story? ",
            &mut input,
        )?,
    ))
}

fn field_or_prompt(value: Option<&str>, question: &str, input: &mut impl BufRead) -> Result<String> {
    if let Some(value) = value {
        return Ok(value.to_string());
    }

    print!("{question}");
    io::stdout().flush().context("failed to flush prompt")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read console input")?;
    Ok(answer.trim().to_string())
}

fn resolve_log_dir(log_dir: &Path) -> Result<PathBuf> {
    if log_dir.is_absolute() {
        return Ok(log_dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(log_dir))
}
