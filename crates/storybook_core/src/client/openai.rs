//! Blocking OpenAI-compatible client for chat, images and downloads.
//!
//! # Invariants
//! - Log events carry sizes and durations only, never prompt text or keys.
//! - Non-success statuses are reported with the response body.
//! - A failed download leaves no file at the destination.

use super::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatRequestMessage, ImageGenerationRequest,
    ImageGenerationResponse,
};
use super::{ApiError, ApiResult, GenerativeApi};
use crate::config::{Credentials, StoryConfig};
use log::{error, info};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client bound to one API key and model configuration.
pub struct OpenAiClient {
    http: Client,
    credentials: Credentials,
    api_base: String,
    chat_model: String,
    image_size: String,
}

impl OpenAiClient {
    /// Builds a client from run configuration and loaded credentials.
    pub fn new(config: &StoryConfig, credentials: Credentials) -> ApiResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            image_size: config.image_size.clone(),
        })
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let response = self
            .http
            .post(format!("{}/{path}", self.api_base))
            .bearer_auth(self.credentials.api_key())
            .json(body)
            .send()?;
        let body = ensure_success(response)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl GenerativeApi for OpenAiClient {
    fn chat_completion(&self, prompt: &str) -> ApiResult<String> {
        let started_at = Instant::now();
        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let result = self
            .post_json::<_, ChatCompletionResponse>("chat/completions", &request)
            .and_then(|response| {
                response
                    .into_first_text()
                    .ok_or(ApiError::EmptyResponse("chat completion text"))
            });

        log_call("chat_completion", started_at, prompt.chars().count(), &result);
        result
    }

    fn generate_image(&self, prompt: &str) -> ApiResult<String> {
        let started_at = Instant::now();
        let request = ImageGenerationRequest {
            prompt,
            n: 1,
            size: &self.image_size,
        };

        let result = self
            .post_json::<_, ImageGenerationResponse>("images/generations", &request)
            .and_then(|response| {
                response
                    .into_first_url()
                    .ok_or(ApiError::EmptyResponse("image url"))
            });

        log_call("image_generation", started_at, prompt.chars().count(), &result);
        result
    }

    fn download_image(&self, url: &str, dest: &Path) -> ApiResult<u64> {
        let started_at = Instant::now();
        let result = self.stream_to_file(url, dest);
        match &result {
            Ok(bytes) => info!(
                "event=image_download module=client status=ok duration_ms={} bytes={}",
                started_at.elapsed().as_millis(),
                bytes
            ),
            Err(err) => error!(
                "event=image_download module=client status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl OpenAiClient {
    fn stream_to_file(&self, url: &str, dest: &Path) -> ApiResult<u64> {
        let mut response = ensure_success(self.http.get(url).send()?)?;

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(dest)?);
        let copied = response
            .copy_to(&mut writer)
            .map_err(ApiError::from)
            .and_then(|written| writer.flush().map(|()| written).map_err(ApiError::from));
        drop(writer);

        // A partial body must not be mistaken for the story's image.
        if copied.is_err() {
            let _ = std::fs::remove_file(dest);
        }
        copied
    }
}

fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

fn log_call(event: &str, started_at: Instant, prompt_chars: usize, result: &ApiResult<String>) {
    match result {
        Ok(output) => info!(
            "event={event} module=client status=ok duration_ms={} prompt_chars={} output_chars={}",
            started_at.elapsed().as_millis(),
            prompt_chars,
            output.chars().count()
        ),
        Err(err) => error!(
            "event={event} module=client status=error duration_ms={} prompt_chars={} error={}",
            started_at.elapsed().as_millis(),
            prompt_chars,
            err
        ),
    }
}
