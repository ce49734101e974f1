//! Generative API boundary.
//!
//! # Responsibility
//! - Define the chat/image/download contract used by the story service.
//! - Provide the OpenAI-compatible HTTP implementation.
//!
//! # Invariants
//! - Every call returns an explicit `ApiResult`; nothing panics or prints.
//! - Calls are blocking and sequential; no retries are attempted.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

mod models;
mod openai;

pub use openai::OpenAiClient;

pub type ApiResult<T> = Result<T, ApiError>;

/// Contract for the hosted generative services.
pub trait GenerativeApi {
    /// Sends one user prompt and returns the completion text.
    fn chat_completion(&self, prompt: &str) -> ApiResult<String>;
    /// Requests one image for `prompt` and returns its URL.
    fn generate_image(&self, prompt: &str) -> ApiResult<String>;
    /// Streams the image at `url` into `dest`, returning bytes written.
    fn download_image(&self, url: &str, dest: &Path) -> ApiResult<u64>;
}

impl<T: GenerativeApi + ?Sized> GenerativeApi for &T {
    fn chat_completion(&self, prompt: &str) -> ApiResult<String> {
        (**self).chat_completion(prompt)
    }

    fn generate_image(&self, prompt: &str) -> ApiResult<String> {
        (**self).generate_image(prompt)
    }

    fn download_image(&self, url: &str, dest: &Path) -> ApiResult<u64> {
        (**self).download_image(url, dest)
    }
}

/// Failure of one generative API call.
#[derive(Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, body read).
    Http(reqwest::Error),
    /// Endpoint answered with a non-success status.
    Status { status: u16, body: String },
    /// Response body was not the expected JSON shape.
    Decode(serde_json::Error),
    /// Response decoded but carried no usable payload.
    EmptyResponse(&'static str),
    /// Local file-system failure while saving a download.
    Io(std::io::Error),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Status { status, body } => {
                write!(f, "endpoint returned status {status}: {body}")
            }
            Self::Decode(err) => write!(f, "failed to decode response: {err}"),
            Self::EmptyResponse(what) => write!(f, "response contained no {what}"),
            Self::Io(err) => write!(f, "failed to write download: {err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Status { .. } | Self::EmptyResponse(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
