//! Reply generators backed by the OpenAI HTTP API.

mod assistants;
mod chat_completion;

pub use assistants::AssistantsReplyGenerator;
pub use chat_completion::ChatCompletionReplyGenerator;

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{StatusCode, header::HeaderValue};
use serde::Deserialize;
use shopdesk_core::ShopdeskError;
use shopdesk_core::config::AssistantConfig;
use shopdesk_core::reply::ReplyGenerator;

static CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"【[^】]*?†(?:source|來源)】").expect("citation regex should compile")
});

/// Removes file-search citation markers such as `【4:0†source】`.
pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").trim().to_string()
}

/// Picks the generator the configuration asks for, or `None` without an API
/// key.
pub fn build_reply_generator(config: &AssistantConfig) -> Result<Option<Arc<dyn ReplyGenerator>>, ShopdeskError> {
    let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };
    let generator: Arc<dyn ReplyGenerator> = match &config.assistant_id {
        Some(id) if !id.trim().is_empty() => Arc::new(AssistantsReplyGenerator::new(api_key, id.clone(), config)?),
        _ => Arc::new(ChatCompletionReplyGenerator::new(api_key, config)?),
    };
    Ok(Some(generator))
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub(crate) fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ShopdeskError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    match retry_after {
        Some(delay) => ShopdeskError::generator(format!(
            "OpenAI API error {}: {} (retry after {}s)",
            status.as_u16(),
            message,
            delay.as_secs()
        )),
        None => ShopdeskError::generator(format!("OpenAI API error {}: {}", status.as_u16(), message)),
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

pub(crate) fn transport_error(err: reqwest::Error) -> ShopdeskError {
    ShopdeskError::generator(format!("OpenAI API request failed: {err}"))
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ShopdeskError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ShopdeskError::generator(format!("Failed to build HTTP client: {e}")))
}
