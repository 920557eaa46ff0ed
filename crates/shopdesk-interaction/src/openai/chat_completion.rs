//! ChatCompletionReplyGenerator - Chat Completions fallback when no
//! assistant id is configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shopdesk_core::config::AssistantConfig;
use shopdesk_core::reply::{ChatMessage, ReplyGenerator};
use shopdesk_core::{Result, ShopdeskError};

use super::{http_client, map_http_error, parse_retry_after, strip_citations, transport_error};

#[derive(Clone)]
pub struct ChatCompletionReplyGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    instructions: String,
}

impl ChatCompletionReplyGenerator {
    pub fn new(api_key: impl Into<String>, config: &AssistantConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.run_timeout().max(Duration::from_secs(10)))?,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            instructions: config.instructions.clone(),
        })
    }

    fn build_request(&self, history: &[ChatMessage]) -> ChatCompletionRequest {
        let mut messages = vec![RequestMessage {
            role: "system".to_string(),
            content: self.instructions.clone(),
        }];
        messages.extend(
            history
                .iter()
                .filter(|m| !m.text.trim().is_empty())
                .map(|m| RequestMessage {
                    role: m.role.to_string(),
                    content: m.text.clone(),
                }),
        );
        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
        }
    }
}

#[async_trait]
impl ReplyGenerator for ChatCompletionReplyGenerator {
    async fn generate(&self, history: &[ChatMessage]) -> Result<Option<String>> {
        let body = self.build_request(history);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ShopdeskError::generator(format!("Failed to parse OpenAI response: {err}")))?;
        Ok(parsed.first_text())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<RequestMessage>,
}

#[derive(Serialize)]
struct RequestMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| strip_citations(&text))
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_starts_with_system_prompt() {
        let generator = ChatCompletionReplyGenerator::new("sk-test", &AssistantConfig::default()).unwrap();
        let request = generator.build_request(&[ChatMessage::user("Hello")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_empty_choice_is_no_reply() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(response.first_text().is_none());
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(response.first_text().is_none());
    }
}
