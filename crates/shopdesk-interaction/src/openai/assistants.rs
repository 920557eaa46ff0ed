//! AssistantsReplyGenerator - OpenAI Assistants v2 over REST.
//!
//! Each call creates a fresh thread seeded with the transcript, runs the
//! configured assistant on it, and returns the newest assistant message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shopdesk_core::config::AssistantConfig;
use shopdesk_core::reply::{ChatMessage, ReplyGenerator};
use shopdesk_core::{Result, ShopdeskError};
use tokio::time::{Instant, sleep};

use super::{http_client, map_http_error, parse_retry_after, strip_citations, transport_error};

const BETA_HEADER: &str = "assistants=v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AssistantsReplyGenerator {
    client: Client,
    api_key: String,
    assistant_id: String,
    base_url: String,
    instructions: String,
    run_timeout: Duration,
    poll_interval: Duration,
}

impl AssistantsReplyGenerator {
    pub fn new(
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
        config: &AssistantConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            instructions: config.instructions.clone(),
            run_timeout: config.run_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    async fn send<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", BETA_HEADER);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        response
            .json()
            .await
            .map_err(|err| ShopdeskError::generator(format!("Failed to parse OpenAI response: {err}")))
    }

    async fn wait_for_run(&self, thread_id: &str, mut run: RunObject) -> Result<RunObject> {
        let deadline = Instant::now() + self.run_timeout;
        while !run.is_terminal() {
            if Instant::now() >= deadline {
                return Err(ShopdeskError::generator(format!(
                    "Assistant run {} still '{}' after {}s",
                    run.id,
                    run.status,
                    self.run_timeout.as_secs()
                )));
            }
            sleep(self.poll_interval).await;
            run = self
                .send::<(), _>(Method::GET, &format!("/threads/{}/runs/{}", thread_id, run.id), None)
                .await?;
        }
        Ok(run)
    }
}

#[async_trait]
impl ReplyGenerator for AssistantsReplyGenerator {
    async fn generate(&self, history: &[ChatMessage]) -> Result<Option<String>> {
        let thread: ThreadObject = self
            .send(Method::POST, "/threads", Some(&CreateThreadRequest::from_history(history)))
            .await?;

        let run: RunObject = self
            .send(
                Method::POST,
                &format!("/threads/{}/runs", thread.id),
                Some(&CreateRunRequest {
                    assistant_id: &self.assistant_id,
                    instructions: &self.instructions,
                }),
            )
            .await?;

        let run = self.wait_for_run(&thread.id, run).await?;
        if run.status != "completed" {
            tracing::warn!(target: "dispatch", status = %run.status, "Assistant run did not complete");
            return Ok(None);
        }

        let messages: MessageList = self
            .send::<(), _>(
                Method::GET,
                &format!("/threads/{}/messages?order=desc&limit=20", thread.id),
                None,
            )
            .await?;
        Ok(messages.latest_assistant_text())
    }
}

#[derive(Serialize)]
struct CreateThreadRequest {
    messages: Vec<ThreadMessage>,
}

impl CreateThreadRequest {
    fn from_history(history: &[ChatMessage]) -> Self {
        Self {
            messages: history
                .iter()
                .filter(|m| !m.text.trim().is_empty())
                .map(|m| ThreadMessage {
                    role: m.role.to_string(),
                    content: m.text.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ThreadMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
    instructions: &'a str,
}

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: String,
}

impl RunObject {
    fn is_terminal(&self) -> bool {
        !matches!(self.status.as_str(), "queued" | "in_progress" | "cancelling")
    }
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<TextBlock>,
}

#[derive(Deserialize)]
struct TextBlock {
    value: String,
}

impl MessageList {
    /// Messages are listed newest first.
    fn latest_assistant_text(self) -> Option<String> {
        self.data
            .into_iter()
            .filter(|m| m.role == "assistant")
            .flat_map(|m| m.content)
            .find_map(|block| block.text)
            .map(|text| strip_citations(&text.value))
            .filter(|text| !text.is_empty())
    }
}
