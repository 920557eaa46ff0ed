//! Transport for the W3C WebDriver wire protocol.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use shopdesk_core::ShopdeskError;

/// Failure of a single WebDriver command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebDriverError {
    /// W3C error code such as `no such element`; `transport` when the
    /// endpoint could not be reached.
    pub code: String,
    pub message: String,
}

pub(crate) const TRANSPORT: &str = "transport";
pub(crate) const NO_SUCH_ELEMENT: &str = "no such element";

impl WebDriverError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        self.code == NO_SUCH_ELEMENT
    }

    /// Whether the browser behind the session is gone.
    pub fn is_session_fault(&self) -> bool {
        if matches!(
            self.code.as_str(),
            TRANSPORT | "invalid session id" | "no such window"
        ) {
            return true;
        }
        let message = self.message.to_ascii_lowercase();
        ["chrome not reachable", "disconnected", "session deleted", "target window already closed"]
            .iter()
            .any(|needle| message.contains(needle))
    }
}

impl From<WebDriverError> for ShopdeskError {
    fn from(err: WebDriverError) -> Self {
        if err.is_session_fault() {
            ShopdeskError::session_dead(format!("{}: {}", err.code, err.message))
        } else {
            ShopdeskError::browser(format!("{}: {}", err.code, err.message))
        }
    }
}

#[derive(Deserialize)]
struct ValueEnvelope {
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// Thin JSON client bound to one WebDriver endpoint.
#[derive(Clone)]
pub struct WebDriverClient {
    http: Client,
    endpoint: String,
}

impl WebDriverClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ShopdeskError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShopdeskError::browser(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a command and returns its `value` member.
    pub async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&serde_json::json!({}));
        }

        let response = request.send().await.map_err(|err| {
            WebDriverError::new(TRANSPORT, format!("{} {} failed: {}", method, path, err))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            WebDriverError::new(TRANSPORT, format!("Failed to read response of {}: {}", path, err))
        })?;

        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }

        let envelope: ValueEnvelope = serde_json::from_str(&text).map_err(|err| {
            WebDriverError::new("unknown error", format!("Malformed response for {}: {}", path, err))
        })?;
        Ok(envelope.value)
    }
}

/// Extracts the W3C error object from a failed response.
pub(crate) fn map_http_error(status: StatusCode, body: &str) -> WebDriverError {
    serde_json::from_str::<ValueEnvelope>(body)
        .ok()
        .and_then(|envelope| serde_json::from_value::<ErrorValue>(envelope.value).ok())
        .map(|error| WebDriverError::new(error.error, error.message))
        .unwrap_or_else(|| WebDriverError::new("unknown error", format!("HTTP {}: {}", status, body)))
}
