//! BrowserSession over a live WebDriver session.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Method;
use serde_json::{Value, json};
use shopdesk_core::browser::{BrowserSession, Cookie, ElementHandle, Locator};
use shopdesk_core::{Result, ShopdeskError};

use super::client::{WebDriverClient, WebDriverError};

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub struct WebDriverSession {
    client: WebDriverClient,
    session_id: String,
}

impl WebDriverSession {
    pub fn new(client: WebDriverClient, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    fn element_path(&self, element: &ElementHandle, suffix: &str) -> String {
        self.path(&format!("/element/{}{}", element.id(), suffix))
    }

    async fn get(&self, suffix: &str) -> Result<Value> {
        Ok(self.client.command(Method::GET, &self.path(suffix), None).await?)
    }

    async fn post(&self, suffix: &str, body: Value) -> Result<Value> {
        Ok(self
            .client
            .command(Method::POST, &self.path(suffix), Some(body))
            .await?)
    }

    fn search_path(&self, scope: Option<&ElementHandle>, plural: bool) -> String {
        let leaf = if plural { "/elements" } else { "/element" };
        match scope {
            Some(parent) => self.element_path(parent, leaf),
            None => self.path(leaf),
        }
    }
}

fn locator_body(locator: &Locator) -> Value {
    let (using, value) = locator.to_css_or_xpath();
    json!({ "using": using, "value": value })
}

pub(crate) fn parse_element(value: &Value) -> Result<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| ShopdeskError::browser(format!("Response is not a web element: {}", value)))
}

pub(crate) fn element_reference(element: &ElementHandle) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(ELEMENT_KEY.to_string(), Value::String(element.id().to_string()));
    Value::Object(map)
}

fn as_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.post("/refresh", json!({})).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(as_string(self.get("/url").await?))
    }

    async fn title(&self) -> Result<String> {
        Ok(as_string(self.get("/title").await?))
    }

    async fn find_element(
        &self,
        locator: &Locator,
        scope: Option<&ElementHandle>,
    ) -> Result<Option<ElementHandle>> {
        let path = self.search_path(scope, false);
        match self
            .client
            .command(Method::POST, &path, Some(locator_body(locator)))
            .await
        {
            Ok(value) => parse_element(&value).map(Some),
            Err(err) if err.is_no_such_element() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>> {
        let path = self.search_path(scope, true);
        let value = self
            .client
            .command(Method::POST, &path, Some(locator_body(locator)))
            .await
            .map_err(ShopdeskError::from)?;
        match value {
            Value::Array(items) => items.iter().map(parse_element).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(ShopdeskError::browser(format!("Expected element list, got {}", other))),
        }
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let path = self.element_path(element, "/click");
        self.client.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        let path = self.element_path(element, "/clear");
        self.client.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let path = self.element_path(element, "/value");
        self.client
            .command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let path = self.element_path(element, &format!("/attribute/{}", name));
        let value = self.client.command(Method::GET, &path, None).await?;
        Ok(match value {
            Value::Null => None,
            other => Some(as_string(other)),
        })
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        let path = self.element_path(element, "/text");
        Ok(as_string(self.client.command(Method::GET, &path, None).await?))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        let path = self.element_path(element, "/displayed");
        let value = self.client.command(Method::GET, &path, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    fn element_arg(&self, element: &ElementHandle) -> Value {
        element_reference(element)
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let value = self.get("/cookie").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        self.post("/cookie", json!({ "cookie": cookie })).await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let encoded = as_string(self.get("/screenshot").await?);
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ShopdeskError::browser(format!("Screenshot is not base64: {e}")))
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        let value = self.get("/window/handles").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.post("/window", json!({ "handle": handle })).await?;
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        match self
            .client
            .command(Method::DELETE, &self.path(""), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if WebDriverError::is_session_fault(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
