//! WebChatConsole - [`ChatConsole`] over a live browser session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shopdesk_core::browser::{BrowserSession, ElementHandle, keys};
use shopdesk_core::config::{ConsoleConfig, DispatchConfig};
use shopdesk_core::reply::ChatMessage;
use shopdesk_core::{Result, ShopdeskError};
use tokio::time::{Instant, sleep};

use super::chain::LocatorChain;
use super::selectors;
use super::transcript::{TRANSCRIPT_SCRIPT, TranscriptBuffer, parse_rendered};
use super::{ChatConsole, ScrollMetrics};
use crate::session_controller::SessionController;

const BANNER_TIMEOUT: Duration = Duration::from_secs(2);
const FILTER_TIMEOUT: Duration = Duration::from_secs(5);
const SELECT_FILTER_TIMEOUT: Duration = Duration::from_secs(8);
const ALL_FILTER_TIMEOUT: Duration = Duration::from_secs(6);
const RELOAD_PAUSE: Duration = Duration::from_secs(2);
const TRANSCRIPT_POLL: Duration = Duration::from_secs(1);

const SCROLL_SCRIPT: &str = "const el = arguments[0]; el.scrollTop = el.scrollTop + arguments[1]; \
                             return [el.scrollTop, el.clientHeight, el.scrollHeight];";
const JS_CLICK: &str = "arguments[0].click();";

pub struct WebChatConsole {
    controller: Arc<SessionController>,
    console: ConsoleConfig,
    dispatch: DispatchConfig,
}

impl WebChatConsole {
    pub fn new(controller: Arc<SessionController>, console: ConsoleConfig, dispatch: DispatchConfig) -> Self {
        Self {
            controller,
            console,
            dispatch,
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Tries every readiness signal in priority order, each with its own
    /// `per_signal` budget. Any single signal is sufficient.
    pub async fn is_chat_ready(&self, per_signal: Duration) -> Result<bool> {
        for (index, signal) in selectors::chat_ready_signals().into_iter().enumerate() {
            let chain = LocatorChain::new("chat ready signal", [signal]);
            if self.controller.find_optional(&chain, None, per_signal).await?.is_some() {
                tracing::debug!(target: "dispatch", signal = index, "Chat console ready");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Best-effort switch to the "all conversations" view.
    pub async fn select_all_filter(&self) -> Result<bool> {
        let Some(filter) = self
            .controller
            .find_optional(&selectors::all_filter(), None, ALL_FILTER_TIMEOUT)
            .await?
        else {
            return Ok(false);
        };
        self.click(&filter).await?;
        self.controller.record_nav(Some("selected all conversations")).await;
        Ok(true)
    }

    /// Recovers from the console's transient error page. Up to
    /// `ready_attempts` reloads before giving up.
    pub async fn ensure_chat_ready(&self) -> Result<bool> {
        for attempt in 1..=self.dispatch.ready_attempts.max(1) {
            let banner = LocatorChain::new("server error banner", [selectors::server_error_banner()]);
            if self.controller.find_optional(&banner, None, BANNER_TIMEOUT).await?.is_some() {
                tracing::warn!(target: "dispatch", attempt, "Chat console shows a server error; reloading");
                let reload = LocatorChain::new("reload button", [selectors::reload_button()]);
                match self.controller.find_optional(&reload, None, BANNER_TIMEOUT).await? {
                    Some(button) => self.click(&button).await?,
                    None => self.controller.session().await?.refresh().await?,
                }
                sleep(RELOAD_PAUSE).await;
            }

            let filter = LocatorChain::new("conversation filter", [selectors::any_filter()]);
            if self.controller.find_optional(&filter, None, FILTER_TIMEOUT).await?.is_some() {
                return Ok(true);
            }

            tracing::debug!(target: "dispatch", attempt, "No conversation filter yet; refreshing");
            self.controller.session().await?.refresh().await?;
            sleep(RELOAD_PAUSE).await;
        }
        Ok(false)
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let session = self.controller.session().await?;
        match session.click(element).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_session_dead() => Err(err),
            Err(err) => {
                // Overlays sometimes intercept native clicks.
                tracing::debug!(target: "dispatch", error = %err, "Native click failed; using script click");
                session
                    .execute_script(JS_CLICK, vec![session.element_arg(element)])
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn conversation_list(&self, session: &dyn BrowserSession) -> Result<Option<ElementHandle>> {
        session.find_element(&selectors::conversation_list(), None).await
    }

    /// `(customer, row)` pairs of the rendered list, top to bottom.
    async fn rendered_rows(&self) -> Result<Vec<(String, ElementHandle)>> {
        let session = self.controller.session().await?;
        let Some(container) = self.conversation_list(session.as_ref()).await? else {
            return Ok(Vec::new());
        };
        let cells = session
            .find_elements(&selectors::conversation_cell(), Some(&container))
            .await?;

        let mut rows = Vec::with_capacity(cells.len());
        for cell in cells {
            let Some(name) = session
                .find_element(&selectors::conversation_name(), Some(&cell))
                .await?
            else {
                continue;
            };
            let title = session.attribute(&name, "title").await?.unwrap_or_default();
            let title = title.trim();
            if !title.is_empty() {
                rows.push((title.to_string(), cell));
            }
        }
        Ok(rows)
    }

    async fn snapshot_transcript(&self, session: &dyn BrowserSession, buffer: &mut TranscriptBuffer) -> Result<usize> {
        let value = session.execute_script(TRANSCRIPT_SCRIPT, Vec::new()).await?;
        Ok(buffer.merge(parse_rendered(value)?))
    }
}

fn metric(values: &[Value], index: usize) -> f64 {
    values.get(index).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Keystrokes for `text`: Shift+Enter between lines, Enter to send.
pub(crate) fn reply_keystrokes(text: &str) -> String {
    let line_break: String = [keys::SHIFT, keys::ENTER, keys::NULL].iter().collect();
    let mut payload = text.lines().collect::<Vec<_>>().join(line_break.as_str());
    payload.push(keys::ENTER);
    payload
}

#[async_trait]
impl ChatConsole for WebChatConsole {
    async fn prepare(&self) -> Result<bool> {
        self.controller
            .navigate(&self.console.chat_url, Some("dispatch: open chat"))
            .await?;
        if let Err(err) = self.select_all_filter().await {
            if err.is_session_dead() {
                return Err(err);
            }
            tracing::debug!(target: "dispatch", error = %err, "Could not select the all filter");
        }
        self.ensure_chat_ready().await
    }

    async fn select_unreplied_filter(&self) -> Result<bool> {
        let Some(filter) = self
            .controller
            .find_optional(&selectors::unreplied_filter(), None, SELECT_FILTER_TIMEOUT)
            .await?
        else {
            return Ok(false);
        };
        self.click(&filter).await?;
        Ok(true)
    }

    async fn unreplied_view_active(&self) -> Result<bool> {
        let session = self.controller.session().await?;
        let Some(label) = session.find_element(&selectors::unreplied_filter_label(), None).await? else {
            return Ok(false);
        };
        let text = session.text(&label).await?;
        Ok(selectors::UNREPLIED_LABELS.iter().any(|l| text.contains(l)))
    }

    async fn has_conversation_list(&self) -> Result<bool> {
        let chain = LocatorChain::new("conversation list", [selectors::conversation_list()]);
        Ok(self
            .controller
            .find_optional(&chain, None, self.dispatch.element_timeout())
            .await?
            .is_some())
    }

    async fn visible_customers(&self) -> Result<Vec<String>> {
        Ok(self.rendered_rows().await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn open_conversation(&self, customer: &str) -> Result<bool> {
        let rows = self.rendered_rows().await?;
        let Some((_, cell)) = rows.into_iter().find(|(name, _)| name == customer) else {
            tracing::debug!(target: "dispatch", customer, "Conversation row no longer rendered");
            return Ok(false);
        };
        self.click(&cell).await?;
        Ok(true)
    }

    async fn read_transcript(&self) -> Result<Vec<ChatMessage>> {
        let session = self.controller.session().await?;
        let list = session.find_element(&selectors::message_list(), None).await?;
        let quiet = self.dispatch.transcript_quiet();
        let step = self.dispatch.transcript_scroll_step_px;

        let mut buffer = TranscriptBuffer::new();
        let mut last_growth = Instant::now();
        loop {
            if self.snapshot_transcript(session.as_ref(), &mut buffer).await? > 0 {
                last_growth = Instant::now();
            }
            if last_growth.elapsed() >= quiet {
                break;
            }
            if let Some(list) = &list {
                session
                    .execute_script(SCROLL_SCRIPT, vec![session.element_arg(list), Value::from(-step)])
                    .await?;
            }
            sleep(TRANSCRIPT_POLL).await;
        }

        tracing::debug!(target: "dispatch", bubbles = buffer.len(), "Transcript loaded");
        Ok(buffer.messages())
    }

    async fn submit_reply(&self, text: &str) -> Result<()> {
        let composer = self
            .controller
            .find(&selectors::composer(), None, self.dispatch.element_timeout())
            .await?;
        let session = self.controller.session().await?;
        session.type_text(&composer, &reply_keystrokes(text)).await
    }

    async fn scroll_list(&self) -> Result<ScrollMetrics> {
        let session = self.controller.session().await?;
        let Some(container) = self.conversation_list(session.as_ref()).await? else {
            return Ok(ScrollMetrics::default());
        };
        let value = session
            .execute_script(
                SCROLL_SCRIPT,
                vec![
                    session.element_arg(&container),
                    Value::from(self.dispatch.list_scroll_step_px),
                ],
            )
            .await?;
        let values = value
            .as_array()
            .ok_or_else(|| ShopdeskError::browser(format!("Unexpected scroll metrics: {value}")))?;
        Ok(ScrollMetrics {
            scroll_top: metric(values, 0),
            client_height: metric(values, 1),
            scroll_height: metric(values, 2),
        })
    }

    async fn on_login_page(&self) -> Result<bool> {
        let url = self.controller.current_url().await?;
        Ok(url.contains(&self.console.login_domain))
    }
}

impl std::fmt::Debug for WebChatConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebChatConsole")
            .field("chat_url", &self.console.chat_url)
            .finish()
    }
}
