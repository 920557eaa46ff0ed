use std::sync::Arc;

use shopdesk_core::config::DispatchConfig;
use shopdesk_core::conversation::ConversationWindowState;
use shopdesk_core::reply::{ReplyConfig, ReplyGenerator, ReplySource};
use shopdesk_core::schedule::ReplyMode;
use shopdesk_core::throttle::{ThrottleLedger, ThrottleRepository};
use shopdesk_core::{Result, ShopdeskError};
use tokio::time::{Instant, sleep};

use super::summary::{DispatchSummary, Handled};
use crate::clock::Clock;
use crate::console::ChatConsole;

/// Walks the unreplied conversation list once and answers every customer
/// whose cooldown has expired.
pub struct ConversationDispatcher {
    console: Arc<dyn ChatConsole>,
    repository: Arc<dyn ThrottleRepository>,
    generator: Option<Arc<dyn ReplyGenerator>>,
    reply: ReplyConfig,
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
}

impl ConversationDispatcher {
    pub fn new(
        console: Arc<dyn ChatConsole>,
        repository: Arc<dyn ThrottleRepository>,
        reply: ReplyConfig,
        config: DispatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            console,
            repository,
            generator: None,
            reply,
            config,
            clock,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ReplyGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn console(&self) -> &Arc<dyn ChatConsole> {
        &self.console
    }

    /// Runs one dispatch cycle in `mode`.
    ///
    /// Per-conversation UI failures are counted and skipped; a list that
    /// cannot be read or scrolled is tried again on the next pass. A dead session
    /// or a ledger that cannot be written ends the cycle with an error.
    pub async fn run_cycle(&self, mode: ReplyMode) -> Result<DispatchSummary> {
        let mut summary = DispatchSummary::new(mode);
        if !mode.is_automated() {
            tracing::debug!(target: "dispatch", "Mode {} is staffed; nothing to do", mode);
            return Ok(summary);
        }

        if !self.console.prepare().await? {
            tracing::warn!(target: "dispatch", "Chat page never became ready; skipping this cycle");
            return Ok(summary);
        }
        summary.page_ready = true;

        if !self.console.select_unreplied_filter().await? {
            tracing::warn!(target: "dispatch", "No conversation filter could be selected");
        }
        if !self.console.has_conversation_list().await? {
            tracing::info!(target: "dispatch", "No pending conversations");
            return Ok(summary);
        }

        let mut ledger = ThrottleLedger::load(self.repository.clone(), self.config.cooldown()).await?;
        let mut window = ConversationWindowState::new(self.config.seen_capacity);
        let started = Instant::now();
        let mut last_discovery = Instant::now();

        loop {
            if started.elapsed() >= self.config.max_cycle() {
                tracing::warn!(
                    target: "dispatch",
                    "Cycle budget of {}s exhausted before the end of the list",
                    self.config.max_cycle_secs
                );
                summary.truncated = true;
                break;
            }

            sleep(self.config.list_settle()).await;

            match self.read_visible().await {
                Ok(Some(visible)) => {
                    let fresh = window.seen.unseen(visible.iter().map(String::as_str));
                    if !fresh.is_empty() {
                        last_discovery = Instant::now();
                    }

                    for customer in fresh {
                        window.seen.insert(&customer);
                        summary.scanned += 1;
                        match self.handle(&customer, mode, &mut ledger).await {
                            Ok(handled) => summary.count(handled),
                            Err(err) if abandons_conversation(&err) => {
                                tracing::warn!(
                                    target: "dispatch",
                                    customer = %customer,
                                    error = %err,
                                    "Conversation abandoned for this cycle"
                                );
                                summary.failed += 1;
                            }
                            Err(err) => return Err(err),
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!(target: "dispatch", "Unreplied view is not active; rows ignored");
                }
                Err(err) if abandons_conversation(&err) => {
                    tracing::warn!(target: "dispatch", error = %err, "Conversation list unreadable; scrolling on");
                }
                Err(err) => return Err(err),
            }

            match self.console.scroll_list().await {
                Ok(metrics) => {
                    window.update_scroll(metrics.scroll_top, metrics.client_height, metrics.scroll_height)
                }
                Err(err) if abandons_conversation(&err) => {
                    tracing::warn!(target: "dispatch", error = %err, "Scrolling the conversation list failed");
                }
                Err(err) => return Err(err),
            }
            if window.is_at_bottom && last_discovery.elapsed() >= self.config.list_quiet() {
                break;
            }
        }

        tracing::info!(
            target: "dispatch",
            mode = %summary.mode,
            scanned = summary.scanned,
            replied = summary.replied,
            throttled = summary.skipped_throttled,
            no_reply = summary.skipped_no_reply,
            failed = summary.failed,
            "Dispatch cycle finished"
        );
        Ok(summary)
    }

    /// Customers visible in the list, `None` when the unreplied view is not
    /// the active one.
    async fn read_visible(&self) -> Result<Option<Vec<String>>> {
        if !self.console.unreplied_view_active().await? {
            return Ok(None);
        }
        self.console.visible_customers().await.map(Some)
    }

    async fn handle(&self, customer: &str, mode: ReplyMode, ledger: &mut ThrottleLedger) -> Result<Handled> {
        let due = ledger.should_reply(customer, self.clock.now());
        if !self.console.open_conversation(customer).await? {
            tracing::debug!(target: "dispatch", customer = %customer, "Row disappeared before it was opened");
            return Ok(Handled::Vanished);
        }
        if !due {
            tracing::debug!(target: "dispatch", customer = %customer, "Replied recently; skipping");
            return Ok(Handled::Throttled);
        }

        let Some(text) = self.reply_text(customer, mode).await? else {
            return Ok(Handled::NoReply);
        };

        self.console.submit_reply(&text).await?;
        ledger.record_reply(customer, self.clock.now()).await?;
        tracing::info!(target: "dispatch", customer = %customer, "Reply sent");
        Ok(Handled::Replied)
    }

    /// Reply text under the configured content policy. Generator failures
    /// and empty answers mean "no reply this turn".
    async fn reply_text(&self, customer: &str, mode: ReplyMode) -> Result<Option<String>> {
        let generator = match (self.reply.source, &self.generator) {
            (ReplySource::Assistant, Some(generator)) => generator,
            (ReplySource::Assistant, None) => {
                tracing::debug!(target: "dispatch", "No reply generator configured; using canned text");
                return Ok(self.reply.canned_text(mode).map(str::to_string));
            }
            (ReplySource::Canned, _) => return Ok(self.reply.canned_text(mode).map(str::to_string)),
        };

        let history = self.console.read_transcript().await?;
        if history.is_empty() {
            tracing::info!(target: "dispatch", customer = %customer, "Empty transcript; not replying");
            return Ok(None);
        }

        match generator.generate(&history).await {
            Ok(Some(text)) if !text.trim().is_empty() => Ok(Some(text)),
            Ok(_) => {
                tracing::info!(target: "dispatch", customer = %customer, "Generator had no reply");
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(target: "dispatch", customer = %customer, error = %err, "Reply generation failed");
                Ok(None)
            }
        }
    }
}

/// Errors that cost one conversation rather than the whole cycle.
fn abandons_conversation(err: &ShopdeskError) -> bool {
    matches!(
        err,
        ShopdeskError::ElementTimeout { .. } | ShopdeskError::Browser(_) | ShopdeskError::Generator(_)
    )
}
