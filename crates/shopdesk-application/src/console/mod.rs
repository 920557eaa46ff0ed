//! The seller chat console as seen by the dispatcher.

mod chain;
pub mod selectors;
mod transcript;
mod web;

pub use chain::LocatorChain;
pub use transcript::TranscriptBuffer;
pub use web::WebChatConsole;

use async_trait::async_trait;
use shopdesk_core::Result;
use shopdesk_core::reply::ChatMessage;

/// Scroll measurement of a scrollable container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub client_height: f64,
    pub scroll_height: f64,
}

/// Page-level operations of one dispatch cycle.
#[async_trait]
pub trait ChatConsole: Send + Sync {
    /// Opens the chat page and waits until it is usable. `false` when the
    /// page never became ready.
    async fn prepare(&self) -> Result<bool>;

    /// Activates the unreplied filter, falling back to "all".
    async fn select_unreplied_filter(&self) -> Result<bool>;

    /// Whether the unreplied filter is the active view.
    async fn unreplied_view_active(&self) -> Result<bool>;

    async fn has_conversation_list(&self) -> Result<bool>;

    /// Customer names of the rendered list rows, top to bottom.
    async fn visible_customers(&self) -> Result<Vec<String>>;

    /// Opens the conversation of `customer`. `false` if its row is gone.
    async fn open_conversation(&self, customer: &str) -> Result<bool>;

    /// Ordered history of the open conversation.
    async fn read_transcript(&self) -> Result<Vec<ChatMessage>>;

    /// Types `text` into the composer and sends it.
    async fn submit_reply(&self, text: &str) -> Result<()>;

    /// Advances the conversation list by one step.
    async fn scroll_list(&self) -> Result<ScrollMetrics>;

    /// Whether the browser was sent back to the login page.
    async fn on_login_page(&self) -> Result<bool>;
}
