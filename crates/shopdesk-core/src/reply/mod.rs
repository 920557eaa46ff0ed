//! Reply generation boundary.

mod model;

pub use model::{ChatMessage, ChatRole, ReplyConfig, ReplySource};

use async_trait::async_trait;

use crate::error::Result;

/// Produces reply text for a conversation.
///
/// `Ok(None)` means "no reply available this turn"; callers treat errors the
/// same way and retry on a later cycle.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, history: &[ChatMessage]) -> Result<Option<String>>;
}
