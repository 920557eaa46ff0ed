//! Sign-in to the seller console.

mod flow;
mod location;

pub use flow::{LoginFlow, LoginOutcome};
pub use location::{classify_location, is_chat_url, login_entry_url};

use async_trait::async_trait;
use shopdesk_core::Result;

/// Brings the browser to a signed-in chat console.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<LoginOutcome>;
}
