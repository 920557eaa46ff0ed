//! Conversation dispatch.
//!
//! - `dispatcher`: one pass over the unreplied list (`ConversationDispatcher`)
//! - `summary`: per-cycle counters (`DispatchSummary`)

mod dispatcher;
mod summary;

pub use dispatcher::ConversationDispatcher;
pub use summary::DispatchSummary;
