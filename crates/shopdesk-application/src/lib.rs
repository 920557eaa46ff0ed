//! Application layer for Shopdesk.
//!
//! Orchestrates the browser session, the login flow and the conversation
//! dispatcher on top of the domain types in `shopdesk-core`.

pub mod clock;
pub mod console;
pub mod dispatch;
pub mod login;
pub mod responder_usecase;
pub mod session_controller;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, FixedClock, SystemClock};
pub use console::{ChatConsole, WebChatConsole};
pub use dispatch::{ConversationDispatcher, DispatchSummary};
pub use login::{Authenticator, LoginFlow, LoginOutcome};
pub use responder_usecase::{CycleOutcome, ResponderUseCase};
pub use session_controller::SessionController;
