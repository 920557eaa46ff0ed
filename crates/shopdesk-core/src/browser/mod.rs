//! Browser automation capability.
//!
//! The responder depends only on these primitives; concrete drivers live in
//! `shopdesk-interaction`.

mod capability;
mod cookie;
mod locator;

pub use capability::{BrowserLauncher, BrowserProfile, BrowserSession, ElementHandle, keys};
pub use cookie::{Cookie, CookieStore};
pub use locator::Locator;
