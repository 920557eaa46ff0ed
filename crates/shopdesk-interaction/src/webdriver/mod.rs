//! W3C WebDriver implementation of the browser capability.
//!
//! Speaks the JSON wire protocol directly over `reqwest`; any compliant
//! endpoint (chromedriver, Selenium Grid) works.

mod client;
mod launcher;
mod session;

pub use client::{WebDriverClient, WebDriverError};
pub use launcher::WebDriverLauncher;
pub use session::{ELEMENT_KEY, WebDriverSession};
