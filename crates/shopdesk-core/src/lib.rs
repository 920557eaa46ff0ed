pub mod audit;
pub mod auth;
pub mod browser;
pub mod config;
pub mod conversation;
pub mod error;
pub mod reply;
pub mod schedule;
pub mod status;
pub mod throttle;
pub mod wait;

// Re-export common error type
pub use error::{Result, ShopdeskError};
