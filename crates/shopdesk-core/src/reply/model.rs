use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::schedule::ReplyMode;

/// Author of a transcript entry, as seen by the reply generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    /// The customer.
    User,
    /// The shop.
    Assistant,
}

/// One transcript entry in conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Where automated reply text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Fixed texts per mode.
    Canned,
    /// The external reply generator.
    #[default]
    Assistant,
}

/// Reply content policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub source: ReplySource,
    pub lunch_break_text: String,
    pub after_hours_text: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            source: ReplySource::Assistant,
            lunch_break_text: "Thanks for your message! We are on a lunch break and will get back to you shortly.".to_string(),
            after_hours_text: "Thanks for your message! Our team is currently offline and will reply during business hours.".to_string(),
        }
    }
}

impl ReplyConfig {
    /// Canned text for `mode`; `None` when the mode is staffed or the
    /// configured text is blank.
    pub fn canned_text(&self, mode: ReplyMode) -> Option<&str> {
        let text = match mode {
            ReplyMode::HumanStaffed => return None,
            ReplyMode::AssistantDuringBreak => &self.lunch_break_text,
            ReplyMode::AssistantAfterHours => &self.after_hours_text,
        };
        let trimmed = text.trim();
        (!trimmed.is_empty()).then_some(text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_text_per_mode() {
        let config = ReplyConfig {
            source: ReplySource::Canned,
            lunch_break_text: "lunch".into(),
            after_hours_text: "  ".into(),
        };
        assert_eq!(config.canned_text(ReplyMode::AssistantDuringBreak), Some("lunch"));
        assert_eq!(config.canned_text(ReplyMode::AssistantAfterHours), None);
        assert_eq!(config.canned_text(ReplyMode::HumanStaffed), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","text":"hi"}"#);
    }
}
