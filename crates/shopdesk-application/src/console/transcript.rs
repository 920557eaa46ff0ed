//! Accumulates conversation history while the message list is scrolled up.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use shopdesk_core::Result;
use shopdesk_core::reply::{ChatMessage, ChatRole};

/// Extracts `{key, role, text}` for every rendered message bubble.
///
/// Received bubbles map to `user`, sent ones to `assistant`; anything else
/// (system notices) yields an empty role and is dropped on the Rust side.
pub(crate) const TRANSCRIPT_SCRIPT: &str = r#"
const nodes = Array.from(document.querySelectorAll('div.DEwekPN7v2'));
return nodes.map(function (node) {
  const tagged = node.querySelector('[data-cy]');
  const cy = tagged ? tagged.getAttribute('data-cy') : '';
  const role = cy === 'webchat-message-receive' ? 'user'
    : (cy === 'webchat-message-send' ? 'assistant' : '');
  const pre = node.querySelector('pre');
  const stamp = node.querySelector('.hvckbUfzJ0');
  let text = pre ? pre.textContent.trim() : '';
  if (stamp) {
    const value = stamp.textContent.trim();
    if (value) { text = text.replace(value, '').trim(); }
  }
  return { key: node.outerHTML, role: role, text: text };
});
"#;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RenderedMessage {
    pub key: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub text: String,
}

pub(crate) fn parse_rendered(value: Value) -> Result<Vec<RenderedMessage>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}

/// History gathered across scroll steps, oldest first.
///
/// The list is virtualized: scrolling up renders older bubbles and recycles
/// newer ones, so every snapshot is merged by bubble identity.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    keys: HashSet<String>,
    entries: Vec<RenderedMessage>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one snapshot taken in DOM order. Unknown bubbles are older
    /// than everything buffered so far and go to the front.
    /// Returns how many were new.
    pub(crate) fn merge(&mut self, snapshot: Vec<RenderedMessage>) -> usize {
        if self.entries.is_empty() {
            for message in snapshot {
                if self.keys.insert(message.key.clone()) {
                    self.entries.push(message);
                }
            }
            return self.entries.len();
        }

        let older: Vec<RenderedMessage> = snapshot
            .into_iter()
            .filter(|m| self.keys.insert(m.key.clone()))
            .collect();
        let added = older.len();
        self.entries.splice(0..0, older);
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The conversation as chat messages; system notices and empty bubbles
    /// are skipped.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .filter(|m| !m.text.is_empty())
            .filter_map(|m| {
                let role = match m.role.as_str() {
                    "user" => ChatRole::User,
                    "assistant" => ChatRole::Assistant,
                    _ => return None,
                };
                Some(ChatMessage {
                    role,
                    text: m.text.clone(),
                })
            })
            .collect()
    }
}
