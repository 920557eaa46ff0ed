use serde::Serialize;
use shopdesk_core::schedule::ReplyMode;

/// Counters of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub mode: ReplyMode,
    /// The chat page became usable.
    pub page_ready: bool,
    /// Distinct customers taken from the list.
    pub scanned: usize,
    pub replied: usize,
    pub skipped_throttled: usize,
    /// No reply text was available; retried next cycle.
    pub skipped_no_reply: usize,
    pub failed: usize,
    /// The cycle hit its time budget before reaching the end of the list.
    pub truncated: bool,
}

impl DispatchSummary {
    pub fn new(mode: ReplyMode) -> Self {
        Self {
            mode,
            page_ready: false,
            scanned: 0,
            replied: 0,
            skipped_throttled: 0,
            skipped_no_reply: 0,
            failed: 0,
            truncated: false,
        }
    }
}

/// What happened to a single customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handled {
    Replied,
    Throttled,
    NoReply,
    /// The row left the list before it could be opened.
    Vanished,
}

impl DispatchSummary {
    pub(crate) fn count(&mut self, handled: Handled) {
        match handled {
            Handled::Replied => self.replied += 1,
            Handled::Throttled => self.skipped_throttled += 1,
            Handled::NoReply | Handled::Vanished => self.skipped_no_reply += 1,
        }
    }
}
