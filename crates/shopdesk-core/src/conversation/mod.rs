//! Per-cycle bookkeeping of the conversation list.

use std::collections::{HashSet, VecDeque};

/// Default capacity of [`SeenWindow`].
pub const DEFAULT_SEEN_CAPACITY: usize = 50;

/// Bounded FIFO set of customer names already handled in this cycle.
///
/// Identity is the customer name, never a DOM node: the list recycles its
/// rows while scrolling.
#[derive(Debug, Clone)]
pub struct SeenWindow {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl SeenWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, customer: &str) -> bool {
        self.members.contains(customer)
    }

    /// Inserts `customer`, evicting the oldest entry when full.
    /// Returns `false` if the name was already present.
    pub fn insert(&mut self, customer: &str) -> bool {
        if self.members.contains(customer) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        self.order.push_back(customer.to_string());
        self.members.insert(customer.to_string());
        true
    }

    /// Names in `visible` not yet seen, in order and without duplicates.
    pub fn unseen<'a, I>(&self, visible: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut batch = HashSet::new();
        visible
            .into_iter()
            .filter(|name| !name.is_empty() && !self.contains(name) && batch.insert(*name))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SeenWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}

/// Scroll state of the conversation list for one dispatch cycle.
///
/// Created at cycle start and dropped at cycle end; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ConversationWindowState {
    pub seen: SeenWindow,
    pub scroll_position: f64,
    pub is_at_bottom: bool,
}

impl ConversationWindowState {
    pub fn new(seen_capacity: usize) -> Self {
        Self {
            seen: SeenWindow::new(seen_capacity),
            scroll_position: 0.0,
            is_at_bottom: false,
        }
    }

    /// Applies a scroll measurement of the list container.
    pub fn update_scroll(&mut self, scroll_top: f64, client_height: f64, scroll_height: f64) {
        self.scroll_position = scroll_top;
        self.is_at_bottom = scroll_top + client_height >= scroll_height;
    }
}
