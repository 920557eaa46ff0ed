//! Ordered locator strategies for one logical UI element.

use std::fmt;

use shopdesk_core::Result;
use shopdesk_core::browser::{BrowserSession, ElementHandle, Locator};

/// Strategies tried in priority order; the first one that matches wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    label: &'static str,
    locators: Vec<Locator>,
    require_visible: bool,
}

impl LocatorChain {
    pub fn new(label: &'static str, locators: impl IntoIterator<Item = Locator>) -> Self {
        Self {
            label,
            locators: locators.into_iter().collect(),
            require_visible: false,
        }
    }

    /// Only accept elements that are rendered visibly.
    pub fn visible(mut self) -> Self {
        self.require_visible = true;
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn locators(&self) -> &[Locator] {
        &self.locators
    }

    /// One pass over the chain. `Ok(None)` when no strategy matches yet.
    pub async fn probe(
        &self,
        session: &dyn BrowserSession,
        scope: Option<&ElementHandle>,
    ) -> Result<Option<(usize, ElementHandle)>> {
        for (index, locator) in self.locators.iter().enumerate() {
            let Some(element) = session.find_element(locator, scope).await? else {
                continue;
            };
            if self.require_visible && !session.is_displayed(&element).await? {
                continue;
            }
            return Ok(Some((index, element)));
        }
        Ok(None)
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
