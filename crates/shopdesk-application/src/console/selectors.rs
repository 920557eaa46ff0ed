//! Locator catalog of the seller login page and chat console.
//!
//! Class names such as `E2MWg3w8y6` are build artifacts of the console and
//! change between releases; keep every selector in this file.

use shopdesk_core::browser::Locator;

use super::chain::LocatorChain;

pub const CONVERSATION_CELL: &str = "[data-cy='webchat-conversation-cell-root']";
pub const CONVERSATION_NAME: &str = "[data-cy='webchat-conversation-cell-name']";
pub const UNREPLIED_FILTER: &str = "[data-cy='webchat-conversation-filter-filter-new']";
pub const ALL_FILTER: &str = "[data-cy='webchat-conversation-filter-filter-all']";
pub const FILTER_ROOT: &str = "[data-cy='webchat-conversation-filter-root-new']";
pub const ANY_FILTER: &str = "[data-cy^='webchat-conversation-filter-filter-']";
pub const CONVERSATION_LIST_CLASS: &str = "ReactVirtualized__List";
pub const MESSAGE_LIST_ID: &str = "message-virtualized-list";
pub const MESSAGE_CLASS: &str = "DEwekPN7v2";
pub const COMPOSER_CLASS: &str = "E2MWg3w8y6";

/// Text shown on the unreplied filter while it is the active view.
pub const UNREPLIED_LABELS: [&str; 2] = ["未回覆", "未回复"];

pub fn account_field() -> LocatorChain {
    LocatorChain::new(
        "account field",
        [
            Locator::name("loginKey"),
            Locator::css("input[name='loginKey']"),
            Locator::xpath(
                "//input[@name='loginKey' or @type='text' or contains(@placeholder,'Email') \
                 or contains(@placeholder,'電話') or contains(@placeholder,'帳號')]",
            ),
        ],
    )
    .visible()
}

pub fn password_field() -> LocatorChain {
    LocatorChain::new(
        "password field",
        [
            Locator::name("password"),
            Locator::css("input[name='password']"),
            Locator::xpath("//input[@name='password' or @type='password']"),
        ],
    )
    .visible()
}

pub fn submit_button() -> LocatorChain {
    LocatorChain::new(
        "login button",
        [
            Locator::css("form button[type='submit']"),
            Locator::xpath("//button[contains(., '登入') or contains(., 'Login')]"),
        ],
    )
    .visible()
}

/// Independent readiness signals of the chat console, strongest first.
pub fn chat_ready_signals() -> Vec<Locator> {
    vec![
        Locator::css("[data-cy^='webchat-conversation-filter-']"),
        Locator::css(FILTER_ROOT),
        Locator::css(CONVERSATION_CELL),
        Locator::id("messagesContainer"),
        Locator::css(".ReactVirtualized__List"),
        Locator::xpath(
            "//div[contains(@class,'LxWGUqZsIZ')][normalize-space()='全部聊聊']\
             /ancestor::div[contains(@class,'qK2REYutol')][1]",
        ),
    ]
}

pub fn server_error_banner() -> Locator {
    Locator::xpath(
        "//*[contains(text(),'伺服器錯誤') or contains(text(),'服务器错误') or contains(text(),'Server Error')]",
    )
}

pub fn reload_button() -> Locator {
    Locator::xpath("//button[contains(.,'重新加載') or contains(.,'重新加载') or contains(.,'Refresh')]")
}

pub fn any_filter() -> Locator {
    Locator::css(ANY_FILTER)
}

/// Filter that shows every conversation.
pub fn all_filter() -> LocatorChain {
    LocatorChain::new(
        "all conversations filter",
        [
            Locator::css(ALL_FILTER),
            Locator::xpath("//div[normalize-space()='全部聊聊' or normalize-space()='全部' or normalize-space()='All']"),
        ],
    )
}

/// Unreplied first, then all, then a text match on either label.
pub fn unreplied_filter() -> LocatorChain {
    LocatorChain::new(
        "unreplied filter",
        [
            Locator::css(UNREPLIED_FILTER),
            Locator::css(ALL_FILTER),
            Locator::xpath(
                "//div[contains(text(),'未回覆') or contains(text(),'未回复') \
                 or contains(text(),'全部') or contains(text(),'All')]",
            ),
        ],
    )
}

pub fn unreplied_filter_label() -> Locator {
    Locator::css(UNREPLIED_FILTER)
}

pub fn conversation_list() -> Locator {
    Locator::class_name(CONVERSATION_LIST_CLASS)
}

pub fn conversation_cell() -> Locator {
    Locator::css(CONVERSATION_CELL)
}

pub fn conversation_name() -> Locator {
    Locator::css(CONVERSATION_NAME)
}

pub fn composer() -> LocatorChain {
    LocatorChain::new("message composer", [Locator::class_name(COMPOSER_CLASS)])
}

pub fn message_list() -> Locator {
    Locator::id(MESSAGE_LIST_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreplied_chain_falls_back_to_all() {
        let chain = unreplied_filter();
        assert_eq!(chain.locators()[0], Locator::css(UNREPLIED_FILTER));
        assert_eq!(chain.locators()[1], Locator::css(ALL_FILTER));
        assert_eq!(chain.locators().len(), 3);
    }

    #[test]
    fn test_ready_signals_start_with_filter_prefix() {
        let signals = chat_ready_signals();
        assert_eq!(signals.len(), 6);
        assert_eq!(signals[0], Locator::css("[data-cy^='webchat-conversation-filter-']"));
        assert!(matches!(signals[5], Locator::XPath(_)));
    }
}
