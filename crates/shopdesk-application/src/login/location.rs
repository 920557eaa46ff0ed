use shopdesk_core::auth::LocationKind;
use shopdesk_core::config::ConsoleConfig;
use url::Url;

/// Classifies `url` for the auth state machine.
///
/// Verification patterns are matched on the full URL and win over the host;
/// login and chat surfaces are told apart by host, so a `next=` parameter
/// pointing at the console does not count as being on it.
pub fn classify_location(url: &str, console: &ConsoleConfig) -> LocationKind {
    let url = url.trim();
    if url.is_empty() || url.starts_with("about:") || url.starts_with("chrome://") || url.starts_with("data:") {
        return LocationKind::Blank;
    }
    if console
        .verification_patterns
        .iter()
        .any(|pattern| url.contains(pattern.as_str()))
    {
        return LocationKind::Verification;
    }

    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase));
    match host.as_deref() {
        Some(host) if host == console.login_domain => LocationKind::Login,
        Some(host) if host == console.chat_domain => LocationKind::ChatSurface,
        _ => LocationKind::Other,
    }
}

/// Whether `url` is the chat page itself rather than another console page.
pub fn is_chat_url(url: &str, console: &ConsoleConfig) -> bool {
    url.trim().starts_with(console.chat_url.as_str())
}

/// Login page that returns to the chat page after sign-in.
pub fn login_entry_url(console: &ConsoleConfig) -> String {
    format!("{}?next={}", console.login_url, console.chat_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> ConsoleConfig {
        ConsoleConfig::default()
    }

    #[test]
    fn test_login_page_with_next_is_login() {
        let url = login_entry_url(&console());
        assert_eq!(
            url,
            "https://accounts.shopee.tw/seller/login?next=https://seller.shopee.tw/new-webchat/conversations"
        );
        assert_eq!(classify_location(&url, &console()), LocationKind::Login);
    }

    #[test]
    fn test_verification_patterns() {
        for url in [
            "https://shopee.tw/verify/ivs?is_initial=true",
            "https://accounts.shopee.tw/seller/challenge/otp",
            "https://shopee.tw/portal/sgw/captcha",
        ] {
            assert_eq!(classify_location(url, &console()), LocationKind::Verification, "{url}");
        }
    }

    #[test]
    fn test_chat_surface_and_others() {
        assert_eq!(
            classify_location("https://seller.shopee.tw/portal/product/list", &console()),
            LocationKind::ChatSurface
        );
        assert_eq!(classify_location("https://shopee.tw/", &console()), LocationKind::Other);
        assert_eq!(classify_location("about:blank", &console()), LocationKind::Blank);
        assert_eq!(classify_location("chrome://newtab/", &console()), LocationKind::Blank);
        assert_eq!(classify_location("", &console()), LocationKind::Blank);
    }

    #[test]
    fn test_chat_url_prefix() {
        assert!(is_chat_url(
            "https://seller.shopee.tw/new-webchat/conversations?cid=1",
            &console()
        ));
        assert!(!is_chat_url("https://seller.shopee.tw/portal", &console()));
    }
}
