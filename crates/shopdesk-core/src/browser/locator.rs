use std::fmt;

use serde::{Deserialize, Serialize};

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    ClassName(String),
    Name(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn class_name(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Attribute-based locators have no native WebDriver strategy and are
    /// rewritten as CSS selectors.
    pub fn to_css_or_xpath(&self) -> (&'static str, String) {
        match self {
            Self::Css(css) => ("css selector", css.clone()),
            Self::XPath(xpath) => ("xpath", xpath.clone()),
            Self::Id(id) => ("css selector", format!("[id=\"{}\"]", css_escape(id))),
            Self::ClassName(class) => (
                "css selector",
                class
                    .split(['.', ' '])
                    .filter(|part| !part.is_empty())
                    .map(|part| format!(".{}", css_escape(part)))
                    .collect::<String>(),
            ),
            Self::Name(name) => ("css selector", format!("[name=\"{}\"]", css_escape(name))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(v) => write!(f, "css={}", v),
            Self::XPath(v) => write!(f, "xpath={}", v),
            Self::Id(v) => write!(f, "id={}", v),
            Self::ClassName(v) => write!(f, "class={}", v),
            Self::Name(v) => write!(f, "name={}", v),
        }
    }
}

fn css_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
