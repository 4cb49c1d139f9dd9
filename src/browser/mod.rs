//! Browser session abstraction.
//!
//! The scraper only ever talks to [`Session`] and [`Element`]; the live
//! implementation drives a WebDriver server, tests use a scripted session.

#[cfg(test)]
pub mod fake;
pub mod webdriver;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use self::webdriver::WebDriverSession;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("webdriver: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("no element matching {0}")]
    NotFound(Locator),

    #[error("could not load {url}")]
    Navigation { url: String },
}

/// How an element is located on the live page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Any element whose own text contains the given string.
    Text(String),
    /// Elements carrying a single class name.
    Class(String),
    /// A CSS selector.
    Css(String),
}

impl Locator {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn class(s: impl Into<String>) -> Self {
        Self::Class(s.into())
    }

    pub fn css(s: impl Into<String>) -> Self {
        Self::Css(s.into())
    }

    /// XPath equivalent of a [`Locator::Text`] lookup.
    pub fn text_xpath(text: &str) -> String {
        if text.contains('\'') {
            format!("//*[contains(text(), \"{text}\")]")
        } else {
            format!("//*[contains(text(), '{text}')]")
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => write!(f, "text '{t}'"),
            Self::Class(c) => write!(f, "class '{c}'"),
            Self::Css(c) => write!(f, "css '{c}'"),
        }
    }
}

/// An element handle in the live page.
#[async_trait]
pub trait Element: Send + Sync {
    async fn is_displayed(&self) -> Result<bool, BrowserError>;
    async fn scroll_into_view(&self) -> Result<(), BrowserError>;
    async fn click(&self) -> Result<(), BrowserError>;
    // Page content is read from `Session::source`; these stay for callers
    // that need a single live value.
    #[allow(dead_code)]
    async fn text(&self) -> Result<String, BrowserError>;
    #[allow(dead_code)]
    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError>;
}

/// One exclusively-owned browser session.
#[async_trait]
pub trait Session: Send + Sync {
    type Element: Element;

    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Markup of the current page as rendered right now.
    async fn source(&self) -> Result<String, BrowserError>;

    async fn find(&self, locator: &Locator) -> Result<Self::Element, BrowserError>;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>, BrowserError>;

    /// Like [`Session::find`], but keeps polling until `timeout` elapses.
    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Self::Element, BrowserError>;

    async fn quit(&self) -> Result<(), BrowserError>;
}
