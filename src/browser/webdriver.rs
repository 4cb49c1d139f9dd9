use crate::browser::{BrowserError, Element, Locator, Session};
use crate::config::{BrowserConfig, BrowserKind};
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A [`Session`] backed by a WebDriver server (geckodriver, chromedriver).
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    pub async fn connect(config: &BrowserConfig) -> Result<Self, BrowserError> {
        info!(
            "Starting {:?} session via {} (headless: {})",
            config.kind, config.webdriver_url, config.headless
        );

        let driver = match config.kind {
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if config.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(config.webdriver_url.as_str(), caps).await?
            }
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if config.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(config.webdriver_url.as_str(), caps).await?
            }
        };

        Ok(Self { driver })
    }
}

fn to_by(locator: &Locator) -> By {
    match locator {
        Locator::Text(text) => By::XPath(Locator::text_xpath(text)),
        Locator::Class(name) => By::ClassName(name.clone()),
        Locator::Css(css) => By::Css(css.clone()),
    }
}

pub struct WebDriverElement(WebElement);

#[async_trait]
impl Element for WebDriverElement {
    async fn is_displayed(&self) -> Result<bool, BrowserError> {
        Ok(self.0.is_displayed().await?)
    }

    async fn scroll_into_view(&self) -> Result<(), BrowserError> {
        Ok(self.0.scroll_into_view().await?)
    }

    async fn click(&self) -> Result<(), BrowserError> {
        Ok(self.0.click().await?)
    }

    async fn text(&self) -> Result<String, BrowserError> {
        Ok(self.0.text().await?)
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.0.attr(name).await?)
    }
}

#[async_trait]
impl Session for WebDriverSession {
    type Element = WebDriverElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        debug!("GET {}", url);
        Ok(self.driver.goto(url).await?)
    }

    async fn source(&self) -> Result<String, BrowserError> {
        Ok(self.driver.source().await?)
    }

    async fn find(&self, locator: &Locator) -> Result<WebDriverElement, BrowserError> {
        let el = self.driver.find(to_by(locator)).await?;
        Ok(WebDriverElement(el))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<WebDriverElement>, BrowserError> {
        let els = self.driver.find_all(to_by(locator)).await?;
        Ok(els.into_iter().map(WebDriverElement).collect())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<WebDriverElement, BrowserError> {
        let el = self
            .driver
            .query(to_by(locator))
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await?;
        Ok(WebDriverElement(el))
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        info!("Closing browser session");
        Ok(self.driver.clone().quit().await?)
    }
}
