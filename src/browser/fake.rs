//! Scripted in-memory session for tests.
//!
//! Pages are keyed by URL. Each page carries its markup and the live
//! controls that can be found on it; clicking a control may switch the
//! session to another page.

use crate::browser::{BrowserError, Element, Locator, Session};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeControl {
    pub locator: Locator,
    pub visible: bool,
    /// Detached from the page: every call on it fails.
    pub stale: bool,
    pub leads_to: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub controls: Vec<FakeControl>,
}

impl FakePage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            controls: Vec::new(),
        }
    }

    /// A visible control; clicking it switches to `leads_to` when given.
    pub fn control(mut self, locator: Locator, leads_to: Option<&str>) -> Self {
        self.controls.push(FakeControl {
            locator,
            visible: true,
            stale: false,
            leads_to: leads_to.map(str::to_string),
        });
        self
    }

    pub fn hidden_control(mut self, locator: Locator) -> Self {
        self.controls.push(FakeControl {
            locator,
            visible: false,
            stale: false,
            leads_to: None,
        });
        self
    }

    /// A control that is found but goes stale before it can be used.
    pub fn stale_control(mut self, locator: Locator) -> Self {
        self.controls.push(FakeControl {
            locator,
            visible: true,
            stale: true,
            leads_to: None,
        });
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    current: Option<String>,
    visited: Vec<String>,
    clicks: Vec<Locator>,
    quit: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, page: FakePage) -> Self {
        self.state.lock().unwrap().pages.insert(url.to_string(), page);
        self
    }

    pub fn start_at(self, url: &str) -> Self {
        self.state.lock().unwrap().current = Some(url.to_string());
        self
    }

    /// URLs entered via `goto` or a click, in order.
    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().quit
    }

    fn current_page(&self) -> Option<FakePage> {
        let state = self.state.lock().unwrap();
        state
            .current
            .as_ref()
            .and_then(|url| state.pages.get(url))
            .cloned()
    }

    fn matching(&self, locator: &Locator) -> Vec<FakeElement> {
        self.current_page()
            .map(|page| {
                page.controls
                    .into_iter()
                    .filter(|c| &c.locator == locator)
                    .map(|control| FakeElement {
                        state: Arc::clone(&self.state),
                        control,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct FakeElement {
    state: Arc<Mutex<FakeState>>,
    control: FakeControl,
}

impl FakeElement {
    fn check_attached(&self) -> Result<(), BrowserError> {
        if self.control.stale {
            return Err(BrowserError::NotFound(self.control.locator.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Element for FakeElement {
    async fn is_displayed(&self) -> Result<bool, BrowserError> {
        self.check_attached()?;
        Ok(self.control.visible)
    }

    async fn scroll_into_view(&self) -> Result<(), BrowserError> {
        self.check_attached()
    }

    async fn click(&self) -> Result<(), BrowserError> {
        self.check_attached()?;
        let mut state = self.state.lock().unwrap();
        state.clicks.push(self.control.locator.clone());
        if let Some(target) = &self.control.leads_to {
            state.current = Some(target.clone());
            state.visited.push(target.clone());
        }
        Ok(())
    }

    async fn text(&self) -> Result<String, BrowserError> {
        Ok(match &self.control.locator {
            Locator::Text(t) => t.clone(),
            _ => String::new(),
        })
    }

    async fn attr(&self, _name: &str) -> Result<Option<String>, BrowserError> {
        Ok(None)
    }
}

#[async_trait]
impl Session for FakeSession {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        if !state.pages.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
            });
        }
        state.current = Some(url.to_string());
        state.visited.push(url.to_string());
        Ok(())
    }

    async fn source(&self) -> Result<String, BrowserError> {
        Ok(self.current_page().map(|p| p.html).unwrap_or_default())
    }

    async fn find(&self, locator: &Locator) -> Result<FakeElement, BrowserError> {
        self.matching(locator)
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::NotFound(locator.clone()))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<FakeElement>, BrowserError> {
        Ok(self.matching(locator))
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<FakeElement, BrowserError> {
        self.find(locator).await
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        self.state.lock().unwrap().quit = true;
        Ok(())
    }
}
