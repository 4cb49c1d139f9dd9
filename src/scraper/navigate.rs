use crate::browser::{BrowserError, Element, Locator, Session};
use crate::config::TimingConfig;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const COOKIE_REJECT_TEXT: &str = "DISAGREE";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("could not open {url}: {source}")]
    Landing {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("{step}: could not find {locator}: {source}")]
    NotFound {
        step: &'static str,
        locator: Locator,
        #[source]
        source: BrowserError,
    },

    #[error("{step}: {locator} is not visible")]
    NotVisible { step: &'static str, locator: Locator },

    #[error("{step}: {source}")]
    Interaction {
        step: &'static str,
        #[source]
        source: BrowserError,
    },
}

/// Whether failing to reject cookies stops the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiePolicy {
    Required,
    Optional,
}

/// One click on the way to a section.
#[derive(Debug, Clone)]
pub struct NavStep {
    pub label: &'static str,
    pub target: Locator,
    /// Element that must be visible and is scrolled into view before the
    /// target is clicked (menu entries below the fold).
    pub anchor: Option<Locator>,
    /// Poll for the target up to the configured timeout instead of a single
    /// lookup.
    pub wait: bool,
    pub require_visible: bool,
}

impl NavStep {
    pub fn click(label: &'static str, target: Locator) -> Self {
        Self {
            label,
            target,
            anchor: None,
            wait: false,
            require_visible: true,
        }
    }

    pub fn via_anchor(mut self, anchor: Locator) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn waiting(mut self) -> Self {
        self.wait = true;
        self
    }
}

pub struct Navigator<'a, S> {
    session: &'a S,
    timing: &'a TimingConfig,
    landing_url: &'a str,
}

impl<'a, S: Session> Navigator<'a, S> {
    pub fn new(session: &'a S, timing: &'a TimingConfig, landing_url: &'a str) -> Self {
        Self {
            session,
            timing,
            landing_url,
        }
    }

    /// Open the landing page and let it render.
    pub async fn land(&self) -> Result<(), NavigationError> {
        info!("Opening {}", self.landing_url);
        self.session
            .goto(self.landing_url)
            .await
            .map_err(|source| NavigationError::Landing {
                url: self.landing_url.to_string(),
                source,
            })?;
        sleep(self.timing.landing_settle()).await;
        Ok(())
    }

    /// Reject the cookie banner.
    pub async fn dismiss_cookies(&self, policy: CookiePolicy) -> Result<(), NavigationError> {
        let mut step = NavStep::click("cookie consent", Locator::text(COOKIE_REJECT_TEXT));
        step.require_visible = false;

        let outcome = self.perform(&step).await;
        sleep(self.timing.nav_settle()).await;

        match (outcome, policy) {
            (Ok(()), _) => Ok(()),
            (Err(e), CookiePolicy::Optional) => {
                warn!("Cookies could not be rejected: {}", e);
                Ok(())
            }
            (Err(e), CookiePolicy::Required) => Err(e),
        }
    }

    pub async fn follow(&self, steps: &[NavStep]) -> Result<(), NavigationError> {
        for step in steps {
            self.perform(step).await?;
        }
        Ok(())
    }

    async fn locate(&self, step: &NavStep, locator: &Locator) -> Result<S::Element, NavigationError> {
        let found = if step.wait {
            self.session.wait_for(locator, self.timing.wait_timeout()).await
        } else {
            self.session.find(locator).await
        };
        found.map_err(|source| NavigationError::NotFound {
            step: step.label,
            locator: locator.clone(),
            source,
        })
    }

    async fn perform(&self, step: &NavStep) -> Result<(), NavigationError> {
        let interaction = |source: BrowserError| NavigationError::Interaction {
            step: step.label,
            source,
        };

        let target = if let Some(anchor) = &step.anchor {
            let anchor_el = self.locate(step, anchor).await?;
            let target = self.locate(step, &step.target).await?;
            if !anchor_el.is_displayed().await.map_err(interaction)? {
                return Err(NavigationError::NotVisible {
                    step: step.label,
                    locator: anchor.clone(),
                });
            }
            anchor_el.scroll_into_view().await.map_err(interaction)?;
            sleep(self.timing.scroll_settle()).await;
            target
        } else {
            let target = self.locate(step, &step.target).await?;
            if step.require_visible && !target.is_displayed().await.map_err(interaction)? {
                return Err(NavigationError::NotVisible {
                    step: step.label,
                    locator: step.target.clone(),
                });
            }
            target
        };

        target.click().await.map_err(interaction)?;
        debug!("{}: clicked {}", step.label, step.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakePage, FakeSession};

    const LANDING: &str = "https://example.test/main.html";

    fn landing(page: FakePage) -> FakeSession {
        FakeSession::new().page(LANDING, page)
    }

    #[tokio::test]
    async fn test_route_through_anchor() {
        let session = landing(
            FakePage::new("")
                .control(Locator::text("FA Rankings"), None)
                .control(Locator::text("Top 1000 FA"), Some("top")),
        )
        .page("top", FakePage::new("<p>top</p>"));
        let timing = TimingConfig::instant();
        let nav = Navigator::new(&session, &timing, LANDING);

        nav.land().await.unwrap();
        nav.follow(&[NavStep::click("top 1000", Locator::text("Top 1000 FA"))
            .via_anchor(Locator::text("FA Rankings"))])
            .await
            .unwrap();

        assert_eq!(session.visited(), vec![LANDING, "top"]);
        assert_eq!(session.clicks(), vec![Locator::text("Top 1000 FA")]);
    }

    #[tokio::test]
    async fn test_missing_target_names_the_step() {
        let session = landing(FakePage::new(""));
        let timing = TimingConfig::instant();
        let nav = Navigator::new(&session, &timing, LANDING);
        nav.land().await.unwrap();

        let err = nav
            .follow(&[NavStep::click("us releases", Locator::text("US releases"))])
            .await
            .unwrap_err();

        assert!(matches!(err, NavigationError::NotFound { step: "us releases", .. }));
        assert!(err.to_string().starts_with("us releases: could not find"));
    }

    #[tokio::test]
    async fn test_hidden_target_is_not_clicked() {
        let session = landing(FakePage::new("").hidden_control(Locator::text("Netflix")));
        let timing = TimingConfig::instant();
        let nav = Navigator::new(&session, &timing, LANDING);
        nav.land().await.unwrap();

        let err = nav
            .follow(&[NavStep::click("netflix", Locator::text("Netflix"))])
            .await
            .unwrap_err();

        assert!(matches!(err, NavigationError::NotVisible { .. }));
        assert!(session.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_cookie_policy() {
        let session = landing(FakePage::new(""));
        let timing = TimingConfig::instant();
        let nav = Navigator::new(&session, &timing, LANDING);
        nav.land().await.unwrap();

        tokio_test::assert_ok!(nav.dismiss_cookies(CookiePolicy::Optional).await);
        tokio_test::assert_err!(nav.dismiss_cookies(CookiePolicy::Required).await);
    }

    #[tokio::test]
    async fn test_cookie_banner_clicked_even_if_hidden() {
        let session = landing(FakePage::new("").hidden_control(Locator::text("DISAGREE")));
        let timing = TimingConfig::instant();
        let nav = Navigator::new(&session, &timing, LANDING);
        nav.land().await.unwrap();

        nav.dismiss_cookies(CookiePolicy::Required).await.unwrap();
        assert_eq!(session.clicks(), vec![Locator::text("DISAGREE")]);
    }

    #[tokio::test]
    async fn test_unreachable_landing() {
        let session = FakeSession::new();
        let timing = TimingConfig::instant();
        let nav = Navigator::new(&session, &timing, LANDING);
        assert!(matches!(nav.land().await, Err(NavigationError::Landing { .. })));
    }
}
