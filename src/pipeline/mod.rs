//! Pipeline orchestrator: ties navigation → extraction → storage together.
//!
//! ## Groups
//!
//! Sections run in three groups, each in its own browser session:
//!   - top: landing → top 1000 (every "show more" expanded, then one visit per film)
//!   - releases: landing → US releases (one visit per film) → box office
//!   - netflix: landing → upcoming releases (paged calendar); landing → most
//!     voted; landing → best rated
//!
//! A failed section discards its rows and writes nothing. The rest of its
//! group is skipped since the session is in an unknown state; other groups
//! still run.

use crate::browser::{BrowserError, Locator, Session, WebDriverSession};
use crate::config::AppConfig;
use crate::models::{Extracted, TableRecord};
use crate::scraper::parsers::{self, Ranking};
use crate::scraper::{
    CookiePolicy, DiagnosticSink, ExtractError, NavStep, NavigationError, Navigator, NextControl,
    PaginationError, TracingSink, expand_all, visit_details, walk_pages,
};
use crate::storage::TableStore;
use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};
use url::Url;

const SHOW_MORE_CLASS: &str = "show-more";
const NEXT_DATE_MARKER: &str = ".button-np-cat.next-date-cat";
const NEXT_DATE_CSS: &str = ".next-date-cat";

#[derive(Debug, Error)]
pub enum SectionError {
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),

    #[error("pagination failed: {0}")]
    Pagination(#[from] PaginationError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("could not read page: {0}")]
    Browser(#[from] BrowserError),

    #[error("invalid landing url: {0}")]
    LandingUrl(#[from] url::ParseError),

    #[error("could not write table: {0:#}")]
    Storage(anyhow::Error),
}

// ── Sections ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Section {
    Releases,
    BoxOffice,
    TopFilms,
    NetflixReleases,
    NetflixMostVoted,
    NetflixBest,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Releases,
        Section::BoxOffice,
        Section::TopFilms,
        Section::NetflixReleases,
        Section::NetflixMostVoted,
        Section::NetflixBest,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Section::Releases => "releases.csv",
            Section::BoxOffice => "box_office.csv",
            Section::TopFilms => "top_films.csv",
            Section::NetflixReleases => "netflix_releases.csv",
            Section::NetflixMostVoted => "netflix_most_voted.csv",
            Section::NetflixBest => "netflix_best.csv",
        }
    }

    /// Box office is reached from wherever the releases section left the
    /// session; every other section starts from the landing page.
    fn lands(self) -> bool {
        self != Section::BoxOffice
    }

    /// Sections that open a group must get past the cookie banner.
    fn cookie_policy(self) -> Option<CookiePolicy> {
        match self {
            Section::Releases | Section::TopFilms | Section::NetflixReleases => {
                Some(CookiePolicy::Required)
            }
            Section::BoxOffice | Section::NetflixMostVoted | Section::NetflixBest => None,
        }
    }

    fn route(self) -> Vec<NavStep> {
        let rankings = || Locator::text("FA Rankings");
        match self {
            Section::Releases => vec![NavStep::click("us releases", Locator::text("US releases"))],
            Section::BoxOffice => vec![
                NavStep::click("box office", Locator::text("Box office")).via_anchor(rankings()),
            ],
            Section::TopFilms => vec![
                NavStep::click("top 1000", Locator::text("Top 1000 FA")).via_anchor(rankings()),
            ],
            Section::NetflixReleases => vec![NavStep::click(
                "netflix releases",
                Locator::text("Netflix (coming soon)"),
            )],
            Section::NetflixMostVoted => vec![
                NavStep::click("netflix", Locator::text("Netflix")),
                NavStep::click("netflix popularity", Locator::text("Popularity")).waiting(),
            ],
            Section::NetflixBest => vec![
                NavStep::click("netflix", Locator::text("Netflix")),
                NavStep::click("netflix rating", Locator::text("Rating")).waiting(),
            ],
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Releases => "new releases",
            Section::BoxOffice => "box office",
            Section::TopFilms => "top 1000",
            Section::NetflixReleases => "netflix releases",
            Section::NetflixMostVoted => "netflix most voted",
            Section::NetflixBest => "netflix best",
        };
        f.write_str(name)
    }
}

/// Sections sharing one browser session, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Top,
    Releases,
    Netflix,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Top, Group::Releases, Group::Netflix];

    pub fn sections(self) -> &'static [Section] {
        match self {
            Group::Top => &[Section::TopFilms],
            Group::Releases => &[Section::Releases, Section::BoxOffice],
            Group::Netflix => &[
                Section::NetflixReleases,
                Section::NetflixMostVoted,
                Section::NetflixBest,
            ],
        }
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SectionStats {
    pub rows: usize,
    /// Rows written with at least one field missing.
    pub degraded: usize,
    /// Items whose detail page could not be read.
    pub dropped: usize,
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum SectionOutcome {
    Written(SectionStats),
    Failed(SectionError),
    /// Not attempted: an earlier section of the group failed, or the
    /// browser session could not be opened.
    Skipped,
}

#[derive(Debug)]
pub struct SectionReport {
    pub section: Section,
    pub outcome: SectionOutcome,
}

impl SectionReport {
    pub fn is_written(&self) -> bool {
        matches!(self.outcome, SectionOutcome::Written(_))
    }
}

// ── Single section ────────────────────────────────────────────────────────────

pub struct SectionRunner<'a, S> {
    session: &'a S,
    config: &'a AppConfig,
    store: &'a TableStore,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, S: Session> SectionRunner<'a, S> {
    pub fn new(
        session: &'a S,
        config: &'a AppConfig,
        store: &'a TableStore,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            session,
            config,
            store,
            sink,
        }
    }

    /// Route to `section`, extract it and write its table. `opens_group`
    /// forces a landing and cookie dismissal even for sections that normally
    /// continue from the previous one.
    pub async fn run(
        &self,
        section: Section,
        opens_group: bool,
    ) -> Result<SectionStats, SectionError> {
        let timing = &self.config.timing;
        let nav = Navigator::new(self.session, timing, &self.config.browser.landing_url);

        if section.lands() || opens_group {
            nav.land().await?;
            let policy = section
                .cookie_policy()
                .or(opens_group.then_some(CookiePolicy::Optional));
            if let Some(policy) = policy {
                nav.dismiss_cookies(policy).await?;
            }
        }
        nav.follow(&section.route()).await?;
        sleep(timing.nav_settle()).await;

        match section {
            Section::Releases => self.scrape_releases(section).await,
            Section::BoxOffice => self.scrape_box_office(section).await,
            Section::TopFilms => self.scrape_top_films(section).await,
            Section::NetflixReleases => self.scrape_netflix_releases(section).await,
            Section::NetflixMostVoted => self.scrape_ranking(section, Ranking::MostVoted).await,
            Section::NetflixBest => self.scrape_ranking(section, Ranking::Best).await,
        }
    }

    async fn scrape_releases(&self, section: Section) -> Result<SectionStats, SectionError> {
        let base = Url::parse(&self.config.browser.landing_url)?;
        let html = self.session.source().await?;
        let items = parsers::parse_release_links(&html, self.sink)?;
        info!("{}: {} films listed", section, items.len());

        let report = visit_details(
            self.session,
            &items,
            &base,
            self.config.timing.detail_settle(),
            self.sink,
            parsers::parse_release_detail,
        )
        .await;
        self.persist(section, report.records, report.dropped.len())
    }

    async fn scrape_box_office(&self, section: Section) -> Result<SectionStats, SectionError> {
        let html = self.session.source().await?;
        let table = parsers::parse_box_office(&html, self.sink)?;
        let path = self
            .store
            .write_box_office(section.file_name(), &table)
            .map_err(SectionError::Storage)?;
        Ok(SectionStats {
            rows: table.rows.len(),
            degraded: 0,
            dropped: 0,
            path,
        })
    }

    async fn scrape_top_films(&self, section: Section) -> Result<SectionStats, SectionError> {
        let base = Url::parse(&self.config.browser.landing_url)?;
        let clicks = expand_all(
            self.session,
            &Locator::class(SHOW_MORE_CLASS),
            &self.config.timing,
            self.config.pagination.max_iterations,
        )
        .await?;
        info!("{}: listing expanded {} times", section, clicks);

        let html = self.session.source().await?;
        let items = parsers::parse_top_links(&html, self.sink)?;

        let report = visit_details(
            self.session,
            &items,
            &base,
            self.config.timing.detail_settle(),
            self.sink,
            parsers::parse_top_detail,
        )
        .await;
        self.persist(section, report.records, report.dropped.len())
    }

    async fn scrape_netflix_releases(
        &self,
        section: Section,
    ) -> Result<SectionStats, SectionError> {
        let next = NextControl {
            marker: NEXT_DATE_MARKER.to_string(),
            locator: Locator::css(NEXT_DATE_CSS),
        };
        let rows = walk_pages(
            self.session,
            &next,
            &self.config.timing,
            self.config.pagination.max_iterations,
            |html| parsers::parse_netflix_releases(html, self.sink),
        )
        .await?;
        self.persist(section, rows, 0)
    }

    async fn scrape_ranking(
        &self,
        section: Section,
        ranking: Ranking,
    ) -> Result<SectionStats, SectionError> {
        let html = self.session.source().await?;
        let rows = parsers::parse_netflix_ranking(&html, ranking, self.sink)?;
        self.persist(section, rows, 0)
    }

    fn persist<R: TableRecord>(
        &self,
        section: Section,
        rows: Vec<Extracted<R>>,
        dropped: usize,
    ) -> Result<SectionStats, SectionError> {
        let degraded = rows.iter().filter(|r| !r.is_complete()).count();
        let records: Vec<R> = rows.into_iter().map(|r| r.record).collect();
        let path = self
            .store
            .write_records(section.file_name(), &records)
            .map_err(SectionError::Storage)?;

        Ok(SectionStats {
            rows: records.len(),
            degraded,
            dropped,
            path,
        })
    }
}

/// Run the requested sections of one group in order on one session. The
/// first failure skips whatever is left of the group.
pub async fn run_group<S: Session>(
    session: &S,
    sections: &[Section],
    config: &AppConfig,
    store: &TableStore,
    sink: &dyn DiagnosticSink,
) -> Vec<SectionReport> {
    let runner = SectionRunner::new(session, config, store, sink);
    let mut reports = Vec::with_capacity(sections.len());
    let mut failed = false;

    for (i, &section) in sections.iter().enumerate() {
        if failed {
            warn!("{}: skipped after an earlier failure in its group", section);
            reports.push(SectionReport {
                section,
                outcome: SectionOutcome::Skipped,
            });
            continue;
        }

        info!("=== Section: {} ===", section);
        let outcome = match runner.run(section, i == 0).await {
            Ok(stats) => {
                info!(
                    "{}: {} rows ({} degraded, {} dropped) → {:?}",
                    section, stats.rows, stats.degraded, stats.dropped, stats.path
                );
                SectionOutcome::Written(stats)
            }
            Err(e) => {
                error!("{}: {}", section, e);
                failed = true;
                SectionOutcome::Failed(e)
            }
        };
        reports.push(SectionReport { section, outcome });
    }

    reports
}

/// [`run_group`], then close the session whatever the outcome.
async fn run_and_close<S: Session>(
    session: S,
    sections: &[Section],
    config: &AppConfig,
    store: &TableStore,
    sink: &dyn DiagnosticSink,
) -> Vec<SectionReport> {
    let reports = run_group(&session, sections, config, store, sink).await;
    if let Err(e) = session.quit().await {
        warn!("Browser session did not close cleanly: {}", e);
    }
    reports
}

// ── Whole run ─────────────────────────────────────────────────────────────────

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Scrape `sections`, one browser session per group.
    pub async fn run(&self, sections: &[Section]) -> Result<Vec<SectionReport>> {
        let store = TableStore::open(&self.config.storage.data_dir)?;
        let sink = TracingSink;
        let mut reports = Vec::new();

        for group in Group::ALL {
            let wanted: Vec<Section> = group
                .sections()
                .iter()
                .copied()
                .filter(|s| sections.contains(s))
                .collect();
            if wanted.is_empty() {
                continue;
            }

            let session = match WebDriverSession::connect(&self.config.browser).await {
                Ok(s) => s,
                Err(e) => {
                    error!("Could not open a browser session for {:?}: {}", group, e);
                    reports.extend(wanted.into_iter().map(|section| SectionReport {
                        section,
                        outcome: SectionOutcome::Skipped,
                    }));
                    continue;
                }
            };

            info!("=== Group: {:?} ===", group);
            reports.extend(run_and_close(session, &wanted, &self.config, &store, &sink).await);
        }

        let written = reports.iter().filter(|r| r.is_written()).count();
        info!(
            "=== Done: {} of {} sections written ===",
            written,
            reports.len()
        );
        Ok(reports)
    }
}
