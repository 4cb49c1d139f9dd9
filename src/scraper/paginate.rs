//! Pagination walkers.
//!
//! The site paginates in two ways. Rankings grow in place behind a "show
//! more" button ([`expand_all`]); the Netflix calendar replaces the whole
//! page behind a "next" button ([`walk_pages`]).

use crate::browser::{BrowserError, Element, Locator, Session};
use crate::config::TimingConfig;
use crate::scraper::ExtractError;
use crate::scraper::parsers::has_control;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("next-page control {0} is present but not visible")]
    NotInteractable(Locator),

    #[error("pagination control {control} still present after {clicks} clicks")]
    IterationCapExceeded { control: Locator, clicks: usize },

    #[error("browser: {0}")]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Click `control` until it disappears or stops being visible. When several
/// elements match, the first visible one is clicked.
///
/// Returns the number of clicks. Any failure to find or use the control
/// ends the expansion normally; only the iteration cap is an error.
pub async fn expand_all<S: Session>(
    session: &S,
    control: &Locator,
    timing: &TimingConfig,
    max_iterations: usize,
) -> Result<usize, PaginationError> {
    let mut clicks = 0usize;

    loop {
        sleep(timing.show_more_poll()).await;

        if let Err(e) = session.wait_for(control, timing.wait_timeout()).await {
            info!("No more {} to expand: {}", control, e);
            break;
        }
        let candidates = match session.find_all(control).await {
            Ok(found) => found,
            Err(e) => {
                info!("No more {} to expand: {}", control, e);
                break;
            }
        };
        let Some(button) = first_displayed(candidates).await else {
            debug!("{} no longer visible", control);
            break;
        };

        if clicks >= max_iterations {
            return Err(PaginationError::IterationCapExceeded {
                control: control.clone(),
                clicks,
            });
        }

        if let Err(e) = button.scroll_into_view().await {
            info!("Stopped expanding, could not scroll to {}: {}", control, e);
            break;
        }
        sleep(timing.show_more_settle()).await;
        if let Err(e) = button.click().await {
            info!("Stopped expanding, could not click {}: {}", control, e);
            break;
        }
        clicks += 1;
        debug!("Expanded {} ({} clicks)", control, clicks);
    }

    Ok(clicks)
}

/// The first element that reports itself visible. Elements whose
/// visibility cannot be read are passed over.
async fn first_displayed<E: Element>(candidates: Vec<E>) -> Option<E> {
    for el in candidates {
        match el.is_displayed().await {
            Ok(true) => return Some(el),
            Ok(false) => {}
            Err(e) => debug!("Skipping control: {}", e),
        }
    }
    None
}

/// The "next page" control of a page-replacement listing.
#[derive(Debug, Clone)]
pub struct NextControl {
    /// Selector checked against the page markup to decide whether a next
    /// page exists.
    pub marker: String,
    /// How the control is found in the live page to click it.
    pub locator: Locator,
}

/// Extract every page of a page-replacement listing, in page order.
///
/// A next control that is found but hidden aborts the walk: the rows
/// gathered so far are discarded with the error. A control that cannot be
/// found, or whose visibility cannot be read, ends the walk normally.
pub async fn walk_pages<S, R, F>(
    session: &S,
    next: &NextControl,
    timing: &TimingConfig,
    max_iterations: usize,
    mut extract: F,
) -> Result<Vec<R>, PaginationError>
where
    S: Session,
    F: FnMut(&str) -> Result<Vec<R>, ExtractError>,
{
    let mut html = session.source().await?;
    let mut rows = extract(&html)?;
    let mut pages = 1usize;
    debug!("Page {}: {} rows", pages, rows.len());

    loop {
        if !has_control(&html, &next.marker)? {
            break;
        }

        let button = match session.find(&next.locator).await {
            Ok(b) => b,
            Err(e) => {
                info!("No next page: {}", e);
                break;
            }
        };
        match button.is_displayed().await {
            Ok(true) => {}
            Ok(false) => return Err(PaginationError::NotInteractable(next.locator.clone())),
            Err(e) => {
                info!("No next page, {} went stale: {}", next.locator, e);
                break;
            }
        }
        if pages > max_iterations {
            return Err(PaginationError::IterationCapExceeded {
                control: next.locator.clone(),
                clicks: pages - 1,
            });
        }

        button.scroll_into_view().await?;
        sleep(timing.page_scroll_settle()).await;
        button.click().await?;
        sleep(timing.page_load_settle()).await;

        html = session.source().await?;
        let page_rows = extract(&html)?;
        pages += 1;
        debug!("Page {}: {} rows", pages, page_rows.len());
        rows.extend(page_rows);
    }

    info!("Walked {} pages, {} rows", pages, rows.len());
    Ok(rows)
}
