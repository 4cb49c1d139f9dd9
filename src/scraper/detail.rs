//! Per-item follow-up: open each film's own page and merge what it says
//! with the name from the listing.
//!
//! Unlike page parsing, where a missing field only nulls that field, any
//! failure here drops the whole item.

use crate::browser::Session;
use crate::models::{Extracted, ItemRef};
use crate::scraper::ExtractError;
use crate::scraper::diagnostics::{Diagnostic, DiagnosticSink};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedItem {
    pub name: String,
    pub cause: String,
}

#[derive(Debug)]
pub struct VisitReport<R> {
    pub records: Vec<Extracted<R>>,
    pub dropped: Vec<DroppedItem>,
}

/// Absolute address of a listing link.
fn resolve_link(base: &Url, link: &str) -> Result<String, String> {
    base.join(link)
        .map(String::from)
        .map_err(|e| format!("bad link '{link}': {e}"))
}

/// Visit every item in order and extract one record from each page.
pub async fn visit_details<S, R, F>(
    session: &S,
    items: &[ItemRef],
    base: &Url,
    settle: Duration,
    sink: &dyn DiagnosticSink,
    extract: F,
) -> VisitReport<R>
where
    S: Session,
    F: Fn(&str, Option<String>, &dyn DiagnosticSink) -> Result<Extracted<R>, ExtractError>,
{
    let mut report = VisitReport {
        records: Vec::with_capacity(items.len()),
        dropped: Vec::new(),
    };

    for (i, item) in items.iter().enumerate() {
        let outcome = visit_one(session, item, base, settle, sink, &extract).await;
        match outcome {
            Ok(record) => {
                debug!("[{}/{}] {}", i + 1, items.len(), item.display_name());
                report.records.push(record);
            }
            Err(cause) => {
                let dropped = DroppedItem {
                    name: item.display_name().to_string(),
                    cause,
                };
                sink.report(Diagnostic::ItemDropped {
                    name: dropped.name.clone(),
                    cause: dropped.cause.clone(),
                });
                report.dropped.push(dropped);
            }
        }
    }

    info!(
        "Visited {} detail pages: {} kept, {} dropped",
        items.len(),
        report.records.len(),
        report.dropped.len()
    );
    report
}

async fn visit_one<S, R, F>(
    session: &S,
    item: &ItemRef,
    base: &Url,
    settle: Duration,
    sink: &dyn DiagnosticSink,
    extract: &F,
) -> Result<Extracted<R>, String>
where
    S: Session,
    F: Fn(&str, Option<String>, &dyn DiagnosticSink) -> Result<Extracted<R>, ExtractError>,
{
    let link = item.link.as_deref().ok_or("no detail link")?;
    let url = resolve_link(base, link)?;

    session.goto(&url).await.map_err(|e| e.to_string())?;
    sleep(settle).await;
    let html = session.source().await.map_err(|e| e.to_string())?;

    extract(&html, item.name.clone(), sink).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakePage, FakeSession};
    use crate::models::ReleaseRecord;
    use crate::scraper::diagnostics::RecordingSink;
    use crate::scraper::parsers::parse_release_detail;

    fn film_page(n: usize) -> FakePage {
        FakePage::new(format!(
            "<div class='card-producer'>Studio {n}</div><dl><dt>Running time</dt><dd>{n}0 min.</dd></dl>"
        ))
    }

    fn item(n: usize) -> ItemRef {
        ItemRef {
            name: Some(format!("Film {n}")),
            link: Some(format!("/us/film{n}.html")),
        }
    }

    #[tokio::test]
    async fn test_failing_item_is_dropped() {
        let base = Url::parse("https://example.test/us/main.html").unwrap();
        let mut session = FakeSession::new();
        for n in [1, 2, 4, 5] {
            session = session.page(&format!("https://example.test/us/film{n}.html"), film_page(n));
        }
        let items: Vec<ItemRef> = (1..=5).map(item).collect();
        let sink = RecordingSink::default();

        let report = visit_details(
            &session,
            &items,
            &base,
            Duration::ZERO,
            &sink,
            parse_release_detail,
        )
        .await;

        let titles: Vec<_> = report
            .records
            .iter()
            .map(|r| r.record.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["Film 1", "Film 2", "Film 4", "Film 5"]);
        assert_eq!(
            report.records[2].record,
            ReleaseRecord {
                title: Some("Film 4".into()),
                producers: Some("Studio 4".into()),
                duration: Some("40 min.".into()),
            }
        );
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].name, "Film 3");
        assert!(matches!(
            sink.entries().as_slice(),
            [Diagnostic::ItemDropped { name, .. }] if name == "Film 3"
        ));
    }

    #[tokio::test]
    async fn test_item_without_link_is_dropped() {
        let base = Url::parse("https://example.test/").unwrap();
        let session = FakeSession::new();
        let items = vec![ItemRef {
            name: Some("Orphan".into()),
            link: None,
        }];

        let report = visit_details(
            &session,
            &items,
            &base,
            Duration::ZERO,
            &RecordingSink::default(),
            parse_release_detail,
        )
        .await;

        assert!(report.records.is_empty());
        assert_eq!(report.dropped[0].cause, "no detail link");
    }

    #[tokio::test]
    async fn test_degraded_rows_are_kept() {
        let base = Url::parse("https://example.test/").unwrap();
        let session = FakeSession::new().page("https://example.test/bare", FakePage::new("<p></p>"));
        let items = vec![ItemRef {
            name: Some("Bare".into()),
            link: Some("/bare".into()),
        }];

        let report = visit_details(
            &session,
            &items,
            &base,
            Duration::ZERO,
            &RecordingSink::default(),
            parse_release_detail,
        )
        .await;

        assert_eq!(report.records.len(), 1);
        assert!(!report.records[0].is_complete());
        assert!(report.dropped.is_empty());
    }
}
