//! Offline cleaning of the scraped tables.
//!
//! Turns the raw text cells into typed values and reports null cells.
//! Nothing here touches the network.

use crate::loader::{load_box_office, load_optional, load_records};
use crate::models::{
    BoxOfficeTable, NetflixRatedRecord, NetflixReleaseRecord, ReleaseRecord, TopFilmRecord,
};
use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{error, info, warn};

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,3}(?:,\d{3})*").unwrap());
static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());
static RATING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}(?:.\d{1,2})*").unwrap());

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("film {0} has no directors, genres or actors")]
    FilmWithoutData(String),
}

// ── Parsers ───────────────────────────────────────────────────────────────────

/// First thousands-separated number in the text.
/// "$1,234,567" → 1234567 | "52,345 votes" → 52345
pub fn parse_amount(s: &str) -> Option<u64> {
    AMOUNT_RE
        .find(s)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// "155 min." → 155
pub fn parse_minutes(s: &str) -> Option<u32> {
    MINUTES_RE.find(s).and_then(|m| m.as_str().parse().ok())
}

/// Rating with the decimal point removed: "7.1" → 71.
pub fn parse_rating(s: &str) -> Option<u32> {
    RATING_RE
        .find(s)
        .and_then(|m| m.as_str().replace('.', "").parse().ok())
}

/// Split a `", "`-joined cell back into its values.
pub fn split_values(s: Option<&str>) -> Vec<String> {
    s.map(|s| {
        s.split(", ")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Producers come as "A, B. Distributor: C"; keep the part before the
/// distributor, without periods.
pub fn split_producers(s: &str) -> Vec<String> {
    let head = s.split("Distributor").next().unwrap_or_default();
    let head = head.trim().replace('.', "");
    split_values(Some(&head))
}

/// Parse release dates: "Friday, May 3, 2024", "May 3, 2024" or ISO
pub fn parse_release_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in ["%A, %B %d, %Y", "%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    None
}

fn normalise_title(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

// ── Cleaned rows ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BoxOfficeEntry {
    pub title: String,
    pub weekend_gross: Option<u64>,
    pub total_gross: Option<u64>,
    pub weeks: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseEntry {
    pub title: String,
    pub producers: Vec<String>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedTitle {
    pub title: String,
    pub genres: Vec<String>,
    pub votes: Option<u64>,
    pub rating: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingRelease {
    pub title: String,
    pub genres: Vec<String>,
    pub country: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopFilmEntry {
    pub title: String,
    pub directors: Vec<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
}

fn report_nulls(table: &str, rows_with_nulls: usize, untitled: usize) {
    if untitled > 0 {
        error!("{}: {} films with no title, dropped", table, untitled);
    }
    if rows_with_nulls > 0 {
        error!("{}: {} rows with null values", table, rows_with_nulls);
    }
}

// ── Tables ────────────────────────────────────────────────────────────────────

pub fn clean_box_office(table: &BoxOfficeTable) -> Vec<BoxOfficeEntry> {
    let mut untitled = 0;
    let mut with_nulls = 0;
    let mut out = Vec::new();

    for row in &table.rows {
        let cell = |name: &str| table.cell(row, name).filter(|c| !c.trim().is_empty());
        if ["Title", "Weekend Gross", "Total Gross", "Weeks"]
            .iter()
            .any(|&c| cell(c).is_none())
        {
            with_nulls += 1;
        }

        let Some(title) = normalise_title(cell("Title")) else {
            untitled += 1;
            continue;
        };
        out.push(BoxOfficeEntry {
            title,
            weekend_gross: cell("Weekend Gross").and_then(parse_amount),
            total_gross: cell("Total Gross").and_then(parse_amount),
            weeks: cell("Weeks").and_then(|w| w.trim().parse().ok()),
        });
    }

    report_nulls("box office", with_nulls, untitled);
    out
}

pub fn clean_releases(rows: &[ReleaseRecord]) -> Vec<ReleaseEntry> {
    let untitled = rows.iter().filter(|r| r.title.is_none()).count();
    let with_nulls = rows
        .iter()
        .filter(|r| r.title.is_none() || r.producers.is_none() || r.duration.is_none())
        .count();
    report_nulls("releases", with_nulls, untitled);

    rows.iter()
        .filter_map(|r| {
            Some(ReleaseEntry {
                title: normalise_title(r.title.as_deref())?,
                producers: r.producers.as_deref().map(split_producers).unwrap_or_default(),
                duration_minutes: r.duration.as_deref().and_then(parse_minutes),
            })
        })
        .collect()
}

pub fn clean_ranking(label: &str, rows: &[NetflixRatedRecord]) -> Vec<RankedTitle> {
    let untitled = rows.iter().filter(|r| r.title.is_none()).count();
    let with_nulls = rows
        .iter()
        .filter(|r| {
            r.title.is_none()
                || r.origin_country.is_none()
                || r.genres.is_none()
                || r.release_date.is_none()
                || r.votes.is_none()
                || r.rating.is_none()
        })
        .count();
    report_nulls(label, with_nulls, untitled);

    rows.iter()
        .filter_map(|r| {
            Some(RankedTitle {
                title: normalise_title(r.title.as_deref())?,
                genres: split_values(r.genres.as_deref()),
                votes: r.votes.as_deref().and_then(parse_amount),
                rating: r.rating.as_deref().and_then(parse_rating),
            })
        })
        .collect()
}

pub fn clean_upcoming(rows: &[NetflixReleaseRecord]) -> Vec<UpcomingRelease> {
    let untitled = rows.iter().filter(|r| r.title.is_none()).count();
    let with_nulls = rows
        .iter()
        .filter(|r| {
            r.title.is_none()
                || r.origin_country.is_none()
                || r.genres.is_none()
                || r.release_date.is_none()
        })
        .count();
    report_nulls("netflix releases", with_nulls, untitled);

    rows.iter()
        .filter_map(|r| {
            let title = normalise_title(r.title.as_deref())?;
            let date = r.release_date.as_deref().and_then(parse_release_date);
            if date.is_none() {
                warn!("'{}': unreadable release date {:?}", title, r.release_date);
            }
            Some(UpcomingRelease {
                title,
                genres: split_values(r.genres.as_deref()),
                country: r.origin_country.clone().unwrap_or_default(),
                date,
            })
        })
        .collect()
}

/// A film with a title but none of directors, genres or actors means the
/// detail pages were not read at all, and the whole table is rejected.
pub fn clean_top_films(rows: &[TopFilmRecord]) -> Result<Vec<TopFilmEntry>, CleanError> {
    let untitled = rows.iter().filter(|r| r.title.is_none()).count();
    if untitled > 0 {
        info!("There are {} films without title", untitled);
    }

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let Some(title) = normalise_title(r.title.as_deref()) else {
            continue;
        };
        if r.directors.is_none() && r.genres.is_none() && r.actors.is_none() {
            return Err(CleanError::FilmWithoutData(title));
        }
        out.push(TopFilmEntry {
            title,
            directors: split_values(r.directors.as_deref()),
            genres: split_values(r.genres.as_deref()),
            actors: split_values(r.actors.as_deref()),
        });
    }
    Ok(out)
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Every cleaned table found in the data directory. Missing files leave
/// their table `None`.
#[derive(Debug, Default)]
pub struct CleanedData {
    pub box_office: Option<Vec<BoxOfficeEntry>>,
    pub releases: Option<Vec<ReleaseEntry>>,
    pub top_films: Option<Vec<TopFilmEntry>>,
    pub upcoming: Option<Vec<UpcomingRelease>>,
    pub most_voted: Option<Vec<RankedTitle>>,
    pub best: Option<Vec<RankedTitle>>,
}

impl CleanedData {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = |name: &str| data_dir.join(name);

        let box_office = load_optional(&path("box_office.csv"), load_box_office)?;
        let releases = load_optional(&path("releases.csv"), load_records::<ReleaseRecord>)?;
        let top_films = load_optional(&path("top_films.csv"), load_records::<TopFilmRecord>)?;
        let upcoming = load_optional(
            &path("netflix_releases.csv"),
            load_records::<NetflixReleaseRecord>,
        )?;
        let most_voted = load_optional(
            &path("netflix_most_voted.csv"),
            load_records::<NetflixRatedRecord>,
        )?;
        let best = load_optional(&path("netflix_best.csv"), load_records::<NetflixRatedRecord>)?;

        let data = Self {
            box_office: box_office.map(|t| clean_box_office(&t)),
            releases: releases.map(|rows| clean_releases(&rows)),
            top_films: top_films.map(|rows| clean_top_films(&rows)).transpose()?,
            upcoming: upcoming.map(|rows| clean_upcoming(&rows)),
            most_voted: most_voted.map(|rows| clean_ranking("netflix most voted", &rows)),
            best: best.map(|rows| clean_ranking("netflix best", &rows)),
        };
        info!("Data preprocessed correctly");
        Ok(data)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$12,345,678"), Some(12_345_678));
        assert_eq!(parse_amount("52,345 votes"), Some(52_345));
        assert_eq!(parse_amount("987"), Some(987));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_parse_minutes_and_rating() {
        assert_eq!(parse_minutes("155 min."), Some(155));
        assert_eq!(parse_minutes("unknown"), None);
        assert_eq!(parse_rating("7.1"), Some(71));
        assert_eq!(parse_rating(" 8.45 "), Some(845));
        assert_eq!(parse_rating("-"), None);
    }

    #[test]
    fn test_split_producers() {
        assert_eq!(
            split_producers("Legendary Pictures, Warner Bros. Distributor: Warner Bros."),
            vec!["Legendary Pictures", "Warner Bros"]
        );
        assert_eq!(split_producers("A24"), vec!["A24"]);
    }

    #[test]
    fn test_split_values_keeps_unspaced_commas() {
        assert_eq!(
            split_values(Some("Warner Bros.,Inc, A24")),
            vec!["Warner Bros.,Inc", "A24"]
        );
        assert!(split_values(None).is_empty());
    }

    #[test]
    fn test_parse_release_date() {
        let may3 = NaiveDate::from_ymd_opt(2024, 5, 3);
        assert_eq!(parse_release_date("Friday, May 3, 2024"), may3);
        assert_eq!(parse_release_date("May 3, 2024"), may3);
        assert_eq!(parse_release_date("2024-05-03"), may3);
        assert_eq!(parse_release_date("soon"), None);
    }

    #[test]
    fn test_clean_box_office_drops_untitled() {
        let table = BoxOfficeTable {
            columns: ["#", "Title", "Weekend Gross", "Total Gross", "Weeks", "Genre"]
                .map(String::from)
                .to_vec(),
            rows: vec![
                ["1", " Wicked ", "$80,000,000", "$114,000,000", "2", "Musical"]
                    .map(String::from)
                    .to_vec(),
                ["2", "", "$1", "$2", "1", "Drama"].map(String::from).to_vec(),
            ],
        };
        let cleaned = clean_box_office(&table);
        assert_eq!(
            cleaned,
            vec![BoxOfficeEntry {
                title: "Wicked".into(),
                weekend_gross: Some(80_000_000),
                total_gross: Some(114_000_000),
                weeks: Some(2),
            }]
        );
    }

    #[test]
    fn test_clean_top_films_rejects_empty_film() {
        let rows = vec![
            TopFilmRecord {
                title: Some("Ok".into()),
                directors: Some("A".into()),
                genres: None,
                actors: None,
            },
            TopFilmRecord {
                title: Some("Empty".into()),
                ..Default::default()
            },
        ];
        let err = clean_top_films(&rows).unwrap_err();
        assert!(matches!(err, CleanError::FilmWithoutData(t) if t == "Empty"));
    }

    #[test]
    fn test_load_cleans_available_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::storage::TableStore::open(dir.path()).unwrap();
        store
            .write_records(
                "releases.csv",
                &[ReleaseRecord {
                    title: Some("Dune".into()),
                    producers: Some("Legendary, Warner Bros. Distributor: Warner Bros.".into()),
                    duration: Some("155 min.".into()),
                }],
            )
            .unwrap();

        let data = CleanedData::load(dir.path()).unwrap();

        assert_eq!(
            data.releases,
            Some(vec![ReleaseEntry {
                title: "Dune".into(),
                producers: vec!["Legendary".into(), "Warner Bros".into()],
                duration_minutes: Some(155),
            }])
        );
        assert!(data.box_office.is_none());
        assert!(data.top_films.is_none());
    }

    #[test]
    fn test_clean_top_films_skips_untitled() {
        let rows = vec![TopFilmRecord {
            title: None,
            directors: Some("A".into()),
            ..Default::default()
        }];
        assert!(clean_top_films(&rows).unwrap().is_empty());
    }
}
