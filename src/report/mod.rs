//! Chart datasets derived from the cleaned tables.
//!
//! Each dataset is a small CSV in the reports directory, ready to be
//! plotted. A dataset whose source tables are missing is skipped.

use crate::cleaner::{
    BoxOfficeEntry, CleanedData, RankedTitle, ReleaseEntry, TopFilmEntry, UpcomingRelease,
};
use crate::models::TableRecord;
use crate::storage::TableStore;
use anyhow::Result;
use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Gross amounts are also given divided by this index so both scales fit
/// one chart.
pub const GROSS_INDEX: f64 = 42_000.0;

const TOP_FREQUENCIES: usize = 20;
const TOP_COLLABORATIONS: usize = 12;
const MIN_PRODUCER_FILMS: usize = 2;

// ── Dataset rows ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxOfficeChartRow {
    pub title: String,
    pub weeks: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub weekend_gross: Option<u64>,
    pub total_gross: Option<u64>,
    pub weekend_gross_index: Option<f64>,
    pub total_gross_index: Option<f64>,
}

impl TableRecord for BoxOfficeChartRow {
    const COLUMNS: &'static [&'static str] = &[
        "Title",
        "Weeks",
        "Duration",
        "Weekend Gross",
        "Total Gross",
        "Weekend Gross (index)",
        "Total Gross (index)",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProducerShareRow {
    pub producer: String,
    pub films: usize,
    pub share_pct: f64,
}

impl TableRecord for ProducerShareRow {
    const COLUMNS: &'static [&'static str] = &["Producer", "Films", "Share %"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VotesRatingRow {
    pub kind: &'static str,
    pub title: String,
    pub votes_thousands: Option<u64>,
    pub rating: Option<u32>,
}

impl TableRecord for VotesRatingRow {
    const COLUMNS: &'static [&'static str] = &["Type", "Title", "Votes (k)", "Rating"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarRow {
    pub year: i32,
    pub month: String,
    pub day: u32,
    pub title: String,
    pub genres: String,
    pub country: String,
}

impl TableRecord for CalendarRow {
    const COLUMNS: &'static [&'static str] = &["Year", "Month", "Day", "Title", "Genres", "Country"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub category: &'static str,
    pub name: String,
    pub count: usize,
}

impl TableRecord for FrequencyRow {
    const COLUMNS: &'static [&'static str] = &["Category", "Name", "Count"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaborationRow {
    pub director: String,
    pub actor: String,
    pub films: usize,
}

impl TableRecord for CollaborationRow {
    const COLUMNS: &'static [&'static str] = &["Director", "Actor", "Films"];
}

// ── Counting ──────────────────────────────────────────────────────────────────

/// Occurrences of each value, most frequent first. Ties keep the order in
/// which values were first seen.
fn frequencies<K, I>(values: I) -> Vec<(K, usize)>
where
    K: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for v in values {
        match index.get(&v) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(v.clone(), counts.len());
                counts.push((v, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

// ── Datasets ──────────────────────────────────────────────────────────────────

/// Box-office entries joined with release details on title, longest film
/// first. Releases without a running time are dropped before the join, so
/// entries that only match such a release are left out too.
pub fn box_office_chart(
    box_office: &[BoxOfficeEntry],
    releases: &[ReleaseEntry],
) -> Vec<BoxOfficeChartRow> {
    let mut by_title: HashMap<&str, &ReleaseEntry> = HashMap::new();
    for r in releases.iter().filter(|r| r.duration_minutes.is_some()) {
        by_title.entry(r.title.as_str()).or_insert(r);
    }

    let mut rows: Vec<BoxOfficeChartRow> = box_office
        .iter()
        .filter_map(|b| {
            let release = by_title.get(b.title.as_str())?;
            Some(BoxOfficeChartRow {
                title: b.title.clone(),
                weeks: b.weeks,
                duration_minutes: release.duration_minutes,
                weekend_gross: b.weekend_gross,
                total_gross: b.total_gross,
                weekend_gross_index: b.weekend_gross.map(|g| g as f64 / GROSS_INDEX),
                total_gross_index: b.total_gross.map(|g| g as f64 / GROSS_INDEX),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.duration_minutes.cmp(&a.duration_minutes));
    rows
}

/// Producers credited on at least two releases, with their share of those
/// credits.
pub fn producer_shares(releases: &[ReleaseEntry]) -> Vec<ProducerShareRow> {
    let counts: Vec<(&str, usize)> = frequencies(
        releases
            .iter()
            .flat_map(|r| r.producers.iter().map(String::as_str)),
    )
    .into_iter()
    .filter(|(_, n)| *n >= MIN_PRODUCER_FILMS)
    .collect();

    let total: usize = counts.iter().map(|(_, n)| n).sum();
    counts
        .into_iter()
        .map(|(producer, films)| ProducerShareRow {
            producer: producer.to_string(),
            films,
            share_pct: films as f64 * 100.0 / total as f64,
        })
        .collect()
}

/// Best-rated and most-voted titles on one scale, lowest rating first.
pub fn votes_vs_rating(best: &[RankedTitle], most_voted: &[RankedTitle]) -> Vec<VotesRatingRow> {
    let tag = |kind: &'static str| {
        move |t: &RankedTitle| VotesRatingRow {
            kind,
            title: t.title.clone(),
            votes_thousands: t.votes.map(|v| v.div_ceil(1000)),
            rating: t.rating,
        }
    };

    let mut rows: Vec<VotesRatingRow> = best
        .iter()
        .map(tag("Best"))
        .chain(most_voted.iter().map(tag("More popular")))
        .collect();
    rows.sort_by_key(|r| r.rating);
    rows
}

/// Upcoming releases laid out by year, month and day.
pub fn release_calendar(upcoming: &[UpcomingRelease]) -> Vec<CalendarRow> {
    let mut dated: Vec<_> = upcoming
        .iter()
        .filter_map(|u| u.date.map(|d| (d, u)))
        .collect();
    let undated = upcoming.len() - dated.len();
    if undated > 0 {
        warn!("{} upcoming releases without a date left off the calendar", undated);
    }
    dated.sort_by_key(|(d, _)| *d);

    dated
        .into_iter()
        .map(|(d, u)| CalendarRow {
            year: d.year(),
            month: d.format("%B").to_string(),
            day: d.day(),
            title: u.title.clone(),
            genres: u.genres.join(", "),
            country: u.country.clone(),
        })
        .collect()
}

/// The most frequent genres, directors and actors of the top films.
pub fn top_frequencies(films: &[TopFilmEntry]) -> Vec<FrequencyRow> {
    let categories: [(&'static str, fn(&TopFilmEntry) -> &[String]); 3] = [
        ("genre", |f| f.genres.as_slice()),
        ("director", |f| f.directors.as_slice()),
        ("actor", |f| f.actors.as_slice()),
    ];

    categories
        .into_iter()
        .flat_map(|(category, values)| {
            frequencies(films.iter().flat_map(values).map(String::as_str))
                .into_iter()
                .take(TOP_FREQUENCIES)
                .map(move |(name, count)| FrequencyRow {
                    category,
                    name: name.to_string(),
                    count,
                })
        })
        .collect()
}

/// Director/actor pairs that recur most across the top films. A director
/// who also acts in their own film is not a collaboration.
pub fn collaborations(films: &[TopFilmEntry]) -> Vec<CollaborationRow> {
    let pairs = films.iter().flat_map(|f| {
        f.directors.iter().flat_map(move |d| {
            f.actors
                .iter()
                .filter(move |a| *a != d)
                .map(move |a| (d.as_str(), a.as_str()))
        })
    });

    frequencies(pairs)
        .into_iter()
        .take(TOP_COLLABORATIONS)
        .map(|((director, actor), films)| CollaborationRow {
            director: director.to_string(),
            actor: actor.to_string(),
            films,
        })
        .collect()
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Write every dataset whose inputs are available. Returns the files written.
pub fn write_reports(data: &CleanedData, reports_dir: &Path) -> Result<Vec<PathBuf>> {
    let store = TableStore::open(reports_dir)?;
    let mut written = Vec::new();

    match (&data.box_office, &data.releases) {
        (Some(box_office), Some(releases)) => {
            let rows = box_office_chart(box_office, releases);
            written.push(store.write_records("box_office.csv", &rows)?);
        }
        _ => warn!("Skipping box_office.csv: needs box office and releases"),
    }

    match &data.releases {
        Some(releases) => {
            written.push(store.write_records("top_producers.csv", &producer_shares(releases))?);
        }
        None => warn!("Skipping top_producers.csv: needs releases"),
    }

    match (&data.best, &data.most_voted) {
        (Some(best), Some(voted)) => {
            let rows = votes_vs_rating(best, voted);
            written.push(store.write_records("netflix_votes_rating.csv", &rows)?);
        }
        _ => warn!("Skipping netflix_votes_rating.csv: needs netflix best and most voted"),
    }

    match &data.upcoming {
        Some(upcoming) => {
            written.push(store.write_records("netflix_calendar.csv", &release_calendar(upcoming))?);
        }
        None => warn!("Skipping netflix_calendar.csv: needs netflix releases"),
    }

    match &data.top_films {
        Some(films) => {
            written.push(store.write_records("top_frequencies.csv", &top_frequencies(films))?);
            written.push(store.write_records("collaborations.csv", &collaborations(films))?);
        }
        None => warn!("Skipping top film datasets: needs top films"),
    }

    info!("{} chart datasets written to {:?}", written.len(), reports_dir);
    Ok(written)
}
