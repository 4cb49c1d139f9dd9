use serde::{Deserialize, Serialize};

/// A row type that can be written as one section table.
///
/// `COLUMNS` is written as the header even when the table is empty, so the
/// offline phase always finds the schema it expects.
pub trait TableRecord: Serialize {
    const COLUMNS: &'static [&'static str];
}

// ── Listing items ─────────────────────────────────────────────────────────────

/// A (display name, detail-page address) pair found on a listing page.
/// Either half may be missing when the listing markup is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub name: Option<String>,
    pub link: Option<String>,
}

impl ItemRef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<untitled>")
    }
}

// ── Extraction outcome ────────────────────────────────────────────────────────

/// One extracted row plus the fields that could not be found for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<R> {
    pub record: R,
    pub missing: Vec<&'static str>,
}

impl<R> Extracted<R> {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

// ── New releases ──────────────────────────────────────────────────────────────

/// releases.csv: one row per released film, filled from its detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Producers")]
    pub producers: Option<String>,
    #[serde(rename = "Duration")]
    pub duration: Option<String>,
}

impl TableRecord for ReleaseRecord {
    const COLUMNS: &'static [&'static str] = &["Title", "Producers", "Duration"];
}

// ── Box office ────────────────────────────────────────────────────────────────

/// box_office.csv: the columns are whatever the site's table header says.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxOfficeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl BoxOfficeTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell of `row` under the header `name`, if both exist.
    pub fn cell<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        self.column(name)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    }
}

// ── Top 1000 ──────────────────────────────────────────────────────────────────

/// top_films.csv
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopFilmRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Directors")]
    pub directors: Option<String>,
    #[serde(rename = "genres")]
    pub genres: Option<String>,
    #[serde(rename = "Actors")]
    pub actors: Option<String>,
}

impl TableRecord for TopFilmRecord {
    const COLUMNS: &'static [&'static str] = &["Title", "Directors", "genres", "Actors"];
}

// ── Netflix ───────────────────────────────────────────────────────────────────

/// netflix_releases.csv
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetflixReleaseRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Origin_country")]
    pub origin_country: Option<String>,
    #[serde(rename = "genres")]
    pub genres: Option<String>,
    #[serde(rename = "Release_date")]
    pub release_date: Option<String>,
}

impl TableRecord for NetflixReleaseRecord {
    const COLUMNS: &'static [&'static str] = &["Title", "Origin_country", "genres", "Release_date"];
}

/// netflix_most_voted.csv and netflix_best.csv share this schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetflixRatedRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Origin_country")]
    pub origin_country: Option<String>,
    #[serde(rename = "Genres")]
    pub genres: Option<String>,
    #[serde(rename = "Release_date")]
    pub release_date: Option<String>,
    #[serde(rename = "n_votes")]
    pub votes: Option<String>,
    #[serde(rename = "rating")]
    pub rating: Option<String>,
}

impl TableRecord for NetflixRatedRecord {
    const COLUMNS: &'static [&'static str] =
        &["Title", "Origin_country", "Genres", "Release_date", "n_votes", "rating"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_completeness() {
        let full = Extracted { record: 1, missing: vec![] };
        let degraded = Extracted { record: 2, missing: vec!["title"] };
        assert!(full.is_complete());
        assert!(!degraded.is_complete());
    }

    #[test]
    fn test_box_office_cell_lookup() {
        let table = BoxOfficeTable {
            columns: vec!["#".into(), "Title".into(), "Weeks".into()],
            rows: vec![vec!["1".into(), "Dune".into()]],
        };
        let row = &table.rows[0];
        assert_eq!(table.cell(row, "Title"), Some("Dune"));
        assert_eq!(table.cell(row, "Weeks"), None);
        assert_eq!(table.cell(row, "Genre"), None);
    }
}
