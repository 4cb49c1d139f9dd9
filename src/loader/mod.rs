//! CSV loader for reading section tables back in the offline phase.

use crate::models::BoxOfficeTable;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read a typed table. Rows that fail to deserialize are logged and skipped.
pub fn load_records<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    debug!("Loading {:?}", path);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        match result {
            Ok(r) => rows.push(r),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    info!("{:?}: {} rows loaded", path, rows.len());
    Ok(rows)
}

/// Read the box-office table with whatever header it was written with.
pub fn load_box_office(path: &Path) -> Result<BoxOfficeTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("No header in {:?}", path))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    info!("{:?}: {} rows loaded", path, rows.len());
    Ok(BoxOfficeTable { columns, rows })
}

/// Load a table if its file exists; a missing file is logged, not an error.
pub fn load_optional<T>(path: &Path, load: impl FnOnce(&Path) -> Result<T>) -> Result<Option<T>> {
    if !path.exists() {
        warn!("{:?} not found, skipping", path);
        return Ok(None);
    }
    load(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetflixRatedRecord, ReleaseRecord, TopFilmRecord};
    use crate::storage::TableStore;

    #[test]
    fn test_written_tables_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path()).unwrap();
        let rows = vec![
            TopFilmRecord {
                title: Some("The Godfather".into()),
                directors: Some("Francis Ford Coppola".into()),
                genres: Some("Drama, Crime".into()),
                actors: None,
            },
        ];
        let path = store.write_records("top_films.csv", &rows).unwrap();

        let loaded: Vec<TopFilmRecord> = load_records(&path).unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn test_empty_cells_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netflix_best.csv");
        std::fs::write(
            &path,
            "Title,Origin_country,Genres,Release_date,n_votes,rating\nDark,Germany,,2017,\"80,120\",8.2\n",
        )
        .unwrap();

        let loaded: Vec<NetflixRatedRecord> = load_records(&path).unwrap();
        assert_eq!(loaded[0].genres, None);
        assert_eq!(loaded[0].votes.as_deref(), Some("80,120"));
    }

    #[test]
    fn test_box_office_round_trip_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box_office.csv");
        std::fs::write(&path, "#,Title,Weeks\n1,Wicked,2\n").unwrap();

        let table = load_box_office(&path).unwrap();
        assert_eq!(table.columns, vec!["#", "Title", "Weeks"]);
        assert_eq!(table.cell(&table.rows[0], "Weeks"), Some("2"));
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_optional(&dir.path().join("releases.csv"), load_records::<ReleaseRecord>)
            .unwrap();
        assert!(loaded.is_none());
    }
}
