//! CSV table output.
//!
//! Each table is written to `<name>.tmp` next to its destination and
//! renamed into place once complete, so a failed write never leaves a
//! half-written file under the real name.

use crate::models::{BoxOfficeTable, TableRecord};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct TableStore {
    dir: PathBuf,
}

impl TableStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Could not create dir {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write typed records, header first, replacing any previous file.
    pub fn write_records<R: TableRecord>(&self, file_name: &str, records: &[R]) -> Result<PathBuf> {
        self.commit(file_name, |wtr| {
            wtr.write_record(R::COLUMNS)?;
            for record in records {
                wtr.serialize(record)?;
            }
            Ok(records.len())
        })
    }

    /// Write the box-office table under its own header row.
    pub fn write_box_office(&self, file_name: &str, table: &BoxOfficeTable) -> Result<PathBuf> {
        self.commit(file_name, |wtr| {
            wtr.write_record(&table.columns)?;
            for row in &table.rows {
                let cells: Vec<&str> = (0..table.columns.len())
                    .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                    .collect();
                wtr.write_record(&cells)?;
            }
            Ok(table.rows.len())
        })
    }

    fn commit(
        &self,
        file_name: &str,
        write: impl FnOnce(&mut csv::Writer<fs::File>) -> Result<usize>,
    ) -> Result<PathBuf> {
        let path = self.path_for(file_name);
        let tmp = self.path_for(&format!("{file_name}.tmp"));

        let written = (|| -> Result<usize> {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)
                .with_context(|| format!("Failed to create {:?}", tmp))?;
            let n = write(&mut wtr)?;
            wtr.flush().context("Failed to flush CSV")?;
            Ok(n)
        })();

        let n = match written {
            Ok(n) => n,
            Err(e) => {
                fs::remove_file(&tmp).ok();
                return Err(e.context(format!("Failed to write {}", file_name)));
            }
        };

        fs::rename(&tmp, &path).with_context(|| format!("Failed to move {:?} into place", tmp))?;
        info!("Wrote {} rows to {:?}", n, path);
        Ok(path)
    }
}
