//! Indexed CSV file
//!
//! Owns the CSV read handle and the mapped row-offset sidecar. The handle's
//! seek position is shared mutable state, so row reads and queries take
//! `&mut self`; the mapped sidecar itself is read-only.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::csv::index::RowIndex;
use crate::query::Predicate;
use crate::record::{self, PermitRecord};
use crate::{PermitError, Result};

/// A CSV file with a validated, memory-mapped row-offset index.
pub struct IndexedFile {
    path: PathBuf,
    file: File,
    index: RowIndex,
}

impl IndexedFile {
    /// Open `path` and ensure a valid mapped sidecar, rebuilding it when
    /// missing or stale. Building scans the whole CSV; reopening against a
    /// valid sidecar is effectively constant-time.
    pub fn open(path: impl AsRef<Path>) -> Result<IndexedFile> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|source| PermitError::CsvOpen {
            path: path.clone(),
            source,
        })?;
        let index = RowIndex::open(&path, &mut file)?;
        Ok(IndexedFile { path, file, index })
    }

    /// Path of the underlying CSV.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of logical rows.
    pub fn row_count(&self) -> u64 {
        self.index.row_count()
    }

    /// Read the bytes of row `i`, stripping the trailing `\n` (and a `\r`
    /// before it, tolerating CRLF). The index guarantees the span holds
    /// exactly one logical row, so no quote-aware re-parsing happens here.
    pub fn read_row(&mut self, i: u64) -> Result<Vec<u8>> {
        let rows = self.index.row_count();
        if i >= rows {
            return Err(PermitError::RowOutOfRange(i));
        }

        let start = self.index.offset(i);
        let end = if i + 1 < rows {
            self.index.offset(i + 1)
        } else {
            self.index.csv_size()
        };

        let mut row = vec![0u8; (end - start) as usize];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut row)?;

        if row.last() == Some(&b'\n') {
            row.pop();
            if row.last() == Some(&b'\r') {
                row.pop();
            }
        }

        Ok(row)
    }

    /// Full-scan query: evaluate `predicate` against every row and
    /// materialize the rows that match, in ascending row order.
    ///
    /// A matching row that fails to decode is logged and dropped from the
    /// result set; the scan continues.
    pub fn run_query(&mut self, predicate: &Predicate) -> Result<Vec<PermitRecord>> {
        let rows = self.index.row_count();
        let mut results = Vec::new();

        for i in 0..rows {
            let row = self.read_row(i)?;
            if !predicate.evaluate(&row) {
                continue;
            }
            match record::parse_row(&row) {
                Ok(rec) => results.push(rec),
                Err(err) => log::warn!(
                    "dropping unparseable row {} in {}: {}",
                    i,
                    self.path.display(),
                    err
                ),
            }
        }

        Ok(results)
    }
}
