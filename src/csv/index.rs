//! Row-offset sidecar index
//!
//! A CSV file gets a companion `<csv>.idx` file holding one byte offset per
//! logical row, so queries can seek straight to any row instead of
//! re-scanning from offset zero.
//!
//! Sidecar format (little-endian throughout):
//! ```text
//! +--------------------------------------------------+
//! | Header (32 bytes)                                |
//! |   magic:     u64 = 0x4353564944583031 "CSVIDX01" |
//! |   version:   u64 = 1                             |
//! |   file_size: u64   CSV size at build time        |
//! |   row_count: u64                                 |
//! +--------------------------------------------------+
//! | offsets: u64[row_count]                          |
//! +--------------------------------------------------+
//! ```
//!
//! A sidecar is valid for a CSV only while magic, version, and file_size
//! all match and the offset array is complete; any mismatch (including a
//! partially-written sidecar) discards it and forces a rebuild. There is no
//! checksum beyond the file_size gate.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;

use crate::{PermitError, Result};

/// Sidecar magic, ASCII "CSVIDX01" interpreted little-endian
pub const INDEX_MAGIC: u64 = 0x4353_5649_4458_3031;
/// Sidecar format version
pub const INDEX_VERSION: u64 = 1;
/// Fixed header size
pub const INDEX_HEADER_SIZE: usize = 32;
/// Chunk size for the build scan
const SCAN_BUF_SIZE: usize = 64 * 1024;

/// Sidecar header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub magic: u64,
    pub version: u64,
    pub file_size: u64,
    pub row_count: u64,
}

impl IndexHeader {
    fn new(file_size: u64, row_count: u64) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            file_size,
            row_count,
        }
    }

    fn to_bytes(&self) -> [u8; INDEX_HEADER_SIZE] {
        let mut buf = [0u8; INDEX_HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.magic.to_le_bytes());
        buf[8..16].copy_from_slice(&self.version.to_le_bytes());
        buf[16..24].copy_from_slice(&self.file_size.to_le_bytes());
        buf[24..32].copy_from_slice(&self.row_count.to_le_bytes());
        buf
    }

    fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(bytes);
        Ok(Self {
            magic: cursor.read_u64::<LittleEndian>()?,
            version: cursor.read_u64::<LittleEndian>()?,
            file_size: cursor.read_u64::<LittleEndian>()?,
            row_count: cursor.read_u64::<LittleEndian>()?,
        })
    }

    /// Whether this sidecar describes a CSV of `csv_size` bytes.
    fn is_valid_for(&self, csv_size: u64) -> bool {
        self.magic == INDEX_MAGIC && self.version == INDEX_VERSION && self.file_size == csv_size
    }
}

/// Memory-mapped row-offset index for one CSV file.
///
/// The map stays live for the index's lifetime; offsets are read directly
/// out of the mapped region.
pub struct RowIndex {
    header: IndexHeader,
    mmap: Mmap,
}

impl RowIndex {
    /// Load a valid sidecar for `csv_path`, or rebuild it from the CSV.
    ///
    /// A missing, stale, or corrupt sidecar is silently replaced; the
    /// caller observes only the added scan latency.
    pub fn open(csv_path: &Path, csv: &mut File) -> Result<RowIndex> {
        let idx_path = sidecar_path(csv_path);
        let csv_size = csv.metadata()?.len();

        if let Some(index) = Self::try_load(&idx_path, csv_size) {
            return Ok(index);
        }

        log::debug!("building row index for {}", csv_path.display());
        let offsets = scan_row_offsets(csv, csv_size)?;
        write_sidecar(&idx_path, csv_size, &offsets)?;
        Self::map_existing(&idx_path)
    }

    /// Try to load and map an existing sidecar. Any problem (missing file,
    /// short header, wrong magic or version, stale file_size, truncated
    /// offset array) returns None so the caller rebuilds.
    fn try_load(idx_path: &Path, csv_size: u64) -> Option<RowIndex> {
        let file = File::open(idx_path).ok()?;
        let idx_len = file.metadata().ok()?.len();
        if idx_len < INDEX_HEADER_SIZE as u64 {
            return None;
        }

        let mut head = [0u8; INDEX_HEADER_SIZE];
        (&file).read_exact(&mut head).ok()?;
        let header = IndexHeader::from_bytes(&head).ok()?;

        if !header.is_valid_for(csv_size) {
            log::debug!("stale or foreign sidecar at {}", idx_path.display());
            return None;
        }
        let offsets_len = header.row_count.checked_mul(8)?;
        if idx_len - (INDEX_HEADER_SIZE as u64) < offsets_len {
            log::debug!("truncated sidecar at {}", idx_path.display());
            return None;
        }

        // SAFETY: the sidecar is mapped read-only and is only ever replaced
        // wholesale by a rebuild before any map of it exists.
        let mmap = unsafe { Mmap::map(&file) }.ok()?;
        Some(RowIndex { header, mmap })
    }

    /// Map a sidecar this process just wrote. Failures here are fatal.
    fn map_existing(idx_path: &Path) -> Result<RowIndex> {
        let map_err = |source| PermitError::IndexMap {
            path: idx_path.to_path_buf(),
            source,
        };

        let file = File::open(idx_path).map_err(map_err)?;
        let mut head = [0u8; INDEX_HEADER_SIZE];
        (&file).read_exact(&mut head).map_err(map_err)?;
        let header = IndexHeader::from_bytes(&head).map_err(map_err)?;

        // SAFETY: the sidecar is mapped read-only and is only ever replaced
        // wholesale by a rebuild before any map of it exists.
        let mmap = unsafe { Mmap::map(&file) }.map_err(map_err)?;
        Ok(RowIndex { header, mmap })
    }

    /// Number of logical rows in the indexed CSV.
    pub fn row_count(&self) -> u64 {
        self.header.row_count
    }

    /// CSV size in bytes at index-build time (equals the current size while
    /// the sidecar is valid).
    pub fn csv_size(&self) -> u64 {
        self.header.file_size
    }

    /// Byte offset of row `i`'s first byte. Caller must bounds-check
    /// against [`row_count`](Self::row_count).
    #[inline]
    pub fn offset(&self, i: u64) -> u64 {
        let start = INDEX_HEADER_SIZE + i as usize * 8;
        u64::from_le_bytes(self.mmap[start..start + 8].try_into().unwrap())
    }
}

/// Sidecar path for a CSV: the CSV path with `.idx` appended.
pub fn sidecar_path(csv_path: &Path) -> PathBuf {
    let mut s = csv_path.as_os_str().to_os_string();
    s.push(".idx");
    PathBuf::from(s)
}

/// Scan the CSV for row starts: offset 0, then the byte after every
/// newline found outside quotes. Shares the tokenizer's quote rule, so a
/// `""` pair toggles the flag twice and stays inside the quoted region.
fn scan_row_offsets(csv: &mut File, csv_size: u64) -> Result<Vec<u64>> {
    csv.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::with_capacity(SCAN_BUF_SIZE, csv);

    let mut offsets: Vec<u64> = vec![0];
    let mut in_quotes = false;
    let mut pos: u64 = 0;

    loop {
        let used = {
            let chunk = reader.fill_buf()?;
            if chunk.is_empty() {
                break;
            }
            for &b in chunk {
                pos += 1;
                if b == b'"' {
                    in_quotes = !in_quotes;
                } else if b == b'\n' && !in_quotes {
                    offsets.push(pos);
                }
            }
            chunk.len()
        };
        reader.consume(used);
    }

    // A file ending in a newline records a phantom row start past EOF
    if offsets.last() == Some(&csv_size) {
        offsets.pop();
    }

    Ok(offsets)
}

fn write_sidecar(idx_path: &Path, csv_size: u64, offsets: &[u64]) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(idx_path)?);
        out.write_all(&IndexHeader::new(csv_size, offsets.len() as u64).to_bytes())?;
        for &offset in offsets {
            out.write_all(&offset.to_le_bytes())?;
        }
        out.flush()
    };

    write().map_err(|source| PermitError::IndexWrite {
        path: idx_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = IndexHeader::new(4096, 17);
        let restored = IndexHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(restored, header);
        assert!(restored.is_valid_for(4096));
        assert!(!restored.is_valid_for(4097));
    }

    #[test]
    fn test_header_rejects_foreign_magic() {
        let mut bytes = IndexHeader::new(10, 1).to_bytes();
        bytes[0] = b'X';
        let header = IndexHeader::from_bytes(&bytes).unwrap();
        assert!(!header.is_valid_for(10));
    }

    #[test]
    fn test_sidecar_path_appends_idx() {
        assert_eq!(
            sidecar_path(Path::new("/data/permits.csv")),
            PathBuf::from("/data/permits.csv.idx")
        );
    }
}
