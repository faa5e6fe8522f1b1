//! Index lifecycle, row access, and end-to-end query tests

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::csv::index::INDEX_HEADER_SIZE;
use crate::csv::{sidecar_path, split_row, IndexedFile};
use crate::query::Predicate;
use crate::record::PermitRecord;
use crate::schema::Catalog;
use crate::PermitError;

/// One permit row with 61 columns; ordinals past the overridden ones are
/// zero-filled placeholders.
fn permit_row(id: u64, borough: u64, status: &str, residential: bool) -> String {
    let mut cols = vec!["0".to_string(); 61];
    cols[0] = id.to_string();
    cols[2] = borough.to_string();
    cols[16] = format!("\"{}\"", status);
    cols[60] = if residential { "1" } else { "0" }.to_string();
    cols.join(",")
}

fn sample_rows() -> [(u64, u64, &'static str, bool); 6] {
    [
        (1000, 0, "ISSUED", true),
        (1001, 1, "PENDING", false),
        (1002, 2, "ISSUED", true),
        (1003, 1, "ISSUED", false),
        (1004, 3, "APPROVED", true),
        (1005, 0, "ISSUED", false),
    ]
}

fn write_sample_csv(dir: &TempDir) -> PathBuf {
    let body: String = sample_rows()
        .iter()
        .map(|&(id, b, s, r)| permit_row(id, b, s, r) + "\n")
        .collect();
    let path = dir.path().join("permits.csv");
    fs::write(&path, body).unwrap();
    path
}

fn job_numbers(records: &[PermitRecord]) -> Vec<i32> {
    records.iter().map(|r| r.job_number).collect()
}

#[test]
fn test_row_count_matches_logical_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.csv");

    fs::write(&path, "a,b\nc,d\ne,f\n").unwrap();
    assert_eq!(IndexedFile::open(&path).unwrap().row_count(), 3);
}

#[test]
fn test_trailing_newline_is_optional() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.csv");

    fs::write(&path, "a,b\nc,d").unwrap();
    let mut file = IndexedFile::open(&path).unwrap();
    assert_eq!(file.row_count(), 2);
    assert_eq!(file.read_row(1).unwrap(), b"c,d");
}

#[test]
fn test_empty_csv_has_no_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");

    fs::write(&path, "").unwrap();
    assert_eq!(IndexedFile::open(&path).unwrap().row_count(), 0);
}

#[test]
fn test_read_row_first_and_last() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);
    let mut file = IndexedFile::open(&path).unwrap();

    let first = file.read_row(0).unwrap();
    let last = file.read_row(file.row_count() - 1).unwrap();

    assert_eq!(first, permit_row(1000, 0, "ISSUED", true).into_bytes());
    assert_eq!(last, permit_row(1005, 0, "ISSUED", false).into_bytes());

    // Field count is stable across repeated reads
    let mut ranges = Vec::new();
    split_row(&first, &mut ranges);
    assert_eq!(ranges.len(), 61);
    split_row(&file.read_row(0).unwrap(), &mut ranges);
    assert_eq!(ranges.len(), 61);
}

#[test]
fn test_read_row_out_of_range() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);
    let mut file = IndexedFile::open(&path).unwrap();

    let err = file.read_row(file.row_count()).unwrap_err();
    assert!(matches!(err, PermitError::RowOutOfRange(6)));
}

#[test]
fn test_quoted_newline_is_one_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.csv");

    fs::write(&path, "a,\"line one\nline two\",c\nx,y,z\n").unwrap();
    let mut file = IndexedFile::open(&path).unwrap();

    assert_eq!(file.row_count(), 2);
    let row = file.read_row(0).unwrap();
    assert_eq!(row, b"a,\"line one\nline two\",c");

    let mut ranges = Vec::new();
    split_row(&row, &mut ranges);
    assert_eq!(ranges.len(), 3);
}

#[test]
fn test_doubled_quote_does_not_split_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.csv");

    // The "" pair must not leave quoted state before the embedded newline
    fs::write(&path, "a,\"say \"\"hi\"\"\nthere\",c\nx,y,z\n").unwrap();
    let file = IndexedFile::open(&path).unwrap();
    assert_eq!(file.row_count(), 2);
}

#[test]
fn test_crlf_rows_stripped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.csv");

    fs::write(&path, "a,b\r\nc,d\r\n").unwrap();
    let mut file = IndexedFile::open(&path).unwrap();

    assert_eq!(file.row_count(), 2);
    assert_eq!(file.read_row(0).unwrap(), b"a,b");
    assert_eq!(file.read_row(1).unwrap(), b"c,d");
}

#[test]
fn test_sidecar_layout() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);
    IndexedFile::open(&path).unwrap();

    let idx = fs::read(sidecar_path(&path)).unwrap();
    assert_eq!(idx.len(), INDEX_HEADER_SIZE + 6 * 8);
    // First offset is always 0
    assert_eq!(&idx[INDEX_HEADER_SIZE..INDEX_HEADER_SIZE + 8], &[0u8; 8]);
}

#[test]
fn test_reopen_does_not_rewrite_sidecar() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);

    IndexedFile::open(&path).unwrap();
    let before = fs::read(sidecar_path(&path)).unwrap();

    let file = IndexedFile::open(&path).unwrap();
    assert_eq!(file.row_count(), 6);
    let after = fs::read(sidecar_path(&path)).unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_resized_csv_invalidates_sidecar() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.csv");

    fs::write(&path, "a,b\nc,d\n").unwrap();
    assert_eq!(IndexedFile::open(&path).unwrap().row_count(), 2);

    fs::write(&path, "longer,row,content\n").unwrap();
    let mut file = IndexedFile::open(&path).unwrap();
    assert_eq!(file.row_count(), 1);
    assert_eq!(file.read_row(0).unwrap(), b"longer,row,content");
}

#[test]
fn test_corrupt_magic_rebuilds() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);
    IndexedFile::open(&path).unwrap();

    let idx_path = sidecar_path(&path);
    let mut idx = fs::read(&idx_path).unwrap();
    idx[0] ^= 0xFF;
    fs::write(&idx_path, &idx).unwrap();

    let mut file = IndexedFile::open(&path).unwrap();
    assert_eq!(file.row_count(), 6);
    assert_eq!(
        file.read_row(0).unwrap(),
        permit_row(1000, 0, "ISSUED", true).into_bytes()
    );

    // The rebuilt sidecar is well-formed again
    let rebuilt = fs::read(&idx_path).unwrap();
    assert_ne!(rebuilt[0], idx[0]);
}

#[test]
fn test_truncated_sidecar_rebuilds() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);
    IndexedFile::open(&path).unwrap();

    let idx_path = sidecar_path(&path);
    let idx = fs::read(&idx_path).unwrap();
    fs::write(&idx_path, &idx[..INDEX_HEADER_SIZE + 8]).unwrap();

    let file = IndexedFile::open(&path).unwrap();
    assert_eq!(file.row_count(), 6);
    assert_eq!(fs::read(&idx_path).unwrap().len(), idx.len());
}

#[test]
fn test_match_borough() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let q = Predicate::matches(Catalog::permit(), "borough", 1i64).unwrap();
    assert_eq!(job_numbers(&file.run_query(&q).unwrap()), vec![1001, 1003]);
}

#[test]
fn test_range_job_number() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let q = Predicate::range(Catalog::permit(), "job_number", 1002i64, 1004i64).unwrap();
    assert_eq!(
        job_numbers(&file.run_query(&q).unwrap()),
        vec![1002, 1003, 1004]
    );
}

#[test]
fn test_and_status_and_borough() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let c = Catalog::permit();
    let q = Predicate::and(vec![
        Predicate::matches(c, "job_status", "ISSUED").unwrap(),
        Predicate::matches(c, "borough", 0i64).unwrap(),
    ]);
    assert_eq!(job_numbers(&file.run_query(&q).unwrap()), vec![1000, 1005]);
}

#[test]
fn test_or_boroughs() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let c = Catalog::permit();
    let q = Predicate::or(vec![
        Predicate::matches(c, "borough", 1i64).unwrap(),
        Predicate::matches(c, "borough", 3i64).unwrap(),
    ]);
    assert_eq!(
        job_numbers(&file.run_query(&q).unwrap()),
        vec![1001, 1003, 1004]
    );
}

#[test]
fn test_not_residential() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let q = Predicate::not(Predicate::matches(Catalog::permit(), "residential", true).unwrap());
    assert_eq!(
        job_numbers(&file.run_query(&q).unwrap()),
        vec![1001, 1003, 1005]
    );
}

#[test]
fn test_nested_or_of_ands() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let c = Catalog::permit();
    let q = Predicate::or(vec![
        Predicate::and(vec![
            Predicate::matches(c, "borough", 1i64).unwrap(),
            Predicate::matches(c, "job_status", "ISSUED").unwrap(),
        ]),
        Predicate::and(vec![
            Predicate::range(c, "job_number", 1000i64, 1001i64).unwrap(),
            Predicate::matches(c, "job_status", "ISSUED").unwrap(),
        ]),
    ]);
    assert_eq!(job_numbers(&file.run_query(&q).unwrap()), vec![1000, 1003]);
}

#[test]
fn test_rebuild_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);

    let q = Predicate::matches(Catalog::permit(), "borough", 1i64).unwrap();

    let mut file = IndexedFile::open(&path).unwrap();
    let first = job_numbers(&file.run_query(&q).unwrap());
    drop(file);

    fs::remove_file(sidecar_path(&path)).unwrap();

    let mut file = IndexedFile::open(&path).unwrap();
    let second = job_numbers(&file.run_query(&q).unwrap());
    assert_eq!(first, second);
    assert_eq!(second, vec![1001, 1003]);
}

#[test]
fn test_same_content_at_new_path_reads_identically() {
    let dir = TempDir::new().unwrap();
    let path = write_sample_csv(&dir);
    let mut file = IndexedFile::open(&path).unwrap();

    let copy = dir.path().join("copy.csv");
    fs::copy(&path, &copy).unwrap();
    let mut other = IndexedFile::open(&copy).unwrap();

    assert_eq!(file.row_count(), other.row_count());
    for i in 0..file.row_count() {
        assert_eq!(file.read_row(i).unwrap(), other.read_row(i).unwrap());
    }
}

#[test]
fn test_matched_row_materializes_typed_record() {
    let dir = TempDir::new().unwrap();
    let mut file = IndexedFile::open(write_sample_csv(&dir)).unwrap();

    let q = Predicate::matches(Catalog::permit(), "job_number", 1004i64).unwrap();
    let records = file.run_query(&q).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].job_number, 1004);
    assert_eq!(records[0].borough, 3);
    assert_eq!(records[0].job_status, "APPROVED");
    assert!(records[0].residential);
}
