//! Quote-aware CSV field splitting
//!
//! One logical row (the bytes between two row offsets, minus the trailing
//! newline) is split into per-field byte ranges. The splitter carries a
//! single `in_quotes` flag: a comma outside quotes terminates the current
//! field, a double quote toggles the flag. A doubled quote inside a quoted
//! field (`""`) toggles twice in immediate succession and therefore never
//! leaves quoted state at that position. Quote characters stay inside the
//! emitted ranges; the coercion layer strips them when a String field is
//! interpreted.
//!
//! The row-offset index builder shares this exact quote rule: if the two
//! ever disagree on what an unquoted newline is, the persisted index is
//! silently wrong.

use std::cell::RefCell;
use std::ops::Range;

// Thread-local field buffer so per-row evaluation never allocates
thread_local! {
    static FIELD_RANGES: RefCell<Vec<Range<usize>>> = RefCell::new(Vec::with_capacity(96));
}

/// Split one logical row into per-field byte ranges.
///
/// Total over any input: empty, malformed, and unbalanced-quote rows all
/// produce some field sequence. The final field is always emitted, possibly
/// empty. `out` is cleared first.
pub fn split_row(row: &[u8], out: &mut Vec<Range<usize>>) {
    out.clear();

    let mut start = 0usize;
    let mut in_quotes = false;

    for (i, &b) in row.iter().enumerate() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == b',' && !in_quotes {
            out.push(start..i);
            start = i + 1;
        }
    }

    out.push(start..row.len());
}

/// Run `f` against the row's field ranges using the thread-local scratch
/// buffer. The buffer is reused between calls and must not be borrowed
/// across them; evaluation is re-entrant per thread but never across
/// threads.
pub fn with_row_fields<R>(row: &[u8], f: impl FnOnce(&[Range<usize>]) -> R) -> R {
    FIELD_RANGES.with(|buf| {
        let mut fields = buf.borrow_mut();
        split_row(row, &mut fields);
        f(&fields)
    })
}
