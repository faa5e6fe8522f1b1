//! Predicate tree evaluated over unparsed CSV rows
//!
//! A query is a tree of [`Predicate`] nodes. Leaves cache the column
//! ordinal and category resolved at construction, so evaluation never
//! touches the catalog; construction is also where every error this layer
//! can produce is raised. Each leaf tokenizes the row it is handed; the
//! result is correct independent of evaluation order.

use crate::csv::with_row_fields;
use crate::query::literal::{boolean_field, numeric_field, unquote, Literal};
use crate::schema::{Catalog, ColumnCategory};
use crate::{PermitError, Result};

/// A compositional boolean predicate over one CSV row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the literal
    Match {
        column: usize,
        category: ColumnCategory,
        value: Literal,
    },
    /// Field falls within `[lo, hi]`, both ends inclusive
    Range {
        column: usize,
        category: ColumnCategory,
        lo: Literal,
        hi: Literal,
    },
    /// All children match; empty selects nothing
    And(Vec<Predicate>),
    /// Any child matches; empty selects nothing
    Or(Vec<Predicate>),
    /// Child does not match
    Not(Box<Predicate>),
}

impl Predicate {
    /// Equality leaf: `column == value`.
    pub fn matches(
        catalog: &Catalog,
        column: &str,
        value: impl Into<Literal>,
    ) -> Result<Predicate> {
        let (index, category) = resolve(catalog, column)?;
        let value = check(column, category, value.into())?;
        Ok(Predicate::Match {
            column: index,
            category,
            value,
        })
    }

    /// Inclusive range leaf: `lo <= column <= hi`. Boolean columns are
    /// rejected.
    pub fn range(
        catalog: &Catalog,
        column: &str,
        lo: impl Into<Literal>,
        hi: impl Into<Literal>,
    ) -> Result<Predicate> {
        let (index, category) = resolve(catalog, column)?;
        if category == ColumnCategory::Boolean {
            return Err(PermitError::UnsupportedRangeCategory(column.to_string()));
        }
        let lo = check(column, category, lo.into())?;
        let hi = check(column, category, hi.into())?;
        Ok(Predicate::Range {
            column: index,
            category,
            lo,
            hi,
        })
    }

    /// Conjunction. Evaluation short-circuits on the first false child.
    pub fn and(children: Vec<Predicate>) -> Predicate {
        Predicate::And(children)
    }

    /// Disjunction. Evaluation short-circuits on the first true child.
    pub fn or(children: Vec<Predicate>) -> Predicate {
        Predicate::Or(children)
    }

    /// Negation.
    pub fn not(child: Predicate) -> Predicate {
        Predicate::Not(Box::new(child))
    }

    /// Evaluate against one unparsed row. A cached column ordinal past the
    /// row's field count makes the leaf false; bad field data coerces per
    /// category rather than erroring. A bad row never aborts a scan.
    pub fn evaluate(&self, row: &[u8]) -> bool {
        match self {
            Predicate::Match {
                column,
                category,
                value,
            } => with_row_fields(row, |fields| match fields.get(*column) {
                Some(range) => field_equals(&row[range.clone()], *category, value),
                None => false,
            }),
            Predicate::Range {
                column,
                category,
                lo,
                hi,
            } => with_row_fields(row, |fields| match fields.get(*column) {
                Some(range) => field_in_range(&row[range.clone()], *category, lo, hi),
                None => false,
            }),
            // An empty conjunction selects nothing
            Predicate::And(children) => {
                !children.is_empty() && children.iter().all(|c| c.evaluate(row))
            }
            Predicate::Or(children) => children.iter().any(|c| c.evaluate(row)),
            Predicate::Not(child) => !child.evaluate(row),
        }
    }
}

fn resolve(catalog: &Catalog, column: &str) -> Result<(usize, ColumnCategory)> {
    catalog
        .lookup(column)
        .ok_or_else(|| PermitError::ColumnNotFound(column.to_string()))
}

fn check(column: &str, category: ColumnCategory, literal: Literal) -> Result<Literal> {
    if literal.compatible_with(category) {
        Ok(literal)
    } else {
        Err(PermitError::LiteralTypeMismatch {
            column: column.to_string(),
            category,
        })
    }
}

fn field_equals(field: &[u8], category: ColumnCategory, value: &Literal) -> bool {
    match category {
        // Exact equality on the normalized doubles
        ColumnCategory::Numeric => value.as_f64().map_or(false, |v| numeric_field(field) == v),
        ColumnCategory::String => value
            .as_str()
            .map_or(false, |v| unquote(field) == v.as_bytes()),
        ColumnCategory::Boolean => value.as_bool().map_or(false, |v| boolean_field(field) == v),
    }
}

fn field_in_range(field: &[u8], category: ColumnCategory, lo: &Literal, hi: &Literal) -> bool {
    match category {
        ColumnCategory::Numeric => match (lo.as_f64(), hi.as_f64()) {
            (Some(lo), Some(hi)) => {
                let x = numeric_field(field);
                lo <= x && x <= hi
            }
            _ => false,
        },
        ColumnCategory::String => match (lo.as_str(), hi.as_str()) {
            (Some(lo), Some(hi)) => {
                let x = unquote(field);
                lo.as_bytes() <= x && x <= hi.as_bytes()
            }
            _ => false,
        },
        // Unreachable: rejected at construction
        ColumnCategory::Boolean => false,
    }
}
