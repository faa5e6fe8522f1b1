//! Fixed-schema column catalog

mod catalog;

pub use catalog::{Catalog, ColumnCategory};
