//! Column catalog: name → (ordinal, category)
//!
//! The export carries no header row; ordinal positions come from this
//! table and nothing else. The catalog is the single source of truth for
//! column ordering; the predicate layer resolves names against it once,
//! at construction, and never per row.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Coarse type tag attached to a column. Determines how field bytes and
/// caller literals are coerced for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnCategory {
    Numeric,
    String,
    Boolean,
}

/// Fixed-schema column table with constant-time name lookup.
#[derive(Debug, Clone)]
pub struct Catalog {
    columns: AHashMap<String, (usize, ColumnCategory)>,
}

impl Catalog {
    /// Build a catalog from `(name, ordinal, category)` triples. Names must
    /// be unique; a duplicate keeps the last entry.
    pub fn new(columns: &[(&str, usize, ColumnCategory)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|&(name, index, category)| (name.to_string(), (index, category)))
                .collect(),
        }
    }

    /// The built-in permit-filing column table.
    pub fn permit() -> &'static Catalog {
        &PERMIT
    }

    /// Resolve a column name to its ordinal and category.
    pub fn lookup(&self, name: &str) -> Option<(usize, ColumnCategory)> {
        self.columns.get(name).copied()
    }

    /// Number of catalogued columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

static PERMIT: Lazy<Catalog> = Lazy::new(|| Catalog::new(PERMIT_COLUMNS));

/// Ordinals into the raw permit-filing export. Columns 69..=84 exist in the
/// file but are not queryable.
const PERMIT_COLUMNS: &[(&str, usize, ColumnCategory)] = &[
    // Numeric columns
    ("job_number", 0, ColumnCategory::Numeric),
    ("doc_number", 1, ColumnCategory::Numeric),
    ("borough", 2, ColumnCategory::Numeric),
    ("block", 5, ColumnCategory::Numeric),
    ("lot", 6, ColumnCategory::Numeric),
    ("bin", 7, ColumnCategory::Numeric),
    ("community_board", 11, ColumnCategory::Numeric),
    ("council_district", 12, ColumnCategory::Numeric),
    ("census_tract", 13, ColumnCategory::Numeric),
    ("filing_date", 22, ColumnCategory::Numeric),
    ("issuance_date", 23, ColumnCategory::Numeric),
    ("expiration_date", 24, ColumnCategory::Numeric),
    ("latest_action_date", 25, ColumnCategory::Numeric),
    ("special_action_date", 26, ColumnCategory::Numeric),
    ("signoff_date", 27, ColumnCategory::Numeric),
    ("existing_dwelling_units", 44, ColumnCategory::Numeric),
    ("proposed_dwelling_units", 45, ColumnCategory::Numeric),
    ("existing_stories", 46, ColumnCategory::Numeric),
    ("proposed_stories", 47, ColumnCategory::Numeric),
    ("existing_height", 48, ColumnCategory::Numeric),
    ("proposed_height", 49, ColumnCategory::Numeric),
    ("initial_cost", 50, ColumnCategory::Numeric),
    ("total_est_fee", 51, ColumnCategory::Numeric),
    ("paid_fee", 52, ColumnCategory::Numeric),
    ("job_no_good_count", 68, ColumnCategory::Numeric),
    ("latitude", 85, ColumnCategory::Numeric),
    ("longitude", 86, ColumnCategory::Numeric),
    // String columns
    ("house_number", 3, ColumnCategory::String),
    ("street_name", 4, ColumnCategory::String),
    ("city", 8, ColumnCategory::String),
    ("state", 9, ColumnCategory::String),
    ("zip", 10, ColumnCategory::String),
    ("nta_name", 14, ColumnCategory::String),
    ("job_type", 15, ColumnCategory::String),
    ("job_status", 16, ColumnCategory::String),
    ("building_type", 17, ColumnCategory::String),
    ("building_class", 18, ColumnCategory::String),
    ("work_type", 19, ColumnCategory::String),
    ("permit_type", 20, ColumnCategory::String),
    ("filing_status", 21, ColumnCategory::String),
    ("owner_type", 28, ColumnCategory::String),
    ("owner_name", 29, ColumnCategory::String),
    ("owner_business_name", 30, ColumnCategory::String),
    ("owner_house_number", 31, ColumnCategory::String),
    ("owner_street_name", 32, ColumnCategory::String),
    ("owner_city", 33, ColumnCategory::String),
    ("owner_state", 34, ColumnCategory::String),
    ("owner_zip", 35, ColumnCategory::String),
    ("owner_phone", 36, ColumnCategory::String),
    ("applicant_first_name", 37, ColumnCategory::String),
    ("applicant_last_name", 38, ColumnCategory::String),
    ("applicant_business_name", 39, ColumnCategory::String),
    ("applicant_professional_title", 40, ColumnCategory::String),
    ("applicant_license", 41, ColumnCategory::String),
    ("applicant_professional_cert", 42, ColumnCategory::String),
    ("applicant_business_phone", 43, ColumnCategory::String),
    ("zoning_district_1", 53, ColumnCategory::String),
    ("zoning_district_2", 54, ColumnCategory::String),
    ("zoning_district_3", 55, ColumnCategory::String),
    ("zoning_district_4", 56, ColumnCategory::String),
    ("zoning_district_5", 57, ColumnCategory::String),
    ("special_district_1", 58, ColumnCategory::String),
    ("special_district_2", 59, ColumnCategory::String),
    // Boolean columns
    ("residential", 60, ColumnCategory::Boolean),
    ("plumbing", 61, ColumnCategory::Boolean),
    ("sprinkler", 62, ColumnCategory::Boolean),
    ("fire_alarm", 63, ColumnCategory::Boolean),
    ("mechanical", 64, ColumnCategory::Boolean),
    ("boiler", 65, ColumnCategory::Boolean),
    ("fuel_burning", 66, ColumnCategory::Boolean),
    ("curb_cut", 67, ColumnCategory::Boolean),
];
