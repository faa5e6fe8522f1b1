//! Typed permit-filing record
//!
//! Decoded form of one export row, materialized only after a predicate
//! match. Field ordinals follow the catalog; columns 69..=84 are skipped
//! and trailing columns are optional, since real exports occasionally
//! truncate empty tails.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::csv::with_row_fields;
use crate::query::unquote;
use crate::record::parse::{coordinate, int_field, money_cents, packed_date, Date};
use crate::{PermitError, Result};

// Core identifier columns every decodable row must carry
const CORE_COLUMNS: usize = 8;

// Ordinals of the two coordinate columns
const LATITUDE: usize = 85;
const LONGITUDE: usize = 86;

/// One decoded permit-filing row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermitRecord {
    // Core identifiers
    pub job_number: i32,
    pub doc_number: i16,
    pub borough: u8,
    pub bin: i32,

    // Location
    pub house_number: String,
    pub street_name: String,
    pub block: i32,
    pub lot: i16,
    pub city: String,
    pub state: String,
    pub zip: String,

    pub community_board: i16,
    pub council_district: i16,
    pub census_tract: i32,
    pub nta_name: String,

    /// NaN when the row is not geocoded
    pub latitude: f64,
    pub longitude: f64,

    // Job classification
    pub job_type: String,
    pub job_status: String,
    pub building_type: String,
    pub building_class: String,
    pub work_type: String,
    pub permit_type: String,
    pub filing_status: String,

    // Dates, packed YYYYMMDD
    pub filing_date: Date,
    pub issuance_date: Date,
    pub expiration_date: Date,
    pub latest_action_date: Date,
    pub special_action_date: Date,
    pub signoff_date: Date,

    // Owner info
    pub owner_type: String,
    pub owner_name: String,
    pub owner_business_name: String,
    pub owner_house_number: String,
    pub owner_street_name: String,
    pub owner_city: String,
    pub owner_state: String,
    pub owner_zip: String,
    pub owner_phone: String,

    // Applicant info
    pub applicant_first_name: String,
    pub applicant_last_name: String,
    pub applicant_business_name: String,
    pub applicant_professional_title: String,
    pub applicant_license: String,
    pub applicant_professional_cert: String,
    pub applicant_business_phone: String,

    // Dimensions / units
    pub existing_dwelling_units: i16,
    pub proposed_dwelling_units: i16,
    pub existing_stories: i16,
    pub proposed_stories: i16,
    pub existing_height: i32,
    pub proposed_height: i32,

    // Financial, integer cents
    pub initial_cost_cents: i64,
    pub total_est_fee_cents: i64,
    pub paid_fee_cents: i64,

    // Zoning
    pub zoning_district_1: String,
    pub zoning_district_2: String,
    pub zoning_district_3: String,
    pub zoning_district_4: String,
    pub zoning_district_5: String,
    pub special_district_1: String,
    pub special_district_2: String,

    // Work scope flags
    pub residential: bool,
    pub plumbing: bool,
    pub sprinkler: bool,
    pub fire_alarm: bool,
    pub mechanical: bool,
    pub boiler: bool,
    pub fuel_burning: bool,
    pub curb_cut: bool,

    pub job_no_good_count: u8,
}

/// Unquoted bytes of field `i`, or empty when the row is short.
fn field<'a>(row: &'a [u8], fields: &[Range<usize>], i: usize) -> &'a [u8] {
    match fields.get(i) {
        Some(range) => unquote(&row[range.clone()]),
        None => b"",
    }
}

fn text(row: &[u8], fields: &[Range<usize>], i: usize) -> String {
    String::from_utf8_lossy(field(row, fields, i)).into_owned()
}

fn flag(row: &[u8], fields: &[Range<usize>], i: usize) -> bool {
    crate::query::boolean_field(field(row, fields, i))
}

/// Decode one logical row into a [`PermitRecord`].
///
/// Rows missing the core identifier columns are errors; everything past
/// them decodes best-effort with per-type defaults.
pub fn parse_row(row: &[u8]) -> Result<PermitRecord> {
    with_row_fields(row, |fields| {
        if fields.len() < CORE_COLUMNS {
            return Err(PermitError::RowParse(format!(
                "expected at least {} fields, found {}",
                CORE_COLUMNS,
                fields.len()
            )));
        }

        let f = |i: usize| field(row, fields, i);
        let s = |i: usize| text(row, fields, i);

        Ok(PermitRecord {
            job_number: int_field(f(0)),
            doc_number: int_field(f(1)),
            borough: int_field(f(2)),
            house_number: s(3),
            street_name: s(4),
            block: int_field(f(5)),
            lot: int_field(f(6)),
            bin: int_field(f(7)),

            city: s(8),
            state: s(9),
            zip: s(10),
            community_board: int_field(f(11)),
            council_district: int_field(f(12)),
            census_tract: int_field(f(13)),
            nta_name: s(14),

            job_type: s(15),
            job_status: s(16),
            building_type: s(17),
            building_class: s(18),
            work_type: s(19),
            permit_type: s(20),
            filing_status: s(21),

            filing_date: packed_date(f(22)),
            issuance_date: packed_date(f(23)),
            expiration_date: packed_date(f(24)),
            latest_action_date: packed_date(f(25)),
            special_action_date: packed_date(f(26)),
            signoff_date: packed_date(f(27)),

            owner_type: s(28),
            owner_name: s(29),
            owner_business_name: s(30),
            owner_house_number: s(31),
            owner_street_name: s(32),
            owner_city: s(33),
            owner_state: s(34),
            owner_zip: s(35),
            owner_phone: s(36),

            applicant_first_name: s(37),
            applicant_last_name: s(38),
            applicant_business_name: s(39),
            applicant_professional_title: s(40),
            applicant_license: s(41),
            applicant_professional_cert: s(42),
            applicant_business_phone: s(43),

            existing_dwelling_units: int_field(f(44)),
            proposed_dwelling_units: int_field(f(45)),
            existing_stories: int_field(f(46)),
            proposed_stories: int_field(f(47)),
            existing_height: int_field(f(48)),
            proposed_height: int_field(f(49)),

            initial_cost_cents: money_cents(f(50)),
            total_est_fee_cents: money_cents(f(51)),
            paid_fee_cents: money_cents(f(52)),

            zoning_district_1: s(53),
            zoning_district_2: s(54),
            zoning_district_3: s(55),
            zoning_district_4: s(56),
            zoning_district_5: s(57),
            special_district_1: s(58),
            special_district_2: s(59),

            residential: flag(row, fields, 60),
            plumbing: flag(row, fields, 61),
            sprinkler: flag(row, fields, 62),
            fire_alarm: flag(row, fields, 63),
            mechanical: flag(row, fields, 64),
            boiler: flag(row, fields, 65),
            fuel_burning: flag(row, fields, 66),
            curb_cut: flag(row, fields, 67),

            job_no_good_count: int_field(f(68)),

            latitude: coordinate(f(LATITUDE)),
            longitude: coordinate(f(LONGITUDE)),
        })
    })
}
