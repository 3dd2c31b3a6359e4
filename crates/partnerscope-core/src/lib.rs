#![deny(clippy::all)]

//! Partner deduplication and contract KPIs over spreadsheet exports.
//!
//! Raw rows go through [`normalize`], get a canonical identity from
//! [`identity`], and are collapsed by [`PartnerIndex`] into one entry per
//! partner with a single resolved [`Status`]. Every count the reports show is
//! a count of index entries, never of raw rows.

pub mod aggregator;
pub mod billing;
pub mod error;
pub mod filter;
pub mod identity;
pub mod normalize;
pub mod regions;
pub mod report;
pub mod status;
pub mod window;

pub use aggregator::{
    period_series, CityLookup, Dimension, PartnerEntry, PartnerIndex, PeriodCount,
    RepresentativeFields, StateBucket, StatusCounts, CITY_SUGGESTION_LIMIT, NONE_LABEL,
};
pub use billing::{
    normalize_billing_record, normalize_billing_records, BillingColumnMap, BillingRecord,
    FinancialSummary, PartnerSales, DEFAULT_TEAM_COMMISSION_RATE,
};
pub use error::{CoreError, CoreResult};
pub use filter::RecordFilter;
pub use identity::{resolve_key, CanonicalKey};
pub use normalize::{
    normalize_record, normalize_records, parse_date, ColumnMap, NormalizedRecord, RawRecord,
};
pub use regions::{known_states, region_for_state};
pub use report::{
    BillingReport, ContractReport, GoalProgress, Goals, PeriodComparison, ReportOptions,
};
pub use status::{resolve_status, Status};
pub use window::{Granularity, TimeWindow, WindowKind};

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Parse a user-typed date, mapping failure to [`CoreError::InvalidDate`].
pub fn parse_as_of(raw: &str) -> CoreResult<chrono::NaiveDate> {
    parse_date(raw).ok_or_else(|| CoreError::InvalidDate(raw.to_string()))
}
