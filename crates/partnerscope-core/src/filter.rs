use crate::billing::BillingRecord;
use crate::normalize::NormalizedRecord;
use crate::regions::region_for_state;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Row filter applied before indexing. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    /// Calendar month (1-12) in any year.
    pub month: Option<u32>,
    pub contract_types: Vec<String>,
    /// Billing-only: compared against the financial type column.
    pub financial_types: Vec<String>,
    pub regions: Vec<String>,
    pub states: Vec<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.since.is_none()
            && self.until.is_none()
            && self.month.is_none()
            && self.contract_types.is_empty()
            && self.financial_types.is_empty()
            && self.regions.is_empty()
            && self.states.is_empty()
    }

    fn has_date_bounds(&self) -> bool {
        self.since.is_some() || self.until.is_some() || self.month.is_some()
    }

    fn date_matches(&self, date: Option<NaiveDate>) -> bool {
        if !self.has_date_bounds() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        if self.since.is_some_and(|since| date < since) {
            return false;
        }
        if self.until.is_some_and(|until| date > until) {
            return false;
        }
        if self.month.is_some_and(|month| date.month() != month) {
            return false;
        }
        true
    }

    /// Contract rows have no financial type, so `financial_types` is not
    /// consulted here.
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        self.date_matches(record.date())
            && matches_any(&self.contract_types, &record.contract_type)
            && matches_any(&self.states, &record.state)
            && (self.regions.is_empty()
                || matches_any(&self.regions, region_for_state(&record.state)))
    }

    /// Billing rows carry no location; region and state selections do not
    /// apply to them.
    pub fn matches_billing(&self, record: &BillingRecord) -> bool {
        self.date_matches(record.date)
            && matches_any(&self.contract_types, &record.contract_type)
            && matches_any(&self.financial_types, &record.financial_type)
    }

    pub fn apply(&self, records: &[NormalizedRecord]) -> Vec<NormalizedRecord> {
        if self.is_empty() {
            return records.to_vec();
        }
        let kept: Vec<NormalizedRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();
        tracing::debug!(
            before = records.len(),
            after = kept.len(),
            "applied record filter"
        );
        kept
    }

    pub fn apply_billing(&self, records: &[BillingRecord]) -> Vec<BillingRecord> {
        records
            .iter()
            .filter(|r| self.matches_billing(r))
            .cloned()
            .collect()
    }
}

fn matches_any(allowed: &[String], value: &str) -> bool {
    allowed.is_empty()
        || allowed
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(day: Option<NaiveDate>, state: &str, contract_type: &str) -> NormalizedRecord {
        NormalizedRecord {
            timestamp: day.and_then(|d| d.and_hms_opt(9, 30, 0)),
            state: state.to_string(),
            contract_type: contract_type.to_string(),
            partner_name: "P".to_string(),
            ..NormalizedRecord::default()
        }
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let filter = RecordFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&record(None, "", "")));
        assert!(filter.matches(&record(Some(date(2024, 1, 1)), "SP", "POS")));
    }

    #[test]
    fn test_date_bounds_are_inclusive_and_need_timestamp() {
        let filter = RecordFilter {
            since: Some(date(2024, 7, 1)),
            until: Some(date(2024, 7, 31)),
            ..RecordFilter::default()
        };
        assert!(filter.matches(&record(Some(date(2024, 7, 1)), "", "")));
        assert!(filter.matches(&record(Some(date(2024, 7, 31)), "", "")));
        assert!(!filter.matches(&record(Some(date(2024, 8, 1)), "", "")));
        assert!(!filter.matches(&record(None, "", "")));
    }

    #[test]
    fn test_month_filter_spans_years() {
        let filter = RecordFilter {
            month: Some(3),
            ..RecordFilter::default()
        };
        assert!(filter.matches(&record(Some(date(2023, 3, 5)), "", "")));
        assert!(filter.matches(&record(Some(date(2024, 3, 9)), "", "")));
        assert!(!filter.matches(&record(Some(date(2024, 4, 9)), "", "")));
    }

    #[test]
    fn test_region_and_state_filters() {
        let filter = RecordFilter {
            regions: vec!["Sul".to_string()],
            ..RecordFilter::default()
        };
        assert!(filter.matches(&record(None, "RS", "")));
        assert!(!filter.matches(&record(None, "SP", "")));

        let filter = RecordFilter {
            states: vec!["sp".to_string(), "RJ".to_string()],
            contract_types: vec!["POS".to_string()],
            ..RecordFilter::default()
        };
        assert!(filter.matches(&record(None, "SP", "pos")));
        assert!(!filter.matches(&record(None, "SP", "NORMAL")));
        assert!(!filter.matches(&record(None, "MG", "POS")));
    }

    fn billing(contract_type: &str, financial_type: &str) -> BillingRecord {
        BillingRecord {
            value: Some(100.0),
            contract_type: contract_type.to_string(),
            financial_type: financial_type.to_string(),
            ..BillingRecord::default()
        }
    }

    #[test]
    fn test_billing_contract_type_reads_contract_column() {
        let filter = RecordFilter {
            contract_types: vec!["NORMAL".to_string()],
            ..RecordFilter::default()
        };
        assert!(filter.matches_billing(&billing("NORMAL", "TECNICO")));
        assert!(!filter.matches_billing(&billing("POS", "NORMAL")));
    }

    #[test]
    fn test_billing_financial_type_filter() {
        let filter = RecordFilter {
            financial_types: vec!["tecnico".to_string()],
            ..RecordFilter::default()
        };
        assert!(!filter.is_empty());
        assert!(filter.matches_billing(&billing("NORMAL", "TECNICO")));
        assert!(!filter.matches_billing(&billing("NORMAL", "POS")));
        assert!(filter.matches(&record(None, "SP", "NORMAL")));
    }

    #[test]
    fn test_billing_ignores_location_filters() {
        let filter = RecordFilter {
            states: vec!["SP".to_string()],
            ..RecordFilter::default()
        };
        assert!(filter.matches_billing(&billing("", "")));
    }

    #[test]
    fn test_apply_keeps_order() {
        let records = vec![
            record(None, "SP", ""),
            record(None, "RS", ""),
            record(None, "SC", ""),
        ];
        let filter = RecordFilter {
            regions: vec!["Sul".to_string()],
            ..RecordFilter::default()
        };
        let kept = filter.apply(&records);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].state, "RS");
        assert_eq!(kept[1].state, "SC");
    }
}
