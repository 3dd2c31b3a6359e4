//! Billing rows and the revenue views built on them.

use crate::identity::CanonicalKey;
use crate::normalize::{cell_text, parse_timestamp, RawRecord};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Share of the post-partner remainder paid to the internal team.
pub const DEFAULT_TEAM_COMMISSION_RATE: f64 = 0.13;

/// Source column headers for billing rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingColumnMap {
    /// Header holding the partner name. `None` reads the first column.
    pub partner_name: Option<String>,
    pub value: String,
    pub commission: String,
    pub date: String,
    pub financial_type: String,
    pub contract_type: String,
}

impl Default for BillingColumnMap {
    fn default() -> Self {
        Self {
            partner_name: None,
            value: "VALOR".to_string(),
            commission: "COMISSÃO".to_string(),
            date: "DATA".to_string(),
            financial_type: "TIPO".to_string(),
            contract_type: "TIPO DE CONTRATO".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    /// `None` when the cell is not a number; such rows add nothing to sums.
    pub value: Option<f64>,
    /// Fraction, already divided by 100.
    pub commission_rate: f64,
    pub date: Option<NaiveDate>,
    pub financial_type: String,
    pub contract_type: String,
    pub partner_name: String,
}

/// Parse a number that may use a comma as decimal separator.
pub fn to_float_any(value: Option<&Value>) -> Option<f64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        _ => {
            let text = cell_text(value);
            text.replace(',', ".").parse::<f64>().ok()
        }
    };
    parsed.filter(|f| f.is_finite())
}

pub fn normalize_billing_record(raw: &RawRecord, columns: &BillingColumnMap) -> BillingRecord {
    let partner_cell = match &columns.partner_name {
        Some(header) => raw.get(header),
        None => raw.first(),
    };

    let value = to_float_any(raw.get(&columns.value));
    if value.is_none() {
        tracing::trace!(column = %columns.value, "billing value is not a number");
    }

    BillingRecord {
        value,
        commission_rate: to_float_any(raw.get(&columns.commission)).map_or(0.0, |p| p / 100.0),
        date: parse_timestamp(&cell_text(raw.get(&columns.date))).map(|ts| ts.date()),
        financial_type: cell_text(raw.get(&columns.financial_type)).to_uppercase(),
        contract_type: cell_text(raw.get(&columns.contract_type)),
        partner_name: cell_text(partner_cell),
    }
}

pub fn normalize_billing_records(
    raws: &[RawRecord],
    columns: &BillingColumnMap,
) -> Vec<BillingRecord> {
    raws.iter()
        .map(|raw| normalize_billing_record(raw, columns))
        .collect()
}

/// Revenue split into partner commission, team commission and net.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total: f64,
    pub partner_commission: f64,
    pub team_commission: f64,
    pub net: f64,
    pub team_rate: f64,
}

impl FinancialSummary {
    pub fn from_records(records: &[BillingRecord], team_rate: f64) -> Self {
        let (total, partner_commission) = records
            .iter()
            .filter_map(|r| r.value.map(|v| (v, v * r.commission_rate)))
            .fold((0.0, 0.0), |(t, p), (v, c)| (t + v, p + c));
        Self::from_totals(total, partner_commission, team_rate)
    }

    fn from_totals(total: f64, partner_commission: f64, team_rate: f64) -> Self {
        let team_commission = team_rate * (total - partner_commission);
        Self {
            total,
            partner_commission,
            team_commission,
            net: total - partner_commission - team_commission,
            team_rate,
        }
    }

    /// Weighted partner commission rate over all revenue.
    pub fn average_commission_rate(&self) -> f64 {
        if self.total > 0.0 {
            self.partner_commission / self.total
        } else {
            0.0
        }
    }

    /// Summary after `additional` revenue at the average commission rate.
    pub fn simulate(&self, additional: f64) -> Self {
        Self::from_totals(
            self.total + additional,
            self.partner_commission + additional * self.average_commission_rate(),
            self.team_rate,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total: f64,
}

impl MonthlyTotal {
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

pub fn daily_totals(records: &[BillingRecord]) -> Vec<DailyTotal> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        if let (Some(date), Some(value)) = (record.date, record.value) {
            *days.entry(date).or_default() += value;
        }
    }
    days.into_iter()
        .map(|(date, total)| DailyTotal { date, total })
        .collect()
}

pub fn monthly_totals(records: &[BillingRecord]) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in records {
        if let (Some(date), Some(value)) = (record.date, record.value) {
            *months.entry((date.year(), date.month())).or_default() += value;
        }
    }
    months
        .into_iter()
        .map(|((year, month), total)| MonthlyTotal { year, month, total })
        .collect()
}

/// Revenue for one calendar month.
pub fn month_revenue(records: &[BillingRecord], year: i32, month: u32) -> f64 {
    records
        .iter()
        .filter(|r| r.date.is_some_and(|d| d.year() == year && d.month() == month))
        .filter_map(|r| r.value)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSales {
    pub key: CanonicalKey,
    /// Smallest raw spelling among the merged rows.
    pub display_name: String,
    pub sales: usize,
    pub revenue: f64,
}

/// Sales count and revenue per partner, most sales first. Rows without a
/// usable partner name are left out; rows with a non-numeric value count
/// towards neither figure.
pub fn partner_ranking(records: &[BillingRecord]) -> Vec<PartnerSales> {
    let mut partners: BTreeMap<CanonicalKey, PartnerSales> = BTreeMap::new();

    for record in records {
        let key = CanonicalKey::from_name(&record.partner_name);
        if key.is_unidentified() {
            continue;
        }
        let entry = partners.entry(key.clone()).or_insert_with(|| PartnerSales {
            key,
            display_name: record.partner_name.clone(),
            sales: 0,
            revenue: 0.0,
        });
        if record.partner_name < entry.display_name {
            entry.display_name = record.partner_name.clone();
        }
        if let Some(value) = record.value {
            entry.sales += 1;
            entry.revenue += value;
        }
    }

    let mut ranking: Vec<PartnerSales> = partners.into_values().collect();
    ranking.sort_by(|a, b| {
        b.sales
            .cmp(&a.sales)
            .then_with(|| b.revenue.total_cmp(&a.revenue))
            .then_with(|| a.key.cmp(&b.key))
    });
    ranking
}
