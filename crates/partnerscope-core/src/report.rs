//! Dashboard-level views assembled from the partner index and billing rows.

use crate::aggregator::{
    period_series, Dimension, PartnerIndex, PeriodCount, StateBucket, StatusCounts,
};
use crate::billing::{
    daily_totals, month_revenue, monthly_totals, partner_ranking, BillingRecord, DailyTotal,
    FinancialSummary, MonthlyTotal, PartnerSales,
};
use crate::normalize::NormalizedRecord;
use crate::status::Status;
use crate::window::{Granularity, TimeWindow, WindowKind};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current period against the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current: f64,
    pub previous: f64,
    pub difference: f64,
    /// `current / previous * 100`, absent when there is no previous volume.
    pub progress_pct: Option<f64>,
}

impl PeriodComparison {
    pub fn new(current: f64, previous: f64) -> Self {
        Self {
            current,
            previous,
            difference: current - previous,
            progress_pct: (previous > 0.0).then(|| current / previous * 100.0),
        }
    }

    pub fn from_counts(current: usize, previous: usize) -> Self {
        Self::new(current as f64, previous as f64)
    }

    pub fn is_ahead(&self) -> bool {
        self.difference > 0.0
    }
}

/// Signed-partner targets per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goals {
    pub monthly: u32,
    pub quarterly: u32,
    pub semiannual: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            monthly: 30,
            quarterly: 90,
            semiannual: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub label: String,
    pub achieved: usize,
    pub target: u32,
    pub ratio: Option<f64>,
}

impl GoalProgress {
    pub fn new(label: impl Into<String>, achieved: usize, target: u32) -> Self {
        Self {
            label: label.into(),
            achieved,
            target,
            ratio: (target > 0).then(|| achieved as f64 / f64::from(target)),
        }
    }

    pub fn is_met(&self) -> bool {
        self.achieved as u64 >= u64::from(self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCount {
    pub kind: WindowKind,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub signed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub goals: Goals,
    pub series: Granularity,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            goals: Goals::default(),
            series: Granularity::Month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractReport {
    pub as_of: NaiveDate,
    pub record_count: usize,
    pub counts: StatusCounts,
    pub unidentified_records: usize,
    pub windows: Vec<WindowCount>,
    pub week_over_week: PeriodComparison,
    pub month_over_month: PeriodComparison,
    pub goals: Vec<GoalProgress>,
    pub signed_by_agent: BTreeMap<String, usize>,
    pub signed_by_state: BTreeMap<String, usize>,
    pub signed_by_region: BTreeMap<String, usize>,
    pub signed_states: usize,
    pub signed_cities: usize,
    /// How many states have one signed partner, two, and so on.
    pub signed_state_distribution: Vec<StateBucket>,
    pub states_without_signed: Vec<String>,
    pub signed_series: Vec<PeriodCount>,
}

impl ContractReport {
    pub fn build(records: &[NormalizedRecord], as_of: NaiveDate, options: &ReportOptions) -> Self {
        let index = PartnerIndex::build(records);

        let signed_in = |window: &TimeWindow| {
            PartnerIndex::build_in_window(records, window).count_by_status(Status::Signed)
        };

        let windows: Vec<WindowCount> = WindowKind::ALL
            .iter()
            .map(|&kind| {
                let window = TimeWindow::containing(kind, as_of);
                WindowCount {
                    kind,
                    label: window.label(),
                    start: window.start,
                    end: window.end,
                    signed: signed_in(&window),
                }
            })
            .collect();

        let count_for = |kind: WindowKind| {
            windows
                .iter()
                .find(|w| w.kind == kind)
                .map_or(0, |w| w.signed)
        };

        let week = TimeWindow::containing(WindowKind::Week, as_of);
        let month = TimeWindow::containing(WindowKind::Month, as_of);
        let week_over_week =
            PeriodComparison::from_counts(count_for(WindowKind::Week), signed_in(&week.previous()));
        let month_over_month = PeriodComparison::from_counts(
            count_for(WindowKind::Month),
            signed_in(&month.previous()),
        );

        let goals = vec![
            GoalProgress::new("monthly", count_for(WindowKind::Month), options.goals.monthly),
            GoalProgress::new(
                "quarterly",
                count_for(WindowKind::Quarter),
                options.goals.quarterly,
            ),
            GoalProgress::new(
                "semiannual",
                count_for(WindowKind::Semester),
                options.goals.semiannual,
            ),
        ];

        let report = ContractReport {
            as_of,
            record_count: records.len(),
            counts: index.status_counts(),
            unidentified_records: index.unidentified().map_or(0, |e| e.member_count),
            windows,
            week_over_week,
            month_over_month,
            goals,
            signed_by_agent: index.group_by_status(Dimension::Agent, Status::Signed),
            signed_by_state: index.group_by_status(Dimension::State, Status::Signed),
            signed_by_region: index.group_by_status(Dimension::Region, Status::Signed),
            signed_states: index.distinct_values(Dimension::State, Some(Status::Signed)),
            signed_cities: index.distinct_values(Dimension::City, Some(Status::Signed)),
            signed_state_distribution: index.state_distribution(Status::Signed),
            states_without_signed: index.states_without(Status::Signed),
            signed_series: period_series(records, Status::Signed, options.series),
        };

        tracing::debug!(
            as_of = %as_of,
            records = report.record_count,
            unique = report.counts.unique,
            signed = report.counts.signed,
            "built contract report"
        );

        report
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingReport {
    pub as_of: NaiveDate,
    pub summary: FinancialSummary,
    pub simulated: Option<FinancialSummary>,
    pub month_over_month: PeriodComparison,
    pub daily: Vec<DailyTotal>,
    pub monthly: Vec<MonthlyTotal>,
    pub ranking: Vec<PartnerSales>,
}

impl BillingReport {
    /// `records` feed every view except the month-over-month comparison,
    /// which reads `history` so filters do not hide the previous month.
    pub fn build(
        records: &[BillingRecord],
        history: &[BillingRecord],
        as_of: NaiveDate,
        team_rate: f64,
        simulate: Option<f64>,
    ) -> Self {
        let summary = FinancialSummary::from_records(records, team_rate);
        let previous = TimeWindow::containing(WindowKind::Month, as_of).previous().start;

        BillingReport {
            as_of,
            summary,
            simulated: simulate.map(|extra| summary.simulate(extra)),
            month_over_month: PeriodComparison::new(
                month_revenue(history, as_of.year(), as_of.month()),
                month_revenue(history, previous.year(), previous.month()),
            ),
            daily: daily_totals(records),
            monthly: monthly_totals(records),
            ranking: partner_ranking(records),
        }
    }
}
