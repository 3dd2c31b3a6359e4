//! Calendar-anchored reporting windows.
//!
//! Every view scopes its time-based numbers through [`TimeWindow`], so a
//! "this week" count means the same Monday-to-Sunday span everywhere.

use crate::error::CoreError;
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Day,
    Week,
    Month,
    Quarter,
    Semester,
}

impl WindowKind {
    pub const ALL: [WindowKind; 5] = [
        WindowKind::Day,
        WindowKind::Week,
        WindowKind::Month,
        WindowKind::Quarter,
        WindowKind::Semester,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowKind::Day => "day",
            WindowKind::Week => "week",
            WindowKind::Month => "month",
            WindowKind::Quarter => "quarter",
            WindowKind::Semester => "semester",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "today" | "dia" => Ok(WindowKind::Day),
            "week" | "semana" => Ok(WindowKind::Week),
            "month" | "mes" | "mês" => Ok(WindowKind::Month),
            "quarter" | "trimestre" => Ok(WindowKind::Quarter),
            "semester" | "semiannual" | "half" | "semestre" => Ok(WindowKind::Semester),
            _ => Err(CoreError::UnknownWindowKind(s.to_string())),
        }
    }
}

/// A closed date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub kind: WindowKind,
    pub anchor: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// The window of `kind` that contains `anchor`.
    pub fn containing(kind: WindowKind, anchor: NaiveDate) -> TimeWindow {
        let (start, end) = match kind {
            WindowKind::Day => (anchor, anchor),
            WindowKind::Week => {
                let back = u64::from(anchor.weekday().num_days_from_monday());
                let start = anchor.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
                (start, add_days(start, 6))
            }
            WindowKind::Month => month_span(anchor.year(), anchor.month(), 1),
            WindowKind::Quarter => {
                let first_month = (anchor.month0() / 3) * 3 + 1;
                month_span(anchor.year(), first_month, 3)
            }
            WindowKind::Semester => {
                let first_month = if anchor.month() <= 6 { 1 } else { 7 };
                month_span(anchor.year(), first_month, 6)
            }
        };

        TimeWindow {
            kind,
            anchor,
            start,
            end,
        }
    }

    /// The window of the same kind immediately before this one.
    pub fn previous(&self) -> TimeWindow {
        let anchor = self.start.pred_opt().unwrap_or(self.start);
        TimeWindow::containing(self.kind, anchor)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Records without a timestamp never fall inside a window.
    pub fn contains_timestamp(&self, timestamp: Option<NaiveDateTime>) -> bool {
        timestamp.is_some_and(|ts| self.contains(ts.date()))
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn label(&self) -> String {
        match self.kind {
            WindowKind::Day => self.start.format("%Y-%m-%d").to_string(),
            WindowKind::Week => {
                let iso = self.start.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            WindowKind::Month => self.start.format("%Y-%m").to_string(),
            WindowKind::Quarter => {
                format!("{}-Q{}", self.start.year(), self.start.month0() / 3 + 1)
            }
            WindowKind::Semester => {
                format!("{}-S{}", self.start.year(), self.start.month0() / 6 + 1)
            }
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} .. {}]",
            self.label(),
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Bucket size for per-period series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    fn window_kind(self) -> WindowKind {
        match self {
            Granularity::Day => WindowKind::Day,
            Granularity::Week => WindowKind::Week,
            Granularity::Month => WindowKind::Month,
        }
    }

    /// The bucket window holding `date`.
    pub fn bucket(self, date: NaiveDate) -> TimeWindow {
        TimeWindow::containing(self.window_kind(), date)
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            _ => Err(CoreError::UnknownGranularity(s.to_string())),
        }
    }
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// `[first day of first_month, last day of first_month + months - 1]`,
/// clamped to chrono's supported range.
fn month_span(year: i32, first_month: u32, months: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, first_month, 1).unwrap_or(NaiveDate::MIN);
    let end = start
        .checked_add_months(Months::new(months))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (start, end)
}
