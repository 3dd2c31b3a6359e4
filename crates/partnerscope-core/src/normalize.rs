//! Field normalization for spreadsheet-exported contract rows.
//!
//! Raw rows arrive as loosely typed, column-ordered cells. Everything past this
//! module works on [`NormalizedRecord`], whose fields are already coerced,
//! trimmed and case-normalized. Normalization never fails: a cell that cannot
//! be interpreted becomes an empty sentinel and the record is kept.

use crate::regions::region_for_state;
use crate::status::Status;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Years outside this range are treated as typos rather than real dates.
pub const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1990..=2100;

/// Cell contents that spreadsheet exports emit for blank cells.
const NULL_ARTIFACTS: &[&str] = &["nan", "nat", "null", "none"];

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d/%m/%y", "%d-%m-%Y", "%d-%m-%y", "%d.%m.%Y", "%d.%m.%y", "%Y-%m-%d",
    "%Y/%m/%d",
];

/// One row as exported by the spreadsheet, cells kept in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Look up a cell by header. Exact matches win; otherwise headers are
    /// compared trimmed and case-insensitively.
    pub fn get(&self, column: &str) -> Option<&Value> {
        if let Some((_, v)) = self.fields.iter().find(|(k, _)| k == column) {
            return Some(v);
        }
        let wanted = column.trim().to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| k.trim().to_lowercase() == wanted)
            .map(|(_, v)| v)
    }

    /// The first cell of the row, whatever its header.
    pub fn first(&self) -> Option<&Value> {
        self.fields.first().map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for RawRecord {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            fields: map.into_iter().collect(),
        }
    }
}

/// Source column headers for contract rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    /// Header holding the partner name. `None` reads the first column.
    pub partner_name: Option<String>,
    pub timestamp: String,
    pub status: String,
    pub agent: String,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    pub contract_type: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            partner_name: None,
            timestamp: "TIMESTAMP".to_string(),
            status: "CONTRATO ASSINADO".to_string(),
            agent: "CAPTADOR".to_string(),
            state: "ESTADO".to_string(),
            city: "CIDADE".to_string(),
            postal_code: "CEP".to_string(),
            contract_type: "TIPO DE CONTRATO".to_string(),
        }
    }
}

/// A contract row in the fixed internal schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub status: Option<Status>,
    pub agent: Option<String>,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    pub contract_type: String,
    pub partner_name: String,
}

impl NormalizedRecord {
    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }

    pub fn region(&self) -> &'static str {
        region_for_state(&self.state)
    }
}

/// Render a cell as trimmed text. Null cells and export artifacts such as
/// `nan` become the empty string; integral floats lose their `.0`.
pub fn cell_text(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                        format!("{}", f as i64)
                    }
                    Some(f) => f.to_string(),
                    None => String::new(),
                }
            }
        }
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    };

    if NULL_ARTIFACTS.contains(&text.to_lowercase().as_str()) {
        String::new()
    } else {
        text
    }
}

/// Parse a spreadsheet date, day-first, with an optional time component.
///
/// Returns `None` for unparseable values and for years outside
/// [`PLAUSIBLE_YEARS`]; there is no month-first retry, so `07/25/2024` is
/// rejected instead of being silently reinterpreted.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        let naive = dt.naive_local();
        return PLAUSIBLE_YEARS.contains(&naive.year()).then_some(naive);
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            if PLAUSIBLE_YEARS.contains(&dt.year()) {
                return Some(dt);
            }
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            if PLAUSIBLE_YEARS.contains(&date.year()) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
    }

    None
}

/// Parse a calendar date typed by a person (CLI flags, config). Accepts ISO
/// and day-first forms.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|ts| ts.date())
}

/// Normalize one raw row. Never fails.
pub fn normalize_record(raw: &RawRecord, columns: &ColumnMap) -> NormalizedRecord {
    let partner_cell = match &columns.partner_name {
        Some(header) => raw.get(header),
        None => raw.first(),
    };

    let timestamp_text = cell_text(raw.get(&columns.timestamp));
    let timestamp = parse_timestamp(&timestamp_text);
    if timestamp.is_none() && !timestamp_text.is_empty() {
        tracing::trace!(value = %timestamp_text, "unparseable timestamp, using null");
    }

    let status_text = cell_text(raw.get(&columns.status));
    let status = Status::from_raw(&status_text);
    if status.is_none() && !status_text.is_empty() {
        tracing::trace!(value = %status_text, "unrecognized status, using null");
    }

    let agent = cell_text(raw.get(&columns.agent));

    NormalizedRecord {
        timestamp,
        status,
        agent: (!agent.is_empty()).then_some(agent),
        state: cell_text(raw.get(&columns.state)).to_uppercase(),
        city: cell_text(raw.get(&columns.city)),
        postal_code: cell_text(raw.get(&columns.postal_code)),
        contract_type: cell_text(raw.get(&columns.contract_type)),
        partner_name: cell_text(partner_cell),
    }
}

pub fn normalize_records(raws: &[RawRecord], columns: &ColumnMap) -> Vec<NormalizedRecord> {
    raws.iter().map(|raw| normalize_record(raw, columns)).collect()
}
