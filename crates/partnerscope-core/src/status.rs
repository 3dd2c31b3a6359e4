//! Contract status vocabulary and the priority rule that collapses
//! duplicate records into a single resolved status.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Signed,
    Pending,
    Canceled,
}

/// Recognized raw tokens per status. A raw value maps to a status when it
/// contains one of these tokens after trimming and upper-casing.
///
/// Rows are checked top to bottom, so a value carrying both a signed and a
/// canceled token is read as signed.
pub const STATUS_SYNONYMS: &[(Status, &[&str])] = &[
    (Status::Signed, &["ASSINADO", "SIGNED"]),
    (Status::Canceled, &["CANCELADO", "CANCELED", "CANCELLED"]),
    (Status::Pending, &["AGUARDANDO", "PENDENTE", "PENDING", "AWAITING"]),
];

impl Status {
    pub const ALL: [Status; 3] = [Status::Signed, Status::Pending, Status::Canceled];

    /// Map a raw spreadsheet value onto a status, `None` when unrecognized.
    pub fn from_raw(raw: &str) -> Option<Status> {
        let value = raw.trim().to_uppercase();
        if value.is_empty() {
            return None;
        }
        STATUS_SYNONYMS
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|token| value.contains(token)))
            .map(|(status, _)| *status)
    }

    /// Precedence used when duplicates disagree: higher wins.
    pub fn priority(self) -> u8 {
        match self {
            Status::Signed => 2,
            Status::Pending => 1,
            Status::Canceled => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Signed => "SIGNED",
            Status::Pending => "PENDING",
            Status::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::from_raw(s).ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

/// Pick the highest-priority status among `statuses`, ignoring unrecognized
/// (`None`) values. Returns `None` only when nothing was recognized.
pub fn resolve_status<I>(statuses: I) -> Option<Status>
where
    I: IntoIterator<Item = Option<Status>>,
{
    statuses.into_iter().flatten().max_by_key(|s| s.priority())
}

/// Running per-status evidence for one partner.
///
/// Folding records into a tally and resolving at the end gives the same
/// answer as [`resolve_status`] regardless of arrival order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTally {
    pub signed: u32,
    pub pending: u32,
    pub canceled: u32,
    pub unknown: u32,
}

impl StatusTally {
    pub fn add(&mut self, status: Option<Status>) {
        match status {
            Some(Status::Signed) => self.signed = self.signed.saturating_add(1),
            Some(Status::Pending) => self.pending = self.pending.saturating_add(1),
            Some(Status::Canceled) => self.canceled = self.canceled.saturating_add(1),
            None => self.unknown = self.unknown.saturating_add(1),
        }
    }

    pub fn count(&self, status: Status) -> u32 {
        match status {
            Status::Signed => self.signed,
            Status::Pending => self.pending,
            Status::Canceled => self.canceled,
        }
    }

    /// Same precedence as [`resolve_status`], over the statuses seen so far.
    pub fn resolved(&self) -> Option<Status> {
        resolve_status(
            Status::ALL
                .iter()
                .map(|&status| (self.count(status) > 0).then_some(status)),
        )
    }

    pub fn total(&self) -> u32 {
        self.signed + self.pending + self.canceled + self.unknown
    }
}
