//! Canonical partner index
//!
//! Collapses normalized records into one entry per canonical key and exposes
//! the counting primitives every view reads from. The index is rebuilt from
//! the full record set on each call; it never patches a previous result.

use crate::error::CoreError;
use crate::identity::{resolve_key, CanonicalKey};
use crate::normalize::NormalizedRecord;
use crate::regions::{known_states, region_for_state};
use crate::status::{Status, StatusTally};
use crate::window::{Granularity, TimeWindow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Group label for entries whose dimension value is blank.
pub const NONE_LABEL: &str = "(none)";

/// Display attributes picked from the records behind one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeFields {
    pub partner_name: String,
    pub agent: Option<String>,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    pub contract_type: String,
    pub timestamp: Option<NaiveDateTime>,
}

impl RepresentativeFields {
    fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            partner_name: record.partner_name.clone(),
            agent: record.agent.clone(),
            state: record.state.clone(),
            city: record.city.clone(),
            postal_code: record.postal_code.clone(),
            contract_type: record.contract_type.clone(),
            timestamp: record.timestamp,
        }
    }

    /// Total order used to pick a representative independently of input
    /// order: earliest timestamp first (missing last), then field values.
    fn precedes(&self, other: &RepresentativeFields) -> bool {
        let rank = |f: &RepresentativeFields| {
            (
                f.timestamp.is_none(),
                f.timestamp,
                f.partner_name.clone(),
                f.agent.clone(),
                f.state.clone(),
                f.city.clone(),
                f.postal_code.clone(),
                f.contract_type.clone(),
            )
        };
        rank(self) < rank(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerEntry {
    pub key: CanonicalKey,
    pub resolved_status: Option<Status>,
    pub statuses: StatusTally,
    pub representative: RepresentativeFields,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
    /// Raw records collapsed into this entry. Diagnostic only.
    pub member_count: usize,
}

impl PartnerEntry {
    pub fn value_of(&self, dimension: Dimension) -> Option<String> {
        let rep = &self.representative;
        let value = match dimension {
            Dimension::Agent => rep.agent.clone().unwrap_or_default(),
            Dimension::State => rep.state.clone(),
            Dimension::City => rep.city.clone(),
            Dimension::ContractType => rep.contract_type.clone(),
            Dimension::Region => {
                if rep.state.is_empty() {
                    String::new()
                } else {
                    region_for_state(&rep.state).to_string()
                }
            }
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Attributes the index can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Agent,
    State,
    Region,
    City,
    ContractType,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Agent => "agent",
            Dimension::State => "state",
            Dimension::Region => "region",
            Dimension::City => "city",
            Dimension::ContractType => "contract-type",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "agent" | "captador" => Ok(Dimension::Agent),
            "state" | "estado" => Ok(Dimension::State),
            "region" | "regiao" | "região" => Ok(Dimension::Region),
            "city" | "cidade" => Ok(Dimension::City),
            "contract-type" | "contract" | "type" => Ok(Dimension::ContractType),
            _ => Err(CoreError::UnknownDimension(s.to_string())),
        }
    }
}

/// Entry counts per resolved status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub unique: usize,
    pub signed: usize,
    pub pending: usize,
    pub canceled: usize,
    pub unresolved: usize,
}

/// Unique partners counted in one period bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCount {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
}

/// Most partial matches a city lookup returns.
pub const CITY_SUGGESTION_LIMIT: usize = 5;

/// Outcome of looking a city up among signed partners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityLookup {
    pub query: String,
    /// States of signed partners whose city equals the query.
    pub exact_states: Vec<String>,
    /// Cities containing the query. Only filled when nothing matched exactly.
    pub suggestions: Vec<String>,
}

impl CityLookup {
    pub fn is_exact(&self) -> bool {
        !self.exact_states.is_empty()
    }

    pub fn is_miss(&self) -> bool {
        self.exact_states.is_empty() && self.suggestions.is_empty()
    }
}

/// States sharing the same number of partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBucket {
    pub partners: usize,
    pub state_count: usize,
    pub states: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerIndex {
    entries: BTreeMap<CanonicalKey, PartnerEntry>,
    record_count: usize,
}

impl PartnerIndex {
    /// Build the index in a single pass. The result depends only on the set
    /// of records, not on their order.
    pub fn build<'a, I>(records: I) -> PartnerIndex
    where
        I: IntoIterator<Item = &'a NormalizedRecord>,
    {
        let mut accumulators: BTreeMap<CanonicalKey, EntryAccumulator> = BTreeMap::new();
        let mut record_count = 0usize;

        for record in records {
            record_count += 1;
            accumulators
                .entry(resolve_key(record))
                .or_default()
                .add_record(record);
        }

        let entries: BTreeMap<CanonicalKey, PartnerEntry> = accumulators
            .into_iter()
            .map(|(key, acc)| {
                let entry = acc.into_entry(key.clone());
                (key, entry)
            })
            .collect();

        let index = PartnerIndex {
            entries,
            record_count,
        };

        tracing::debug!(
            records = index.record_count,
            entries = index.count_unique(),
            unidentified_records = index.unidentified().map_or(0, |e| e.member_count),
            "built partner index"
        );

        index
    }

    /// Build the index from only the records whose timestamp falls inside
    /// `window`. Records without a timestamp are left out.
    pub fn build_in_window<'a, I>(records: I, window: &TimeWindow) -> PartnerIndex
    where
        I: IntoIterator<Item = &'a NormalizedRecord>,
    {
        PartnerIndex::build(
            records
                .into_iter()
                .filter(|r| window.contains_timestamp(r.timestamp)),
        )
    }

    pub fn count_by_status(&self, status: Status) -> usize {
        self.entries
            .values()
            .filter(|e| e.resolved_status == Some(status))
            .count()
    }

    /// Every entry counts, including those without a resolved status and the
    /// unidentified bucket.
    pub fn count_unique(&self) -> usize {
        self.entries.len()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            unique: self.entries.len(),
            ..StatusCounts::default()
        };
        for entry in self.entries.values() {
            match entry.resolved_status {
                Some(Status::Signed) => counts.signed += 1,
                Some(Status::Pending) => counts.pending += 1,
                Some(Status::Canceled) => counts.canceled += 1,
                None => counts.unresolved += 1,
            }
        }
        counts
    }

    /// Unique entries per dimension value. Blank values group under
    /// [`NONE_LABEL`].
    pub fn group_by(&self, dimension: Dimension) -> BTreeMap<String, usize> {
        group_entries(self.entries.values(), dimension)
    }

    pub fn group_by_status(&self, dimension: Dimension, status: Status) -> BTreeMap<String, usize> {
        group_entries(
            self.entries
                .values()
                .filter(|e| e.resolved_status == Some(status)),
            dimension,
        )
    }

    /// Number of distinct non-blank values of `dimension`, optionally among
    /// entries with one resolved status.
    pub fn distinct_values(&self, dimension: Dimension, status: Option<Status>) -> usize {
        self.entries
            .values()
            .filter(|e| status.is_none() || e.resolved_status == status)
            .filter_map(|e| e.value_of(dimension))
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&PartnerEntry> {
        self.entries.get(key)
    }

    /// The shared bucket for records with no identity signal, if any.
    pub fn unidentified(&self) -> Option<&PartnerEntry> {
        self.entries.get(&CanonicalKey::Unidentified)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &PartnerEntry> {
        self.entries.values()
    }

    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &PartnerEntry> {
        self.entries
            .values()
            .filter(move |e| e.resolved_status == Some(status))
    }

    /// Look `query` up among signed entries. Matching trims and ignores
    /// case; partial matches are searched only when no city matches exactly.
    pub fn find_city(&self, query: &str) -> CityLookup {
        let needle = query.trim().to_lowercase();
        let mut lookup = CityLookup {
            query: query.trim().to_string(),
            ..CityLookup::default()
        };
        if needle.is_empty() {
            return lookup;
        }

        let signed: Vec<&RepresentativeFields> = self
            .with_status(Status::Signed)
            .map(|e| &e.representative)
            .filter(|rep| !rep.city.trim().is_empty())
            .collect();

        let exact: Vec<&RepresentativeFields> = signed
            .iter()
            .copied()
            .filter(|rep| rep.city.trim().to_lowercase() == needle)
            .collect();
        if !exact.is_empty() {
            let states: BTreeSet<String> = exact
                .iter()
                .map(|rep| {
                    if rep.state.is_empty() {
                        NONE_LABEL.to_string()
                    } else {
                        rep.state.clone()
                    }
                })
                .collect();
            lookup.exact_states = states.into_iter().collect();
            return lookup;
        }

        let suggestions: BTreeSet<String> = signed
            .iter()
            .filter(|rep| rep.city.trim().to_lowercase().contains(&needle))
            .map(|rep| rep.city.trim().to_string())
            .collect();
        lookup.suggestions = suggestions
            .into_iter()
            .take(CITY_SUGGESTION_LIMIT)
            .collect();
        lookup
    }

    /// How many states hold each partner count, among entries with
    /// `status`. Entries without a state are left out. Sorted by count.
    pub fn state_distribution(&self, status: Status) -> Vec<StateBucket> {
        let mut per_state: BTreeMap<String, usize> = BTreeMap::new();
        for entry in self.with_status(status) {
            if let Some(state) = entry.value_of(Dimension::State) {
                *per_state.entry(state).or_default() += 1;
            }
        }

        let mut buckets: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (state, partners) in per_state {
            buckets.entry(partners).or_default().push(state);
        }
        buckets
            .into_iter()
            .map(|(partners, states)| StateBucket {
                partners,
                state_count: states.len(),
                states,
            })
            .collect()
    }

    /// Known state codes with no entry of `status`.
    pub fn states_without(&self, status: Status) -> Vec<String> {
        let present: BTreeSet<String> = self
            .with_status(status)
            .filter_map(|e| e.value_of(Dimension::State))
            .map(|state| state.to_uppercase())
            .collect();
        known_states()
            .into_iter()
            .filter(|uf| !present.contains(*uf))
            .map(str::to_string)
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unique partners with resolved `status` per period bucket, built from a
/// separate index per bucket. Buckets without records are omitted; the
/// result is sorted by period.
pub fn period_series(
    records: &[NormalizedRecord],
    status: Status,
    granularity: Granularity,
) -> Vec<PeriodCount> {
    let mut buckets: BTreeMap<NaiveDate, (TimeWindow, Vec<&NormalizedRecord>)> = BTreeMap::new();

    for record in records {
        if let Some(date) = record.date() {
            let window = granularity.bucket(date);
            buckets
                .entry(window.start)
                .or_insert_with(|| (window, Vec::new()))
                .1
                .push(record);
        }
    }

    buckets
        .into_values()
        .map(|(window, members)| PeriodCount {
            label: window.label(),
            start: window.start,
            end: window.end,
            count: PartnerIndex::build(members).count_by_status(status),
        })
        .collect()
}

// =============================================================================
// Internal helpers
// =============================================================================

fn group_entries<'a, I>(entries: I, dimension: Dimension) -> BTreeMap<String, usize>
where
    I: Iterator<Item = &'a PartnerEntry>,
{
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        let label = entry
            .value_of(dimension)
            .unwrap_or_else(|| NONE_LABEL.to_string());
        *groups.entry(label).or_default() += 1;
    }
    groups
}

/// Per-key state while the pass is running. Keeps the best candidate for
/// each possible resolved status so the final pick needs no second pass.
#[derive(Default)]
struct EntryAccumulator {
    statuses: StatusTally,
    signed: Option<RepresentativeFields>,
    pending: Option<RepresentativeFields>,
    canceled: Option<RepresentativeFields>,
    unknown: Option<RepresentativeFields>,
    first_seen: Option<NaiveDateTime>,
    last_seen: Option<NaiveDateTime>,
    member_count: usize,
}

impl EntryAccumulator {
    fn add_record(&mut self, record: &NormalizedRecord) {
        self.statuses.add(record.status);
        self.member_count += 1;

        if let Some(ts) = record.timestamp {
            self.first_seen = Some(self.first_seen.map_or(ts, |cur| cur.min(ts)));
            self.last_seen = Some(self.last_seen.map_or(ts, |cur| cur.max(ts)));
        }

        let slot = match record.status {
            Some(Status::Signed) => &mut self.signed,
            Some(Status::Pending) => &mut self.pending,
            Some(Status::Canceled) => &mut self.canceled,
            None => &mut self.unknown,
        };
        let candidate = RepresentativeFields::from_record(record);
        let replace = match slot.as_ref() {
            Some(current) => candidate.precedes(current),
            None => true,
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    fn into_entry(self, key: CanonicalKey) -> PartnerEntry {
        let resolved_status = self.statuses.resolved();
        let representative = match resolved_status {
            Some(Status::Signed) => self.signed,
            Some(Status::Pending) => self.pending,
            Some(Status::Canceled) => self.canceled,
            None => self.unknown,
        }
        .unwrap_or_default();

        PartnerEntry {
            key,
            resolved_status,
            statuses: self.statuses,
            representative,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            member_count: self.member_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowKind;

    fn ts(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(10, 0, 0))
    }

    fn mock_record(name: &str, status: Option<Status>) -> NormalizedRecord {
        NormalizedRecord {
            partner_name: name.to_string(),
            status,
            ..NormalizedRecord::default()
        }
    }

    fn located(
        name: &str,
        status: Option<Status>,
        agent: &str,
        state: &str,
        timestamp: Option<NaiveDateTime>,
    ) -> NormalizedRecord {
        NormalizedRecord {
            partner_name: name.to_string(),
            status,
            agent: (!agent.is_empty()).then(|| agent.to_string()),
            state: state.to_string(),
            timestamp,
            ..NormalizedRecord::default()
        }
    }

    fn name_key(name: &str) -> CanonicalKey {
        CanonicalKey::Name {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_build_empty() {
        let index = PartnerIndex::build(&Vec::<NormalizedRecord>::new());
        assert!(index.is_empty());
        assert_eq!(index.count_unique(), 0);
        assert_eq!(index.count_by_status(Status::Signed), 0);
        assert!(index.group_by(Dimension::Agent).is_empty());
        assert!(index.unidentified().is_none());
        assert_eq!(index.status_counts(), StatusCounts::default());
    }

    #[test]
    fn test_reference_scenario() {
        let records = vec![
            mock_record("A", Some(Status::Signed)),
            mock_record("A", Some(Status::Canceled)),
            NormalizedRecord {
                postal_code: "12345".to_string(),
                status: Some(Status::Pending),
                ..NormalizedRecord::default()
            },
        ];

        let index = PartnerIndex::build(&records);
        assert_eq!(index.count_unique(), 2);
        assert_eq!(
            index.get(&name_key("a")).and_then(|e| e.resolved_status),
            Some(Status::Signed)
        );
        assert_eq!(
            index
                .get(&CanonicalKey::PostalCode {
                    code: "12345".to_string()
                })
                .and_then(|e| e.resolved_status),
            Some(Status::Pending)
        );
        assert_eq!(index.count_by_status(Status::Signed), 1);
        assert_eq!(index.count_by_status(Status::Pending), 1);
        assert_eq!(index.count_by_status(Status::Canceled), 0);
        assert_eq!(index.record_count(), 3);
    }

    #[test]
    fn test_signed_outranks_any_number_of_other_statuses() {
        let mut records = vec![mock_record("acme", Some(Status::Signed))];
        for _ in 0..20 {
            records.push(mock_record("ACME", Some(Status::Canceled)));
            records.push(mock_record("Acme", Some(Status::Pending)));
            records.push(mock_record("acme", None));
        }

        let index = PartnerIndex::build(&records);
        let entry = index.get(&name_key("acme")).unwrap();
        assert_eq!(entry.resolved_status, Some(Status::Signed));
        assert_eq!(entry.member_count, 61);
        assert_eq!(entry.statuses.canceled, 20);
        assert_eq!(entry.statuses.unknown, 20);
    }

    #[test]
    fn test_unresolved_entries_count_as_unique_only() {
        let records = vec![
            mock_record("A", None),
            mock_record("B", Some(Status::Signed)),
        ];
        let index = PartnerIndex::build(&records);
        assert_eq!(index.count_unique(), 2);
        assert_eq!(index.count_by_status(Status::Signed), 1);
        assert_eq!(index.status_counts().unresolved, 1);
    }

    #[test]
    fn test_count_unique_ignores_raw_volume() {
        let names = ["a", "b", "c", "d", "e", "f", "g"];
        let records: Vec<NormalizedRecord> = (0..100)
            .map(|i| mock_record(names[i % names.len()], Some(Status::Pending)))
            .collect();
        let index = PartnerIndex::build(&records);
        assert_eq!(index.count_unique(), 7);
        assert_eq!(index.record_count(), 100);
    }

    #[test]
    fn test_unidentified_bucket_is_shared_and_visible() {
        let records = vec![
            mock_record("", Some(Status::Signed)),
            mock_record("  ", Some(Status::Canceled)),
            mock_record("", None),
            mock_record("Real", Some(Status::Signed)),
        ];
        let index = PartnerIndex::build(&records);
        let bucket = index.unidentified().unwrap();
        assert_eq!(bucket.member_count, 3);
        assert_eq!(bucket.resolved_status, Some(Status::Signed));
        assert_eq!(index.count_unique(), 2);
    }

    #[test]
    fn test_order_independence_over_permutations() {
        let records = vec![
            located("A", Some(Status::Signed), "Ana", "SP", ts(2024, 7, 9)),
            located("a", Some(Status::Canceled), "Bruno", "RJ", ts(2024, 7, 1)),
            located("A", Some(Status::Signed), "Carla", "MG", ts(2024, 7, 2)),
            located("B", None, "Ana", "", None),
            located("B", Some(Status::Pending), "", "PR", ts(2024, 6, 3)),
            located("", Some(Status::Canceled), "Bruno", "SP", ts(2024, 5, 1)),
            located("C", Some(Status::Pending), "Ana", "BA", None),
            located("C", Some(Status::Pending), "Bruno", "BA", None),
        ];
        let expected = PartnerIndex::build(&records);

        for shift in 0..records.len() {
            let mut rotated = records.clone();
            rotated.rotate_left(shift);
            assert_eq!(PartnerIndex::build(&rotated), expected);
            rotated.reverse();
            assert_eq!(PartnerIndex::build(&rotated), expected);
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let records = vec![
            located("A", Some(Status::Signed), "Ana", "SP", ts(2024, 7, 9)),
            located("B", Some(Status::Pending), "Bruno", "RJ", None),
        ];
        assert_eq!(PartnerIndex::build(&records), PartnerIndex::build(&records));
    }

    #[test]
    fn test_representative_prefers_resolved_status_then_earliest() {
        let records = vec![
            located("A", Some(Status::Canceled), "Zeca", "RS", ts(2024, 1, 1)),
            located("A", Some(Status::Signed), "Ana", "SP", ts(2024, 7, 9)),
            located("A", Some(Status::Signed), "Carla", "MG", ts(2024, 7, 2)),
        ];
        let index = PartnerIndex::build(&records);
        let entry = index.get(&name_key("a")).unwrap();
        assert_eq!(entry.representative.agent.as_deref(), Some("Carla"));
        assert_eq!(entry.representative.state, "MG");
        assert_eq!(entry.first_seen, ts(2024, 1, 1));
        assert_eq!(entry.last_seen, ts(2024, 7, 9));
    }

    #[test]
    fn test_group_by_counts_entries_not_records() {
        let mut records = Vec::new();
        for _ in 0..5 {
            records.push(located("A", Some(Status::Signed), "Ana", "SP", ts(2024, 7, 9)));
        }
        records.push(located("B", Some(Status::Signed), "Ana", "RJ", ts(2024, 7, 9)));
        records.push(located("C", Some(Status::Pending), "", "AM", ts(2024, 7, 9)));

        let index = PartnerIndex::build(&records);
        let by_agent = index.group_by(Dimension::Agent);
        assert_eq!(by_agent.get("Ana"), Some(&2));
        assert_eq!(by_agent.get(NONE_LABEL), Some(&1));

        let by_region = index.group_by(Dimension::Region);
        assert_eq!(by_region.get("Sudeste"), Some(&2));
        assert_eq!(by_region.get("Norte"), Some(&1));

        let signed_by_state = index.group_by_status(Dimension::State, Status::Signed);
        assert_eq!(signed_by_state.len(), 2);
        assert_eq!(signed_by_state.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_distinct_values() {
        let records = vec![
            located("A", Some(Status::Signed), "Ana", "SP", None),
            located("B", Some(Status::Signed), "Ana", "SP", None),
            located("C", Some(Status::Signed), "Ana", "", None),
            located("D", Some(Status::Pending), "Ana", "RJ", None),
        ];
        let index = PartnerIndex::build(&records);
        assert_eq!(index.distinct_values(Dimension::State, Some(Status::Signed)), 1);
        assert_eq!(index.distinct_values(Dimension::State, None), 2);
        assert_eq!(index.distinct_values(Dimension::Region, None), 1);
    }

    #[test]
    fn test_build_in_window_excludes_null_timestamps() {
        let records = vec![
            located("A", Some(Status::Signed), "", "", ts(2024, 7, 10)),
            located("B", Some(Status::Signed), "", "", None),
            located("C", Some(Status::Signed), "", "", ts(2024, 7, 15)),
        ];
        let window = TimeWindow::containing(
            WindowKind::Week,
            NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(),
        );

        let windowed = PartnerIndex::build_in_window(&records, &window);
        assert_eq!(windowed.count_unique(), 1);
        assert_eq!(PartnerIndex::build(&records).count_unique(), 3);
    }

    #[test]
    fn test_period_series_counts_unique_partners_per_month() {
        let records = vec![
            located("A", Some(Status::Signed), "", "", ts(2024, 6, 1)),
            located("A", Some(Status::Signed), "", "", ts(2024, 6, 20)),
            located("B", Some(Status::Signed), "", "", ts(2024, 6, 5)),
            located("B", Some(Status::Signed), "", "", ts(2024, 7, 5)),
            located("C", Some(Status::Pending), "", "", ts(2024, 7, 6)),
            located("D", Some(Status::Signed), "", "", None),
        ];

        let series = period_series(&records, Status::Signed, Granularity::Month);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "2024-06");
        assert_eq!(series[0].count, 2);
        assert_eq!(series[1].label, "2024-07");
        assert_eq!(series[1].count, 1);
    }

    fn in_city(name: &str, status: Status, city: &str, state: &str) -> NormalizedRecord {
        NormalizedRecord {
            partner_name: name.to_string(),
            status: Some(status),
            city: city.to_string(),
            state: state.to_string(),
            ..NormalizedRecord::default()
        }
    }

    fn city_index() -> PartnerIndex {
        let records = vec![
            in_city("Polo Santos", Status::Signed, "Santos", "SP"),
            in_city("Polo Santos MG", Status::Signed, "santos ", "MG"),
            in_city("Polo Santo Andre", Status::Signed, "Santo André", "SP"),
            in_city("Polo Santana", Status::Signed, "Santana", "AP"),
            in_city("Polo Campinas", Status::Pending, "Campinas", "SP"),
        ];
        PartnerIndex::build(&records)
    }

    #[test]
    fn test_find_city_exact_is_case_insensitive() {
        let lookup = city_index().find_city("  SANTOS ");
        assert!(lookup.is_exact());
        assert_eq!(lookup.query, "SANTOS");
        assert_eq!(lookup.exact_states, vec!["MG".to_string(), "SP".to_string()]);
        assert!(lookup.suggestions.is_empty());
    }

    #[test]
    fn test_find_city_partial_suggestions() {
        let lookup = city_index().find_city("sant");
        assert!(!lookup.is_exact());
        assert!(!lookup.is_miss());
        assert_eq!(
            lookup.suggestions,
            vec!["Santana", "Santo André", "Santos", "santos"]
        );
    }

    #[test]
    fn test_find_city_limits_suggestions() {
        let records: Vec<NormalizedRecord> = (0..8)
            .map(|i| in_city(&format!("Polo {i}"), Status::Signed, &format!("Vila {i}"), "SP"))
            .collect();
        let lookup = PartnerIndex::build(&records).find_city("vila");
        assert_eq!(lookup.suggestions.len(), CITY_SUGGESTION_LIMIT);
        assert_eq!(lookup.suggestions[0], "Vila 0");
    }

    #[test]
    fn test_find_city_only_searches_signed() {
        let index = city_index();
        assert!(index.find_city("Campinas").is_miss());
        assert!(index.find_city("Recife").is_miss());
        assert!(index.find_city("   ").is_miss());
    }

    #[test]
    fn test_state_distribution_groups_states_by_count() {
        let index = city_index();
        let buckets = index.state_distribution(Status::Signed);
        assert_eq!(
            buckets,
            vec![
                StateBucket {
                    partners: 1,
                    state_count: 2,
                    states: vec!["AP".to_string(), "MG".to_string()],
                },
                StateBucket {
                    partners: 2,
                    state_count: 1,
                    states: vec!["SP".to_string()],
                },
            ]
        );

        let missing = index.states_without(Status::Signed);
        assert_eq!(missing.len(), 24);
        assert!(missing.contains(&"RS".to_string()));
        assert!(!missing.contains(&"SP".to_string()));
    }

    #[test]
    fn test_dimension_parsing() {
        assert_eq!("agent".parse::<Dimension>(), Ok(Dimension::Agent));
        assert_eq!("contract_type".parse::<Dimension>(), Ok(Dimension::ContractType));
        assert_eq!("Estado".parse::<Dimension>(), Ok(Dimension::State));
        assert!("color".parse::<Dimension>().is_err());
    }
}
