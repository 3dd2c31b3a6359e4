//! Canonical partner identity.
//!
//! Every record gets exactly one [`CanonicalKey`], taken from the first usable
//! candidate in this order:
//! 1. partner name (case-folded, whitespace collapsed)
//! 2. postal code (case-folded, separators removed)
//! 3. city + state, when both are present
//! 4. the shared [`CanonicalKey::Unidentified`] bucket
//!
//! The unidentified bucket merges every record with no identity signal into a
//! single entry. Counts that include it over-merge those rows, which is why the
//! index reports it separately.

use crate::normalize::NormalizedRecord;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalKey {
    Name { name: String },
    PostalCode { code: String },
    Locality { city: String, state: String },
    Unidentified,
}

impl CanonicalKey {
    pub fn is_unidentified(&self) -> bool {
        matches!(self, CanonicalKey::Unidentified)
    }

    /// Key built from a partner name alone, as billing rows only carry a name.
    pub fn from_name(name: &str) -> CanonicalKey {
        let name = fold(name);
        if name.is_empty() {
            CanonicalKey::Unidentified
        } else {
            CanonicalKey::Name { name }
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalKey::Name { name } => f.write_str(name),
            CanonicalKey::PostalCode { code } => f.write_str(code),
            CanonicalKey::Locality { city, state } => write!(f, "{}|{}", city, state),
            CanonicalKey::Unidentified => f.write_str("(unidentified)"),
        }
    }
}

/// Lower-case and collapse internal whitespace runs to one space.
pub fn fold(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn fold_postal_code(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '.')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Derive the canonical key for a record. Total: always returns a key.
pub fn resolve_key(record: &NormalizedRecord) -> CanonicalKey {
    let name = fold(&record.partner_name);
    if !name.is_empty() {
        return CanonicalKey::Name { name };
    }

    let code = fold_postal_code(&record.postal_code);
    if !code.is_empty() {
        return CanonicalKey::PostalCode { code };
    }

    let city = fold(&record.city);
    let state = fold(&record.state);
    if !city.is_empty() && !state.is_empty() {
        return CanonicalKey::Locality { city, state };
    }

    CanonicalKey::Unidentified
}
