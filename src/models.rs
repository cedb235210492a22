use crate::errors::InvalidEntityCode;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

const MAX_CODE_LEN: usize = 16;

/// Key of one countable entity, e.g. a country code. Always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityCode(String);

impl EntityCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidEntityCode> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = !code.is_empty()
            && code.len() <= MAX_CODE_LEN
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(InvalidEntityCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityCode {
    type Err = InvalidEntityCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityCode {
    type Error = InvalidEntityCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntityCode> for String {
    fn from(code: EntityCode) -> Self {
        code.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-entity counts plus their sum. `total` is only ever changed together
/// with `clicks`, so `total == clicks.values().sum()` after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CounterSnapshot {
    clicks: BTreeMap<EntityCode, u64>,
    total: u64,
}

impl CounterSnapshot {
    pub fn from_counts(clicks: BTreeMap<EntityCode, u64>) -> Self {
        let total = sum_counts(&clicks);
        Self { clicks, total }
    }

    pub fn clicks(&self) -> &BTreeMap<EntityCode, u64> {
        &self.clicks
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, entity: &EntityCode) -> u64 {
        self.clicks.get(entity).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }

    /// Adds one click and returns the entity's new count.
    pub fn increment(&mut self, entity: &EntityCode) -> u64 {
        let entry = self.clicks.entry(entity.clone()).or_default();
        *entry = entry.saturating_add(1);
        self.total = self.total.saturating_add(1);
        *entry
    }

    /// Overwrites one entity's count, shifting the total by the difference.
    /// Returns the previous count.
    pub fn set_count(&mut self, entity: &EntityCode, count: u64) -> u64 {
        let previous = self.clicks.insert(entity.clone(), count).unwrap_or_default();
        self.total = self.total.saturating_sub(previous).saturating_add(count);
        previous
    }

    /// True when the stored total agrees with the per-entity sum.
    pub fn is_consistent(&self) -> bool {
        self.total == sum_counts(&self.clicks)
    }

    /// Re-derives the total from the per-entity counts.
    pub fn recompute_total(&mut self) {
        self.total = sum_counts(&self.clicks);
    }
}

fn sum_counts(clicks: &BTreeMap<EntityCode, u64>) -> u64 {
    clicks.values().fold(0u64, |acc, value| acc.saturating_add(*value))
}

/// Success/failure wrapper used by the remote counter service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncrementReport {
    pub country_code: EntityCode,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub country_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickResponse {
    pub country_code: String,
    pub my_count: u64,
    pub my_total: u64,
    pub count: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedEntity {
    pub rank: usize,
    pub country_code: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountersResponse {
    pub my_total: u64,
    pub my_clicks: BTreeMap<String, u64>,
    pub total: u64,
    pub clicks: BTreeMap<String, u64>,
    pub carried_shortfall: u64,
    pub phase: String,
    pub top: Vec<RankedEntity>,
}
