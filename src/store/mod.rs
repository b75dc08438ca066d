//! Store Module
//!
//! The key-value backend the engine writes through.
//!
//! ## Record Types
//! ```text
//! ┌────────────┬───────────────────────────────────────────────┐
//! │ Value      │ opaque bytes (entity documents, single edges) │
//! │ Set        │ unordered unique strings (buckets, ref tables)│
//! │ Sorted set │ unique strings ordered by score               │
//! └────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! Stores own their consistency; the engine assumes nothing beyond
//! per-call atomicity.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{normalise_range, MemoryStore, SortedSet, StoredValue};

use std::cmp::Ordering;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::FieldValue;
use crate::error::Result;
use crate::query::Direction;

/// Key-value backend used by the engine
///
/// Accessing a key through an operation of the wrong record type is an
/// error. Collections that become empty cease to exist.
pub trait KeyValueStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    /// Get a value by key
    fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Set a value, replacing any record under the key
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete any record under the key (no-op if absent)
    fn delete(&self, key: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Sets
    // -------------------------------------------------------------------------

    /// Members of a set; empty if the key does not exist
    fn set_members(&self, key: &str) -> Result<Vec<String>>;

    fn set_add(&self, key: &str, member: &str) -> Result<()>;

    fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Sorted Sets
    // -------------------------------------------------------------------------

    /// Insert a member or move it to a new score
    fn sorted_set_upsert(&self, key: &str, member: &str, score: SortScore) -> Result<()>;

    fn sorted_set_remove(&self, key: &str, member: &str) -> Result<()>;

    /// Current score of a member
    fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<SortScore>>;

    /// Members by rank, `start` and `end` inclusive
    ///
    /// Negative positions count from the end (`-1` is the last member).
    fn sorted_set_range(
        &self,
        key: &str,
        start: i64,
        end: i64,
        direction: Direction,
    ) -> Result<Vec<String>>;

    fn sorted_set_len(&self, key: &str) -> Result<usize>;
}

// =============================================================================
// Sort Scores
// =============================================================================

/// Score of a sorted set member
///
/// Numbers order before text; numbers use IEEE total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SortScore {
    Number(f64),
    Text(String),
}

impl SortScore {
    /// Score for a column value; `None` for null and non-scalar values
    pub fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(i) => Some(SortScore::Number(*i as f64)),
            FieldValue::Decimal(d) => Some(SortScore::Number(*d)),
            FieldValue::Bool(b) => Some(SortScore::Number(if *b { 1.0 } else { 0.0 })),
            FieldValue::DateTime(dt) => Some(SortScore::Number(
                dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9,
            )),
            FieldValue::String(s) => Some(SortScore::Text(s.clone())),
            FieldValue::Null | FieldValue::Set(_) | FieldValue::Object(_) => None,
        }
    }
}

impl PartialEq for SortScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortScore {}

impl PartialOrd for SortScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortScore {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortScore::Number(a), SortScore::Number(b)) => a.total_cmp(b),
            (SortScore::Text(a), SortScore::Text(b)) => a.cmp(b),
            (SortScore::Number(_), SortScore::Text(_)) => Ordering::Less,
            (SortScore::Text(_), SortScore::Number(_)) => Ordering::Greater,
        }
    }
}

impl From<f64> for SortScore {
    fn from(value: f64) -> Self {
        SortScore::Number(value)
    }
}

impl From<&str> for SortScore {
    fn from(value: &str) -> Self {
        SortScore::Text(value.to_string())
    }
}
