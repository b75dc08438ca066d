//! In-memory store
//!
//! BTreeMap-based store behind a RwLock, so keys iterate in order and
//! reads run concurrently.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{OrmError, Result};
use crate::query::Direction;

use super::{KeyValueStore, SortScore};

/// A record held under one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Value(Bytes),
    Set(BTreeSet<String>),
    SortedSet(SortedSet),
}

impl StoredValue {
    fn type_name(&self) -> &'static str {
        match self {
            StoredValue::Value(_) => "value",
            StoredValue::Set(_) => "set",
            StoredValue::SortedSet(_) => "sorted set",
        }
    }
}

/// Members with scores, kept in score order
///
/// Ties are broken by member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, SortScore)>", into = "Vec<(String, SortScore)>")]
pub struct SortedSet {
    scores: HashMap<String, SortScore>,
    ordered: BTreeSet<(SortScore, String)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or rescore a member; returns the previous score
    pub fn upsert(&mut self, member: &str, score: SortScore) -> Option<SortScore> {
        let previous = self.scores.insert(member.to_string(), score.clone());
        if let Some(old) = &previous {
            self.ordered.remove(&(old.clone(), member.to_string()));
        }
        self.ordered.insert((score, member.to_string()));
        previous
    }

    pub fn remove(&mut self, member: &str) -> Option<SortScore> {
        let score = self.scores.remove(member)?;
        self.ordered.remove(&(score.clone(), member.to_string()));
        Some(score)
    }

    pub fn score(&self, member: &str) -> Option<&SortScore> {
        self.scores.get(member)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Members by rank, Redis range semantics
    pub fn range(&self, start: i64, end: i64, direction: Direction) -> Vec<String> {
        let Some((from, to)) = normalise_range(self.len(), start, end) else {
            return Vec::new();
        };
        let take = to - from + 1;

        match direction {
            Direction::Asc => self
                .ordered
                .iter()
                .skip(from)
                .take(take)
                .map(|(_, m)| m.clone())
                .collect(),
            Direction::Desc => self
                .ordered
                .iter()
                .rev()
                .skip(from)
                .take(take)
                .map(|(_, m)| m.clone())
                .collect(),
        }
    }

    /// Member, score pairs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SortScore)> {
        self.ordered.iter().map(|(s, m)| (m.as_str(), s))
    }
}

impl From<Vec<(String, SortScore)>> for SortedSet {
    fn from(entries: Vec<(String, SortScore)>) -> Self {
        let mut set = SortedSet::new();
        for (member, score) in entries {
            set.upsert(&member, score);
        }
        set
    }
}

impl From<SortedSet> for Vec<(String, SortScore)> {
    fn from(set: SortedSet) -> Self {
        set.ordered.into_iter().map(|(s, m)| (m, s)).collect()
    }
}

/// Resolve an inclusive, possibly negative, rank range against `len`
///
/// Returns `None` when the range selects nothing.
pub fn normalise_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let resolve = |pos: i64| if pos < 0 { len + pos } else { pos };

    let start = resolve(start).max(0);
    let end = resolve(end).min(len - 1);

    if start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Volatile store holding every record in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(data: BTreeMap<String, StoredValue>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Copy of every record
    pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
        self.data.read().clone()
    }

    /// Keys starting with `prefix`, in order
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        self.data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Record under a key
    pub fn entry(&self, key: &str) -> Option<StoredValue> {
        self.data.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }
}

fn wrong_type(key: &str, expected: &str, found: &StoredValue) -> OrmError {
    OrmError::Store(format!(
        "Key {} holds a {}, not a {}",
        key,
        found.type_name(),
        expected
    ))
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match self.data.read().get(key) {
            None => Ok(None),
            Some(StoredValue::Value(v)) => Ok(Some(v.clone())),
            Some(other) => Err(wrong_type(key, "value", other)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data.write().insert(
            key.to_string(),
            StoredValue::Value(Bytes::copy_from_slice(value)),
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>> {
        match self.data.read().get(key) {
            None => Ok(Vec::new()),
            Some(StoredValue::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, "set", other)),
        }
    }

    fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut data = self.data.write();
        let record = data
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::Set(BTreeSet::new()));

        match record {
            StoredValue::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            other => Err(wrong_type(key, "set", other)),
        }
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut data = self.data.write();
        let now_empty = match data.get_mut(key) {
            None => return Ok(()),
            Some(StoredValue::Set(members)) => {
                members.remove(member);
                members.is_empty()
            }
            Some(other) => return Err(wrong_type(key, "set", other)),
        };

        if now_empty {
            data.remove(key);
        }
        Ok(())
    }

    fn sorted_set_upsert(&self, key: &str, member: &str, score: SortScore) -> Result<()> {
        let mut data = self.data.write();
        let record = data
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::SortedSet(SortedSet::new()));

        match record {
            StoredValue::SortedSet(set) => {
                set.upsert(member, score);
                Ok(())
            }
            other => Err(wrong_type(key, "sorted set", other)),
        }
    }

    fn sorted_set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut data = self.data.write();
        let now_empty = match data.get_mut(key) {
            None => return Ok(()),
            Some(StoredValue::SortedSet(set)) => {
                set.remove(member);
                set.is_empty()
            }
            Some(other) => return Err(wrong_type(key, "sorted set", other)),
        };

        if now_empty {
            data.remove(key);
        }
        Ok(())
    }

    fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<SortScore>> {
        match self.data.read().get(key) {
            None => Ok(None),
            Some(StoredValue::SortedSet(set)) => Ok(set.score(member).cloned()),
            Some(other) => Err(wrong_type(key, "sorted set", other)),
        }
    }

    fn sorted_set_range(
        &self,
        key: &str,
        start: i64,
        end: i64,
        direction: Direction,
    ) -> Result<Vec<String>> {
        match self.data.read().get(key) {
            None => Ok(Vec::new()),
            Some(StoredValue::SortedSet(set)) => Ok(set.range(start, end, direction)),
            Some(other) => Err(wrong_type(key, "sorted set", other)),
        }
    }

    fn sorted_set_len(&self, key: &str) -> Result<usize> {
        match self.data.read().get(key) {
            None => Ok(0),
            Some(StoredValue::SortedSet(set)) => Ok(set.len()),
            Some(other) => Err(wrong_type(key, "sorted set", other)),
        }
    }
}
