//! Planned store mutations
//!
//! A save is planned in full before anything is written, then applied in
//! three phases:
//!
//! ```text
//! removals ──▶ document ──▶ additions
//! ```
//!
//! Readers that fetch an id from an index or edge after the document write
//! always find the new document.

use crate::error::Result;
use crate::store::{KeyValueStore, SortScore};

/// One store mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
    SetAdd { key: String, member: String },
    SetRemove { key: String, member: String },
    SortedUpsert { key: String, member: String, score: SortScore },
    SortedRemove { key: String, member: String },
}

impl StoreOp {
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Set { key, .. }
            | StoreOp::Delete { key }
            | StoreOp::SetAdd { key, .. }
            | StoreOp::SetRemove { key, .. }
            | StoreOp::SortedUpsert { key, .. }
            | StoreOp::SortedRemove { key, .. } => key,
        }
    }

    /// Issue the mutation against a store
    pub fn apply(&self, store: &dyn KeyValueStore) -> Result<()> {
        tracing::trace!(op = self.kind(), key = %self.key(), "Applying store op");

        match self {
            StoreOp::Set { key, value } => store.set(key, value),
            StoreOp::Delete { key } => store.delete(key),
            StoreOp::SetAdd { key, member } => store.set_add(key, member),
            StoreOp::SetRemove { key, member } => store.set_remove(key, member),
            StoreOp::SortedUpsert { key, member, score } => {
                store.sorted_set_upsert(key, member, score.clone())
            }
            StoreOp::SortedRemove { key, member } => store.sorted_set_remove(key, member),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StoreOp::Set { .. } => "set",
            StoreOp::Delete { .. } => "delete",
            StoreOp::SetAdd { .. } => "set_add",
            StoreOp::SetRemove { .. } => "set_remove",
            StoreOp::SortedUpsert { .. } => "sorted_upsert",
            StoreOp::SortedRemove { .. } => "sorted_remove",
        }
    }
}

/// The derived writes of one save
#[derive(Debug, Default)]
pub struct WriteSet {
    removals: Vec<StoreOp>,
    document: Option<StoreOp>,
    additions: Vec<StoreOp>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, op: StoreOp) {
        self.removals.push(op);
    }

    pub fn add(&mut self, op: StoreOp) {
        self.additions.push(op);
    }

    pub fn set_document(&mut self, key: String, value: Vec<u8>) {
        self.document = Some(StoreOp::Set { key, value });
    }

    /// Whether this plan already takes `member` out of the collection at `key`
    pub fn removes(&self, key: &str, member: &str) -> bool {
        self.removals.iter().any(|op| match op {
            StoreOp::SetRemove { key: k, member: m }
            | StoreOp::SortedRemove { key: k, member: m } => k == key && m == member,
            StoreOp::Delete { key: k } => k == key,
            _ => false,
        })
    }

    pub fn removal_count(&self) -> usize {
        self.removals.len()
    }

    pub fn addition_count(&self) -> usize {
        self.additions.len()
    }

    pub fn removals(&self) -> &[StoreOp] {
        &self.removals
    }

    pub fn additions(&self) -> &[StoreOp] {
        &self.additions
    }

    /// Apply every phase in order, stopping at the first failure
    ///
    /// Nothing is rolled back.
    pub fn apply(&self, store: &dyn KeyValueStore) -> Result<()> {
        for op in &self.removals {
            op.apply(store)?;
        }
        if let Some(op) = &self.document {
            op.apply(store)?;
        }
        for op in &self.additions {
            op.apply(store)?;
        }
        Ok(())
    }
}
