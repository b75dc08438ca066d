//! Key Scheme Module
//!
//! Derives store addresses for every kind of record the engine writes.
//!
//! ## Key Layout (standard scheme, `:` delimiter)
//! ```text
//! doc:{table}:{id}                                  entity document
//! ref:{table}:{id}                                  keys of edges pointing at the entity
//! rel:{assoc}:{source}:{target}:{id}:{field}        relationship edge
//! idx:{table}:{index}:{value}                       standard index bucket
//! rsrt:{source}:{target}:{id}:{field}:{sort_field}  relationship sort set
//! srt:{table}:{sort_field}                          table sort set
//! ```
//!
//! Every key starts with a kind discriminator and has a fixed number of
//! components, so two keys of different kinds can never be equal.
//! Identifiers (tables, ids, field and index names) containing the delimiter
//! are rejected; index values are data and get escaped instead, each column
//! value on its own, then joined by the delimiter.

mod standard;

pub use standard::{escape_component, unescape_component, StandardKeyScheme};

use crate::error::Result;
use crate::metadata::{Association, Index, Relationship};

/// Derives store keys from metadata and identifiers
///
/// Implementations must be pure: equal inputs always give equal keys, and
/// keys of different kinds never collide.
pub trait KeyScheme: Send + Sync {
    /// Key of an entity document
    fn entity_key(&self, table: &str, id: &str) -> Result<String>;

    /// Key of an entity's ref table (edges that point at it)
    fn entity_ref_key(&self, table: &str, id: &str) -> Result<String>;

    /// Key of the edge owned by `id` on the source side of `relationship`
    fn relationship_key(&self, relationship: &Relationship, id: &str) -> Result<String>;

    /// Key of a standard index bucket
    ///
    /// `value` must come from `index_value`, which escapes the column values.
    fn index_key(&self, index: &Index, value: &str) -> Result<String>;

    /// Key of the sort set of a sorted relationship owned by `id`
    fn sort_index_key(&self, relationship: &Relationship, sort_field: &str, id: &str)
        -> Result<String>;

    /// Key of a table-wide sort set
    fn table_sort_key(&self, table: &str, sort_field: &str) -> Result<String>;

    /// Join several column values into one index value
    fn index_value(&self, parts: &[String]) -> String;

    /// Recover the record kind and components from a key
    fn parse_key(&self, key: &str) -> Option<KeyKind>;
}

/// A parsed store key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    Document {
        table: String,
        id: String,
    },
    RefTable {
        table: String,
        id: String,
    },
    Relationship {
        association: Association,
        source: String,
        target: String,
        id: String,
        field: String,
    },
    Index {
        table: String,
        index: String,
        value: String,
    },
    RelationshipSort {
        source: String,
        target: String,
        id: String,
        field: String,
        sort_field: String,
    },
    TableSort {
        table: String,
        sort_field: String,
    },
}
