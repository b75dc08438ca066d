//! Query Module
//!
//! Descriptors for range queries over sort indices.
//!
//! A query reads ids from one sorted set, either the table-wide set of a
//! sortable column or the sort set of one entity's relationship, and the
//! engine hydrates them lazily.

use crate::metadata::Relationship;

/// Ordering of a range read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Restricts a query to the related ids of one source entity
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipScope {
    pub relationship: Relationship,
    pub source_id: String,
}

/// A range query over a sort index
///
/// `start` and `end` are inclusive ranks; negative values count from the
/// end, so the default `0..=-1` selects every member.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedQuery {
    pub table: String,
    pub scope: Option<RelationshipScope>,
    pub sort_by: String,
    pub direction: Direction,
    pub start: i64,
    pub end: i64,
}

impl SortedQuery {
    /// Query the table-wide sort index on `sort_by`
    pub fn new(table: impl Into<String>, sort_by: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            scope: None,
            sort_by: sort_by.into(),
            direction: Direction::Asc,
            start: 0,
            end: -1,
        }
    }

    /// Query the ids related to `source_id` through a sorted relationship
    pub fn relationship(
        relationship: &Relationship,
        source_id: impl Into<String>,
        sort_by: impl Into<String>,
    ) -> Self {
        Self {
            table: relationship.target_table.clone(),
            scope: Some(RelationshipScope {
                relationship: relationship.clone(),
                source_id: source_id.into(),
            }),
            ..Self::new(String::new(), sort_by)
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    pub fn end(mut self, end: i64) -> Self {
        self.end = end;
        self
    }

    /// Set both range bounds
    pub fn range(self, start: i64, end: i64) -> Self {
        self.start(start).end(end)
    }
}

/// A query over a table-wide sort index, never relationship scoped
#[derive(Debug, Clone, PartialEq)]
pub struct SortedTableQuery(SortedQuery);

impl SortedTableQuery {
    pub fn new(table: impl Into<String>, sort_by: impl Into<String>) -> Self {
        Self(SortedQuery::new(table, sort_by))
    }

    pub fn direction(self, direction: Direction) -> Self {
        Self(self.0.direction(direction))
    }

    pub fn range(self, start: i64, end: i64) -> Self {
        Self(self.0.range(start, end))
    }

    pub fn table(&self) -> &str {
        &self.0.table
    }

    pub fn sort_by(&self) -> &str {
        &self.0.sort_by
    }
}

impl From<SortedTableQuery> for SortedQuery {
    fn from(query: SortedTableQuery) -> Self {
        SortedQuery {
            scope: None,
            ..query.0
        }
    }
}
