//! Index descriptors
//!
//! Standard indices map column values to id buckets; sort indices keep
//! ids ordered by one column.

use std::cmp::Ordering;

use crate::codec::{Document, FieldValue};
use crate::store::SortScore;

/// Comparison applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// Parse a schema comparison operator
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "=" | "==" | "eq" => Some(Comparison::Eq),
            "!=" | "<>" | "ne" => Some(Comparison::Ne),
            "<" | "lt" => Some(Comparison::Lt),
            "<=" | "le" => Some(Comparison::Le),
            ">" | "gt" => Some(Comparison::Gt),
            ">=" | "ge" => Some(Comparison::Ge),
            _ => None,
        }
    }
}

/// Predicate gating whether an entity is indexed
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub comparison: Comparison,
    pub value: FieldValue,
}

impl Condition {
    /// Column must equal `value`
    pub fn new(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            column: column.into(),
            comparison: Comparison::Eq,
            value: value.into(),
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Evaluate against a document; a missing column reads as null
    pub fn matches(&self, document: &Document) -> bool {
        let actual = document.get(&self.column).unwrap_or(&FieldValue::Null);

        match self.comparison {
            Comparison::Eq => actual == &self.value,
            Comparison::Ne => actual != &self.value,
            ordered => match actual.compare(&self.value) {
                Some(ord) => match ordered {
                    Comparison::Lt => ord == Ordering::Less,
                    Comparison::Le => ord != Ordering::Greater,
                    Comparison::Gt => ord == Ordering::Greater,
                    Comparison::Ge => ord != Ordering::Less,
                    Comparison::Eq | Comparison::Ne => false,
                },
                None => false,
            },
        }
    }
}

/// A standard index over one or more columns
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Owning table, filled in by the entity builder
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    pub conditions: Vec<Condition>,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: String::new(),
            name: name.into(),
            columns: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether every condition holds for the document
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }

    /// Rendered column values, or `None` if the document is not indexed
    ///
    /// A document is not indexed when a condition fails or any indexed
    /// column is null.
    pub fn values(&self, document: &Document) -> Option<Vec<String>> {
        if !self.matches(document) {
            return None;
        }
        self.columns
            .iter()
            .map(|c| document.get(c).and_then(FieldValue::index_string))
            .collect()
    }
}

/// A table-wide sort index on one column
#[derive(Debug, Clone, PartialEq)]
pub struct SortIndex {
    /// Owning table, filled in by the entity builder
    pub table: String,
    pub column: String,
    pub conditions: Vec<Condition>,
}

impl SortIndex {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: String::new(),
            column: column.into(),
            conditions: Vec::new(),
        }
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Score of the document, or `None` if it is not in the sort set
    pub fn score(&self, document: &Document) -> Option<SortScore> {
        if !self.conditions.iter().all(|c| c.matches(document)) {
            return None;
        }
        document.get(&self.column).and_then(SortScore::from_field)
    }
}
