//! Standard key scheme
//!
//! Delimiter-separated keys with a kind prefix and fixed arity per kind.

use crate::error::{OrmError, Result};
use crate::metadata::{Association, Index, Relationship};

use super::{KeyKind, KeyScheme};

const DOCUMENT: &str = "doc";
const REF_TABLE: &str = "ref";
const RELATIONSHIP: &str = "rel";
const INDEX: &str = "idx";
const RELATIONSHIP_SORT: &str = "rsrt";
const TABLE_SORT: &str = "srt";

/// Escape character used for index values
const ESCAPE: char = '%';

/// The default key scheme
#[derive(Debug, Clone)]
pub struct StandardKeyScheme {
    delimiter: char,
}

impl Default for StandardKeyScheme {
    fn default() -> Self {
        Self::new(':')
    }
}

impl StandardKeyScheme {
    /// Create a scheme using the given delimiter
    ///
    /// The delimiter should not be alphanumeric or `%` (see `Config::validate`).
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Get the delimiter
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Validate an identifier component
    fn ident<'a>(&self, what: &str, value: &'a str) -> Result<&'a str> {
        if value.is_empty() {
            return Err(OrmError::InvalidArgument(format!("{} must not be empty", what)));
        }
        if value.contains(self.delimiter) {
            return Err(OrmError::InvalidArgument(format!(
                "{} {:?} contains the key delimiter {:?}",
                what, value, self.delimiter
            )));
        }
        Ok(value)
    }

    fn join(&self, parts: &[&str]) -> String {
        let mut key = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                key.push(self.delimiter);
            }
            key.push_str(part);
        }
        key
    }
}

impl KeyScheme for StandardKeyScheme {
    fn entity_key(&self, table: &str, id: &str) -> Result<String> {
        Ok(self.join(&[DOCUMENT, self.ident("table name", table)?, self.ident("id", id)?]))
    }

    fn entity_ref_key(&self, table: &str, id: &str) -> Result<String> {
        Ok(self.join(&[REF_TABLE, self.ident("table name", table)?, self.ident("id", id)?]))
    }

    fn relationship_key(&self, relationship: &Relationship, id: &str) -> Result<String> {
        Ok(self.join(&[
            RELATIONSHIP,
            relationship.association.code(),
            self.ident("source table", &relationship.source_table)?,
            self.ident("target table", &relationship.target_table)?,
            self.ident("id", id)?,
            self.ident("relationship field", &relationship.name)?,
        ]))
    }

    fn index_key(&self, index: &Index, value: &str) -> Result<String> {
        Ok(self.join(&[
            INDEX,
            self.ident("table name", &index.table)?,
            self.ident("index name", &index.name)?,
            value,
        ]))
    }

    fn sort_index_key(
        &self,
        relationship: &Relationship,
        sort_field: &str,
        id: &str,
    ) -> Result<String> {
        Ok(self.join(&[
            RELATIONSHIP_SORT,
            self.ident("source table", &relationship.source_table)?,
            self.ident("target table", &relationship.target_table)?,
            self.ident("id", id)?,
            self.ident("relationship field", &relationship.name)?,
            self.ident("sort field", sort_field)?,
        ]))
    }

    fn table_sort_key(&self, table: &str, sort_field: &str) -> Result<String> {
        Ok(self.join(&[
            TABLE_SORT,
            self.ident("table name", table)?,
            self.ident("sort field", sort_field)?,
        ]))
    }

    fn index_value(&self, parts: &[String]) -> String {
        let escaped: Vec<String> = parts
            .iter()
            .map(|p| escape_component(p, self.delimiter))
            .collect();
        let refs: Vec<&str> = escaped.iter().map(String::as_str).collect();
        // Escaped parts never contain the delimiter, so the join is reversible
        self.join(&refs)
    }

    fn parse_key(&self, key: &str) -> Option<KeyKind> {
        let parts: Vec<&str> = key.split(self.delimiter).collect();
        let owned = |i: usize| parts[i].to_string();

        match (parts[0], parts.len()) {
            (DOCUMENT, 3) => Some(KeyKind::Document {
                table: owned(1),
                id: owned(2),
            }),
            (REF_TABLE, 3) => Some(KeyKind::RefTable {
                table: owned(1),
                id: owned(2),
            }),
            (RELATIONSHIP, 6) => Some(KeyKind::Relationship {
                association: Association::from_code(parts[1])?,
                source: owned(2),
                target: owned(3),
                id: owned(4),
                field: owned(5),
            }),
            // Multi-column index values contain delimiters of their own
            (INDEX, n) if n >= 4 => Some(KeyKind::Index {
                table: owned(1),
                index: owned(2),
                value: parts[3..].join(&self.delimiter.to_string()),
            }),
            (RELATIONSHIP_SORT, 6) => Some(KeyKind::RelationshipSort {
                source: owned(1),
                target: owned(2),
                id: owned(3),
                field: owned(4),
                sort_field: owned(5),
            }),
            (TABLE_SORT, 3) => Some(KeyKind::TableSort {
                table: owned(1),
                sort_field: owned(2),
            }),
            _ => None,
        }
    }
}

/// Percent-escape `%` and the delimiter inside a data component
pub fn escape_component(value: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == ESCAPE || ch == delimiter {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Reverse `escape_component`
pub fn unescape_component(value: &str) -> Result<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3).ok_or_else(|| {
                OrmError::InvalidArgument(format!("Truncated escape in {:?}", value))
            })?;
            let byte = u8::from_str_radix(hex, 16).map_err(|_| {
                OrmError::InvalidArgument(format!("Bad escape %{} in {:?}", hex, value))
            })?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out)
        .map_err(|e| OrmError::InvalidArgument(format!("Escaped value is not UTF-8: {}", e)))
}
