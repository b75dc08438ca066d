//! JSON serialiser
//!
//! The reference codec: a flat JSON object of column name → canonical value.
//! Only primitives and pre-serialised strings are ever assigned, so any
//! nesting below the root object marks the payload as foreign.

use serde_json::{Map, Value};

use crate::error::{OrmError, Result};
use crate::metadata::ColumnInfo;

use super::field::{decode, encode};
use super::{Document, FieldValue, Serialiser};

/// JSON document codec, tag `JSON`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerialiser;

impl JsonSerialiser {
    /// Serialiser header code, prefixed to documents
    pub const CODE: &'static str = "JSON";

    pub fn new() -> Self {
        Self
    }
}

impl Serialiser for JsonSerialiser {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn encode_document(&self, columns: &[ColumnInfo], document: &Document) -> Result<String> {
        let mut object = Map::with_capacity(columns.len());

        for column in columns {
            let value = document.get(&column.name).unwrap_or(&FieldValue::Null);
            if let Some(encoded) = encode(column.field_type, value)? {
                object.insert(column.name.clone(), encoded);
            }
        }

        Ok(serde_json::to_string(&Value::Object(object))?)
    }

    fn decode_document(&self, columns: &[ColumnInfo], payload: &str) -> Result<Document> {
        let object = match serde_json::from_str::<Value>(payload)? {
            Value::Object(object) => object,
            other => {
                return Err(OrmError::Serialization(format!(
                    "JSON document must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if let Some((name, _)) = object.iter().find(|(_, v)| v.is_object() || v.is_array()) {
            return Err(OrmError::Serialization(format!(
                "JSON document field {:?} is nested deeper than one level",
                name
            )));
        }

        let mut document = Document::new();
        for column in columns {
            let raw = object.get(&column.name).unwrap_or(&Value::Null);
            if let Some(value) = decode(column.field_type, raw, column.class.as_ref())? {
                document.insert(column.name.clone(), value);
            }
        }

        Ok(document)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
