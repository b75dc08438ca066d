//! Per-field codec rules
//!
//! Converts one typed field value to and from its canonical JSON value.
//!
//! | FieldType | Canonical value                         |
//! |-----------|-----------------------------------------|
//! | DateTime  | RFC 3339 string                         |
//! | Int       | JSON integer                            |
//! | String    | JSON string                             |
//! | Decimal   | JSON number                             |
//! | Bool      | JSON boolean                            |
//! | Set       | JSON string holding an encoded array    |
//! | Object    | string from the value's own capability  |
//! | Unknown   | skipped (`None`)                        |
//!
//! Null is null for every type.

use chrono::DateTime;
use serde_json::{Number, Value};

use crate::error::{OrmError, Result};

use super::value::{FieldType, FieldValue, ObjectClass, ScalarValue};

/// Encode a value for a field of the given type
///
/// Returns `Ok(None)` when the type is unknown and the field must be skipped.
pub fn encode(field_type: FieldType, value: &FieldValue) -> Result<Option<Value>> {
    if field_type == FieldType::Unknown {
        return Ok(None);
    }
    if value.is_null() {
        return Ok(Some(Value::Null));
    }

    let encoded = match field_type {
        FieldType::DateTime => Value::String(cast_datetime(value)?),
        FieldType::Int => Value::from(cast_int(value)?),
        FieldType::String => Value::String(cast_string(value)?),
        FieldType::Decimal => {
            let number = cast_decimal(value)?;
            Value::Number(Number::from_f64(number).ok_or_else(|| {
                OrmError::Serialization(format!("{} has no JSON representation", number))
            })?)
        }
        FieldType::Bool => Value::Bool(cast_bool(value)?),
        FieldType::Set => match value {
            FieldValue::Set(items) => Value::String(serde_json::to_string(items)?),
            other => return Err(cast_error(other, field_type)),
        },
        FieldType::Object => match value {
            FieldValue::Object(obj) => Value::String(obj.encode()?),
            other => {
                return Err(OrmError::NotSerialisable(format!(
                    "value of kind {}",
                    other.kind()
                )))
            }
        },
        FieldType::Unknown => return Ok(None),
    };

    Ok(Some(encoded))
}

/// Decode a canonical value for a field of the given type
///
/// OBJECT fields need the column's class to rebuild the value. Returns
/// `Ok(None)` when the type is unknown and the field must be skipped.
pub fn decode(
    field_type: FieldType,
    raw: &Value,
    class: Option<&ObjectClass>,
) -> Result<Option<FieldValue>> {
    if field_type == FieldType::Unknown {
        return Ok(None);
    }
    if raw.is_null() {
        return Ok(Some(FieldValue::Null));
    }

    let decoded = match (field_type, raw) {
        (FieldType::DateTime, Value::String(s)) => {
            let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
                OrmError::Serialization(format!("invalid datetime {:?}: {}", s, e))
            })?;
            FieldValue::DateTime(parsed)
        }

        (FieldType::Int, Value::Number(n)) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Int(n.as_f64().unwrap_or_default() as i64),
        },
        (FieldType::Int, Value::Bool(b)) => FieldValue::Int(*b as i64),
        (FieldType::Int, Value::String(s)) => FieldValue::Int(s.trim().parse().map_err(|_| {
            OrmError::Serialization(format!("invalid integer {:?}", s))
        })?),

        (FieldType::String, Value::String(s)) => FieldValue::String(s.clone()),
        (FieldType::String, Value::Number(n)) => FieldValue::String(n.to_string()),
        (FieldType::String, Value::Bool(b)) => FieldValue::String(b.to_string()),

        (FieldType::Decimal, Value::Number(n)) => {
            FieldValue::Decimal(n.as_f64().unwrap_or_default())
        }
        (FieldType::Decimal, Value::String(s)) => {
            FieldValue::Decimal(s.trim().parse().map_err(|_| {
                OrmError::Serialization(format!("invalid decimal {:?}", s))
            })?)
        }

        (FieldType::Bool, Value::Bool(b)) => FieldValue::Bool(*b),
        (FieldType::Bool, Value::Number(n)) => {
            FieldValue::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false))
        }
        (FieldType::Bool, Value::String(s)) => FieldValue::Bool(!s.is_empty() && s != "0"),

        (FieldType::Set, Value::String(s)) => {
            FieldValue::Set(serde_json::from_str::<Vec<ScalarValue>>(s)?)
        }

        (FieldType::Object, Value::String(s)) => {
            let class = class.ok_or_else(|| {
                OrmError::InvalidArgument("object column has no class".to_string())
            })?;
            FieldValue::Object(class.decode(s)?)
        }

        (field_type, raw) => {
            return Err(OrmError::Serialization(format!(
                "cannot decode {} as {}",
                raw,
                field_type.name()
            )))
        }
    };

    Ok(Some(decoded))
}

// =============================================================================
// Casts
// =============================================================================

fn cast_error(value: &FieldValue, field_type: FieldType) -> OrmError {
    OrmError::InvalidArgument(format!(
        "cannot store {} value in {} field",
        value.kind(),
        field_type.name()
    ))
}

fn cast_datetime(value: &FieldValue) -> Result<String> {
    match value {
        FieldValue::DateTime(dt) => Ok(dt.to_rfc3339()),
        FieldValue::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.to_rfc3339())
            .map_err(|e| OrmError::InvalidArgument(format!("invalid datetime {:?}: {}", s, e))),
        other => Err(cast_error(other, FieldType::DateTime)),
    }
}

fn cast_int(value: &FieldValue) -> Result<i64> {
    match value {
        FieldValue::Int(i) => Ok(*i),
        FieldValue::Decimal(d) => Ok(*d as i64),
        FieldValue::Bool(b) => Ok(*b as i64),
        FieldValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| OrmError::InvalidArgument(format!("invalid integer {:?}", s))),
        other => Err(cast_error(other, FieldType::Int)),
    }
}

fn cast_string(value: &FieldValue) -> Result<String> {
    match value {
        FieldValue::Set(_) | FieldValue::Object(_) => Err(cast_error(value, FieldType::String)),
        scalar => Ok(scalar.index_string().unwrap_or_default()),
    }
}

fn cast_decimal(value: &FieldValue) -> Result<f64> {
    match value {
        FieldValue::Decimal(d) => Ok(*d),
        FieldValue::Int(i) => Ok(*i as f64),
        FieldValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        FieldValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| OrmError::InvalidArgument(format!("invalid decimal {:?}", s))),
        other => Err(cast_error(other, FieldType::Decimal)),
    }
}

fn cast_bool(value: &FieldValue) -> Result<bool> {
    match value {
        FieldValue::Bool(b) => Ok(*b),
        FieldValue::Int(i) => Ok(*i != 0),
        FieldValue::Decimal(d) => Ok(*d != 0.0),
        FieldValue::String(s) => Ok(!s.is_empty() && s != "0"),
        other => Err(cast_error(other, FieldType::Bool)),
    }
}
