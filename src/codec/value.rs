//! Field values
//!
//! The typed in-memory representation exchanged with column accessors.

use std::any::{type_name, Any};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{OrmError, Result};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    DateTime,
    Int,
    String,
    Decimal,
    Bool,
    Set,
    Object,
    /// Anything a metadata provider could not map; skipped by codecs
    Unknown,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::DateTime => "datetime",
            FieldType::Int => "int",
            FieldType::String => "string",
            FieldType::Decimal => "decimal",
            FieldType::Bool => "bool",
            FieldType::Set => "set",
            FieldType::Object => "object",
            FieldType::Unknown => "unknown",
        }
    }

    /// Whether values of this type can be rendered as an id or index value
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldType::Set | FieldType::Object | FieldType::Unknown)
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    /// Parse a schema type name; unrecognised names map to `Unknown`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "datetime" => FieldType::DateTime,
            "int" | "integer" => FieldType::Int,
            "string" => FieldType::String,
            "decimal" | "float" => FieldType::Decimal,
            "bool" | "boolean" => FieldType::Bool,
            "set" => FieldType::Set,
            "object" => FieldType::Object,
            _ => FieldType::Unknown,
        })
    }
}

/// A scalar member of a SET field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Decimal(f64),
    String(String),
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Decimal(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

// =============================================================================
// Object capabilities
// =============================================================================

/// Self-describing serialisation for OBJECT fields
///
/// The alternative capability is plain serde (`Serialize + DeserializeOwned`).
pub trait Serialisable: Sized {
    fn serialise(&self) -> Result<String>;

    fn deserialise(raw: &str) -> Result<Self>;
}

/// Type-erased object held by an `ObjectValue`
trait ErasedObject: Send + Sync {
    fn class_name(&self) -> &'static str;

    fn encode(&self) -> Result<String>;

    fn as_any(&self) -> &dyn Any;
}

struct SerdeObject<T>(T);

impl<T: Serialize + Send + Sync + 'static> ErasedObject for SerdeObject<T> {
    fn class_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

struct SelfDescribingObject<T>(T);

impl<T: Serialisable + Send + Sync + 'static> ErasedObject for SelfDescribingObject<T> {
    fn class_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn encode(&self) -> Result<String> {
        self.0.serialise()
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

struct OpaqueObject<T>(T);

impl<T: Send + Sync + 'static> ErasedObject for OpaqueObject<T> {
    fn class_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn encode(&self) -> Result<String> {
        Err(OrmError::NotSerialisable(type_name::<T>().to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

/// The value of an OBJECT field
#[derive(Clone)]
pub struct ObjectValue {
    inner: Arc<dyn ErasedObject>,
}

impl ObjectValue {
    /// Wrap a value serialised through serde
    pub fn serde<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SerdeObject(value)),
        }
    }

    /// Wrap a value serialised through `Serialisable`
    pub fn serialisable<T>(value: T) -> Self
    where
        T: Serialisable + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SelfDescribingObject(value)),
        }
    }

    /// Wrap a value with no serialisation capability; encoding it fails
    pub fn opaque<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            inner: Arc::new(OpaqueObject(value)),
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.inner.class_name()
    }

    /// Serialise through the wrapped value's capability
    pub fn encode(&self) -> Result<String> {
        self.inner.encode()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectValue").field(&self.class_name()).finish()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        if self.class_name() != other.class_name() {
            return false;
        }
        match (self.encode(), other.encode()) {
            (Ok(a), Ok(b)) => a == b,
            _ => Arc::ptr_eq(&self.inner, &other.inner),
        }
    }
}

/// Class identity of an OBJECT column, used to rebuild values on decode
#[derive(Clone, Copy)]
pub struct ObjectClass {
    name: &'static str,
    decode: fn(&str) -> Result<ObjectValue>,
}

fn decode_serde<T>(raw: &str) -> Result<ObjectValue>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    Ok(ObjectValue::serde(serde_json::from_str::<T>(raw)?))
}

fn decode_serialisable<T>(raw: &str) -> Result<ObjectValue>
where
    T: Serialisable + Send + Sync + 'static,
{
    Ok(ObjectValue::serialisable(T::deserialise(raw)?))
}

fn decode_opaque<T: 'static>(_raw: &str) -> Result<ObjectValue> {
    Err(OrmError::NotSerialisable(type_name::<T>().to_string()))
}

impl ObjectClass {
    pub fn serde<T>() -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            name: type_name::<T>(),
            decode: decode_serde::<T>,
        }
    }

    pub fn serialisable<T>() -> Self
    where
        T: Serialisable + Send + Sync + 'static,
    {
        Self {
            name: type_name::<T>(),
            decode: decode_serialisable::<T>,
        }
    }

    /// A class without serialisation capability
    pub fn opaque<T: 'static>() -> Self {
        Self {
            name: type_name::<T>(),
            decode: decode_opaque::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rebuild a value of this class from its serialised form
    pub fn decode(&self, raw: &str) -> Result<ObjectValue> {
        (self.decode)(raw)
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectClass").field(&self.name).finish()
    }
}

// =============================================================================
// FieldValue
// =============================================================================

/// A typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    DateTime(DateTime<FixedOffset>),
    Int(i64),
    String(String),
    Decimal(f64),
    Bool(bool),
    Set(Vec<ScalarValue>),
    Object(ObjectValue),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Int(_) => "int",
            FieldValue::String(_) => "string",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Bool(_) => "bool",
            FieldValue::Set(_) => "set",
            FieldValue::Object(_) => "object",
        }
    }

    /// Render as an id or index value; `None` for null and non-scalars
    pub fn index_string(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Decimal(d) => Some(d.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::DateTime(dt) => Some(dt.to_rfc3339()),
            FieldValue::Null | FieldValue::Set(_) | FieldValue::Object(_) => None,
        }
    }

    /// Order two values of compatible kinds (numbers compare across int/decimal)
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Decimal(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Decimal(a), FieldValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => a.partial_cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn mismatch(&self, expected: &str) -> OrmError {
        OrmError::InvalidArgument(format!("expected {} value, got {}", expected, self.kind()))
    }

    pub fn into_string(self) -> Result<Option<String>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::String(s) => Ok(Some(s)),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn into_i64(self) -> Result<Option<i64>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Int(i) => Ok(Some(i)),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn into_f64(self) -> Result<Option<f64>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Decimal(d) => Ok(Some(d)),
            FieldValue::Int(i) => Ok(Some(i as f64)),
            other => Err(other.mismatch("decimal")),
        }
    }

    pub fn into_bool(self) -> Result<Option<bool>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Bool(b) => Ok(Some(b)),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn into_datetime(self) -> Result<Option<DateTime<FixedOffset>>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::DateTime(dt) => Ok(Some(dt)),
            other => Err(other.mismatch("datetime")),
        }
    }

    pub fn into_set(self) -> Result<Option<Vec<ScalarValue>>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Set(items) => Ok(Some(items)),
            other => Err(other.mismatch("set")),
        }
    }

    /// Extract an OBJECT value of a concrete type
    pub fn into_object<T: Clone + 'static>(self) -> Result<Option<T>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Object(obj) => obj.downcast_ref::<T>().cloned().map(Some).ok_or_else(|| {
                OrmError::InvalidArgument(format!(
                    "expected object of class {}, got {}",
                    type_name::<T>(),
                    obj.class_name()
                ))
            }),
            other => Err(other.mismatch("object")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value.into())
    }
}

impl From<Vec<ScalarValue>> for FieldValue {
    fn from(value: Vec<ScalarValue>) -> Self {
        FieldValue::Set(value)
    }
}

impl From<ObjectValue> for FieldValue {
    fn from(value: ObjectValue) -> Self {
        FieldValue::Object(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
