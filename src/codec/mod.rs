//! Codec Module
//!
//! Converts entities to and from the tagged documents held in the store.
//!
//! ## Document Format
//! ```text
//! ┌──────────────┬─────────────────────────────────────┐
//! │ Codec (4)    │ Payload                             │
//! └──────────────┴─────────────────────────────────────┘
//! ```
//! The codec tag names the serialiser that wrote the payload, so documents
//! written by different codecs can live in one store. A serialiser refuses
//! to read a payload carrying any tag but its own.

mod field;
mod json;
mod value;

use std::collections::BTreeMap;

pub use field::{decode, encode};
pub use json::JsonSerialiser;
pub use value::{FieldType, FieldValue, ObjectClass, ObjectValue, ScalarValue, Serialisable};

use crate::error::{OrmError, Result};
use crate::metadata::{ColumnInfo, Entity};

/// Codec tag size in bytes
pub const CODEC_TAG_LEN: usize = 4;

/// Typed column values of one entity, keyed by column name
pub type Document = BTreeMap<String, FieldValue>;

/// A codec tag plus the payload it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialisedData {
    codec: String,
    data: String,
}

impl SerialisedData {
    /// Create from a codec tag and payload
    ///
    /// The tag must be exactly 4 ASCII characters.
    pub fn new(codec: impl Into<String>, data: impl Into<String>) -> Result<Self> {
        let codec = codec.into();
        if codec.len() != CODEC_TAG_LEN || !codec.is_ascii() {
            return Err(OrmError::InvalidArgument(format!(
                "Codec tag {:?} must be {} ASCII characters",
                codec, CODEC_TAG_LEN
            )));
        }

        Ok(Self {
            codec,
            data: data.into(),
        })
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Encode as stored bytes: tag + payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(CODEC_TAG_LEN + self.data.len());
        bytes.extend_from_slice(self.codec.as_bytes());
        bytes.extend_from_slice(self.data.as_bytes());
        bytes
    }

    /// Decode stored bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CODEC_TAG_LEN {
            return Err(OrmError::FormatMismatch {
                expected: format!("{}-byte codec tag", CODEC_TAG_LEN),
                found: format!("{} bytes", bytes.len()),
            });
        }

        let (tag, payload) = bytes.split_at(CODEC_TAG_LEN);
        let codec = std::str::from_utf8(tag)
            .ok()
            .filter(|t| t.is_ascii())
            .ok_or_else(|| OrmError::FormatMismatch {
                expected: "ASCII codec tag".to_string(),
                found: format!("{:?}", tag),
            })?;
        let data = std::str::from_utf8(payload)
            .map_err(|e| OrmError::Serialization(format!("Payload is not UTF-8: {}", e)))?;

        Self::new(codec, data)
    }
}

/// A document codec
///
/// Implementations apply the per-field rules of their wire form to a whole
/// column layout. Fields of unknown type are skipped in both directions.
pub trait Serialiser: Send + Sync {
    /// Unique 4-character tag prefixed to every document this codec writes
    fn code(&self) -> &'static str;

    /// Encode typed column values into a payload
    fn encode_document(&self, columns: &[ColumnInfo], document: &Document) -> Result<String>;

    /// Decode a payload into typed column values
    fn decode_document(&self, columns: &[ColumnInfo], payload: &str) -> Result<Document>;

    /// Encode and tag a document
    fn serialise_document(
        &self,
        columns: &[ColumnInfo],
        document: &Document,
    ) -> Result<SerialisedData> {
        SerialisedData::new(self.code(), self.encode_document(columns, document)?)
    }

    /// Check the tag, then decode a document
    fn deserialise_document(
        &self,
        columns: &[ColumnInfo],
        data: &SerialisedData,
    ) -> Result<Document> {
        if data.codec() != self.code() {
            return Err(OrmError::FormatMismatch {
                expected: self.code().to_string(),
                found: data.codec().to_string(),
            });
        }
        self.decode_document(columns, data.data())
    }
}

/// Serialise an entity through its metadata
pub fn serialise<E>(
    serialiser: &dyn Serialiser,
    metadata: &Entity<E>,
    entity: &E,
) -> Result<SerialisedData> {
    serialiser.serialise_document(metadata.info().columns(), &metadata.read_document(entity))
}

/// Hydrate an entity from serialised data through its metadata
pub fn deserialise<E>(
    serialiser: &dyn Serialiser,
    metadata: &Entity<E>,
    data: &SerialisedData,
    entity: &mut E,
) -> Result<()> {
    let document = serialiser.deserialise_document(metadata.info().columns(), data)?;
    metadata.write_document(entity, document)
}
