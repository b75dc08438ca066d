//! # AtlasORM
//!
//! An object-to-key-value persistence engine with:
//! - Typed entity documents tagged with their codec
//! - Standard indices with condition predicates
//! - Table-wide and per-relationship sort indices with range queries
//! - Relationship edges kept consistent on both sides, with ref tables
//!   for scan-free cascading deletes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      EntityManager                          │
//! │          save / load / delete / query / related             │
//! └──────┬──────────────┬───────────────┬──────────────┬────────┘
//!        │              │               │              │
//!        ▼              ▼               ▼              ▼
//!   ┌─────────┐   ┌───────────┐   ┌───────────┐   ┌─────────┐
//!   │ Mapper  │   │ KeyScheme │   │Serialiser │   │  Query  │
//!   │(metadata│   │  (keys)   │   │  (codec)  │   │(ranges) │
//!   └─────────┘   └───────────┘   └───────────┘   └─────────┘
//!                       │
//!                       ▼
//!              ┌──────────────────┐
//!              │  KeyValueStore   │
//!              │ Memory │ File    │
//!              └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keys;
pub mod codec;
pub mod metadata;
pub mod store;
pub mod query;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{OrmError, Result};
pub use config::{Config, SyncStrategy};
pub use codec::{FieldType, FieldValue, JsonSerialiser, SerialisedData, Serialiser};
pub use engine::{EntityManager, QueryResult};
pub use keys::{KeyScheme, StandardKeyScheme};
pub use metadata::{Column, Entity, Index, Mapper, MetadataRegistry, Relationship, SortIndex};
pub use query::{Direction, SortedQuery, SortedTableQuery};
pub use store::{FileStore, KeyValueStore, MemoryStore, SortScore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasORM
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
