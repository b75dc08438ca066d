//! Metadata Module
//!
//! Descriptors of entities, columns, relationships and indices.
//!
//! ## Responsibilities
//! - Describe how an entity type maps onto a table
//! - Carry explicit accessor functions for every column
//! - Declare standard indices, sort indices and relationships
//! - Hand descriptors to the engine through a `Mapper`
//!
//! Descriptors are validated once when built and are read-only afterwards.

mod entity;
mod index;
mod registry;
mod relationship;

pub use entity::{
    Column, ColumnInfo, Entity, EntityBuilder, Getter, RelationshipField, RelationshipGetter,
    Setter, TableInfo,
};
pub use index::{Comparison, Condition, Index, SortIndex};
pub use registry::{Mapper, MetadataRegistry};
pub use relationship::{Association, Relationship};
