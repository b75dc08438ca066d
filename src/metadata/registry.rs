//! Metadata providers
//!
//! Descriptors are built outside the engine and registered explicitly; the
//! engine only looks them up.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{OrmError, Result};

use super::{Entity, Relationship, TableInfo};

/// Source of entity descriptors
pub trait Mapper: Send + Sync {
    /// Type-erased `Entity<E>` registered for the Rust type `type_id`
    fn lookup(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Plain description of a table by name
    fn table(&self, table: &str) -> Option<Arc<TableInfo>>;

    /// Relationship declared on `table` under `name`
    fn declared_relationship(&self, table: &str, name: &str) -> Option<Relationship> {
        self.table(table)
            .and_then(|info| info.relationship(name).cloned())
    }
}

impl dyn Mapper {
    /// Typed descriptor for entity type `E`
    pub fn entity_metadata<E: 'static>(&self) -> Result<Arc<Entity<E>>> {
        let erased = self.lookup(TypeId::of::<E>()).ok_or_else(|| {
            OrmError::InvalidArgument(format!(
                "No metadata registered for {}",
                std::any::type_name::<E>()
            ))
        })?;

        erased.downcast::<Entity<E>>().map_err(|_| {
            OrmError::InvalidArgument(format!(
                "Metadata registered for {} has the wrong type",
                std::any::type_name::<E>()
            ))
        })
    }
}

/// In-process registry of entity descriptors
///
/// Registration is the only write; lookups take a read lock.
#[derive(Default)]
pub struct MetadataRegistry {
    entities: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    tables: RwLock<HashMap<String, (TypeId, Arc<TableInfo>)>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the descriptor of entity type `E`
    ///
    /// Fails if another type already claimed the same table name.
    pub fn register<E: 'static>(&self, entity: Entity<E>) -> Result<()> {
        let type_id = TypeId::of::<E>();
        let table = entity.table().to_string();

        let mut tables = self.tables.write();
        if let Some((owner, _)) = tables.get(&table) {
            if *owner != type_id {
                return Err(OrmError::InvalidArgument(format!(
                    "Table {} is already registered for another type",
                    table
                )));
            }
        }

        tracing::debug!(table = %table, "Registering entity metadata");

        // A type moving to another table gives up its old name
        tables.retain(|name, (owner, _)| *owner != type_id || *name == table);
        tables.insert(table, (type_id, Arc::clone(entity.info())));
        self.entities
            .write()
            .insert(type_id, Arc::new(entity) as Arc<dyn Any + Send + Sync>);

        Ok(())
    }

    /// Builder-style registration
    pub fn with<E: 'static>(self, entity: Entity<E>) -> Result<Self> {
        self.register(entity)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl Mapper for MetadataRegistry {
    fn lookup(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.entities.read().get(&type_id).cloned()
    }

    fn table(&self, table: &str) -> Option<Arc<TableInfo>> {
        self.tables.read().get(table).map(|(_, info)| Arc::clone(info))
    }
}
