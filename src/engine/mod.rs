//! Engine Module
//!
//! The persistence engine that keeps documents and their derived records
//! consistent.
//!
//! ## Responsibilities
//! - Save entities: document, index buckets, sort sets, relationship edges
//! - Load entities and resolve relationships lazily
//! - Delete entities with cascading cleanup through the ref table
//! - Answer range queries against sort indices
//!
//! ## Save Pipeline
//! ```text
//!  entity ──▶ metadata ──▶ document ──▶ serialiser ──▶ tagged payload
//!                              │
//!                              ▼
//!             prior document (if any) ──▶ WriteSet
//!                                          ├─ removals  (stale buckets, edges, scores)
//!                                          ├─ document
//!                                          └─ additions (buckets, edges, scores, refs)
//! ```
//!
//! The engine holds no state between calls besides its collaborators.
//! Between reading the prior document and applying the write set, another
//! writer of the same entity can slip in; concurrent saves of one entity
//! must be serialised by the caller.

mod indices;
mod relationships;
mod results;
mod write_set;

pub use results::{QueryIter, QueryResult};
pub use write_set::{StoreOp, WriteSet};

use std::sync::Arc;

use crate::codec::{self, Document, JsonSerialiser, SerialisedData, Serialiser};
use crate::config::Config;
use crate::error::{OrmError, Result};
use crate::keys::{KeyScheme, StandardKeyScheme};
use crate::metadata::{Entity, Mapper, TableInfo};
use crate::query::SortedQuery;
use crate::store::KeyValueStore;

/// Saves, loads, deletes and queries entities
pub struct EntityManager {
    /// Backend holding every record
    store: Arc<dyn KeyValueStore>,

    /// Source of entity descriptors
    mapper: Arc<dyn Mapper>,

    /// Derives every store key
    keys: Box<dyn KeyScheme>,

    /// Codec for entity documents
    serialiser: Box<dyn Serialiser>,

    config: Config,
}

impl EntityManager {
    /// Create a manager with the default config, key scheme and JSON codec
    pub fn new(store: Arc<dyn KeyValueStore>, mapper: Arc<dyn Mapper>) -> Self {
        Self {
            store,
            mapper,
            keys: Box::new(StandardKeyScheme::default()),
            serialiser: Box::new(JsonSerialiser::new()),
            config: Config::default(),
        }
    }

    /// Create a manager from a config
    ///
    /// The standard key scheme uses the configured delimiter.
    pub fn with_config(
        store: Arc<dyn KeyValueStore>,
        mapper: Arc<dyn Mapper>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            mapper,
            keys: Box::new(StandardKeyScheme::new(config.key_delimiter)),
            serialiser: Box::new(JsonSerialiser::new()),
            config,
        })
    }

    /// Replace the document codec
    pub fn with_serialiser(mut self, serialiser: Box<dyn Serialiser>) -> Self {
        self.serialiser = serialiser;
        self
    }

    /// Replace the key scheme
    pub fn with_key_scheme(mut self, keys: Box<dyn KeyScheme>) -> Self {
        self.keys = keys;
        self
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Persist an entity and every record derived from it
    ///
    /// Steps:
    /// 1. Serialise the entity
    /// 2. Read the prior document, if one exists
    /// 3. Plan index, sort, relationship and ref-table changes
    /// 4. Apply removals, then the document, then additions
    ///
    /// A failure part way leaves earlier writes in place.
    pub fn save<E: 'static>(&self, entity: &E) -> Result<()> {
        let metadata = self.metadata::<E>()?;
        let info = metadata.info();
        let id = metadata.id_of(entity)?;

        // Step 1: Serialise
        let document = metadata.read_document(entity);
        let data = self
            .serialiser
            .serialise_document(info.columns(), &document)?;

        // Step 2: Prior state
        let doc_key = self.keys.entity_key(info.table(), &id)?;
        let previous = self.read_document(info, &doc_key)?;

        // Step 3: Plan
        let mut writes = WriteSet::new();
        self.plan_indices(info, &id, previous.as_ref(), &document, &mut writes)?;

        for field in metadata.relationships() {
            // An unpopulated field leaves its stored edges alone
            if let Some(ids) = field.ids(entity) {
                self.plan_relationship(field.relationship(), &id, &document, ids, &mut writes)?;
            }
        }

        self.plan_sort_refresh(info, &id, &document, &mut writes)?;
        writes.set_document(doc_key, data.to_bytes());

        tracing::debug!(
            table = info.table(),
            id = %id,
            update = previous.is_some(),
            removals = writes.removal_count(),
            additions = writes.addition_count(),
            "Saving entity"
        );

        // Step 4: Apply
        writes.apply(self.store.as_ref())
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Load an entity by id
    pub fn load<E: Default + 'static>(&self, id: &str) -> Result<E> {
        let metadata = self.metadata::<E>()?;
        self.load_with(&metadata, id)
    }

    /// Whether a document exists for the id
    pub fn exists<E: 'static>(&self, id: &str) -> Result<bool> {
        let metadata = self.metadata::<E>()?;
        let key = self.keys.entity_key(metadata.table(), id)?;
        Ok(self.store.get(&key)?.is_some())
    }

    pub(crate) fn load_with<E: Default>(&self, metadata: &Entity<E>, id: &str) -> Result<E> {
        let key = self.keys.entity_key(metadata.table(), id)?;
        let bytes = self
            .store
            .get(&key)?
            .ok_or_else(|| OrmError::not_found(metadata.table(), id))?;

        let data = SerialisedData::from_bytes(&bytes)?;
        let mut entity = E::default();
        codec::deserialise(self.serialiser.as_ref(), metadata, &data, &mut entity)?;

        Ok(entity)
    }

    /// Decode the stored document under `key` using a table description
    pub(crate) fn read_document(&self, info: &TableInfo, key: &str) -> Result<Option<Document>> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(bytes) => {
                let data = SerialisedData::from_bytes(&bytes)?;
                let document = self
                    .serialiser
                    .deserialise_document(info.columns(), &data)?;
                Ok(Some(document))
            }
        }
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete an entity and everything derived from it
    pub fn delete<E: 'static>(&self, entity: &E) -> Result<()> {
        let metadata = self.metadata::<E>()?;
        let id = metadata.id_of(entity)?;
        self.delete_by_id::<E>(&id)
    }

    /// Delete an entity by id
    ///
    /// Steps:
    /// 1. Read the stored document (NotFound if absent)
    /// 2. Delete the document
    /// 3. Remove the id from every index bucket and sort set
    /// 4. Remove the id from every edge listed in its ref table
    /// 5. Remove the entity's own edges
    /// 6. Delete the ref table
    pub fn delete_by_id<E: 'static>(&self, id: &str) -> Result<()> {
        let metadata = self.metadata::<E>()?;
        let info = metadata.info();

        // Step 1: Stored state drives the cleanup
        let doc_key = self.keys.entity_key(info.table(), id)?;
        let stored = self
            .read_document(info, &doc_key)?
            .ok_or_else(|| OrmError::not_found(info.table(), id))?;

        // Step 2: Document
        self.apply(StoreOp::Delete { key: doc_key })?;

        // Step 3: Indices
        let index_ops = self.index_removals(info, id, &stored)?;
        for op in &index_ops {
            op.apply(self.store.as_ref())?;
        }

        // Step 4: Edges pointing at the entity
        let references = self.unlink_references(info.table(), id)?;

        // Step 5: Edges owned by the entity
        let outgoing = self.unlink_outgoing(info, id)?;

        // Step 6: Ref table. No rollback: what earlier steps removed stays removed
        let ref_key = self.keys.entity_ref_key(info.table(), id)?;
        self.apply(StoreOp::Delete { key: ref_key })?;

        tracing::debug!(
            table = info.table(),
            id = %id,
            index_entries = index_ops.len(),
            references,
            outgoing,
            "Deleted entity"
        );

        Ok(())
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Run a range query over a sort index
    ///
    /// The ids are read now; entities are loaded as the result is iterated.
    pub fn query<E: Default + 'static>(
        &self,
        query: impl Into<SortedQuery>,
    ) -> Result<QueryResult<'_, E>> {
        let query = query.into();
        let metadata = self.metadata::<E>()?;
        let info = metadata.info();

        if query.table != info.table() {
            return Err(OrmError::InvalidArgument(format!(
                "Query on table {} cannot load entities of table {}",
                query.table,
                info.table()
            )));
        }

        let key = match &query.scope {
            None => {
                if info.sortable(&query.sort_by).is_none() {
                    return Err(OrmError::InvalidArgument(format!(
                        "Table {} has no sort index on {}",
                        info.table(),
                        query.sort_by
                    )));
                }
                self.keys.table_sort_key(info.table(), &query.sort_by)?
            }
            Some(scope) => {
                let rel = &scope.relationship;
                if rel.target_table != info.table() {
                    return Err(OrmError::InvalidArgument(format!(
                        "Relationship {} relates to {}, not {}",
                        rel.name,
                        rel.target_table,
                        info.table()
                    )));
                }
                if rel.sort_by.as_deref() != Some(query.sort_by.as_str()) {
                    return Err(OrmError::InvalidArgument(format!(
                        "Relationship {} is not sorted by {}",
                        rel.name, query.sort_by
                    )));
                }
                self.keys
                    .sort_index_key(rel, &query.sort_by, &scope.source_id)?
            }
        };

        let ids = self
            .store
            .sorted_set_range(&key, query.start, query.end, query.direction)?;

        tracing::debug!(
            key = %key,
            start = query.start,
            end = query.end,
            hits = ids.len(),
            "Sorted query"
        );

        Ok(QueryResult::new(self, metadata, ids))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Typed descriptor of an entity type
    pub fn metadata<E: 'static>(&self) -> Result<Arc<Entity<E>>> {
        self.mapper.entity_metadata::<E>()
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn mapper(&self) -> &Arc<dyn Mapper> {
        &self.mapper
    }

    pub fn key_scheme(&self) -> &dyn KeyScheme {
        self.keys.as_ref()
    }

    pub fn serialiser(&self) -> &dyn Serialiser {
        self.serialiser.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn apply(&self, op: StoreOp) -> Result<()> {
        op.apply(self.store.as_ref())
    }
}
