//! Standard and sort index maintenance

use crate::codec::Document;
use crate::error::{OrmError, Result};
use crate::metadata::{Index, TableInfo};

use super::{EntityManager, QueryResult, StoreOp, WriteSet};

impl EntityManager {
    /// Plan bucket moves and sort-set rescoring for one save
    ///
    /// An id leaves its old bucket only when the bucket key changed; it is
    /// always (re)added to the current one. A stale sort score is removed
    /// before the new score is written.
    pub(super) fn plan_indices(
        &self,
        info: &TableInfo,
        id: &str,
        previous: Option<&Document>,
        document: &Document,
        writes: &mut WriteSet,
    ) -> Result<()> {
        for index in info.indices() {
            let old_key = previous
                .and_then(|d| index.values(d))
                .map(|v| self.bucket_key(index, &v))
                .transpose()?;
            let new_key = index
                .values(document)
                .map(|v| self.bucket_key(index, &v))
                .transpose()?;

            if let Some(old) = old_key {
                if new_key.as_ref() != Some(&old) {
                    writes.remove(StoreOp::SetRemove {
                        key: old,
                        member: id.to_string(),
                    });
                }
            }
            if let Some(key) = new_key {
                writes.add(StoreOp::SetAdd {
                    key,
                    member: id.to_string(),
                });
            }
        }

        for sortable in info.sortables() {
            let key = self.keys.table_sort_key(info.table(), &sortable.column)?;
            let old_score = previous.and_then(|d| sortable.score(d));
            let new_score = sortable.score(document);

            if old_score.is_some() && old_score != new_score {
                writes.remove(StoreOp::SortedRemove {
                    key: key.clone(),
                    member: id.to_string(),
                });
            }
            if let Some(score) = new_score {
                writes.add(StoreOp::SortedUpsert {
                    key,
                    member: id.to_string(),
                    score,
                });
            }
        }

        Ok(())
    }

    /// Removals taking a stored document out of every index
    pub(super) fn index_removals(
        &self,
        info: &TableInfo,
        id: &str,
        stored: &Document,
    ) -> Result<Vec<StoreOp>> {
        let mut ops = Vec::new();

        for index in info.indices() {
            if let Some(values) = index.values(stored) {
                ops.push(StoreOp::SetRemove {
                    key: self.bucket_key(index, &values)?,
                    member: id.to_string(),
                });
            }
        }

        // Unconditional: a sort set may hold a score written under other conditions
        for sortable in info.sortables() {
            ops.push(StoreOp::SortedRemove {
                key: self.keys.table_sort_key(info.table(), &sortable.column)?,
                member: id.to_string(),
            });
        }

        Ok(ops)
    }

    fn bucket_key(&self, index: &Index, values: &[String]) -> Result<String> {
        self.keys.index_key(index, &self.keys.index_value(values))
    }

    // =========================================================================
    // Index Lookup
    // =========================================================================

    /// Ids in the bucket of a standard index matching `values`
    ///
    /// One value per indexed column, rendered the way the column renders
    /// (`true`/`false` for booleans, RFC 3339 for datetimes).
    pub fn retrieve_by_index<E: 'static>(
        &self,
        index_name: &str,
        values: &[&str],
    ) -> Result<Vec<String>> {
        let metadata = self.metadata::<E>()?;
        let key = self.lookup_key(metadata.info(), index_name, values)?;
        self.store.set_members(&key)
    }

    /// Entities in the bucket of a standard index, loaded lazily
    pub fn load_by_index<E: Default + 'static>(
        &self,
        index_name: &str,
        values: &[&str],
    ) -> Result<QueryResult<'_, E>> {
        let metadata = self.metadata::<E>()?;
        let key = self.lookup_key(metadata.info(), index_name, values)?;
        let ids = self.store.set_members(&key)?;
        Ok(QueryResult::new(self, metadata, ids))
    }

    fn lookup_key(&self, info: &TableInfo, index_name: &str, values: &[&str]) -> Result<String> {
        let index = info.index(index_name).ok_or_else(|| {
            OrmError::InvalidArgument(format!(
                "Table {} has no index {}",
                info.table(),
                index_name
            ))
        })?;

        if values.len() != index.columns.len() {
            return Err(OrmError::InvalidArgument(format!(
                "Index {} covers {} columns, got {} values",
                index_name,
                index.columns.len(),
                values.len()
            )));
        }

        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.bucket_key(index, &values)
    }
}
