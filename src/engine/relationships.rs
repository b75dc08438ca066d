//! Relationship edge maintenance
//!
//! ## Records per edge
//! ```text
//! rel:{assoc}:{source}:{target}:{owner}:{field}   target id (single) or set of ids
//! rsrt:{source}:{target}:{owner}:{field}:{col}    related ids scored by target column
//! ref:{target}:{id}                               every edge/sort key listing `id`
//! ```
//!
//! The ref table is what lets a delete find every edge pointing at an
//! entity without scanning.

use std::collections::HashSet;

use crate::codec::Document;
use crate::error::{OrmError, Result};
use crate::keys::KeyKind;
use crate::metadata::{Entity, Relationship, TableInfo};
use crate::store::SortScore;

use super::{EntityManager, QueryResult, StoreOp, WriteSet};

impl EntityManager {
    // =========================================================================
    // Save Planning
    // =========================================================================

    /// Plan the writes that bring one relationship field to `targets`
    pub(super) fn plan_relationship(
        &self,
        rel: &Relationship,
        id: &str,
        document: &Document,
        targets: Vec<String>,
        writes: &mut WriteSet,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        let desired: Vec<String> = targets
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();

        if rel.association.is_single_valued() && desired.len() > 1 {
            return Err(OrmError::InvalidArgument(format!(
                "Relationship {} of {} holds one id, got {}",
                rel.name,
                rel.source_table,
                desired.len()
            )));
        }

        let edge_key = self.keys.relationship_key(rel, id)?;
        let current = self.edge_targets(rel, &edge_key)?;

        let removed: Vec<&String> = current.iter().filter(|t| !desired.contains(t)).collect();
        let added: Vec<&String> = desired.iter().filter(|t| !current.contains(t)).collect();

        if removed.is_empty() && added.is_empty() {
            return Ok(());
        }

        // Forward edge
        if rel.association.is_single_valued() {
            match desired.first() {
                Some(target) => writes.add(StoreOp::Set {
                    key: edge_key.clone(),
                    value: target.as_bytes().to_vec(),
                }),
                None => writes.remove(StoreOp::Delete {
                    key: edge_key.clone(),
                }),
            }
        } else {
            for target in &removed {
                writes.remove(StoreOp::SetRemove {
                    key: edge_key.clone(),
                    member: target.to_string(),
                });
            }
            for target in &added {
                writes.add(StoreOp::SetAdd {
                    key: edge_key.clone(),
                    member: target.to_string(),
                });
            }
        }

        // Sort set and ref tables of the targets
        let sort_key = rel
            .sort_by
            .as_ref()
            .map(|column| self.keys.sort_index_key(rel, column, id))
            .transpose()?;

        for target in &removed {
            let ref_key = self.keys.entity_ref_key(&rel.target_table, target)?;
            writes.remove(StoreOp::SetRemove {
                key: ref_key.clone(),
                member: edge_key.clone(),
            });
            if let Some(sort_key) = &sort_key {
                writes.remove(StoreOp::SortedRemove {
                    key: sort_key.clone(),
                    member: target.to_string(),
                });
                writes.remove(StoreOp::SetRemove {
                    key: ref_key,
                    member: sort_key.clone(),
                });
            }
        }

        for target in &added {
            let ref_key = self.keys.entity_ref_key(&rel.target_table, target)?;
            writes.add(StoreOp::SetAdd {
                key: ref_key.clone(),
                member: edge_key.clone(),
            });
            if let (Some(sort_key), Some(column)) = (&sort_key, &rel.sort_by) {
                if let Some(score) = self.related_score(&rel.target_table, target, column)? {
                    writes.add(StoreOp::SortedUpsert {
                        key: sort_key.clone(),
                        member: target.to_string(),
                        score,
                    });
                }
                // Registered even without a score, so a later save of the target scores it
                writes.add(StoreOp::SetAdd {
                    key: ref_key,
                    member: sort_key.clone(),
                });
            }
        }

        if let Some(inverse) = self.inverse_of(rel) {
            self.plan_inverse(rel, &inverse, id, document, &removed, &added, writes)?;
        }

        Ok(())
    }

    /// Mirror edge changes onto the other side of a bidirectional relationship
    #[allow(clippy::too_many_arguments)]
    fn plan_inverse(
        &self,
        rel: &Relationship,
        inverse: &Relationship,
        id: &str,
        document: &Document,
        removed: &[&String],
        added: &[&String],
        writes: &mut WriteSet,
    ) -> Result<()> {
        let own_ref = self.keys.entity_ref_key(&rel.source_table, id)?;
        let inverse_single = inverse.association.is_single_valued();

        for target in removed {
            let inverse_key = self.keys.relationship_key(inverse, target)?;

            if inverse_single {
                // Leave it if another owner already took the target over
                if self.single_target(&inverse_key)?.as_deref() == Some(id) {
                    writes.remove(StoreOp::Delete {
                        key: inverse_key.clone(),
                    });
                }
            } else {
                writes.remove(StoreOp::SetRemove {
                    key: inverse_key.clone(),
                    member: id.to_string(),
                });
            }
            writes.remove(StoreOp::SetRemove {
                key: own_ref.clone(),
                member: inverse_key,
            });

            if let Some(column) = &inverse.sort_by {
                let sort_key = self.keys.sort_index_key(inverse, column, target)?;
                writes.remove(StoreOp::SortedRemove {
                    key: sort_key.clone(),
                    member: id.to_string(),
                });
                writes.remove(StoreOp::SetRemove {
                    key: own_ref.clone(),
                    member: sort_key,
                });
            }
        }

        for target in added {
            let inverse_key = self.keys.relationship_key(inverse, target)?;

            if inverse_single {
                let previous_owner = self.single_target(&inverse_key)?;
                if let Some(previous) = previous_owner.filter(|owner| owner != id) {
                    self.plan_detach(rel, inverse, &previous, target, writes)?;
                }
                writes.add(StoreOp::Set {
                    key: inverse_key.clone(),
                    value: id.as_bytes().to_vec(),
                });
            } else {
                writes.add(StoreOp::SetAdd {
                    key: inverse_key.clone(),
                    member: id.to_string(),
                });
            }
            writes.add(StoreOp::SetAdd {
                key: own_ref.clone(),
                member: inverse_key,
            });

            if let Some(column) = &inverse.sort_by {
                let sort_key = self.keys.sort_index_key(inverse, column, target)?;
                // The inverse sorts by a column of this entity
                if let Some(score) = document.get(column).and_then(SortScore::from_field) {
                    writes.add(StoreOp::SortedUpsert {
                        key: sort_key.clone(),
                        member: id.to_string(),
                        score,
                    });
                }
                writes.add(StoreOp::SetAdd {
                    key: own_ref.clone(),
                    member: sort_key,
                });
            }
        }

        Ok(())
    }

    /// Take `target` away from the previous owner of a single-valued inverse
    fn plan_detach(
        &self,
        rel: &Relationship,
        inverse: &Relationship,
        previous: &str,
        target: &str,
        writes: &mut WriteSet,
    ) -> Result<()> {
        let edge_key = self.keys.relationship_key(rel, previous)?;
        let target_ref = self.keys.entity_ref_key(&rel.target_table, target)?;

        tracing::debug!(
            relationship = %rel.name,
            target = %target,
            from = %previous,
            "Re-pointing single-valued inverse"
        );

        if rel.association.is_single_valued() {
            if self.single_target(&edge_key)?.as_deref() == Some(target) {
                writes.remove(StoreOp::Delete {
                    key: edge_key.clone(),
                });
            }
        } else {
            writes.remove(StoreOp::SetRemove {
                key: edge_key.clone(),
                member: target.to_string(),
            });
        }
        writes.remove(StoreOp::SetRemove {
            key: target_ref.clone(),
            member: edge_key,
        });

        if let Some(column) = &rel.sort_by {
            let sort_key = self.keys.sort_index_key(rel, column, previous)?;
            writes.remove(StoreOp::SortedRemove {
                key: sort_key.clone(),
                member: target.to_string(),
            });
            writes.remove(StoreOp::SetRemove {
                key: target_ref,
                member: sort_key,
            });
        }

        // The inverse edge is overwritten; unregister it from the old owner
        let inverse_key = self.keys.relationship_key(inverse, target)?;
        writes.remove(StoreOp::SetRemove {
            key: self.keys.entity_ref_key(&rel.source_table, previous)?,
            member: inverse_key,
        });

        Ok(())
    }

    /// Rescore this entity in every relationship sort set that lists it
    pub(super) fn plan_sort_refresh(
        &self,
        info: &TableInfo,
        id: &str,
        document: &Document,
        writes: &mut WriteSet,
    ) -> Result<()> {
        let ref_key = self.keys.entity_ref_key(info.table(), id)?;

        for member in self.store.set_members(&ref_key)? {
            let Some(KeyKind::RelationshipSort {
                target, sort_field, ..
            }) = self.keys.parse_key(&member)
            else {
                continue;
            };
            if target != info.table() || writes.removes(&member, id) {
                continue;
            }

            match document.get(&sort_field).and_then(SortScore::from_field) {
                Some(score) => writes.add(StoreOp::SortedUpsert {
                    key: member,
                    member: id.to_string(),
                    score,
                }),
                None => writes.remove(StoreOp::SortedRemove {
                    key: member,
                    member: id.to_string(),
                }),
            }
        }

        Ok(())
    }

    // =========================================================================
    // Delete Cleanup
    // =========================================================================

    /// Remove `id` from every edge and sort set listed in its ref table
    ///
    /// Edges left empty are deleted. Returns the number of entries walked.
    pub(super) fn unlink_references(&self, table: &str, id: &str) -> Result<usize> {
        let ref_key = self.keys.entity_ref_key(table, id)?;
        let members = self.store.set_members(&ref_key)?;

        for member in &members {
            match self.keys.parse_key(member) {
                Some(KeyKind::Relationship { association, .. }) => {
                    if association.is_single_valued() {
                        if self.single_target(member)?.as_deref() == Some(id) {
                            self.apply(StoreOp::Delete {
                                key: member.clone(),
                            })?;
                        }
                    } else {
                        self.apply(StoreOp::SetRemove {
                            key: member.clone(),
                            member: id.to_string(),
                        })?;
                        if self.store.set_members(member)?.is_empty() {
                            self.apply(StoreOp::Delete {
                                key: member.clone(),
                            })?;
                        }
                    }
                }
                Some(KeyKind::RelationshipSort { .. }) => {
                    self.apply(StoreOp::SortedRemove {
                        key: member.clone(),
                        member: id.to_string(),
                    })?;
                    if self.store.sorted_set_len(member)? == 0 {
                        self.apply(StoreOp::Delete {
                            key: member.clone(),
                        })?;
                    }
                }
                _ => {
                    tracing::warn!(
                        key = %member,
                        ref_table = %ref_key,
                        "Skipping unrecognised ref-table entry"
                    );
                }
            }
        }

        Ok(members.len())
    }

    /// Delete the edges and sort sets owned by `id`
    ///
    /// Covers the declared relationships and the inverse sides derived for
    /// tables that declare none. Each target's ref table forgets the deleted
    /// keys. Returns the number of targets unlinked.
    pub(super) fn unlink_outgoing(&self, info: &TableInfo, id: &str) -> Result<usize> {
        let mut unlinked = 0;

        for rel in info.relationships() {
            unlinked += self.unlink_edge(rel, id)?;
        }
        for rel in self.derived_inverses(info, id)? {
            unlinked += self.unlink_edge(&rel, id)?;
        }

        Ok(unlinked)
    }

    /// Delete one edge owned by `id` together with its sort set
    fn unlink_edge(&self, rel: &Relationship, id: &str) -> Result<usize> {
        let edge_key = self.keys.relationship_key(rel, id)?;
        let targets = self.edge_targets(rel, &edge_key)?;
        let sort_key = rel
            .sort_by
            .as_ref()
            .map(|column| self.keys.sort_index_key(rel, column, id))
            .transpose()?;

        self.apply(StoreOp::Delete {
            key: edge_key.clone(),
        })?;
        if let Some(sort_key) = &sort_key {
            self.apply(StoreOp::Delete {
                key: sort_key.clone(),
            })?;
        }

        for target in &targets {
            let ref_key = self.keys.entity_ref_key(&rel.target_table, target)?;
            self.apply(StoreOp::SetRemove {
                key: ref_key.clone(),
                member: edge_key.clone(),
            })?;
            if let Some(sort_key) = &sort_key {
                self.apply(StoreOp::SetRemove {
                    key: ref_key,
                    member: sort_key.clone(),
                })?;
            }
        }

        Ok(targets.len())
    }

    /// Inverse sides `id` holds for relationships its table does not declare
    ///
    /// Found through the forward edges listed in the entity's ref table.
    fn derived_inverses(&self, info: &TableInfo, id: &str) -> Result<Vec<Relationship>> {
        let ref_key = self.keys.entity_ref_key(info.table(), id)?;
        let mut inverses: Vec<Relationship> = Vec::new();

        for member in self.store.set_members(&ref_key)? {
            let Some(KeyKind::Relationship { source, target, field, .. }) =
                self.keys.parse_key(&member)
            else {
                continue;
            };
            if target != info.table() {
                continue;
            }
            let Some(inverse) = self
                .mapper
                .declared_relationship(&source, &field)
                .and_then(|forward| self.inverse_of(&forward))
            else {
                continue;
            };
            if info.relationship(&inverse.name).is_some()
                || inverses.iter().any(|known| known.name == inverse.name)
            {
                continue;
            }
            inverses.push(inverse);
        }

        Ok(inverses)
    }

    // =========================================================================
    // Lazy Resolution
    // =========================================================================

    /// Ids related to entity `id` of type `E` through `relationship`
    pub fn related_ids<E: 'static>(&self, id: &str, relationship: &str) -> Result<Vec<String>> {
        let metadata = self.metadata::<E>()?;
        let rel = declared(&metadata, relationship)?;
        let edge_key = self.keys.relationship_key(rel, id)?;
        self.edge_targets(rel, &edge_key)
    }

    /// Entities related to entity `id` of type `E`, loaded lazily
    pub fn load_related<E: 'static, T: Default + 'static>(
        &self,
        id: &str,
        relationship: &str,
    ) -> Result<QueryResult<'_, T>> {
        let metadata = self.metadata::<E>()?;
        let rel = declared(&metadata, relationship)?;
        let target = self.metadata::<T>()?;

        if rel.target_table != target.table() {
            return Err(OrmError::InvalidArgument(format!(
                "Relationship {} relates to {}, not {}",
                rel.name,
                rel.target_table,
                target.table()
            )));
        }

        let edge_key = self.keys.relationship_key(rel, id)?;
        let ids = self.edge_targets(rel, &edge_key)?;
        Ok(QueryResult::new(self, target, ids))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Current targets of an edge
    fn edge_targets(&self, rel: &Relationship, edge_key: &str) -> Result<Vec<String>> {
        if rel.association.is_single_valued() {
            Ok(self.single_target(edge_key)?.into_iter().collect())
        } else {
            self.store.set_members(edge_key)
        }
    }

    /// Value of a single-valued edge
    fn single_target(&self, edge_key: &str) -> Result<Option<String>> {
        match self.store.get(edge_key)? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes.to_vec()).map(Some).map_err(|e| {
                OrmError::Serialization(format!("Edge {} is not UTF-8: {}", edge_key, e))
            }),
        }
    }

    /// Descriptor of the other side of a bidirectional relationship
    ///
    /// The target's registered descriptor wins, so its sort column is honoured.
    fn inverse_of(&self, rel: &Relationship) -> Option<Relationship> {
        let name = rel.inversed_by.as_ref()?;
        self.mapper
            .declared_relationship(&rel.target_table, name)
            .filter(|inverse| inverse.target_table == rel.source_table)
            .or_else(|| rel.inverse())
    }

    /// Sort score of a related entity, read from its stored document
    fn related_score(&self, table: &str, id: &str, column: &str) -> Result<Option<SortScore>> {
        let info = self.mapper.table(table).ok_or_else(|| {
            OrmError::InvalidArgument(format!("No metadata registered for table {}", table))
        })?;
        let key = self.keys.entity_key(table, id)?;

        match self.read_document(&info, &key)? {
            Some(document) => Ok(document.get(column).and_then(SortScore::from_field)),
            None if self.config.strict_relationship_scores => Err(OrmError::not_found(table, id)),
            None => {
                tracing::warn!(
                    table = %table,
                    id = %id,
                    column = %column,
                    "Related entity has no document; leaving it unscored"
                );
                Ok(None)
            }
        }
    }
}

fn declared<'a, E>(metadata: &'a Entity<E>, name: &str) -> Result<&'a Relationship> {
    metadata
        .relationship(name)
        .map(|field| field.relationship())
        .ok_or_else(|| {
            OrmError::InvalidArgument(format!(
                "Table {} has no relationship {}",
                metadata.table(),
                name
            ))
        })
}
