//! Lazily hydrated query results

use std::slice;
use std::sync::Arc;

use crate::error::Result;
use crate::metadata::Entity;

use super::EntityManager;

/// Ids produced by a query, hydrated on iteration
///
/// Iterating twice loads each entity twice; nothing is cached. An id whose
/// document has vanished since the ids were read yields NotFound.
pub struct QueryResult<'a, E> {
    manager: &'a EntityManager,
    metadata: Arc<Entity<E>>,
    ids: Vec<String>,
}

impl<'a, E: Default> QueryResult<'a, E> {
    pub(crate) fn new(
        manager: &'a EntityManager,
        metadata: Arc<Entity<E>>,
        ids: Vec<String>,
    ) -> Self {
        Self {
            manager,
            metadata,
            ids,
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Start a fresh pass over the entities
    pub fn iter(&self) -> QueryIter<'_, E> {
        QueryIter {
            manager: self.manager,
            metadata: &self.metadata,
            ids: self.ids.iter(),
        }
    }

    /// Load every entity, stopping at the first failure
    pub fn load_all(&self) -> Result<Vec<E>> {
        self.iter().collect()
    }
}

impl<'r, 'a, E: Default> IntoIterator for &'r QueryResult<'a, E> {
    type Item = Result<E>;
    type IntoIter = QueryIter<'r, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator loading one entity per step
pub struct QueryIter<'r, E> {
    manager: &'r EntityManager,
    metadata: &'r Entity<E>,
    ids: slice::Iter<'r, String>,
}

impl<E: Default> Iterator for QueryIter<'_, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        Some(self.manager.load_with(self.metadata, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl<E: Default> ExactSizeIterator for QueryIter<'_, E> {}
