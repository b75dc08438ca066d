//! Entity and column descriptors
//!
//! An `Entity<E>` pairs the plain table description (`TableInfo`) with the
//! accessor functions that read and write a Rust value of type `E`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::codec::{Document, FieldType, FieldValue, ObjectClass};
use crate::error::{OrmError, Result};

use super::{Index, Relationship, SortIndex};

/// Reads one column from an entity
pub type Getter<E> = fn(&E) -> FieldValue;

/// Writes one column into an entity
pub type Setter<E> = fn(&mut E, FieldValue) -> Result<()>;

/// Reads the ids held by a relationship field
///
/// `None` means the field was never populated and its stored edges must be
/// left alone; `Some(vec![])` clears them.
pub type RelationshipGetter<E> = fn(&E) -> Option<Vec<String>>;

/// Name and type of a column, independent of the entity type
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub field_type: FieldType,
    /// Class identity of OBJECT columns
    pub class: Option<ObjectClass>,
}

/// A column with its accessor pair
pub struct Column<E> {
    info: ColumnInfo,
    getter: Getter<E>,
    setter: Setter<E>,
}

impl<E> Column<E> {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        getter: Getter<E>,
        setter: Setter<E>,
    ) -> Self {
        Self {
            info: ColumnInfo {
                name: name.into(),
                field_type,
                class: None,
            },
            getter,
            setter,
        }
    }

    /// An OBJECT column whose values are rebuilt through `class`
    pub fn object(
        name: impl Into<String>,
        class: ObjectClass,
        getter: Getter<E>,
        setter: Setter<E>,
    ) -> Self {
        Self {
            info: ColumnInfo {
                name: name.into(),
                field_type: FieldType::Object,
                class: Some(class),
            },
            getter,
            setter,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn field_type(&self) -> FieldType {
        self.info.field_type
    }

    pub fn info(&self) -> &ColumnInfo {
        &self.info
    }

    pub fn get(&self, entity: &E) -> FieldValue {
        (self.getter)(entity)
    }

    pub fn set(&self, entity: &mut E, value: FieldValue) -> Result<()> {
        (self.setter)(entity, value)
    }
}

impl<E> Clone for Column<E> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            getter: self.getter,
            setter: self.setter,
        }
    }
}

impl<E> fmt::Debug for Column<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column").field("info", &self.info).finish()
    }
}

/// A relationship with the accessor reading its ids
pub struct RelationshipField<E> {
    relationship: Relationship,
    getter: RelationshipGetter<E>,
}

impl<E> RelationshipField<E> {
    pub fn relationship(&self) -> &Relationship {
        &self.relationship
    }

    pub fn ids(&self, entity: &E) -> Option<Vec<String>> {
        (self.getter)(entity)
    }
}

impl<E> fmt::Debug for RelationshipField<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipField")
            .field("relationship", &self.relationship)
            .finish()
    }
}

// =============================================================================
// TableInfo
// =============================================================================

/// Plain description of a table
#[derive(Debug, Clone)]
pub struct TableInfo {
    table: String,
    id_column: String,
    columns: Vec<ColumnInfo>,
    relationships: Vec<Relationship>,
    indices: Vec<Index>,
    sortables: Vec<SortIndex>,
}

impl TableInfo {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indices.iter().find(|i| i.name == name)
    }

    pub fn sortables(&self) -> &[SortIndex] {
        &self.sortables
    }

    pub fn sortable(&self, column: &str) -> Option<&SortIndex> {
        self.sortables.iter().find(|s| s.column == column)
    }
}

// =============================================================================
// Entity
// =============================================================================

/// Full metadata for entity type `E`
pub struct Entity<E> {
    info: Arc<TableInfo>,
    columns: Vec<Column<E>>,
    id_index: usize,
    relationships: Vec<RelationshipField<E>>,
}

impl<E> Entity<E> {
    pub fn builder(table: impl Into<String>) -> EntityBuilder<E> {
        EntityBuilder::new(table)
    }

    pub fn info(&self) -> &Arc<TableInfo> {
        &self.info
    }

    pub fn table(&self) -> &str {
        self.info.table()
    }

    pub fn columns(&self) -> &[Column<E>] {
        &self.columns
    }

    pub fn id_column(&self) -> &Column<E> {
        &self.columns[self.id_index]
    }

    pub fn relationships(&self) -> &[RelationshipField<E>] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipField<E>> {
        self.relationships.iter().find(|r| r.relationship.name == name)
    }

    /// Render the entity's id
    ///
    /// Fails with InvalidArgument when the id is null or empty.
    pub fn id_of(&self, entity: &E) -> Result<String> {
        match self.id_column().get(entity).index_string() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(OrmError::InvalidArgument(format!(
                "Entity of table {} has no id in column {}",
                self.table(),
                self.id_column().name()
            ))),
        }
    }

    /// Read every column into a document
    pub fn read_document(&self, entity: &E) -> Document {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.get(entity)))
            .collect()
    }

    /// Write every column present in the document
    ///
    /// Columns absent from the document (skipped by the codec) are left alone.
    pub fn write_document(&self, entity: &mut E, mut document: Document) -> Result<()> {
        for column in &self.columns {
            if let Some(value) = document.remove(column.name()) {
                column.set(entity, value)?;
            }
        }
        Ok(())
    }
}

impl<E> fmt::Debug for Entity<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity").field("info", &self.info).finish()
    }
}

/// Builder for Entity
pub struct EntityBuilder<E> {
    table: String,
    id_column: Option<String>,
    columns: Vec<Column<E>>,
    relationships: Vec<RelationshipField<E>>,
    indices: Vec<Index>,
    sortables: Vec<SortIndex>,
}

impl<E> EntityBuilder<E> {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: None,
            columns: Vec::new(),
            relationships: Vec::new(),
            indices: Vec::new(),
            sortables: Vec::new(),
        }
    }

    /// Name the id column
    pub fn id(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    pub fn column(mut self, column: Column<E>) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relationship(
        mut self,
        relationship: Relationship,
        getter: RelationshipGetter<E>,
    ) -> Self {
        self.relationships.push(RelationshipField {
            relationship,
            getter,
        });
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    pub fn sortable(mut self, sortable: SortIndex) -> Self {
        self.sortables.push(sortable);
        self
    }

    /// Validate and build the descriptor
    pub fn build(self) -> Result<Entity<E>> {
        let invalid = |msg: String| Err(OrmError::InvalidArgument(msg));
        let table = self.table;

        if table.is_empty() {
            return invalid("Entity table name must not be empty".to_string());
        }

        let mut names = HashSet::new();
        for column in &self.columns {
            if column.name().is_empty() {
                return invalid(format!("Table {} has a column with an empty name", table));
            }
            if !names.insert(column.name()) {
                return invalid(format!("Table {} declares column {} twice", table, column.name()));
            }
        }

        let id_name = match self.id_column {
            Some(id) => id,
            None => return invalid(format!("Table {} has no id column", table)),
        };
        let id_index = match self.columns.iter().position(|c| c.name() == id_name) {
            Some(i) => i,
            None => return invalid(format!("Id column {} is not a column of {}", id_name, table)),
        };
        if !self.columns[id_index].field_type().is_scalar() {
            return invalid(format!(
                "Id column {} of {} must be a scalar type, not {}",
                id_name,
                table,
                self.columns[id_index].field_type().name()
            ));
        }

        let has_column = |name: &str| names.contains(name);

        let mut indices = self.indices;
        for index in &mut indices {
            if index.columns.is_empty() {
                return invalid(format!("Index {} of {} has no columns", index.name, table));
            }
            if let Some(c) = index.columns.iter().find(|c| !has_column(c.as_str())) {
                return invalid(format!("Index {} refers to unknown column {}", index.name, c));
            }
            if let Some(c) = index.conditions.iter().find(|c| !has_column(c.column.as_str())) {
                return invalid(format!(
                    "Index {} condition refers to unknown column {}",
                    index.name, c.column
                ));
            }
            index.table = table.clone();
        }

        let mut sortables = self.sortables;
        for sortable in &mut sortables {
            if !has_column(sortable.column.as_str()) {
                return invalid(format!(
                    "Sort index on unknown column {} of {}",
                    sortable.column, table
                ));
            }
            if let Some(c) = sortable.conditions.iter().find(|c| !has_column(c.column.as_str())) {
                return invalid(format!(
                    "Sort index condition refers to unknown column {}",
                    c.column
                ));
            }
            sortable.table = table.clone();
        }

        let mut relationships = self.relationships;
        let mut rel_names = HashSet::new();
        for field in &mut relationships {
            let rel = &mut field.relationship;
            if !rel_names.insert(rel.name.clone()) {
                return invalid(format!("Table {} declares relationship {} twice", table, rel.name));
            }
            if rel.association.is_single_valued() && rel.sort_by.is_some() {
                return invalid(format!(
                    "Relationship {} of {} holds a single id and cannot be sorted",
                    rel.name, table
                ));
            }
            rel.source_table = table.clone();
        }

        let info = TableInfo {
            table,
            id_column: id_name,
            columns: self.columns.iter().map(|c| c.info.clone()).collect(),
            relationships: relationships.iter().map(|r| r.relationship.clone()).collect(),
            indices,
            sortables,
        };

        Ok(Entity {
            info: Arc::new(info),
            columns: self.columns,
            id_index,
            relationships,
        })
    }
}
