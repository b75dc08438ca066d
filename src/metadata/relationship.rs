//! Relationship descriptors

/// Association kind of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Association {
    /// Short code embedded in edge keys
    pub fn code(&self) -> &'static str {
        match self {
            Association::OneToOne => "o2o",
            Association::OneToMany => "o2m",
            Association::ManyToOne => "m2o",
            Association::ManyToMany => "m2m",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "o2o" => Some(Association::OneToOne),
            "o2m" => Some(Association::OneToMany),
            "m2o" => Some(Association::ManyToOne),
            "m2m" => Some(Association::ManyToMany),
            _ => None,
        }
    }

    /// Whether the owning side holds at most one target id
    pub fn is_single_valued(&self) -> bool {
        matches!(self, Association::OneToOne | Association::ManyToOne)
    }

    /// Association seen from the other side
    pub fn inverse(&self) -> Self {
        match self {
            Association::OneToOne => Association::OneToOne,
            Association::OneToMany => Association::ManyToOne,
            Association::ManyToOne => Association::OneToMany,
            Association::ManyToMany => Association::ManyToMany,
        }
    }
}

/// A relationship from one table to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Local field holding the relationship
    pub name: String,
    pub association: Association,
    /// Owning table, filled in by the entity builder
    pub source_table: String,
    pub target_table: String,
    /// Field on the target holding the other side (`None` ⇒ unidirectional)
    pub inversed_by: Option<String>,
    /// Column on the target entity ordering the related ids
    pub sort_by: Option<String>,
}

impl Relationship {
    pub fn new(
        name: impl Into<String>,
        association: Association,
        target_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            association,
            source_table: String::new(),
            target_table: target_table.into(),
            inversed_by: None,
            sort_by: None,
        }
    }

    pub fn one_to_one(name: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self::new(name, Association::OneToOne, target_table)
    }

    pub fn one_to_many(name: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self::new(name, Association::OneToMany, target_table)
    }

    pub fn many_to_one(name: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self::new(name, Association::ManyToOne, target_table)
    }

    pub fn many_to_many(name: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self::new(name, Association::ManyToMany, target_table)
    }

    /// Make the relationship bidirectional
    pub fn inversed_by(mut self, field: impl Into<String>) -> Self {
        self.inversed_by = Some(field.into());
        self
    }

    /// Keep related ids ordered by a target column
    pub fn sorted_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self
    }

    pub fn is_bidirectional(&self) -> bool {
        self.inversed_by.is_some()
    }

    /// Descriptor of the other side, derived from this one
    ///
    /// Used when the target table has no registered descriptor of its own.
    pub fn inverse(&self) -> Option<Relationship> {
        let name = self.inversed_by.clone()?;
        Some(Relationship {
            name,
            association: self.association.inverse(),
            source_table: self.target_table.clone(),
            target_table: self.source_table.clone(),
            inversed_by: Some(self.name.clone()),
            sort_by: None,
        })
    }
}
