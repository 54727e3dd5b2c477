//! Raw per-class mapping facts.
//!
//! These types are the narrow interface through which a [`crate::metadata::source::MappingSource`]
//! hands over what it parsed from annotations, XML or configuration. They describe a single
//! class in isolation; inherited state is only combined once metadata is built and linked to
//! its parent.
//!
//! # Key Components
//!
//! - [`MappingFacts`] - Everything the mapping source knows about one class
//! - [`MetadataKind`] - The closed set of metadata representations
//! - [`FieldMapping`] / [`FieldFlags`] - Column mapped properties
//! - [`AssociationMapping`] / [`AssociationKind`] - References to other mapped classes
//!
//! # Examples
//!
//! ```rust
//! use mapscope::metadata::mapping::{AssociationKind, FieldFlags, MappingFacts};
//!
//! let facts = MappingFacts::entity("users")
//!     .id("id")
//!     .field("email", FieldFlags::UNIQUE)
//!     .association("group", "App\\Group", AssociationKind::ManyToOne);
//!
//! assert_eq!(facts.identifier(), vec!["id"]);
//! assert!(facts.field_named("email").is_some());
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The closed set of metadata representations a class can be mapped as.
///
/// The definition builder picks exactly one kind per class; instantiation then dispatches
/// on it statically.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MetadataKind {
    /// A class with its own identity, stored in a table
    #[default]
    Entity,
    /// A non-instantiable base class contributing mapped fields to its descendants
    MappedSuperclass,
    /// A value object stored inline in the table of its owner
    Embeddable,
}

impl MetadataKind {
    /// Returns `true` for kinds that take part in an entity inheritance hierarchy.
    #[must_use]
    pub fn is_hierarchy_member(self) -> bool {
        matches!(self, MetadataKind::Entity | MetadataKind::MappedSuperclass)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    /// Storage flags of a mapped field
    pub struct FieldFlags : u8 {
        /// The field is part of the identifier
        const IDENTIFIER = 0x01;
        /// The column accepts NULL
        const NULLABLE = 0x02;
        /// The column carries a unique constraint
        const UNIQUE = 0x04;
        /// The field is used for optimistic locking
        const VERSION = 0x08;
    }
}

/// A property mapped to a single column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Property name on the class
    pub name: String,
    /// Column name in the table
    pub column: String,
    /// Storage flags
    pub flags: FieldFlags,
}

impl FieldMapping {
    /// Returns `true` if this field is part of the identifier.
    #[must_use]
    pub fn is_identifier(&self) -> bool {
        self.flags.contains(FieldFlags::IDENTIFIER)
    }
}

/// Cardinality of an association.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AssociationKind {
    /// Single-valued, unique on the owning side
    OneToOne,
    /// Single-valued
    ManyToOne,
    /// Collection-valued, inverse side of a many-to-one
    OneToMany,
    /// Collection-valued through a join table
    ManyToMany,
}

/// A property referencing another mapped class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationMapping {
    /// Property name on the class
    pub field: String,
    /// Canonical name of the referenced class
    pub target: String,
    /// Cardinality
    pub kind: AssociationKind,
}

/// Everything a mapping source knows about one class, without inherited state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingFacts {
    /// Representation the class is mapped as
    pub kind: MetadataKind,
    /// Explicit table name, only meaningful for entities
    pub table: Option<String>,
    /// Fields declared on this class
    pub fields: Vec<FieldMapping>,
    /// Associations declared on this class
    pub associations: Vec<AssociationMapping>,
}

impl MappingFacts {
    /// Facts of an entity stored in `table`.
    #[must_use]
    pub fn entity(table: &str) -> Self {
        MappingFacts {
            kind: MetadataKind::Entity,
            table: Some(table.to_string()),
            ..Default::default()
        }
    }

    /// Facts of a mapped superclass.
    #[must_use]
    pub fn mapped_superclass() -> Self {
        MappingFacts {
            kind: MetadataKind::MappedSuperclass,
            ..Default::default()
        }
    }

    /// Facts of an embeddable value object.
    #[must_use]
    pub fn embeddable() -> Self {
        MappingFacts {
            kind: MetadataKind::Embeddable,
            ..Default::default()
        }
    }

    /// Adds a field whose column has the same name as the property.
    #[must_use]
    pub fn field(self, name: &str, flags: FieldFlags) -> Self {
        self.column(name, name, flags)
    }

    /// Adds a field mapped to an explicitly named column.
    #[must_use]
    pub fn column(mut self, name: &str, column: &str, flags: FieldFlags) -> Self {
        self.fields.push(FieldMapping {
            name: name.to_string(),
            column: column.to_string(),
            flags,
        });
        self
    }

    /// Adds an identifier field.
    #[must_use]
    pub fn id(self, name: &str) -> Self {
        self.field(name, FieldFlags::IDENTIFIER)
    }

    /// Adds an association to `target`.
    #[must_use]
    pub fn association(mut self, field: &str, target: &str, kind: AssociationKind) -> Self {
        self.associations.push(AssociationMapping {
            field: field.to_string(),
            target: target.to_string(),
            kind,
        });
        self
    }

    /// Names of the identifier fields declared on this class.
    #[must_use]
    pub fn identifier(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.is_identifier())
            .map(|field| field.name.as_str())
            .collect()
    }

    /// Looks up a declared field by property name.
    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|field| field.name == name)
    }
}
