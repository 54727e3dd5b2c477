//! Built class metadata and its two-phase construction.
//!
//! Metadata for a class moves through three states. A
//! [`crate::metadata::definition::ClassMetadataDefinition`] is the unbound build plan.
//! Instantiating it yields a [`ConstructedMetadata`], whose identity, shape and parent link are
//! fixed but which carries no reflection. Binding a [`ReflectionHandle`] consumes it and yields a
//! [`ClassMetadata`], the only state that can be cached or handed to callers.
//!
//! Parent links are non-owning: a [`ClassMetadataRef`] holds a weak reference into the
//! resolver's cache, which alone owns the lifetime of every metadata object.
//!
//! # Examples
//!
//! ```rust
//! use mapscope::metadata::{
//!     classmeta::ConstructedMetadata, mapping::MappingFacts, source::ReflectionHandle,
//! };
//! use std::sync::Arc;
//!
//! let facts = MappingFacts::entity("users").id("id");
//! let constructed = ConstructedMetadata::new("App\\User", facts, None);
//! let handle = ReflectionHandle::new("App\\User", vec!["id".to_string()]);
//! let metadata = Arc::new(constructed.bind(handle)?);
//!
//! assert_eq!(metadata.table_name(), Some("users"));
//! assert!(metadata.is_root());
//! # Ok::<(), mapscope::Error>(())
//! ```

use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        mapping::{AssociationMapping, FieldMapping, MappingFacts, MetadataKind},
        source::ReflectionHandle,
    },
    Error, Result,
};

/// Reference to a `ClassMetadata`
pub type ClassMetadataRc = Arc<ClassMetadata>;

/// A non-owning link to a `ClassMetadata` held by the resolver cache
#[derive(Clone, Debug)]
pub struct ClassMetadataRef {
    weak_ref: Weak<ClassMetadata>,
}

impl ClassMetadataRef {
    /// Create a new `ClassMetadataRef` from a strong reference
    #[must_use]
    pub fn new(strong_ref: &ClassMetadataRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the metadata, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<ClassMetadataRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced metadata is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// Returns `true` if this link points at exactly `other`
    #[must_use]
    pub fn points_to(&self, other: &ClassMetadataRc) -> bool {
        Weak::ptr_eq(&self.weak_ref, &Arc::downgrade(other))
    }
}

impl From<&ClassMetadataRc> for ClassMetadataRef {
    fn from(strong_ref: &ClassMetadataRc) -> Self {
        ClassMetadataRef::new(strong_ref)
    }
}

/// Representation-specific part of the metadata, one variant per [`MetadataKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataShape {
    /// Stored in its own table
    Entity {
        /// Table name
        table: String,
    },
    /// Contributes fields to descendants, never stored itself
    MappedSuperclass,
    /// Stored inline in its owner's table
    Embeddable,
}

impl MetadataShape {
    /// The kind tag of this shape.
    #[must_use]
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataShape::Entity { .. } => MetadataKind::Entity,
            MetadataShape::MappedSuperclass => MetadataKind::MappedSuperclass,
            MetadataShape::Embeddable => MetadataKind::Embeddable,
        }
    }
}

/// Table name derived from the short class name, used when the mapping names none.
#[must_use]
pub fn default_table_name(class: &str) -> String {
    class
        .rsplit(|c: char| c == '\\' || c == '.' || c == ':')
        .find(|segment| !segment.is_empty())
        .unwrap_or(class)
        .to_string()
}

/// Metadata whose shape and parent are fixed but which has no reflection attached yet.
///
/// This state cannot be cached by the resolver; call [`ConstructedMetadata::bind`] to
/// obtain a [`ClassMetadata`].
#[derive(Debug)]
pub struct ConstructedMetadata {
    name: String,
    shape: MetadataShape,
    parent: Option<ClassMetadataRef>,
    parent_name: Option<String>,
    fields: Vec<FieldMapping>,
    associations: Vec<AssociationMapping>,
}

impl ConstructedMetadata {
    /// Constructs metadata for `name` from its raw facts, linked to `parent`.
    ///
    /// The shape follows `facts.kind`. This is the public entry point for manually
    /// registered metadata; the resolver goes through its definitions instead.
    #[must_use]
    pub fn new(name: &str, facts: MappingFacts, parent: Option<&ClassMetadataRc>) -> Self {
        let shape = match facts.kind {
            MetadataKind::Entity => MetadataShape::Entity {
                table: facts.table.unwrap_or_else(|| default_table_name(name)),
            },
            MetadataKind::MappedSuperclass => MetadataShape::MappedSuperclass,
            MetadataKind::Embeddable => MetadataShape::Embeddable,
        };

        Self::with_shape(
            name,
            shape,
            parent.map(ClassMetadataRef::new),
            parent.map(|p| p.name().to_string()),
            facts.fields,
            facts.associations,
        )
    }

    pub(crate) fn with_shape(
        name: &str,
        shape: MetadataShape,
        parent: Option<ClassMetadataRef>,
        parent_name: Option<String>,
        fields: Vec<FieldMapping>,
        associations: Vec<AssociationMapping>,
    ) -> Self {
        ConstructedMetadata {
            name: name.to_string(),
            shape,
            parent,
            parent_name,
            fields,
            associations,
        }
    }

    /// Canonical class name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Representation kind
    #[must_use]
    pub fn kind(&self) -> MetadataKind {
        self.shape.kind()
    }

    /// Fields declared on this class
    #[must_use]
    pub fn declared_fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Parent metadata, if any and still alive
    #[must_use]
    pub fn parent(&self) -> Option<ClassMetadataRc> {
        self.parent.as_ref().and_then(ClassMetadataRef::upgrade)
    }

    /// Attaches the reflection handle, completing construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvableClass`] if the handle was produced for a different class.
    pub fn bind(self, reflection: ReflectionHandle) -> Result<ClassMetadata> {
        if reflection.class_name != self.name {
            return Err(Error::UnresolvableClass {
                class: self.name,
                message: format!(
                    "reflection handle belongs to '{}'",
                    reflection.class_name
                ),
            });
        }

        Ok(ClassMetadata {
            name: self.name,
            shape: self.shape,
            parent: self.parent,
            parent_name: self.parent_name,
            fields: self.fields,
            associations: self.associations,
            reflection,
        })
    }
}

/// The built, queryable mapping description of exactly one class.
///
/// Only obtainable through [`ConstructedMetadata::bind`], so every instance carries its
/// reflection handle.
#[derive(Debug)]
pub struct ClassMetadata {
    /// Canonical class name
    name: String,
    /// Representation-specific data
    shape: MetadataShape,
    /// Non-owning link to the effective (non-transient) parent
    parent: Option<ClassMetadataRef>,
    /// Name of the parent, kept for diagnostics even if the parent was dropped
    parent_name: Option<String>,
    /// Fields declared on this class
    fields: Vec<FieldMapping>,
    /// Associations declared on this class
    associations: Vec<AssociationMapping>,
    /// Runtime introspection, bound after construction
    reflection: ReflectionHandle,
}

impl ClassMetadata {
    /// Canonical class name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Representation kind
    #[must_use]
    pub fn kind(&self) -> MetadataKind {
        self.shape.kind()
    }

    /// Representation-specific data
    #[must_use]
    pub fn shape(&self) -> &MetadataShape {
        &self.shape
    }

    /// Table name for entities
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        match &self.shape {
            MetadataShape::Entity { table } => Some(table),
            _ => None,
        }
    }

    /// The reflection handle attached after construction
    #[must_use]
    pub fn reflection(&self) -> &ReflectionHandle {
        &self.reflection
    }

    /// The parent link itself
    #[must_use]
    pub fn parent_ref(&self) -> Option<&ClassMetadataRef> {
        self.parent.as_ref()
    }

    /// Parent metadata, if any and still alive
    #[must_use]
    pub fn parent(&self) -> Option<ClassMetadataRc> {
        self.parent.as_ref().and_then(ClassMetadataRef::upgrade)
    }

    /// Name of the parent class, if any
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    /// Returns `true` if this class has no mapped parent
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// All reachable ancestors, nearest parent first.
    #[must_use]
    pub fn ancestors(&self) -> Vec<ClassMetadataRc> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(metadata) = current {
            current = metadata.parent();
            ancestors.push(metadata);
        }
        ancestors
    }

    /// Name of the topmost mapped class of this hierarchy.
    #[must_use]
    pub fn root_name(&self) -> String {
        self.ancestors()
            .last()
            .map_or_else(|| self.name.clone(), |root| root.name().to_string())
    }

    /// Fields declared directly on this class
    #[must_use]
    pub fn declared_fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Associations declared directly on this class
    #[must_use]
    pub fn associations(&self) -> &[AssociationMapping] {
        &self.associations
    }

    /// Inherited and declared fields, root first.
    #[must_use]
    pub fn all_fields(&self) -> Vec<FieldMapping> {
        let ancestors = self.ancestors();
        ancestors
            .iter()
            .rev()
            .flat_map(|ancestor| ancestor.declared_fields().iter().cloned())
            .chain(self.fields.iter().cloned())
            .collect()
    }

    /// Identifier field names, declared here or inherited from the nearest ancestor that
    /// declares one.
    #[must_use]
    pub fn identifier(&self) -> Vec<String> {
        let own: Vec<String> = self
            .fields
            .iter()
            .filter(|field| field.is_identifier())
            .map(|field| field.name.clone())
            .collect();
        if !own.is_empty() {
            return own;
        }

        self.parent()
            .map(|parent| parent.identifier())
            .unwrap_or_default()
    }
}
