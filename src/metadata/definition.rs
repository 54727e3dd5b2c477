//! Class metadata definitions and the definition builder.
//!
//! A [`ClassMetadataDefinition`] is the cacheable build plan for one class: the concrete
//! representation to instantiate, the parent metadata to bind it to, and the generated
//! artifact it was materialized from. Definitions are built once per class name by the
//! [`DefinitionBuilder`] and shared by every later instantiation, so siblings of a common
//! base never rebuild the base's plan.
//!
//! # Instantiation
//!
//! The representation is a closed set ([`MetadataKind`]). Each kind maps statically to a
//! constructor function, chosen when the definition is built and invoked by
//! [`ClassMetadataDefinition::instantiate`] with the parent resolved by the caller. The result is
//! a [`ConstructedMetadata`] which still needs its reflection bind before it can be cached.
//!
//! # Consistency Checks
//!
//! Raw mapping facts are checked before the generation strategy runs. Every check failure is
//! reported as [`crate::Error::MappingInconsistency`]:
//!
//! - duplicate field names or column names
//! - identifier fields marked nullable
//! - associations without a target class
//! - embeddables declaring associations
//! - entities or mapped superclasses extending an embeddable
//! - embeddables extending an entity
//!
//! # Thread Safety
//!
//! [`DefinitionBuilder`] is [`Send`] + [`Sync`]. Concurrent requests for the same missing class
//! run the build, and therefore the generation strategy, once.

use std::{collections::HashSet, sync::Arc};

use crate::{
    metadata::{
        classmeta::{
            default_table_name, ClassMetadataRc, ClassMetadataRef, ConstructedMetadata,
            MetadataShape,
        },
        generation::{Artifact, GenerationPolicy, GenerationRequest, GenerationStrategy},
        mapping::{FieldFlags, MappingFacts, MetadataKind},
        source::MappingSource,
    },
    utils::synchronization::SingleFlight,
    Result,
};

type Constructor = fn(&ClassMetadataDefinition, Option<&ClassMetadataRc>) -> ConstructedMetadata;

/// Build plan for the metadata of one class.
pub struct ClassMetadataDefinition {
    class_name: String,
    kind: MetadataKind,
    parent: Option<ClassMetadataRef>,
    parent_name: Option<String>,
    artifact: Arc<Artifact>,
    constructor: Constructor,
}

impl ClassMetadataDefinition {
    /// Canonical class name
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Representation this definition instantiates
    #[must_use]
    pub fn kind(&self) -> MetadataKind {
        self.kind
    }

    /// Parent metadata this definition was built against, if any and still alive
    #[must_use]
    pub fn parent(&self) -> Option<ClassMetadataRc> {
        self.parent.as_ref().and_then(ClassMetadataRef::upgrade)
    }

    /// Name of the parent this definition was built against
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    /// The generated artifact backing this definition
    #[must_use]
    pub fn artifact(&self) -> &Arc<Artifact> {
        &self.artifact
    }

    /// Mapping facts the artifact was generated from
    #[must_use]
    pub fn mapping(&self) -> &MappingFacts {
        &self.artifact.mapping
    }

    /// Constructs fresh, reflection-less metadata from this plan, linked to `parent`.
    ///
    /// `parent` is the currently cached metadata of the nearest mapped ancestor. It may differ
    /// from the parent the definition was built against if that one was replaced since.
    #[must_use]
    pub fn instantiate(&self, parent: Option<&ClassMetadataRc>) -> ConstructedMetadata {
        (self.constructor)(self, parent)
    }

    fn construct_with(
        &self,
        shape: MetadataShape,
        parent: Option<&ClassMetadataRc>,
    ) -> ConstructedMetadata {
        let mapping = self.mapping();
        ConstructedMetadata::with_shape(
            &self.class_name,
            shape,
            parent.map(ClassMetadataRef::new),
            parent.map(|parent| parent.name().to_string()),
            mapping.fields.clone(),
            mapping.associations.clone(),
        )
    }
}

impl std::fmt::Debug for ClassMetadataDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMetadataDefinition")
            .field("class_name", &self.class_name)
            .field("kind", &self.kind)
            .field("parent_name", &self.parent_name)
            .field("fingerprint", &self.artifact.fingerprint)
            .finish_non_exhaustive()
    }
}

fn construct_entity(
    definition: &ClassMetadataDefinition,
    parent: Option<&ClassMetadataRc>,
) -> ConstructedMetadata {
    let table = definition
        .mapping()
        .table
        .clone()
        .unwrap_or_else(|| default_table_name(&definition.class_name));
    definition.construct_with(MetadataShape::Entity { table }, parent)
}

fn construct_mapped_superclass(
    definition: &ClassMetadataDefinition,
    parent: Option<&ClassMetadataRc>,
) -> ConstructedMetadata {
    definition.construct_with(MetadataShape::MappedSuperclass, parent)
}

fn construct_embeddable(
    definition: &ClassMetadataDefinition,
    parent: Option<&ClassMetadataRc>,
) -> ConstructedMetadata {
    definition.construct_with(MetadataShape::Embeddable, parent)
}

/// The constructor instantiating `kind`.
fn constructor_for(kind: MetadataKind) -> Constructor {
    match kind {
        MetadataKind::Entity => construct_entity,
        MetadataKind::MappedSuperclass => construct_mapped_superclass,
        MetadataKind::Embeddable => construct_embeddable,
    }
}

/// Checks the raw facts of `class` against themselves and against its parent.
///
/// # Errors
///
/// Returns [`crate::Error::MappingInconsistency`] for the first problem found.
pub fn check_consistency(
    class: &str,
    facts: &MappingFacts,
    parent: Option<&ClassMetadataRc>,
) -> Result<()> {
    let mut names = HashSet::new();
    let mut columns = HashSet::new();
    for field in &facts.fields {
        if !names.insert(field.name.as_str()) {
            return Err(mapping_error!(class, "field '{}' is mapped twice", field.name));
        }
        if !columns.insert(field.column.as_str()) {
            return Err(mapping_error!(
                class,
                "column '{}' is mapped by more than one field",
                field.column
            ));
        }
        if field.is_identifier() && field.flags.contains(FieldFlags::NULLABLE) {
            return Err(mapping_error!(
                class,
                "identifier field '{}' cannot be nullable",
                field.name
            ));
        }
    }

    for association in &facts.associations {
        if association.target.trim().is_empty() {
            return Err(mapping_error!(
                class,
                "association '{}' has no target class",
                association.field
            ));
        }
    }

    if facts.kind == MetadataKind::Embeddable && !facts.associations.is_empty() {
        return Err(mapping_error!(class, "embeddables cannot declare associations"));
    }

    if let Some(parent) = parent {
        match (facts.kind, parent.kind()) {
            (kind, MetadataKind::Embeddable) if kind.is_hierarchy_member() => {
                return Err(mapping_error!(
                    class,
                    "{} cannot extend embeddable '{}'",
                    kind,
                    parent.name()
                ));
            }
            (MetadataKind::Embeddable, MetadataKind::Entity) => {
                return Err(mapping_error!(
                    class,
                    "embeddable cannot extend entity '{}'",
                    parent.name()
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Builds and caches one [`ClassMetadataDefinition`] per class name.
pub struct DefinitionBuilder {
    source: Arc<dyn MappingSource>,
    strategy: Arc<dyn GenerationStrategy>,
    definitions: SingleFlight<Arc<ClassMetadataDefinition>>,
}

impl DefinitionBuilder {
    /// Creates a builder reading facts from `source` and materializing artifacts with
    /// `strategy`.
    #[must_use]
    pub fn new(source: Arc<dyn MappingSource>, strategy: Arc<dyn GenerationStrategy>) -> Self {
        DefinitionBuilder {
            source,
            strategy,
            definitions: SingleFlight::new(),
        }
    }

    /// Returns the cached definition of `class`, building it on a miss.
    ///
    /// `parent` is the already resolved metadata of the nearest non-transient ancestor. It is
    /// only consulted when the definition is built. Instantiation links to whatever parent is
    /// passed to [`ClassMetadataDefinition::instantiate`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MappingInconsistency`] if the facts are unusable, or the
    /// generation strategy's error if no artifact can be materialized. Nothing is cached on
    /// failure.
    pub fn get_or_create(
        &self,
        class: &str,
        parent: Option<&ClassMetadataRc>,
    ) -> Result<Arc<ClassMetadataDefinition>> {
        self.definitions
            .get_or_try_init(class, || self.build(class, parent))
    }

    /// Cached definition of `class`, if one was built
    #[must_use]
    pub fn get(&self, class: &str) -> Option<Arc<ClassMetadataDefinition>> {
        self.definitions.get(class)
    }

    /// Number of cached definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if no definition was built yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Policy of the generation strategy in use
    #[must_use]
    pub fn policy(&self) -> GenerationPolicy {
        self.strategy.policy()
    }

    fn build(
        &self,
        class: &str,
        parent: Option<&ClassMetadataRc>,
    ) -> Result<Arc<ClassMetadataDefinition>> {
        let facts = self.source.mapping_facts(class)?;
        check_consistency(class, &facts, parent)?;

        let parent_name = parent.map(|parent| parent.name().to_string());
        let request = GenerationRequest::new(class, facts.kind, parent_name.as_deref(), &facts)?;
        let artifact = self.strategy.materialize(&request)?;

        log::debug!(
            "built {} definition for {} (parent: {})",
            facts.kind,
            class,
            parent_name.as_deref().unwrap_or("none")
        );

        Ok(Arc::new(ClassMetadataDefinition {
            class_name: class.to_string(),
            kind: facts.kind,
            parent: parent.map(ClassMetadataRef::new),
            parent_name,
            artifact,
            constructor: constructor_for(facts.kind),
        }))
    }
}
