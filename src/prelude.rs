//! # mapscope Prelude
//!
//! The most commonly used types and traits, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all mapscope operations
pub use crate::Error;

/// The result type used throughout mapscope
pub use crate::Result;

// ================================================================================================
// Resolution
// ================================================================================================

/// The resolver and its configuration
pub use crate::metadata::resolver::{MetadataResolver, ResolverConfig};

/// Hierarchy validation settings
pub use crate::metadata::context::ValidationConfig;

/// Built metadata
pub use crate::metadata::classmeta::{
    ClassMetadata, ClassMetadataRc, ClassMetadataRef, MetadataShape,
};

/// Build plans
pub use crate::metadata::definition::ClassMetadataDefinition;

// ================================================================================================
// Mapping and Collaborators
// ================================================================================================

/// Raw mapping facts
pub use crate::metadata::mapping::{
    AssociationKind, AssociationMapping, FieldFlags, FieldMapping, MappingFacts, MetadataKind,
};

/// Collaborator interfaces and their bundled implementations
pub use crate::metadata::{
    catalog::ClassCatalog,
    source::{
        MappingSource, NameNormalizer, ProxyNameNormalizer, ReflectionHandle, ReflectionService,
    },
};

// ================================================================================================
// Generation
// ================================================================================================

/// Generation policies, strategies and artifact stores
pub use crate::metadata::generation::{
    ArtifactStore, FileArtifactStore, GenerationPolicy, GenerationStrategy, MemoryArtifactStore,
};
