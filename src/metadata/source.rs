//! Interfaces to the external collaborators of the resolver.
//!
//! The resolver never parses mapping sources, introspects classes or knows about proxy naming
//! schemes itself. It consumes three narrow traits which are injected at construction time:
//!
//! - [`MappingSource`] - raw mapping facts, transience and the list of mapped classes
//! - [`ReflectionService`] - ancestor chains and the post-construction reflection bind
//! - [`NameNormalizer`] - canonical class names for proxy or alias references
//!
//! [`crate::metadata::catalog::ClassCatalog`] implements the first two for programmatic
//! mappings, [`ProxyNameNormalizer`] is the default normalizer.

use crate::{
    metadata::{classmeta::ConstructedMetadata, mapping::MappingFacts},
    Result,
};

/// Supplies raw mapping facts for classes.
pub trait MappingSource: Send + Sync {
    /// Canonical names of every mapped class, in the source's enumeration order.
    fn all_class_names(&self) -> Vec<String>;

    /// Returns `true` if the class is excluded from persistence mapping.
    fn is_transient(&self, class: &str) -> bool;

    /// Raw mapping facts declared directly on `class`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MappingInconsistency`] if the class has no usable mapping.
    fn mapping_facts(&self, class: &str) -> Result<MappingFacts>;
}

/// Introspects application classes.
pub trait ReflectionService: Send + Sync {
    /// Ancestors of `class`, nearest parent first (derived to base), excluding `class`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvableClass`] if the class cannot be located.
    fn ancestor_classes(&self, class: &str) -> Result<Vec<String>>;

    /// Produces the runtime reflection handle for freshly constructed metadata.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvableClass`] if the class cannot be introspected.
    fn bind_reflection(&self, metadata: &ConstructedMetadata) -> Result<ReflectionHandle>;
}

/// Maps an arbitrary class reference to its canonical class name.
pub trait NameNormalizer: Send + Sync {
    /// Canonical name for `reference`, with any proxy or wrapper indirection removed.
    fn canonical_name(&self, reference: &str) -> String;
}

/// Runtime introspection attached to metadata after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionHandle {
    /// Name of the introspected class
    pub class_name: String,
    /// Properties visible on the class, inherited ones included
    pub properties: Vec<String>,
}

impl ReflectionHandle {
    /// Creates a handle for `class_name` exposing `properties`.
    #[must_use]
    pub fn new(class_name: &str, properties: Vec<String>) -> Self {
        ReflectionHandle {
            class_name: class_name.to_string(),
            properties,
        }
    }

    /// Returns `true` if the class exposes a property called `name`.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|property| property == name)
    }
}

/// Strips generated-proxy indirection from class references.
///
/// Proxy classes are named `<prefix>\<marker>\<Original\Class>`; everything up to and
/// including the marker segment is removed. A leading namespace separator is dropped as
/// well, so `\App\User` and `App\User` normalize to the same name.
#[derive(Debug, Clone)]
pub struct ProxyNameNormalizer {
    marker: String,
}

impl ProxyNameNormalizer {
    /// Marker segment used by default.
    pub const DEFAULT_MARKER: &'static str = "__CG__";

    /// Creates a normalizer recognizing `marker` as proxy segment.
    #[must_use]
    pub fn new(marker: &str) -> Self {
        ProxyNameNormalizer {
            marker: marker.to_string(),
        }
    }
}

impl Default for ProxyNameNormalizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MARKER)
    }
}

impl NameNormalizer for ProxyNameNormalizer {
    fn canonical_name(&self, reference: &str) -> String {
        let needle = format!("\\{}\\", self.marker);
        let stripped = match reference.rfind(&needle) {
            Some(position) => &reference[position + needle.len()..],
            None => reference,
        };

        stripped.trim_start_matches('\\').to_string()
    }
}
