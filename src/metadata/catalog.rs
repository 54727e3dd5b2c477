//! In-memory class catalog.
//!
//! [`ClassCatalog`] is a programmatic stand-in for the mapping driver and the reflection layer.
//! Classes are declared with their direct parent and either mapping facts or a transient
//! marker. It answers every query the resolver needs:
//!
//! - enumeration of mapped classes in declaration order
//! - transience (undeclared classes are transient)
//! - raw mapping facts
//! - ancestor chains, derived to base, including transient ancestors
//! - reflection handles listing the properties visible on a class
//!
//! # Examples
//!
//! ```rust
//! use mapscope::metadata::{catalog::ClassCatalog, mapping::MappingFacts, source::*};
//!
//! let mut catalog = ClassCatalog::new();
//! catalog
//!     .declare("App\\Model", None, MappingFacts::mapped_superclass().id("id"))
//!     .declare_transient("App\\Timestamps", Some("App\\Model"))
//!     .declare("App\\User", Some("App\\Timestamps"), MappingFacts::entity("users"));
//!
//! assert_eq!(
//!     catalog.ancestor_classes("App\\User")?,
//!     vec!["App\\Timestamps".to_string(), "App\\Model".to_string()]
//! );
//! assert!(catalog.is_transient("App\\Timestamps"));
//! assert_eq!(catalog.all_class_names(), vec!["App\\Model", "App\\User"]);
//! # Ok::<(), mapscope::Error>(())
//! ```

use std::collections::{HashMap, HashSet};

use crate::{
    metadata::{
        classmeta::ConstructedMetadata,
        mapping::MappingFacts,
        source::{MappingSource, ReflectionHandle, ReflectionService},
    },
    Error, Result,
};

/// A declared class
#[derive(Debug, Clone)]
struct CatalogEntry {
    /// Direct parent in the language's type hierarchy
    parent: Option<String>,
    /// Mapping facts, `None` for transient classes
    facts: Option<MappingFacts>,
    /// Unmapped properties declared on the class
    properties: Vec<String>,
}

/// In-memory implementation of [`MappingSource`] and [`ReflectionService`].
#[derive(Debug, Default, Clone)]
pub struct ClassCatalog {
    classes: HashMap<String, CatalogEntry>,
    order: Vec<String>,
}

impl ClassCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a mapped class.
    ///
    /// Redeclaring a class replaces its previous declaration but keeps its position in the
    /// enumeration order.
    pub fn declare(&mut self, name: &str, parent: Option<&str>, facts: MappingFacts) -> &mut Self {
        self.insert(name, parent, Some(facts))
    }

    /// Declares a class that exists in the type hierarchy but is not mapped.
    pub fn declare_transient(&mut self, name: &str, parent: Option<&str>) -> &mut Self {
        self.insert(name, parent, None)
    }

    /// Adds unmapped properties to an already declared class.
    pub fn with_properties(&mut self, name: &str, properties: &[&str]) -> &mut Self {
        if let Some(entry) = self.classes.get_mut(name) {
            entry
                .properties
                .extend(properties.iter().map(|property| (*property).to_string()));
        }
        self
    }

    /// Returns `true` if `name` was declared, mapped or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of declared classes, transient ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn insert(
        &mut self,
        name: &str,
        parent: Option<&str>,
        facts: Option<MappingFacts>,
    ) -> &mut Self {
        let entry = CatalogEntry {
            parent: parent.map(str::to_string),
            facts,
            properties: Vec::new(),
        };

        if self.classes.insert(name.to_string(), entry).is_none() {
            self.order.push(name.to_string());
        }
        self
    }

    fn entry(&self, name: &str) -> Result<&CatalogEntry> {
        self.classes.get(name).ok_or_else(|| Error::UnresolvableClass {
            class: name.to_string(),
            message: "class is not declared".to_string(),
        })
    }
}

impl MappingSource for ClassCatalog {
    fn all_class_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| !self.is_transient(name))
            .cloned()
            .collect()
    }

    fn is_transient(&self, class: &str) -> bool {
        self.classes
            .get(class)
            .map_or(true, |entry| entry.facts.is_none())
    }

    fn mapping_facts(&self, class: &str) -> Result<MappingFacts> {
        self.classes
            .get(class)
            .and_then(|entry| entry.facts.clone())
            .ok_or_else(|| mapping_error!(class, "class is not a mapped class"))
    }
}

impl ReflectionService for ClassCatalog {
    fn ancestor_classes(&self, class: &str) -> Result<Vec<String>> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(class.to_string());

        let mut current = self.entry(class)?.parent.clone();
        while let Some(name) = current {
            let entry = self.entry(&name).map_err(|_| Error::UnresolvableClass {
                class: class.to_string(),
                message: format!("ancestor '{name}' is not declared"),
            })?;

            // A cyclic declaration is reported once, the chain validation takes it from there
            let revisited = !seen.insert(name.clone());
            ancestors.push(name);
            if revisited {
                break;
            }
            current = entry.parent.clone();
        }

        Ok(ancestors)
    }

    fn bind_reflection(&self, metadata: &ConstructedMetadata) -> Result<ReflectionHandle> {
        let mut properties = Vec::new();
        let mut seen = HashSet::new();

        let mut current = Some(metadata.name().to_string());
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }

            let entry = self.entry(&name)?;
            if let Some(facts) = &entry.facts {
                properties.extend(facts.fields.iter().map(|field| field.name.clone()));
                properties.extend(facts.associations.iter().map(|assoc| assoc.field.clone()));
            }
            properties.extend(entry.properties.iter().cloned());
            current = entry.parent.clone();
        }

        Ok(ReflectionHandle::new(metadata.name(), properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::mapping::FieldFlags;

    fn catalog() -> ClassCatalog {
        let mut catalog = ClassCatalog::new();
        catalog
            .declare("App\\Root", None, MappingFacts::entity("root").id("id"))
            .declare_transient("App\\Mixin", Some("App\\Root"))
            .with_properties("App\\Mixin", &["cache"])
            .declare(
                "App\\Leaf",
                Some("App\\Mixin"),
                MappingFacts::entity("leaf").field("name", FieldFlags::empty()),
            );
        catalog
    }

    #[test]
    fn test_ancestors_are_derived_to_base() {
        let catalog = catalog();
        assert_eq!(
            catalog.ancestor_classes("App\\Leaf").unwrap(),
            vec!["App\\Mixin".to_string(), "App\\Root".to_string()]
        );
        assert!(catalog.ancestor_classes("App\\Root").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_class_is_unresolvable() {
        let catalog = catalog();
        assert!(matches!(
            catalog.ancestor_classes("App\\Ghost"),
            Err(Error::UnresolvableClass { .. })
        ));

        let mut broken = ClassCatalog::new();
        broken.declare("App\\Child", Some("App\\Missing"), MappingFacts::entity("c"));
        match broken.ancestor_classes("App\\Child") {
            Err(Error::UnresolvableClass { class, message }) => {
                assert_eq!(class, "App\\Child");
                assert!(message.contains("App\\Missing"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cycle_is_reported_once() {
        let mut catalog = ClassCatalog::new();
        catalog
            .declare("App\\A", Some("App\\B"), MappingFacts::entity("a"))
            .declare("App\\B", Some("App\\A"), MappingFacts::entity("b"));

        assert_eq!(
            catalog.ancestor_classes("App\\A").unwrap(),
            vec!["App\\B".to_string(), "App\\A".to_string()]
        );
    }

    #[test]
    fn test_transience_and_enumeration() {
        let catalog = catalog();
        assert!(catalog.is_transient("App\\Mixin"));
        assert!(catalog.is_transient("App\\Undeclared"));
        assert!(!catalog.is_transient("App\\Leaf"));
        assert_eq!(catalog.all_class_names(), vec!["App\\Root", "App\\Leaf"]);
        assert!(matches!(
            catalog.mapping_facts("App\\Mixin"),
            Err(Error::MappingInconsistency { .. })
        ));
    }

    #[test]
    fn test_redeclare_keeps_order() {
        let mut catalog = catalog();
        catalog.declare("App\\Root", None, MappingFacts::entity("root2").id("id"));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.all_class_names(), vec!["App\\Root", "App\\Leaf"]);
        assert_eq!(
            catalog.mapping_facts("App\\Root").unwrap().table.as_deref(),
            Some("root2")
        );
    }

    #[test]
    fn test_reflection_collects_inherited_properties() {
        let catalog = catalog();
        let constructed = ConstructedMetadata::new(
            "App\\Leaf",
            catalog.mapping_facts("App\\Leaf").unwrap(),
            None,
        );

        let handle = catalog.bind_reflection(&constructed).unwrap();
        assert_eq!(handle.class_name, "App\\Leaf");
        assert!(handle.has_property("name"));
        assert!(handle.has_property("cache"));
        assert!(handle.has_property("id"));
    }
}
