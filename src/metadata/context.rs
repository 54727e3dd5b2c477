//! Per-call building context and hierarchy validation.
//!
//! A [`BuildingContext`] lives for exactly one top-level resolution. While the resolver walks
//! the ancestor chain, every metadata object on the chain is handed to the context, marked as
//! either freshly built or taken from the cache. Once the walk completes the context runs one
//! validation pass and reports every issue it found in a single
//! [`crate::Error::HierarchyValidation`].
//!
//! Issues are only reported for classes built during the call. Cached ancestors take part as
//! context, e.g. as the source of an inherited identifier or of a shadowed field, but were
//! validated when they were built themselves.
//!
//! Validation never rolls anything back: metadata cached during the walk stays cached even if
//! the pass fails.

use std::collections::HashSet;

use crate::{
    metadata::{
        classmeta::ClassMetadataRc, mapping::MetadataKind, source::MappingSource,
    },
    Error, Result,
};

/// Configuration of the hierarchy validation pass
///
/// Mapping consistency of a single class is always checked while its definition is built.
/// These flags control the cross-class checks that need the whole resolved chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidationConfig {
    /// Require every entity to have an identifier, declared or inherited
    pub enable_identifier_validation: bool,

    /// Reject fields redeclaring a field of a mapped ancestor
    pub enable_field_shadowing_validation: bool,

    /// Reject associations targeting transient or unknown classes
    pub enable_association_validation: bool,

    /// Reject chains in which a class appears more than once
    pub enable_cycle_validation: bool,

    /// Maximum number of mapped classes in one chain, `0` for unlimited (default: 64)
    pub max_hierarchy_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enable_identifier_validation: true,
            enable_field_shadowing_validation: true,
            enable_association_validation: true,
            enable_cycle_validation: true,
            max_hierarchy_depth: 64,
        }
    }
}

impl ValidationConfig {
    /// Creates a disabled validation configuration
    ///
    /// The validation pass never fails.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enable_identifier_validation: false,
            enable_field_shadowing_validation: false,
            enable_association_validation: false,
            enable_cycle_validation: false,
            max_hierarchy_depth: 0,
        }
    }

    /// Creates a minimal validation configuration
    ///
    /// Only rejects hierarchies that cannot be meaningfully linked at all.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_identifier_validation: false,
            enable_field_shadowing_validation: false,
            enable_association_validation: false,
            enable_cycle_validation: true,
            max_hierarchy_depth: 64,
        }
    }

    /// Creates a validation configuration with all checks enabled and a tight depth limit
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_hierarchy_depth: 16,
            ..Self::default()
        }
    }

    /// Returns `true` if the pass can report anything at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enable_identifier_validation
            || self.enable_field_shadowing_validation
            || self.enable_association_validation
            || self.enable_cycle_validation
            || self.max_hierarchy_depth > 0
    }
}

/// State accumulated during one top-level resolution.
pub struct BuildingContext<'a> {
    requested: String,
    chain: Vec<String>,
    resolved: Vec<ClassMetadataRc>,
    built: Vec<ClassMetadataRc>,
    source: &'a dyn MappingSource,
    config: ValidationConfig,
}

impl<'a> BuildingContext<'a> {
    /// Creates the context for resolving `requested` through `chain`, base first.
    #[must_use]
    pub fn new(
        requested: &str,
        chain: Vec<String>,
        source: &'a dyn MappingSource,
        config: ValidationConfig,
    ) -> Self {
        BuildingContext {
            requested: requested.to_string(),
            chain,
            resolved: Vec::new(),
            built: Vec::new(),
            source,
            config,
        }
    }

    /// Records metadata built during this call.
    pub fn add(&mut self, metadata: ClassMetadataRc) {
        self.resolved.push(metadata.clone());
        self.built.push(metadata);
    }

    /// Records metadata of the chain that was already cached.
    pub fn add_cached(&mut self, metadata: ClassMetadataRc) {
        self.resolved.push(metadata);
    }

    /// The ancestor chain, base first
    #[must_use]
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Metadata built during this call, base first
    #[must_use]
    pub fn built(&self) -> &[ClassMetadataRc] {
        &self.built
    }

    /// Every metadata object seen on the chain, base first
    #[must_use]
    pub fn resolved(&self) -> &[ClassMetadataRc] {
        &self.resolved
    }

    /// Collects every issue of the chain without failing.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.built.is_empty() {
            return issues;
        }

        if self.config.enable_cycle_validation {
            let mut seen = HashSet::new();
            for class in &self.chain {
                if !seen.insert(class.as_str()) {
                    issues.push(format!(
                        "class '{class}' appears more than once in its own ancestor chain"
                    ));
                }
            }
        }

        if self.config.max_hierarchy_depth > 0 && self.chain.len() > self.config.max_hierarchy_depth
        {
            issues.push(format!(
                "chain of {} mapped classes exceeds the maximum depth of {}",
                self.chain.len(),
                self.config.max_hierarchy_depth
            ));
        }

        for metadata in &self.built {
            if self.config.enable_identifier_validation
                && metadata.kind() == MetadataKind::Entity
                && metadata.identifier().is_empty()
            {
                issues.push(format!(
                    "entity '{}' has no identifier in its hierarchy",
                    metadata.name()
                ));
            }

            if self.config.enable_field_shadowing_validation {
                for ancestor in metadata.ancestors() {
                    for field in metadata.declared_fields() {
                        if ancestor
                            .declared_fields()
                            .iter()
                            .any(|inherited| inherited.name == field.name)
                        {
                            issues.push(format!(
                                "field '{}' of '{}' redeclares a field of '{}'",
                                field.name,
                                metadata.name(),
                                ancestor.name()
                            ));
                        }
                    }
                }
            }

            if self.config.enable_association_validation {
                for association in metadata.associations() {
                    if self.source.is_transient(&association.target) {
                        issues.push(format!(
                            "association '{}' of '{}' targets transient or unmapped class '{}'",
                            association.field,
                            metadata.name(),
                            association.target
                        ));
                    }
                }
            }
        }

        issues
    }

    /// Runs the validation pass over the whole chain.
    ///
    /// Does nothing if no metadata was built during this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HierarchyValidation`] carrying every issue found.
    pub fn validate(&self) -> Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            return Ok(());
        }

        log::warn!(
            "hierarchy of {} failed validation with {} issue(s)",
            self.requested,
            issues.len()
        );
        Err(Error::HierarchyValidation {
            class: self.requested.clone(),
            issues,
        })
    }
}
