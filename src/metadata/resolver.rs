//! The metadata resolver.
//!
//! [`MetadataResolver`] is the entry point of the crate. It looks metadata up by class name and,
//! on a miss, builds it together with every mapped ancestor:
//!
//! 1. The requested reference is normalized to a canonical class name.
//! 2. The ancestor chain is computed: ancestors from the reflection service (derived to base),
//!    reversed to base first, transient classes dropped, the class itself appended.
//! 3. The chain is walked base first. Cached classes become the running parent; every other
//!    class gets its definition fetched or built, is instantiated bound to the running parent,
//!    has its reflection attached, is cached and becomes the running parent.
//! 4. A [`BuildingContext`] validates the chain once and reports every issue together.
//!
//! # Caches
//!
//! Two caches are owned by the resolver and never evicted: definitions (inside the
//! [`DefinitionBuilder`]) and loaded metadata. Parent links are weak references into the loaded
//! cache, so the cache is the sole owner of every metadata object for the resolver's lifetime.
//!
//! # Thread Safety
//!
//! [`MetadataResolver`] is [`Send`] + [`Sync`] and meant to be shared behind an [`Arc`]. Reads
//! never block on builds. Concurrent resolution of the same missing class builds it once; other
//! callers wait for that build and receive the identical instance. A build gate is only held
//! while one class is built and its parent is always resolved before, so gates never nest.
//!
//! # Examples
//!
//! ```rust
//! use mapscope::prelude::*;
//! use std::sync::Arc;
//!
//! let mut catalog = ClassCatalog::new();
//! catalog
//!     .declare("App\\Model", None, MappingFacts::mapped_superclass().id("id"))
//!     .declare("App\\User", Some("App\\Model"), MappingFacts::entity("users"));
//!
//! let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());
//! let user = resolver.get_metadata_for("App\\User")?;
//! let model = resolver.get_metadata_for("App\\Model")?;
//!
//! assert!(Arc::ptr_eq(&user.parent().unwrap(), &model));
//! assert_eq!(user.identifier(), vec!["id".to_string()]);
//! # Ok::<(), mapscope::Error>(())
//! ```

use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    metadata::{
        catalog::ClassCatalog,
        classmeta::ClassMetadataRc,
        context::{BuildingContext, ValidationConfig},
        definition::{ClassMetadataDefinition, DefinitionBuilder},
        generation::{strategy_for, ArtifactStore, GenerationPolicy, MemoryArtifactStore},
        source::{MappingSource, NameNormalizer, ProxyNameNormalizer, ReflectionService},
    },
    utils::synchronization::SingleFlight,
    Error, Result,
};

/// Configuration of a [`MetadataResolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolverConfig {
    /// When generated artifacts are (re)materialized (default: if-missing)
    pub generation: GenerationPolicy,
    /// Checks run once per resolved chain
    pub validation: ValidationConfig,
}

impl ResolverConfig {
    /// Sets the generation policy
    #[must_use]
    pub fn with_generation(mut self, policy: GenerationPolicy) -> Self {
        self.generation = policy;
        self
    }

    /// Sets the validation configuration
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }
}

/// Resolves, builds and caches class metadata.
pub struct MetadataResolver {
    source: Arc<dyn MappingSource>,
    reflection: Arc<dyn ReflectionService>,
    normalizer: Arc<dyn NameNormalizer>,
    definitions: DefinitionBuilder,
    loaded: SingleFlight<ClassMetadataRc>,
    config: ResolverConfig,
}

impl MetadataResolver {
    /// Creates a resolver from its collaborators.
    ///
    /// The generation strategy is chosen from `config.generation` and writes to `store`.
    #[must_use]
    pub fn new(
        source: Arc<dyn MappingSource>,
        reflection: Arc<dyn ReflectionService>,
        normalizer: Arc<dyn NameNormalizer>,
        store: Arc<dyn ArtifactStore>,
        config: ResolverConfig,
    ) -> Self {
        let strategy = strategy_for(config.generation, store);
        MetadataResolver {
            definitions: DefinitionBuilder::new(source.clone(), strategy),
            source,
            reflection,
            normalizer,
            loaded: SingleFlight::new(),
            config,
        }
    }

    /// Creates a resolver over an in-memory catalog.
    ///
    /// The catalog serves as mapping source and reflection service, proxies are recognized by
    /// the default marker and artifacts are kept in memory.
    #[must_use]
    pub fn with_catalog(catalog: ClassCatalog, config: ResolverConfig) -> Self {
        let catalog = Arc::new(catalog);
        Self::new(
            catalog.clone(),
            catalog,
            Arc::new(ProxyNameNormalizer::default()),
            Arc::new(MemoryArtifactStore::new()),
            config,
        )
    }

    /// Returns the metadata of `reference`, building it and its ancestors if needed.
    ///
    /// `reference` may be a proxy or alias name, it is normalized first. A cached class is
    /// returned without any further work.
    ///
    /// # Errors
    ///
    /// - [`Error::UnresolvableClass`] if the class or one of its ancestors cannot be located
    /// - [`Error::MappingInconsistency`] if a class on the chain has unusable mapping facts
    /// - [`Error::Generation`] if an artifact cannot be materialized under the active policy
    /// - [`Error::HierarchyValidation`] if the resolved chain fails validation
    ///
    /// Metadata cached before the failure stays cached.
    pub fn get_metadata_for(&self, reference: &str) -> Result<ClassMetadataRc> {
        let name = self.normalizer.canonical_name(reference);
        if let Some(metadata) = self.loaded.get(&name) {
            log::trace!("metadata cache hit for {name}");
            return Ok(metadata);
        }

        let chain = self.ancestor_chain(&name)?;
        log::debug!("resolving {} through {} class(es): {:?}", name, chain.len(), chain);

        let mut context = BuildingContext::new(
            &name,
            chain.clone(),
            self.source.as_ref(),
            self.config.validation,
        );

        let mut parent: Option<ClassMetadataRc> = None;
        for class in &chain {
            let metadata = match self.loaded.get(class) {
                Some(cached) => {
                    context.add_cached(cached.clone());
                    cached
                }
                None => {
                    let mut built_here = false;
                    let metadata = self.loaded.get_or_try_init(class, || {
                        built_here = true;
                        self.build(class, parent.as_ref())
                    })?;

                    if built_here {
                        context.add(metadata.clone());
                    } else {
                        context.add_cached(metadata.clone());
                    }
                    metadata
                }
            };
            parent = Some(metadata);
        }

        context.validate()?;

        parent.ok_or_else(|| Error::UnresolvableClass {
            class: name,
            message: "ancestor chain is empty".to_string(),
        })
    }

    /// Returns the metadata of every mapped class, in the mapping source's order.
    ///
    /// The result holds exactly one entry per enumerated name, even if manual registration put
    /// the same metadata under several names.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`MetadataResolver::get_metadata_for`].
    pub fn get_all_metadata(&self) -> Result<Vec<ClassMetadataRc>> {
        self.source
            .all_class_names()
            .iter()
            .map(|class| self.get_metadata_for(class))
            .collect()
    }

    /// Returns `true` if metadata for exactly `class` is cached.
    #[must_use]
    pub fn has_metadata_for(&self, class: &str) -> bool {
        self.loaded.contains(class)
    }

    /// Stores `metadata` under `class`, replacing any cached metadata.
    ///
    /// Neither ancestors nor validation are involved.
    pub fn set_metadata_for(&self, class: &str, metadata: ClassMetadataRc) {
        self.loaded.insert(class, metadata);
    }

    /// Returns `true` if `reference` names a class excluded from mapping.
    #[must_use]
    pub fn is_transient(&self, reference: &str) -> bool {
        self.source.is_transient(&self.normalizer.canonical_name(reference))
    }

    /// Snapshot of all cached metadata, in no particular order.
    #[must_use]
    pub fn loaded_metadata(&self) -> Vec<ClassMetadataRc> {
        self.loaded.values()
    }

    /// Resolves every mapped class in parallel and returns how many were resolved.
    ///
    /// # Errors
    ///
    /// Returns an error of [`MetadataResolver::get_metadata_for`] if any class fails. All
    /// classes are attempted; metadata of the successful ones stays cached.
    pub fn warm_up(&self) -> Result<usize> {
        let classes = self.source.all_class_names();
        let results: Vec<Result<ClassMetadataRc>> = classes
            .par_iter()
            .map(|class| self.get_metadata_for(class))
            .collect();

        let mut resolved = 0;
        for result in results {
            result?;
            resolved += 1;
        }

        log::debug!("warmed up {resolved} class(es)");
        Ok(resolved)
    }

    /// Cached definition of `reference`, if one was built.
    #[must_use]
    pub fn definition_for(&self, reference: &str) -> Option<Arc<ClassMetadataDefinition>> {
        self.definitions.get(&self.normalizer.canonical_name(reference))
    }

    /// Mapped ancestors of `class` base first, ending with `class` itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvableClass`] if the reflection service cannot locate the class
    /// or one of its ancestors.
    pub fn ancestor_chain(&self, class: &str) -> Result<Vec<String>> {
        let mut chain: Vec<String> = self
            .reflection
            .ancestor_classes(class)?
            .into_iter()
            .rev()
            .filter(|ancestor| !self.source.is_transient(ancestor))
            .collect();
        chain.push(class.to_string());
        Ok(chain)
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn build(&self, class: &str, parent: Option<&ClassMetadataRc>) -> Result<ClassMetadataRc> {
        let definition = self.definitions.get_or_create(class, parent)?;
        let constructed = definition.instantiate(parent);
        let reflection = self.reflection.bind_reflection(&constructed)?;
        let metadata = Arc::new(constructed.bind(reflection)?);

        log::debug!("loaded {} metadata for {}", metadata.kind(), class);
        Ok(metadata)
    }
}
