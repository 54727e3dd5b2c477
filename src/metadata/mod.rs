//! Class metadata resolution.
//!
//! This module contains everything between the raw mapping facts of a class and the fully built,
//! cached metadata describing how the class and its ancestors map to storage.
//!
//! # Key Components
//!
//! - [`resolver`] - The orchestrator: lookup by name, ancestor chains, caches
//! - [`definition`] - Cacheable build plans and their consistency checks
//! - [`generation`] - When and how generated artifacts backing a definition are materialized
//! - [`context`] - Validation of a resolved hierarchy, once per top-level call
//! - [`classmeta`] - Built metadata and its typestates
//! - [`mapping`] - Raw per-class mapping facts
//! - [`source`] - Interfaces of the mapping source, reflection and name normalization
//! - [`catalog`] - An in-memory implementation of the mapping source and reflection
//!
//! # Examples
//!
//! ```rust
//! use mapscope::metadata::{
//!     catalog::ClassCatalog,
//!     mapping::{AssociationKind, MappingFacts},
//!     resolver::{MetadataResolver, ResolverConfig},
//! };
//!
//! let mut catalog = ClassCatalog::new();
//! catalog
//!     .declare("App\\Customer", None, MappingFacts::entity("customers").id("id"))
//!     .declare(
//!         "App\\Order",
//!         None,
//!         MappingFacts::entity("orders")
//!             .id("id")
//!             .association("customer", "App\\Customer", AssociationKind::ManyToOne),
//!     );
//!
//! let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());
//! let all = resolver.get_all_metadata()?;
//! assert_eq!(all.len(), 2);
//! assert_eq!(all[1].associations()[0].target, "App\\Customer");
//! # Ok::<(), mapscope::Error>(())
//! ```

/// In-memory mapping source and reflection service
pub mod catalog;
/// Built class metadata and its construction states
pub mod classmeta;
/// Per-call building context and hierarchy validation
pub mod context;
/// Class metadata definitions and the definition builder
pub mod definition;
/// Generation policies, strategies and artifact stores
pub mod generation;
/// Raw per-class mapping facts
pub mod mapping;
/// The metadata resolver
pub mod resolver;
/// Interfaces to external collaborators
pub mod source;
