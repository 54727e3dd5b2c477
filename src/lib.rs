// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # mapscope
//!
//! Resolution, construction and caching of class-mapping metadata for object-relational
//! persistence layers.
//!
//! Given a class name, `mapscope` produces a fully built metadata object describing how that
//! class and its mapped ancestors map to storage. Ancestor chains are resolved bottom-up,
//! transient classes are skipped, every class is built exactly once per resolver, and the
//! assembled hierarchy is validated as a whole.
//!
//! ## Features
//!
//! - **Ancestor-chain resolution** - Base-first build order with transient classes skipped
//! - **Two caches** - Definitions and built metadata, shared by every caller
//! - **Single flight** - Concurrent requests for the same class build it once
//! - **Generation policies** - `never`, `always` or `if-missing` artifact materialization
//! - **Atomic artifact writes** - Temp file, rename and advisory lock, safe across processes
//! - **Aggregated validation** - One report listing every issue across a hierarchy
//!
//! ## Quick Start
//!
//! ```rust
//! use mapscope::prelude::*;
//!
//! let mut catalog = ClassCatalog::new();
//! catalog
//!     .declare("App\\Model", None, MappingFacts::mapped_superclass().id("id"))
//!     .declare_transient("App\\Timestamps", Some("App\\Model"))
//!     .declare("App\\User", Some("App\\Timestamps"), MappingFacts::entity("users"));
//!
//! let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());
//! let user = resolver.get_metadata_for("App\\User")?;
//!
//! assert_eq!(user.table_name(), Some("users"));
//! assert_eq!(user.parent_name(), Some("App\\Model"));
//! assert!(!resolver.has_metadata_for("App\\Timestamps"));
//! # Ok::<(), mapscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata::resolver`] - The orchestrating [`metadata::resolver::MetadataResolver`]
//! - [`metadata::definition`] - Build plans and the definition builder
//! - [`metadata::generation`] - Generation policies, artifacts and artifact stores
//! - [`metadata::context`] - Per-call hierarchy validation
//! - [`metadata::classmeta`] - The built metadata and its typestates
//! - [`metadata::source`] - Interfaces of the external collaborators
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger itself. Builds and
//! artifact generation are reported at `debug`, cache hits at `trace`, stale artifacts and
//! validation failures at `warn`.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use mapscope::prelude::*;
///
/// let resolver = MetadataResolver::with_catalog(ClassCatalog::new(), ResolverConfig::default());
/// assert!(resolver.loaded_metadata().is_empty());
/// ```
pub mod prelude;

/// Class metadata: mapping facts, definitions, generation, validation and resolution
pub mod metadata;

/// Synchronization primitives backing the caches
pub mod utils;

/// `mapscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `mapscope` Error type
///
/// Every fallible operation of the crate returns this error. Failures are never retried
/// internally.
pub use error::Error;
