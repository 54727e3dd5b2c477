//! Generated-artifact handling for class definitions.
//!
//! Every definition is backed by a generated artifact. Producing it can be expensive, so the
//! [`GenerationPolicy`] decides when it is (re)materialized:
//!
//! - [`GenerationPolicy::Never`] - the artifact must already exist and match the mapping
//! - [`GenerationPolicy::Always`] - regenerate unconditionally, for development
//! - [`GenerationPolicy::IfMissing`] - generate only if no valid artifact is stored (default)
//!
//! # Key Components
//!
//! - [`GenerationStrategy`] - The capability, one implementation per policy
//! - [`Artifact`] / [`GenerationRequest`] - What is generated and from which inputs
//! - [`ArtifactStore`] - Where artifacts live: [`FileArtifactStore`] or [`MemoryArtifactStore`]
//!
//! # Examples
//!
//! ```rust
//! use mapscope::metadata::generation::{strategy_for, GenerationPolicy, MemoryArtifactStore};
//! use std::sync::Arc;
//!
//! let policy: GenerationPolicy = "if-missing".parse().unwrap();
//! let strategy = strategy_for(policy, Arc::new(MemoryArtifactStore::new()));
//! assert_eq!(strategy.policy(), GenerationPolicy::IfMissing);
//! ```

mod artifact;
mod store;
mod strategy;

use std::sync::Arc;

use strum::{Display, EnumIter, EnumString};

pub use artifact::{fingerprint, Artifact, GenerationRequest};
pub use store::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};
pub use strategy::{AlwaysGenerate, GenerateIfMissing, GenerationStrategy, NeverGenerate};

/// When generated artifacts are (re)materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum GenerationPolicy {
    /// Assume the artifact exists; fail if it is absent or stale
    Never,
    /// Regenerate on every definition build
    Always,
    /// Generate only when no valid artifact is stored
    #[default]
    IfMissing,
}

/// Creates the strategy implementing `policy` on top of `store`.
#[must_use]
pub fn strategy_for(
    policy: GenerationPolicy,
    store: Arc<dyn ArtifactStore>,
) -> Arc<dyn GenerationStrategy> {
    match policy {
        GenerationPolicy::Never => Arc::new(NeverGenerate::new(store)),
        GenerationPolicy::Always => Arc::new(AlwaysGenerate::new(store)),
        GenerationPolicy::IfMissing => Arc::new(GenerateIfMissing::new(store)),
    }
}
