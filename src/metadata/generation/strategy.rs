//! Generation strategies.
//!
//! One strategy type per [`GenerationPolicy`]. Each materializes or validates the artifact backing
//! a definition through a shared [`ArtifactStore`]. The resolver guarantees that at most one
//! strategy call per class runs at a time; the store guarantees atomic writes across processes.

use std::sync::Arc;

use crate::{
    metadata::generation::{Artifact, ArtifactStore, GenerationPolicy, GenerationRequest},
    Result,
};

/// Materializes or validates the generated artifact for a definition.
pub trait GenerationStrategy: Send + Sync {
    /// The policy this strategy implements.
    fn policy(&self) -> GenerationPolicy;

    /// Returns a valid artifact for `request`, generating it if the policy allows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Generation`] if no valid artifact can be produced under this
    /// policy, or the store's error if reading or writing fails.
    fn materialize(&self, request: &GenerationRequest) -> Result<Arc<Artifact>>;
}

/// Never generates; the artifact must already exist and be valid.
pub struct NeverGenerate {
    store: Arc<dyn ArtifactStore>,
}

impl NeverGenerate {
    /// Creates the strategy on top of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        NeverGenerate { store }
    }
}

impl GenerationStrategy for NeverGenerate {
    fn policy(&self) -> GenerationPolicy {
        GenerationPolicy::Never
    }

    fn materialize(&self, request: &GenerationRequest) -> Result<Arc<Artifact>> {
        match self.store.load(request.class_name)? {
            Some(artifact) if artifact.is_valid_for(request) => Ok(Arc::new(artifact)),
            Some(_) => Err(generation_error!(
                request.class_name,
                "stored artifact is stale and generation is disabled"
            )),
            None => Err(generation_error!(
                request.class_name,
                "no artifact is stored and generation is disabled"
            )),
        }
    }
}

/// Regenerates on every call. Expensive, meant for development.
pub struct AlwaysGenerate {
    store: Arc<dyn ArtifactStore>,
}

impl AlwaysGenerate {
    /// Creates the strategy on top of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        AlwaysGenerate { store }
    }
}

impl GenerationStrategy for AlwaysGenerate {
    fn policy(&self) -> GenerationPolicy {
        GenerationPolicy::Always
    }

    fn materialize(&self, request: &GenerationRequest) -> Result<Arc<Artifact>> {
        let artifact = Artifact::generate(request);
        self.store.save(&artifact)?;
        log::debug!("generated artifact for {}", request.class_name);
        Ok(Arc::new(artifact))
    }
}

/// Generates only if no valid artifact is stored; reuses it otherwise.
pub struct GenerateIfMissing {
    store: Arc<dyn ArtifactStore>,
}

impl GenerateIfMissing {
    /// Creates the strategy on top of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        GenerateIfMissing { store }
    }
}

impl GenerationStrategy for GenerateIfMissing {
    fn policy(&self) -> GenerationPolicy {
        GenerationPolicy::IfMissing
    }

    fn materialize(&self, request: &GenerationRequest) -> Result<Arc<Artifact>> {
        match self.store.load(request.class_name)? {
            Some(artifact) if artifact.is_valid_for(request) => {
                log::trace!("reusing artifact for {}", request.class_name);
                return Ok(Arc::new(artifact));
            }
            Some(_) => log::warn!("artifact for {} is stale, regenerating", request.class_name),
            None => {}
        }

        let artifact = Artifact::generate(request);
        self.store.save(&artifact)?;
        log::debug!("generated artifact for {}", request.class_name);
        Ok(Arc::new(artifact))
    }
}
