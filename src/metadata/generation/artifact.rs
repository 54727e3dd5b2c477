//! Generated artifacts backing class definitions.
//!
//! An [`Artifact`] is the materialized, cacheable rendition of a class's build plan. It carries a
//! fingerprint over everything the plan was derived from, so a cached artifact can be checked
//! for staleness against the current mapping without regenerating it.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{
    metadata::mapping::{MappingFacts, MetadataKind},
    Result,
};

/// Everything needed to generate or validate the artifact of one class.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    /// Canonical class name
    pub class_name: &'a str,
    /// Representation chosen by the definition builder
    pub kind: MetadataKind,
    /// Canonical name of the effective parent
    pub parent: Option<&'a str>,
    /// Raw mapping facts of the class
    pub mapping: &'a MappingFacts,
    /// Fingerprint over all of the above
    pub fingerprint: String,
}

impl<'a> GenerationRequest<'a> {
    /// Creates a request and computes its fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the mapping cannot be encoded.
    pub fn new(
        class_name: &'a str,
        kind: MetadataKind,
        parent: Option<&'a str>,
        mapping: &'a MappingFacts,
    ) -> Result<Self> {
        let fingerprint = fingerprint(class_name, kind, parent, mapping)?;
        Ok(GenerationRequest {
            class_name,
            kind,
            parent,
            mapping,
            fingerprint,
        })
    }
}

/// Hex encoded SHA-1 over the class name, kind, parent and mapping.
///
/// # Errors
///
/// Returns [`crate::Error::Serialization`] if the mapping cannot be encoded.
pub fn fingerprint(
    class_name: &str,
    kind: MetadataKind,
    parent: Option<&str>,
    mapping: &MappingFacts,
) -> Result<String> {
    let encoded = serde_json::to_vec(&(class_name, kind, parent, mapping))?;
    Ok(hex::encode(Sha1::digest(&encoded)))
}

/// A materialized build plan, as persisted by an [`crate::metadata::generation::ArtifactStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Canonical class name
    pub class_name: String,
    /// Representation to instantiate
    pub kind: MetadataKind,
    /// Canonical name of the effective parent
    pub parent: Option<String>,
    /// Fingerprint of the inputs this artifact was generated from
    pub fingerprint: String,
    /// Raw mapping facts the artifact was generated from
    pub mapping: MappingFacts,
}

impl Artifact {
    /// Generates the artifact for `request`.
    #[must_use]
    pub fn generate(request: &GenerationRequest) -> Self {
        Artifact {
            class_name: request.class_name.to_string(),
            kind: request.kind,
            parent: request.parent.map(str::to_string),
            fingerprint: request.fingerprint.clone(),
            mapping: request.mapping.clone(),
        }
    }

    /// Returns `true` if this artifact was generated from exactly the inputs of `request`.
    #[must_use]
    pub fn is_valid_for(&self, request: &GenerationRequest) -> bool {
        self.class_name == request.class_name && self.fingerprint == request.fingerprint
    }

    /// Encodes the artifact for storage.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decodes a stored artifact.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if `data` is not a valid artifact.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::mapping::FieldFlags;

    #[test]
    fn test_fingerprint_tracks_every_input() {
        let facts = MappingFacts::entity("users").id("id");
        let base = fingerprint("App\\User", MetadataKind::Entity, None, &facts).unwrap();

        assert_eq!(base.len(), 40);
        assert_eq!(
            base,
            fingerprint("App\\User", MetadataKind::Entity, None, &facts).unwrap()
        );
        assert_ne!(
            base,
            fingerprint("App\\User", MetadataKind::Entity, Some("App\\Base"), &facts).unwrap()
        );

        let changed = facts.clone().field("email", FieldFlags::empty());
        assert_ne!(
            base,
            fingerprint("App\\User", MetadataKind::Entity, None, &changed).unwrap()
        );
    }

    #[test]
    fn test_validity_against_request() {
        let facts = MappingFacts::entity("users").id("id");
        let request =
            GenerationRequest::new("App\\User", MetadataKind::Entity, None, &facts).unwrap();
        let artifact = Artifact::generate(&request);
        assert!(artifact.is_valid_for(&request));

        let changed = facts.clone().field("email", FieldFlags::empty());
        let stale =
            GenerationRequest::new("App\\User", MetadataKind::Entity, None, &changed).unwrap();
        assert!(!artifact.is_valid_for(&stale));

        let decoded = Artifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, artifact);
        assert!(Artifact::from_bytes(b"{ not json").is_err());
    }
}
