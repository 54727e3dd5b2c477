use thiserror::Error;

macro_rules! mapping_error {
    // Single string version
    ($class:expr, $msg:expr) => {
        crate::Error::MappingInconsistency {
            class: $class.to_string(),
            message: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($class:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::MappingInconsistency {
            class: $class.to_string(),
            message: format!($fmt, $($arg)*),
        }
    };
}

macro_rules! generation_error {
    ($class:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        crate::Error::Generation {
            class: $class.to_string(),
            message: format!($fmt $(, $arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every error is fatal for the top-level call that produced it; nothing is retried
/// automatically. Metadata which was already cached before the failure stays cached, so a
/// later call for an unrelated class is not affected.
///
/// # Error Categories
///
/// ## Resolution Errors
/// - [`Error::UnresolvableClass`] - The reflection service could not locate or introspect a class
/// - [`Error::MappingInconsistency`] - Raw mapping facts are malformed or contradictory
/// - [`Error::HierarchyValidation`] - The end-of-chain validation pass found issues
///
/// ## Generation Errors
/// - [`Error::Generation`] - An artifact could not be produced or read under the active policy
/// - [`Error::FileError`] - Filesystem I/O errors from the artifact store
/// - [`Error::Serialization`] - Artifact payloads could not be encoded or decoded
///
/// ## Internal Errors
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::Error`] - Miscellaneous failures
///
/// # Examples
///
/// ```rust
/// use mapscope::prelude::*;
///
/// let catalog = ClassCatalog::new();
/// let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());
///
/// match resolver.get_metadata_for("App\\Missing") {
///     Err(Error::UnresolvableClass { class, .. }) => assert_eq!(class, "App\\Missing"),
///     other => panic!("unexpected: {:?}", other.map(|m| m.name().to_string())),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The reflection service could not locate or introspect the named class.
    ///
    /// Raised when the ancestor chain of a class cannot be computed, or when the
    /// post-construction reflection bind fails.
    #[error("Class '{class}' could not be resolved - {message}")]
    UnresolvableClass {
        /// Canonical name of the class
        class: String,
        /// Description of the failure
        message: String,
    },

    /// Raw mapping facts of a class are malformed or contradictory.
    ///
    /// Detected while the definition of a class is built, before any metadata is
    /// instantiated for it.
    #[error("Mapping of '{class}' is inconsistent - {message}")]
    MappingInconsistency {
        /// Canonical name of the class
        class: String,
        /// Description of the inconsistency
        message: String,
    },

    /// The validation pass over a fully resolved ancestor chain failed.
    ///
    /// Reported once per top-level resolution, carrying every issue found across the
    /// whole chain.
    #[error(
        "Hierarchy of '{class}' failed validation with {} issue(s): {}",
        issues.len(),
        issues.join("; ")
    )]
    HierarchyValidation {
        /// Canonical name of the class whose resolution triggered the validation
        class: String,
        /// All issues found across the chain
        issues: Vec<String>,
    },

    /// A generated artifact could not be produced or read under the active policy.
    #[error("Artifact for '{class}' is unavailable - {message}")]
    Generation {
        /// Canonical name of the class
        class: String,
        /// Description of the failure
        message: String,
    },

    /// File I/O error.
    ///
    /// Wraps standard I/O errors raised by the artifact store.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Artifact payload could not be encoded or decoded.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to lock target.
    ///
    /// A per-class build gate was poisoned by a panicking builder.
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns the canonical class name this error refers to, if any.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        match self {
            Error::UnresolvableClass { class, .. }
            | Error::MappingInconsistency { class, .. }
            | Error::HierarchyValidation { class, .. }
            | Error::Generation { class, .. } => Some(class),
            _ => None,
        }
    }
}
