//! Shared fixtures for unit tests
//!
//! Sample class hierarchies and instrumented collaborators used across the metadata tests.


pub use catalogs::*;
pub use sources::*;
