//! Configuration for the fhirflow engines.
//!
//! Validation rule sets and extraction configs are immutable value objects:
//! loaded once (from TOML files or the built-in defaults) and passed by
//! reference into each engine call. There is no ambient mutable state, so
//! every engine stays independently testable with arbitrary rule sets.

pub mod error;
pub mod extraction;
pub mod validation;

pub use error::{ConfigError, Result};
pub use extraction::{ExtractionConfig, FieldScope};
pub use validation::{ResolvedRules, TypeRules, ValidationRuleSet, WILDCARD_TYPE};
