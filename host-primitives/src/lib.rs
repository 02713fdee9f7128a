//! Core shared types for the script host trust gate.

#![warn(missing_docs, clippy::pedantic)]

mod capability;
mod error;
mod identity;
mod ids;
mod trust;
mod value;

/// Capability descriptors and supporting builders.
pub use capability::{
    ANY_SCOPE, Capability, CapabilityBuilder, EXECUTE_RESOURCE, EXECUTE_VERB,
};
/// Error type, result alias, and host-facing error kinds.
pub use error::{Error, ErrorKind, Result};
/// Canonical tool identities.
pub use identity::{TOOL_PREFIX, ToolIdentity, canonical_identity};
/// Unique identifier for execution contexts.
pub use ids::ContextId;
/// Trust level of the calling environment.
pub use trust::TrustContext;
/// Dynamic script values and declared type tags.
pub use value::{TypeTag, Value, ValueKind};
