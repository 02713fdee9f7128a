//! Tool registration, argument coercion, and sandbox confinement.
//!
//! The modules exposed here let host code register tool implementations under
//! canonical identities, coerce dynamically-typed script arguments into the
//! declared types, and confine script-supplied paths to a sandbox root.

#![warn(missing_docs, clippy::pedantic)]

pub mod args;
pub mod checksum;
mod error;
pub mod registrar;
pub mod registry;
pub mod runtime;
pub mod sandbox;
pub mod spec;

pub use args::{CallArgs, coerce_args, coerce_value};
pub use error::{ArgumentFailure, CoercionError, ToolError, ToolResult};
pub use registrar::{RegisterFn, ToolRegistrar};
pub use registry::{
    ScopedRegistry, ToolFunction, ToolImplementation, ToolImplementationBuilder, ToolRegistry,
};
pub use runtime::{InternalRuntime, Runtime};
pub use sandbox::{SandboxError, SandboxRoot, resolve_and_secure_path};
pub use spec::{ArgSpec, ToolSpec};
