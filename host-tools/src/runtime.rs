//! Runtime handles handed to tool functions at call time.
//!
//! Public tools see [`Runtime`]; tools registered as internal see
//! [`InternalRuntime`], which adds registry access and the caller's trust
//! level. The handle a tool receives is fixed by the function type it was
//! registered with, so no downcasting happens at call time.

use std::path::PathBuf;

use host_primitives::{Capability, ContextId, ToolIdentity, TrustContext, Value};
use tracing::Level;

use crate::error::ToolResult;
use crate::registry::ToolRegistry;
use crate::sandbox::SandboxRoot;

/// Capabilities available to every tool function.
pub trait Runtime {
    /// Execution context the call belongs to.
    fn context_id(&self) -> ContextId;

    /// Identity of the tool currently executing.
    fn identity(&self) -> &ToolIdentity;

    /// Sandbox root of the execution context.
    fn sandbox_root(&self) -> &SandboxRoot;

    /// Confines `input` to the sandbox root (lexical check).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::Sandbox`] when the path is rejected.
    fn resolve_path(&self, input: &str) -> ToolResult<PathBuf> {
        Ok(self.sandbox_root().resolve(input)?)
    }

    /// Confines `input` to the sandbox root, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::Sandbox`] when the path is rejected.
    fn resolve_existing_path(&self, input: &str) -> ToolResult<PathBuf> {
        Ok(self.sandbox_root().resolve_existing(input)?)
    }

    /// Returns `true` when the context's grants cover `required`.
    ///
    /// Tools declaring a `*` scope use this to check the concrete scope (for
    /// example a resolved path) before acting on it.
    fn granted(&self, required: &Capability) -> bool;

    /// Like [`Runtime::granted`], but fails with
    /// [`crate::ToolError::CapabilityDenied`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::CapabilityDenied`] when not covered.
    fn require_granted(&self, required: &Capability) -> ToolResult<()> {
        if self.granted(required) {
            Ok(())
        } else {
            Err(crate::ToolError::CapabilityDenied {
                identity: self.identity().clone(),
                required: required.clone(),
            })
        }
    }

    /// Emits a log line attributed to the running tool.
    fn log(&self, level: Level, message: &str);

    /// Reads a script variable.
    fn var(&self, name: &str) -> Option<Value>;

    /// Writes a script variable.
    fn set_var(&self, name: &str, value: Value);

    /// Invokes another tool under the same policy and sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::Nested`] carrying the nested failure kind.
    fn call_tool(&self, identity: &str, args: Vec<Value>) -> ToolResult<Value>;
}

/// Handle given to tools registered as internal.
pub trait InternalRuntime: Runtime {
    /// Registry the executing context resolves tools from.
    fn registry(&self) -> &ToolRegistry;

    /// Trust level of the calling environment.
    fn trust_context(&self) -> TrustContext;
}
