//! Runtime registry for tool implementations.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, RwLock};

use host_primitives::{Capability, ContextId, ToolIdentity, Value};
use tracing::debug;

use crate::args::CallArgs;
use crate::checksum::signature_checksum;
use crate::error::{ToolError, ToolResult};
use crate::runtime::{InternalRuntime, Runtime};
use crate::spec::ToolSpec;

/// Function signature of public tools.
pub type PublicToolFn = dyn Fn(&dyn Runtime, CallArgs) -> ToolResult<Value> + Send + Sync;

/// Function signature of internal tools.
pub type InternalToolFn =
    dyn Fn(&dyn InternalRuntime, CallArgs) -> ToolResult<Value> + Send + Sync;

/// Function reference stored for a tool; the variant selects the runtime handle.
#[derive(Clone)]
pub enum ToolFunction {
    /// Receives a [`Runtime`].
    Public(Arc<PublicToolFn>),
    /// Receives an [`InternalRuntime`].
    Internal(Arc<InternalToolFn>),
}

impl fmt::Debug for ToolFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public(_) => f.write_str("ToolFunction::Public"),
            Self::Internal(_) => f.write_str("ToolFunction::Internal"),
        }
    }
}

/// Registered tool: spec, function, and authorization metadata.
#[derive(Clone, Debug)]
pub struct ToolImplementation {
    identity: ToolIdentity,
    spec: ToolSpec,
    function: ToolFunction,
    requires_trust: bool,
    required_capabilities: Vec<Capability>,
    effects: Vec<String>,
    variadic: bool,
    checksum: String,
}

impl ToolImplementation {
    /// Starts building an implementation for `spec`.
    #[must_use]
    pub fn builder(spec: ToolSpec) -> ToolImplementationBuilder {
        ToolImplementationBuilder {
            spec,
            function: None,
            requires_trust: false,
            required_capabilities: Vec::new(),
            effects: Vec::new(),
            variadic: false,
        }
    }

    /// Canonical identity.
    #[must_use]
    pub fn identity(&self) -> &ToolIdentity {
        &self.identity
    }

    /// Declared signature.
    #[must_use]
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Function reference.
    #[must_use]
    pub fn function(&self) -> &ToolFunction {
        &self.function
    }

    /// Whether the tool may only run in a privileged context.
    #[must_use]
    pub fn requires_trust(&self) -> bool {
        self.requires_trust
    }

    /// Capabilities the policy must grant.
    #[must_use]
    pub fn required_capabilities(&self) -> &[Capability] {
        &self.required_capabilities
    }

    /// Informational effect tags.
    #[must_use]
    pub fn effects(&self) -> &[String] {
        &self.effects
    }

    /// Whether extra trailing arguments are passed through uncoerced.
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Whether the function receives an [`InternalRuntime`].
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self.function, ToolFunction::Internal(_))
    }

    /// Hex SHA-256 of the signature, populated at registration.
    #[must_use]
    pub fn signature_checksum(&self) -> &str {
        &self.checksum
    }
}

/// Builder for [`ToolImplementation`].
pub struct ToolImplementationBuilder {
    spec: ToolSpec,
    function: Option<ToolFunction>,
    requires_trust: bool,
    required_capabilities: Vec<Capability>,
    effects: Vec<String>,
    variadic: bool,
}

impl ToolImplementationBuilder {
    /// Sets a public tool function.
    #[must_use]
    pub fn function<F>(mut self, function: F) -> Self
    where
        F: Fn(&dyn Runtime, CallArgs) -> ToolResult<Value> + Send + Sync + 'static,
    {
        self.function = Some(ToolFunction::Public(Arc::new(function)));
        self
    }

    /// Sets an internal tool function.
    #[must_use]
    pub fn internal_function<F>(mut self, function: F) -> Self
    where
        F: Fn(&dyn InternalRuntime, CallArgs) -> ToolResult<Value> + Send + Sync + 'static,
    {
        self.function = Some(ToolFunction::Internal(Arc::new(function)));
        self
    }

    /// Marks the tool as callable only from a privileged context.
    #[must_use]
    pub fn requires_trust(mut self, requires_trust: bool) -> Self {
        self.requires_trust = requires_trust;
        self
    }

    /// Adds a required capability.
    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.required_capabilities.push(capability);
        self
    }

    /// Adds an informational effect tag.
    #[must_use]
    pub fn effect(mut self, effect: impl Into<String>) -> Self {
        self.effects.push(effect.into());
        self
    }

    /// Lets extra trailing arguments through uncoerced.
    #[must_use]
    pub fn variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    /// Finalises the implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSpec`] if no function was supplied or the
    /// spec fails validation.
    pub fn build(self) -> ToolResult<ToolImplementation> {
        self.spec.validate()?;
        let identity = self.spec.identity();
        let function = self.function.ok_or_else(|| ToolError::InvalidSpec {
            identity: identity.to_string(),
            reason: "function reference is missing".into(),
        })?;

        Ok(ToolImplementation {
            identity,
            spec: self.spec,
            function,
            requires_trust: self.requires_trust,
            required_capabilities: self.required_capabilities,
            effects: self.effects,
            variadic: self.variadic,
            checksum: String::new(),
        })
    }
}

/// Registry that stores tool implementations keyed by canonical identity.
///
/// Cloning is cheap and yields a handle onto the same table.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    inner: Arc<RwLock<HashMap<ToolIdentity, Arc<ToolImplementation>>>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().expect("tool registry poisoned");
        let mut names: Vec<_> = inner.keys().map(ToolIdentity::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool implementation.
    ///
    /// The identity is re-derived from the spec and the signature checksum is
    /// computed here. An existing registration is never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSpec`] for an invalid spec and
    /// [`ToolError::DuplicateIdentity`] if the identity is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_tool(
        &self,
        mut implementation: ToolImplementation,
    ) -> ToolResult<Arc<ToolImplementation>> {
        implementation.spec.validate()?;
        implementation.identity = implementation.spec.identity();
        implementation.checksum = signature_checksum(&implementation);

        let mut inner = self.inner.write().expect("tool registry poisoned");
        if inner.contains_key(&implementation.identity) {
            return Err(ToolError::DuplicateIdentity {
                identity: implementation.identity,
            });
        }

        let implementation = Arc::new(implementation);
        inner.insert(implementation.identity.clone(), Arc::clone(&implementation));
        debug!(
            identity = %implementation.identity,
            checksum = %implementation.checksum,
            internal = implementation.is_internal(),
            "tool registered"
        );

        Ok(implementation)
    }

    /// Looks up a tool by any spelling of its identity.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<Arc<ToolImplementation>> {
        let identity = ToolIdentity::new(name);
        let inner = self.inner.read().expect("tool registry poisoned");
        inner.get(&identity).cloned()
    }

    /// Looks up a tool by group and short name.
    #[must_use]
    pub fn get_tool_short(&self, group: &str, name: &str) -> Option<Arc<ToolImplementation>> {
        self.get_tool(ToolIdentity::from_parts(group, name).as_str())
    }

    /// Looks up a tool, failing with [`ToolError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] when no tool matches.
    pub fn require_tool(&self, name: &str) -> ToolResult<Arc<ToolImplementation>> {
        self.get_tool(name).ok_or_else(|| ToolError::NotFound {
            identity: ToolIdentity::new(name),
        })
    }

    /// Snapshot of every registered tool, in no particular order.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Arc<ToolImplementation>> {
        let inner = self.inner.read().expect("tool registry poisoned");
        inner.values().cloned().collect()
    }

    /// Number of registered tools.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().expect("tool registry poisoned").len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a view sharing this tool table, bound to another execution context.
    #[must_use]
    pub fn scoped_view(&self, context: ContextId) -> ScopedRegistry {
        ScopedRegistry {
            registry: self.clone(),
            context,
        }
    }

    /// Returns `true` when both handles share one tool table.
    #[must_use]
    pub fn shares_table_with(&self, other: &ToolRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Registry handle bound to a specific execution context.
///
/// Registrations through any view are visible to all of them.
#[derive(Clone, Debug)]
pub struct ScopedRegistry {
    registry: ToolRegistry,
    context: ContextId,
}

impl ScopedRegistry {
    /// Execution context this view is bound to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Shared registry behind the view.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Rebinds the same table to another context.
    #[must_use]
    pub fn rebind(&self, context: ContextId) -> ScopedRegistry {
        self.registry.scoped_view(context)
    }
}

impl Deref for ScopedRegistry {
    type Target = ToolRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}
