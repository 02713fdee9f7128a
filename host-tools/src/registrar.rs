//! Explicit, host-controlled tool registration.
//!
//! Tool modules expose a `register` function; the host collects them in a
//! [`ToolRegistrar`] and calls [`ToolRegistrar::register_all`] once at
//! startup. Nothing registers itself at load time.

use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};
use crate::registry::ToolRegistry;

/// Registration entry point of a tool module.
pub type RegisterFn = fn(&ToolRegistry) -> ToolResult<()>;

/// Ordered list of `(module, register_fn)` pairs.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistrar {
    entries: Vec<(String, RegisterFn)>,
}

impl ToolRegistrar {
    /// Creates an empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a module.
    pub fn add(&mut self, module: impl Into<String>, register: RegisterFn) -> &mut Self {
        self.entries.push((module.into(), register));
        self
    }

    /// Appends a module, returning the registrar for chaining.
    #[must_use]
    pub fn with(mut self, module: impl Into<String>, register: RegisterFn) -> Self {
        self.add(module, register);
        self
    }

    /// Module names in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(module, _)| module.as_str())
    }

    /// Runs every module against `registry`, in order.
    ///
    /// Returns the number of tools the modules added.
    ///
    /// # Errors
    ///
    /// Stops at the first failing module and returns
    /// [`ToolError::Registration`] naming it.
    pub fn register_all(&self, registry: &ToolRegistry) -> ToolResult<usize> {
        let before = registry.len();
        for (module, register) in &self.entries {
            register(registry).map_err(|source| ToolError::Registration {
                module: module.clone(),
                source: Box::new(source),
            })?;
            debug!(module = %module, "tool module registered");
        }

        let added = registry.len().saturating_sub(before);
        info!(modules = self.entries.len(), tools = added, "tool registration complete");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use host_primitives::Value;

    use crate::registry::ToolImplementation;
    use crate::spec::ToolSpec;

    fn register_fs(registry: &ToolRegistry) -> ToolResult<()> {
        for name in ["read", "write"] {
            registry.register_tool(
                ToolImplementation::builder(ToolSpec::new("fs", name))
                    .function(|_rt, _args| Ok(Value::Nil))
                    .build()?,
            )?;
        }
        Ok(())
    }

    fn register_fs_again(registry: &ToolRegistry) -> ToolResult<()> {
        registry.register_tool(
            ToolImplementation::builder(ToolSpec::new("fs", "read"))
                .function(|_rt, _args| Ok(Value::Nil))
                .build()?,
        )?;
        Ok(())
    }

    #[test]
    fn registers_modules_in_order() {
        let registrar = ToolRegistrar::new().with("fs", register_fs);
        let registry = ToolRegistry::new();

        assert_eq!(registrar.register_all(&registry).unwrap(), 2);
        assert_eq!(registrar.modules().collect::<Vec<_>>(), ["fs"]);
        assert!(registry.get_tool("fs.write").is_some());
    }

    #[test]
    fn failing_module_is_named() {
        let registrar = ToolRegistrar::new()
            .with("fs", register_fs)
            .with("fs-shadow", register_fs_again);
        let registry = ToolRegistry::new();

        let err = registrar.register_all(&registry).expect_err("duplicate");
        assert!(matches!(err, ToolError::Registration { ref module, .. } if module == "fs-shadow"));
        assert_eq!(err.kind(), host_primitives::ErrorKind::DuplicateIdentity);
    }
}
