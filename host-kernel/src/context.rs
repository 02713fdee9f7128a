//! Per-execution state: policy, sandbox root, variables and registry view.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use host_policy::ExecPolicy;
use host_primitives::{ContextId, TrustContext, Value};
use host_tools::{SandboxRoot, ScopedRegistry, ToolRegistry};

/// State shared by every call made from one script execution.
///
/// The policy and sandbox root are host-supplied and fixed for the lifetime of
/// the context. Variables are private to the context.
#[derive(Debug)]
pub struct ExecutionContext {
    id: ContextId,
    registry: ScopedRegistry,
    policy: Option<Arc<ExecPolicy>>,
    sandbox_root: Option<SandboxRoot>,
    variables: RwLock<HashMap<String, Value>>,
}

impl ExecutionContext {
    /// Starts building a context that resolves tools from `registry`.
    #[must_use]
    pub fn builder(registry: &ToolRegistry) -> ExecutionContextBuilder {
        ExecutionContextBuilder {
            id: ContextId::random(),
            registry: registry.clone(),
            policy: None,
            sandbox_root: None,
            variables: HashMap::new(),
        }
    }

    /// Identifier of the context.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Registry view bound to this context.
    #[must_use]
    pub fn registry(&self) -> &ScopedRegistry {
        &self.registry
    }

    /// Policy governing the context, if configured.
    #[must_use]
    pub fn policy(&self) -> Option<&ExecPolicy> {
        self.policy.as_deref()
    }

    /// Sandbox root, if configured.
    #[must_use]
    pub fn sandbox_root(&self) -> Option<&SandboxRoot> {
        self.sandbox_root.as_ref()
    }

    /// Trust level of the context; `Normal` without a policy.
    #[must_use]
    pub fn trust_context(&self) -> TrustContext {
        self.policy().map(ExecPolicy::context).unwrap_or_default()
    }

    /// Reads a variable.
    ///
    /// # Panics
    ///
    /// Panics if the variable lock is poisoned.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<Value> {
        let variables = self.variables.read().expect("context variables poisoned");
        variables.get(name).cloned()
    }

    /// Writes a variable, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if the variable lock is poisoned.
    pub fn set_var(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        let mut variables = self.variables.write().expect("context variables poisoned");
        variables.insert(name.into(), value)
    }

    /// Creates a child context for a forked execution.
    ///
    /// The child shares the tool table, the policy (and its call counters) and
    /// the sandbox root. It gets a fresh id and a copy of the current
    /// variables; later writes on either side are not visible to the other.
    ///
    /// # Panics
    ///
    /// Panics if the variable lock is poisoned.
    #[must_use]
    pub fn fork(&self) -> ExecutionContext {
        let id = ContextId::random();
        let variables = self
            .variables
            .read()
            .expect("context variables poisoned")
            .clone();

        ExecutionContext {
            id,
            registry: self.registry.rebind(id),
            policy: self.policy.clone(),
            sandbox_root: self.sandbox_root.clone(),
            variables: RwLock::new(variables),
        }
    }
}

/// Builder for [`ExecutionContext`].
#[derive(Debug)]
pub struct ExecutionContextBuilder {
    id: ContextId,
    registry: ToolRegistry,
    policy: Option<Arc<ExecPolicy>>,
    sandbox_root: Option<SandboxRoot>,
    variables: HashMap<String, Value>,
}

impl ExecutionContextBuilder {
    /// Overrides the generated context id.
    #[must_use]
    pub fn id(mut self, id: ContextId) -> Self {
        self.id = id;
        self
    }

    /// Sets the policy.
    #[must_use]
    pub fn policy(mut self, policy: impl Into<Arc<ExecPolicy>>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    /// Sets the sandbox root.
    #[must_use]
    pub fn sandbox_root(mut self, root: SandboxRoot) -> Self {
        self.sandbox_root = Some(root);
        self
    }

    /// Seeds a variable.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Finalises the context.
    #[must_use]
    pub fn build(self) -> ExecutionContext {
        ExecutionContext {
            id: self.id,
            registry: self.registry.scoped_view(self.id),
            policy: self.policy,
            sandbox_root: self.sandbox_root,
            variables: RwLock::new(self.variables),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use host_primitives::ToolIdentity;

    #[test]
    fn fork_shares_policy_but_not_variables() {
        let registry = ToolRegistry::new();
        let policy = Arc::new(
            ExecPolicy::builder(TrustContext::Privileged)
                .limit("x", 5)
                .build(),
        );
        let parent = ExecutionContext::builder(&registry)
            .policy(Arc::clone(&policy))
            .sandbox_root(SandboxRoot::new("/data"))
            .var("greeting", "hi")
            .build();

        let child = parent.fork();
        child.set_var("greeting", Value::from("bye"));

        assert_ne!(child.id(), parent.id());
        assert_eq!(child.registry().context(), child.id());
        assert!(child.registry().shares_table_with(parent.registry()));
        assert_eq!(parent.var("greeting"), Some(Value::from("hi")));
        assert_eq!(child.var("greeting"), Some(Value::from("bye")));
        assert_eq!(child.trust_context(), TrustContext::Privileged);
        assert_eq!(child.sandbox_root(), parent.sandbox_root());

        policy.grants().limiter().charge(&ToolIdentity::new("x"));
        assert_eq!(
            child
                .policy()
                .map(|p| p.grants().call_count(&ToolIdentity::new("x"))),
            Some(1)
        );
    }

    #[test]
    fn context_without_policy_is_normal() {
        let context = ExecutionContext::builder(&ToolRegistry::new()).build();
        assert!(context.policy().is_none());
        assert!(context.sandbox_root().is_none());
        assert_eq!(context.trust_context(), TrustContext::Normal);
    }
}
