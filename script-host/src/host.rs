//! Facade wiring registry, executor and configuration together.

use std::path::Path;
use std::sync::Arc;

use host_config::HostConfig;
use host_kernel::{ExecutionContext, Executor, InvokeResult, TracingPolicyObserver};
use host_policy::ExecPolicy;
use host_primitives::Value;
use host_tools::{ToolRegistrar, ToolRegistry, ToolResult};

/// Registry, executor and configuration of one embedding host.
///
/// Each script execution gets its own [`ExecutionContext`] from
/// [`Host::context`], with a fresh policy and counters.
#[derive(Debug)]
pub struct Host {
    registry: ToolRegistry,
    executor: Executor,
    config: HostConfig,
}

impl Host {
    /// Creates a host with an empty registry.
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        let executor = config
            .executor()
            .with_policy_observer(Arc::new(TracingPolicyObserver));
        Self {
            registry: ToolRegistry::new(),
            executor,
            config,
        }
    }

    /// Loads the configuration at `path` and creates a host from it.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        host_config::load_from_path(path).map(Self::new)
    }

    /// Runs every module of `registrar` against the host registry.
    ///
    /// # Errors
    ///
    /// Returns the first registration failure, naming the module.
    pub fn register(&self, registrar: &ToolRegistrar) -> ToolResult<usize> {
        registrar.register_all(&self.registry)
    }

    /// Shared tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Executor used by [`Host::invoke`].
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// New execution context using the configured policy and sandbox root.
    #[must_use]
    pub fn context(&self) -> ExecutionContext {
        self.context_with(self.config.build_policy())
    }

    /// New execution context with an explicit policy, for example a
    /// privileged bootstrap context.
    #[must_use]
    pub fn context_with(&self, policy: ExecPolicy) -> ExecutionContext {
        ExecutionContext::builder(&self.registry)
            .policy(policy)
            .sandbox_root(self.config.sandbox_root())
            .build()
    }

    /// Invokes a tool in `context`.
    ///
    /// # Errors
    ///
    /// See [`Executor::invoke`].
    pub fn invoke(
        &self,
        context: &ExecutionContext,
        identity: &str,
        args: Vec<Value>,
    ) -> InvokeResult<Value> {
        self.executor.invoke(context, identity, args)
    }

    /// Installs the global tracing subscriber from the telemetry section.
    ///
    /// Returns `false` when a subscriber was already installed.
    #[cfg(feature = "telemetry")]
    pub fn init_tracing(&self) -> bool {
        host_telemetry::init_tracing(&self.config.telemetry)
    }
}
