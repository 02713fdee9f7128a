//! Tool invocation pipeline.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use host_policy::{can_call, check};
use host_primitives::{Capability, ContextId, ToolIdentity, TrustContext, Value};
use host_tools::{
    InternalRuntime, Runtime, SandboxRoot, ToolError, ToolFunction, ToolImplementation,
    ToolRegistry, ToolResult, coerce_args,
};
use tracing::{Level, debug, error, info, trace, warn};

use crate::context::ExecutionContext;
use crate::error::{InvokeError, InvokeResult};
use crate::observer::PolicyObserver;

/// Default limit on nested tool calls.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Runs tool calls through lookup, authorization, coercion and execution.
///
/// Cloning is cheap; clones share the observer.
#[derive(Clone)]
pub struct Executor {
    observer: Option<Arc<dyn PolicyObserver>>,
    max_depth: usize,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("observer_configured", &self.observer.is_some())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Creates an executor without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observer: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Installs a policy observer.
    pub fn set_policy_observer(&mut self, observer: Arc<dyn PolicyObserver>) {
        self.observer = Some(observer);
    }

    /// Installs a policy observer, returning the updated executor for chaining.
    #[must_use]
    pub fn with_policy_observer(mut self, observer: Arc<dyn PolicyObserver>) -> Self {
        self.set_policy_observer(observer);
        self
    }

    /// Returns the policy observer if configured.
    #[must_use]
    pub fn policy_observer(&self) -> Option<&Arc<dyn PolicyObserver>> {
        self.observer.as_ref()
    }

    /// Sets how deep nested tool calls may go. `0` forbids nesting.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Configured nesting limit.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Invokes `identity` with raw script arguments.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] for an unknown tool, a missing sandbox root, a
    /// refused authorization, an argument mismatch, a tool failure or a
    /// contained panic. Nothing runs after the first failing step.
    pub fn invoke(
        &self,
        context: &ExecutionContext,
        identity: &str,
        args: Vec<Value>,
    ) -> InvokeResult<Value> {
        self.invoke_at(context, identity, args, 0)
    }

    /// Runs [`Executor::invoke`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns the invocation error, or [`InvokeError::Join`] if the blocking
    /// task could not complete.
    pub async fn invoke_blocking(
        &self,
        context: Arc<ExecutionContext>,
        identity: impl Into<String>,
        args: Vec<Value>,
    ) -> InvokeResult<Value> {
        let executor = self.clone();
        let identity = identity.into();
        tokio::task::spawn_blocking(move || executor.invoke(&context, &identity, args))
            .await
            .map_err(|err| InvokeError::Join {
                reason: err.to_string(),
            })?
    }

    fn invoke_at(
        &self,
        context: &ExecutionContext,
        identity: &str,
        args: Vec<Value>,
        depth: usize,
    ) -> InvokeResult<Value> {
        if depth > self.max_depth {
            return Err(InvokeError::DepthExceeded {
                identity: ToolIdentity::new(identity),
                max: self.max_depth,
            });
        }

        let implementation = context.registry().require_tool(identity)?;
        let sandbox_root = context.sandbox_root().ok_or(InvokeError::MissingSandbox)?;

        let decision = can_call(&implementation, context.policy());
        self.notify_policy(context.id(), implementation.identity(), decision.as_ref().err());
        decision?;

        let args = coerce_args(&implementation, args)?;
        let runtime = CallRuntime {
            executor: self,
            context,
            identity: implementation.identity(),
            sandbox_root,
            depth,
        };

        trace!(
            context = %context.id(),
            identity = %implementation.identity(),
            depth,
            "invoking tool"
        );
        match catch_unwind(AssertUnwindSafe(|| run(&implementation, &runtime, args))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                debug!(
                    context = %context.id(),
                    identity = %implementation.identity(),
                    kind = %err.kind(),
                    error = %err,
                    "tool returned an error"
                );
                Err(err.into())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(
                    context = %context.id(),
                    identity = %implementation.identity(),
                    panic = %message,
                    "tool panicked; contained"
                );
                Err(InvokeError::Panic {
                    identity: implementation.identity().clone(),
                    message,
                })
            }
        }
    }

    fn notify_policy(
        &self,
        context: ContextId,
        identity: &ToolIdentity,
        refusal: Option<&host_policy::PolicyError>,
    ) {
        if let Some(observer) = &self.observer {
            observer.on_decision(context, identity, refusal.map_or(Ok(()), Err));
        }
    }
}

fn run(
    implementation: &ToolImplementation,
    runtime: &CallRuntime<'_>,
    args: host_tools::CallArgs,
) -> ToolResult<Value> {
    match implementation.function() {
        ToolFunction::Public(function) => function(runtime, args),
        ToolFunction::Internal(function) => function(runtime, args),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Handle given to a tool for the duration of one call.
struct CallRuntime<'a> {
    executor: &'a Executor,
    context: &'a ExecutionContext,
    identity: &'a ToolIdentity,
    sandbox_root: &'a SandboxRoot,
    depth: usize,
}

impl Runtime for CallRuntime<'_> {
    fn context_id(&self) -> ContextId {
        self.context.id()
    }

    fn identity(&self) -> &ToolIdentity {
        self.identity
    }

    fn sandbox_root(&self) -> &SandboxRoot {
        self.sandbox_root
    }

    fn granted(&self, required: &Capability) -> bool {
        self.context
            .policy()
            .is_some_and(|policy| check(required, policy.grants().capabilities()))
    }

    fn log(&self, level: Level, message: &str) {
        let context = self.context.id();
        let identity = self.identity;
        match level {
            Level::ERROR => error!(context = %context, identity = %identity, "{message}"),
            Level::WARN => warn!(context = %context, identity = %identity, "{message}"),
            Level::INFO => info!(context = %context, identity = %identity, "{message}"),
            Level::DEBUG => debug!(context = %context, identity = %identity, "{message}"),
            Level::TRACE => trace!(context = %context, identity = %identity, "{message}"),
        }
    }

    fn var(&self, name: &str) -> Option<Value> {
        self.context.var(name)
    }

    fn set_var(&self, name: &str, value: Value) {
        self.context.set_var(name, value);
    }

    fn call_tool(&self, identity: &str, args: Vec<Value>) -> ToolResult<Value> {
        self.executor
            .invoke_at(self.context, identity, args, self.depth + 1)
            .map_err(|err| ToolError::Nested {
                identity: ToolIdentity::new(identity),
                kind: err.kind(),
                reason: err.to_string(),
            })
    }
}

impl InternalRuntime for CallRuntime<'_> {
    fn registry(&self) -> &ToolRegistry {
        self.context.registry().registry()
    }

    fn trust_context(&self) -> TrustContext {
        self.context.trust_context()
    }
}
