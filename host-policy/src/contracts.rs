//! Execution policy and grant contracts.

use host_primitives::{Capability, ToolIdentity, TrustContext, canonical_identity};

use crate::limiter::CallLimiter;

/// Capabilities a policy grants plus per-identity call limits.
#[derive(Debug, Default)]
pub struct GrantSet {
    capabilities: Vec<Capability>,
    limiter: CallLimiter,
}

impl GrantSet {
    /// Creates a grant set from capabilities and `(identity, max_calls)` limits.
    #[must_use]
    pub fn new<I, S>(capabilities: Vec<Capability>, limits: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        Self {
            capabilities,
            limiter: CallLimiter::new(limits),
        }
    }

    /// Granted capabilities, in declaration order.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Call limiter holding the limits and counters.
    #[must_use]
    pub fn limiter(&self) -> &CallLimiter {
        &self.limiter
    }

    /// Calls charged so far to `identity`.
    #[must_use]
    pub fn call_count(&self, identity: &ToolIdentity) -> u64 {
        self.limiter.count(identity)
    }
}

/// Policy governing one execution context.
///
/// Immutable once built, apart from the call counters in its [`GrantSet`].
/// Share it between threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct ExecPolicy {
    context: TrustContext,
    allow: Vec<String>,
    deny: Vec<String>,
    grants: GrantSet,
}

impl ExecPolicy {
    /// Starts building a policy for the supplied trust context.
    #[must_use]
    pub fn builder(context: TrustContext) -> ExecPolicyBuilder {
        ExecPolicyBuilder {
            context,
            allow: Vec::new(),
            deny: Vec::new(),
            capabilities: Vec::new(),
            limits: Vec::new(),
        }
    }

    /// Trust level of the context.
    #[must_use]
    pub fn context(&self) -> TrustContext {
        self.context
    }

    /// Canonicalized allow rules.
    #[must_use]
    pub fn allow(&self) -> &[String] {
        &self.allow
    }

    /// Canonicalized deny rules.
    #[must_use]
    pub fn deny(&self) -> &[String] {
        &self.deny
    }

    /// Grants and limits.
    #[must_use]
    pub fn grants(&self) -> &GrantSet {
        &self.grants
    }
}

/// Builder for [`ExecPolicy`].
#[derive(Debug)]
pub struct ExecPolicyBuilder {
    context: TrustContext,
    allow: Vec<String>,
    deny: Vec<String>,
    capabilities: Vec<Capability>,
    limits: Vec<(String, u64)>,
}

impl ExecPolicyBuilder {
    /// Adds an allow rule. `fs.*` and `tool.fs.*` are the same rule.
    #[must_use]
    pub fn allow(mut self, rule: impl AsRef<str>) -> Self {
        self.allow.push(canonical_identity(rule.as_ref()));
        self
    }

    /// Adds several allow rules.
    #[must_use]
    pub fn allow_all<I, S>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rules.into_iter().fold(self, ExecPolicyBuilder::allow)
    }

    /// Adds a deny rule.
    #[must_use]
    pub fn deny(mut self, rule: impl AsRef<str>) -> Self {
        self.deny.push(canonical_identity(rule.as_ref()));
        self
    }

    /// Adds several deny rules.
    #[must_use]
    pub fn deny_all<I, S>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rules.into_iter().fold(self, ExecPolicyBuilder::deny)
    }

    /// Grants a capability.
    #[must_use]
    pub fn grant(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Grants several capabilities.
    #[must_use]
    pub fn grant_all(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Limits `identity` to `max_calls` calls for the lifetime of the policy.
    #[must_use]
    pub fn limit(mut self, identity: impl Into<String>, max_calls: u64) -> Self {
        self.limits.push((identity.into(), max_calls));
        self
    }

    /// Finalises the policy.
    #[must_use]
    pub fn build(self) -> ExecPolicy {
        ExecPolicy {
            context: self.context,
            allow: self.allow,
            deny: self.deny,
            grants: GrantSet::new(self.capabilities, self.limits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_and_limits_are_canonicalized() {
        let policy = ExecPolicy::builder(TrustContext::Normal)
            .allow("FS.*")
            .deny_all(["tool.fs.delete", "tool.tool.net.*"])
            .limit("Tool.X", 2)
            .build();

        assert_eq!(policy.allow(), ["tool.fs.*"]);
        assert_eq!(policy.deny(), ["tool.fs.delete", "tool.net.*"]);
        assert_eq!(
            policy.grants().limiter().limit(&ToolIdentity::new("x")),
            Some(2)
        );
        assert_eq!(policy.grants().call_count(&ToolIdentity::new("x")), 0);
    }

    #[test]
    fn default_policy_is_normal_and_empty() {
        let policy = ExecPolicy::default();
        assert_eq!(policy.context(), TrustContext::Normal);
        assert!(policy.allow().is_empty());
        assert!(policy.grants().capabilities().is_empty());
    }
}
