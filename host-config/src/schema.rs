//! Strongly typed configuration schema.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Result, bail};
use host_kernel::{DEFAULT_MAX_DEPTH, Executor};
use host_policy::ExecPolicy;
use host_primitives::{Capability, TrustContext};
use host_telemetry::TelemetryConfig;
use host_tools::SandboxRoot;
use serde::{Deserialize, Serialize};

/// Top-level host configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Directory tool paths are confined to. Empty falls back to `/`.
    pub sandbox_root: PathBuf,
    /// Maximum nesting of tool-to-tool calls.
    pub max_depth: usize,
    /// Execution policy applied to script contexts.
    pub policy: PolicyConfig,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sandbox_root: PathBuf::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            policy: PolicyConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl HostConfig {
    /// Checks the document for values that cannot be turned into a policy.
    ///
    /// # Errors
    ///
    /// Fails on empty allow/deny rules or empty limit identities.
    pub fn validate(&self) -> Result<()> {
        for (list, rules) in [("allow", &self.policy.allow), ("deny", &self.policy.deny)] {
            if let Some(index) = rules.iter().position(|rule| rule.trim().is_empty()) {
                bail!("{list} rule #{index} is empty");
            }
        }
        if self.policy.limits.keys().any(|identity| identity.trim().is_empty()) {
            bail!("call limit configured for an empty identity");
        }
        Ok(())
    }

    /// Builds a fresh policy with zeroed counters.
    #[must_use]
    pub fn build_policy(&self) -> ExecPolicy {
        let policy = &self.policy;
        let mut builder = ExecPolicy::builder(policy.context)
            .allow_all(&policy.allow)
            .deny_all(&policy.deny)
            .grant_all(policy.grants.iter().cloned());
        for (identity, max_calls) in &policy.limits {
            builder = builder.limit(identity.clone(), *max_calls);
        }
        builder.build()
    }

    /// Sandbox root; an empty path falls back to `/` with a warning.
    #[must_use]
    pub fn sandbox_root(&self) -> SandboxRoot {
        SandboxRoot::new(&self.sandbox_root)
    }

    /// Executor honouring the configured nesting limit.
    #[must_use]
    pub fn executor(&self) -> Executor {
        Executor::new().with_max_depth(self.max_depth)
    }
}

/// Policy section of [`HostConfig`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Trust level of script contexts.
    pub context: TrustContext,
    /// Glob rules a tool identity must match.
    pub allow: Vec<String>,
    /// Glob rules that refuse a tool identity outright.
    pub deny: Vec<String>,
    /// Granted capabilities.
    pub grants: Vec<Capability>,
    /// Maximum calls per tool identity.
    pub limits: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use host_primitives::ToolIdentity;

    #[test]
    fn builds_policy_from_document() {
        let config: HostConfig = serde_json::from_str(
            r#"{
                "sandbox_root": "/data",
                "policy": {
                    "context": "privileged",
                    "allow": ["fs.*"],
                    "deny": ["tool.fs.delete"],
                    "grants": [{"resource": "fs", "verbs": ["write"], "scopes": ["/data/*"]}],
                    "limits": {"tool.fs.write": 2}
                }
            }"#,
        )
        .unwrap();
        config.validate().unwrap();

        let policy = config.build_policy();
        assert_eq!(policy.context(), TrustContext::Privileged);
        assert_eq!(policy.allow(), ["tool.fs.*"]);
        assert_eq!(policy.deny(), ["tool.fs.delete"]);
        assert_eq!(policy.grants().capabilities().len(), 1);
        assert_eq!(
            policy.grants().limiter().limit(&ToolIdentity::new("fs.write")),
            Some(2)
        );
        assert_eq!(config.sandbox_root().path(), std::path::Path::new("/data"));
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn empty_document_is_closed_by_default() {
        let config: HostConfig = serde_json::from_str("{}").unwrap();
        let policy = config.build_policy();
        assert_eq!(policy.context(), TrustContext::Normal);
        assert!(policy.allow().is_empty());
        assert_eq!(config.sandbox_root().path(), std::path::Path::new("/"));
    }

    #[test]
    fn rejects_invalid_sections() {
        let unknown = serde_json::from_str::<HostConfig>(r#"{"sandbox": "/data"}"#);
        assert!(unknown.is_err());

        let verbless = serde_json::from_str::<HostConfig>(
            r#"{"policy": {"grants": [{"resource": "fs", "verbs": []}]}}"#,
        );
        assert!(verbless.is_err());

        let config: HostConfig =
            serde_json::from_str(r#"{"policy": {"allow": ["fs.*", " "]}}"#).unwrap();
        let err = config.validate().expect_err("empty rule");
        assert_eq!(err.to_string(), "allow rule #1 is empty");
    }
}
