//! Authorization decision for a single tool call.

use host_primitives::{Capability, ErrorKind, ToolIdentity, TrustContext};
use host_tools::ToolImplementation;
use thiserror::Error;
use tracing::{debug, warn};

use crate::contracts::ExecPolicy;
use crate::limiter::LimitCheck;
use crate::matcher::{check, match_rule, rule_matches_execute};

/// Reasons a call is refused.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No policy was configured for the execution context.
    #[error("no execution policy configured")]
    Missing,
    /// Tool requires a privileged context.
    #[error("tool `{identity}` requires a privileged context (current: {context})")]
    Trust {
        /// Tool being called.
        identity: ToolIdentity,
        /// Trust level of the caller.
        context: TrustContext,
    },
    /// A deny rule matched.
    #[error("tool `{identity}` is denied by rule `{rule}`")]
    Denied {
        /// Tool being called.
        identity: ToolIdentity,
        /// Matching deny rule.
        rule: String,
    },
    /// No allow rule matched.
    #[error("tool `{identity}` is not allow-listed")]
    NotAllowed {
        /// Tool being called.
        identity: ToolIdentity,
    },
    /// Grants do not cover a required capability.
    #[error("tool `{identity}` requires {required}; held grants: [{}]", held_list(.held))]
    Capability {
        /// Tool being called.
        identity: ToolIdentity,
        /// First requirement not covered.
        required: Capability,
        /// Every grant of the policy.
        held: Vec<Capability>,
    },
    /// Call budget exhausted.
    #[error("tool `{identity}` exceeded its call limit ({count} > {limit})")]
    LimitExceeded {
        /// Tool being called.
        identity: ToolIdentity,
        /// Post-increment count.
        count: u64,
        /// Configured maximum.
        limit: u64,
    },
}

impl PolicyError {
    /// Machine-readable category of the failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Missing => ErrorKind::Configuration,
            Self::Trust { .. } => ErrorKind::Trust,
            Self::Denied { .. } | Self::NotAllowed { .. } | Self::LimitExceeded { .. } => {
                ErrorKind::Policy
            }
            Self::Capability { .. } => ErrorKind::Capability,
        }
    }
}

fn held_list(held: &[Capability]) -> String {
    held.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Decides whether `implementation` may run under `policy`.
///
/// Checks run in a fixed order and the first failure is returned:
///
/// 1. a policy must be present;
/// 2. trusted tools need a privileged context;
/// 3. deny rules, matched against the synthetic execute capability;
/// 4. allow rules;
/// 5. required capabilities against the grants;
/// 6. the call limit, charged before comparing.
///
/// A call refused at step 6 has still consumed budget.
///
/// # Errors
///
/// Returns the [`PolicyError`] of the first failing check.
pub fn can_call(
    implementation: &ToolImplementation,
    policy: Option<&ExecPolicy>,
) -> PolicyResult<()> {
    let policy = policy.ok_or(PolicyError::Missing)?;
    let identity = implementation.identity();

    if implementation.requires_trust() && !policy.context().is_privileged() {
        warn!(identity = %identity, context = %policy.context(), "trusted tool refused");
        return Err(PolicyError::Trust {
            identity: identity.clone(),
            context: policy.context(),
        });
    }

    let execute = Capability::execute(identity.as_str());
    if let Some(rule) = policy
        .deny()
        .iter()
        .find(|rule| rule_matches_execute(rule, &execute))
    {
        warn!(identity = %identity, rule = %rule, "tool denied");
        return Err(PolicyError::Denied {
            identity: identity.clone(),
            rule: rule.clone(),
        });
    }

    if !policy
        .allow()
        .iter()
        .any(|rule| match_rule(rule, identity.as_str()))
    {
        warn!(identity = %identity, "tool not allow-listed");
        return Err(PolicyError::NotAllowed {
            identity: identity.clone(),
        });
    }

    let grants = policy.grants();
    if let Some(required) = implementation
        .required_capabilities()
        .iter()
        .find(|required| !check(required, grants.capabilities()))
    {
        warn!(identity = %identity, required = %required, "capability not granted");
        return Err(PolicyError::Capability {
            identity: identity.clone(),
            required: required.clone(),
            held: grants.capabilities().to_vec(),
        });
    }

    match grants.limiter().charge(identity) {
        LimitCheck::Exceeded { count, limit } => {
            warn!(identity = %identity, count, limit, "call limit exceeded");
            Err(PolicyError::LimitExceeded {
                identity: identity.clone(),
                count,
                limit,
            })
        }
        LimitCheck::Within { count, limit } => {
            debug!(identity = %identity, count, limit, "call authorized");
            Ok(())
        }
        LimitCheck::Unlimited => {
            debug!(identity = %identity, "call authorized");
            Ok(())
        }
    }
}
