//! Authorization of tool calls.
//!
//! [`can_call`] combines the trust level, allow/deny rules, capability grants
//! and call limits of an [`ExecPolicy`] into one ordered decision.

#![warn(missing_docs, clippy::pedantic)]

pub mod contracts;
pub mod engine;
pub mod limiter;
pub mod matcher;

pub use contracts::{ExecPolicy, ExecPolicyBuilder, GrantSet};
pub use engine::{PolicyError, PolicyResult, can_call};
pub use limiter::{CallLimiter, LimitCheck};
pub use matcher::{check, glob_match, match_rule};
