//! Shared error definitions for host primitives.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used by the primitive types.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided context identifier could not be parsed.
    #[error("invalid context id: {source}")]
    InvalidContextId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Capability definition failed validation.
    #[error("invalid capability: {reason}")]
    InvalidCapability {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

/// Machine-readable category carried by every failure surfaced to the host.
///
/// The serialized name and [`ErrorKind::as_str`] are the same string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No policy or no usable sandbox root was configured.
    #[serde(rename = "configuration_error")]
    Configuration,
    /// Unknown tool identity.
    #[serde(rename = "not_found_error")]
    NotFound,
    /// Second registration under an existing identity.
    #[serde(rename = "duplicate_identity")]
    DuplicateIdentity,
    /// Tool requires a privileged context.
    #[serde(rename = "trust_error")]
    Trust,
    /// Denied, not allow-listed, or over its call limit.
    #[serde(rename = "policy_error")]
    Policy,
    /// Grants do not cover a required capability.
    #[serde(rename = "capability_error")]
    Capability,
    /// Arity or coercion failure.
    #[serde(rename = "argument_mismatch_error")]
    ArgumentMismatch,
    /// Path escapes the sandbox or is malformed.
    #[serde(rename = "path_violation_error")]
    PathViolation,
    /// Tool function failed or panicked.
    #[serde(rename = "execution_error")]
    Execution,
}

impl ErrorKind {
    /// Stable name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::NotFound => "not_found_error",
            Self::DuplicateIdentity => "duplicate_identity",
            Self::Trust => "trust_error",
            Self::Policy => "policy_error",
            Self::Capability => "capability_error",
            Self::ArgumentMismatch => "argument_mismatch_error",
            Self::PathViolation => "path_violation_error",
            Self::Execution => "execution_error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ErrorKind; 9] = [
        ErrorKind::Configuration,
        ErrorKind::NotFound,
        ErrorKind::DuplicateIdentity,
        ErrorKind::Trust,
        ErrorKind::Policy,
        ErrorKind::Capability,
        ErrorKind::ArgumentMismatch,
        ErrorKind::PathViolation,
        ErrorKind::Execution,
    ];

    #[test]
    fn serialized_name_matches_display() {
        for kind in ALL {
            let json = serde_json::to_value(kind).expect("serialize");
            assert_eq!(json, serde_json::Value::from(kind.as_str()));
            assert_eq!(kind.to_string(), kind.as_str());

            let back: ErrorKind = serde_json::from_value(json).expect("deserialize");
            assert_eq!(back, kind);
        }
    }
}
