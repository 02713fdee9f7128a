//! Errors produced by tool registration, argument coercion, and execution.

use std::fmt::{self, Display, Formatter};

use host_primitives::{Capability, ErrorKind, ToolIdentity, TypeTag, ValueKind};
use thiserror::Error;

use crate::sandbox::SandboxError;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool spec failed validation.
    #[error("invalid tool spec `{identity}`: {reason}")]
    InvalidSpec {
        /// Identity derived from the rejected spec.
        identity: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Identity collided with an existing registration.
    #[error("tool `{identity}` is already registered")]
    DuplicateIdentity {
        /// Canonical identity of the offending tool.
        identity: ToolIdentity,
    },

    /// Requested tool does not exist.
    #[error("tool `{identity}` is not registered")]
    NotFound {
        /// Canonical identity that was looked up.
        identity: ToolIdentity,
    },

    /// Wrong number of arguments.
    #[error("tool `{identity}` expects {} argument(s), got {got}", arity_range(.min, .max))]
    Arity {
        /// Tool being called.
        identity: ToolIdentity,
        /// Number of required arguments.
        min: usize,
        /// Total declared arguments, `None` for variadic tools.
        max: Option<usize>,
        /// Number of arguments supplied.
        got: usize,
    },

    /// One or more arguments could not be coerced to their declared type.
    #[error("tool `{identity}` argument mismatch: {}", join_failures(.failures))]
    ArgumentMismatch {
        /// Tool being called.
        identity: ToolIdentity,
        /// Every argument that failed coercion.
        failures: Vec<ArgumentFailure>,
    },

    /// Tool read an argument that was omitted.
    #[error("argument `{argument}` is required")]
    MissingArgument {
        /// Name of the missing argument.
        argument: String,
    },

    /// Path confinement failure.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// A call-time scope is not covered by the context's grants.
    #[error("tool `{identity}` is not granted {required}")]
    CapabilityDenied {
        /// Tool performing the check.
        identity: ToolIdentity,
        /// Concrete capability that was checked.
        required: Capability,
    },

    /// Nested tool invocation failed.
    #[error("nested call to `{identity}` failed: {reason}")]
    Nested {
        /// Identity of the nested tool.
        identity: ToolIdentity,
        /// Kind of the nested failure.
        kind: ErrorKind,
        /// Message of the nested failure.
        reason: String,
    },

    /// A registration module failed.
    #[error("registration module `{module}` failed: {source}")]
    Registration {
        /// Name the module was added under.
        module: String,
        /// Underlying registration error.
        source: Box<ToolError>,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Returns the host-facing error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSpec { .. } => ErrorKind::Configuration,
            Self::DuplicateIdentity { .. } => ErrorKind::DuplicateIdentity,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Arity { .. } | Self::ArgumentMismatch { .. } | Self::MissingArgument { .. } => {
                ErrorKind::ArgumentMismatch
            }
            Self::Sandbox(err) => err.kind(),
            Self::CapabilityDenied { .. } => ErrorKind::Capability,
            Self::Nested { kind, .. } => *kind,
            Self::Registration { source, .. } => source.kind(),
            Self::Execution { .. } => ErrorKind::Execution,
        }
    }
}

/// Why a single value failed coercion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoercionError {
    /// Declared type.
    pub expected: TypeTag,
    /// Kind actually supplied.
    pub actual: ValueKind,
    /// Failing element inside a collection, as `index N` or `key K`.
    pub element: Option<String>,
    /// Element-level reason when `element` is set.
    pub element_error: Option<Box<CoercionError>>,
}

impl CoercionError {
    pub(crate) fn new(expected: TypeTag, actual: ValueKind) -> Self {
        Self {
            expected,
            actual,
            element: None,
            element_error: None,
        }
    }

    pub(crate) fn in_element(
        expected: TypeTag,
        actual: ValueKind,
        element: String,
        cause: CoercionError,
    ) -> Self {
        Self {
            expected,
            actual,
            element: Some(element),
            element_error: Some(Box::new(cause)),
        }
    }
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.actual)?;
        if let (Some(element), Some(cause)) = (&self.element, &self.element_error) {
            write!(f, " ({element}: {cause})")?;
        }
        Ok(())
    }
}

/// Coercion failure attributed to a named argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentFailure {
    /// Declared argument name.
    pub argument: String,
    /// Zero-based position in the call.
    pub position: usize,
    /// Underlying coercion error.
    pub error: CoercionError,
}

impl Display for ArgumentFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "argument `{}` (#{}): {}",
            self.argument, self.position, self.error
        )
    }
}

fn arity_range(min: &usize, max: &Option<usize>) -> String {
    match *max {
        Some(max) if max == *min => min.to_string(),
        Some(max) => format!("{min}..={max}"),
        None => format!("at least {min}"),
    }
}

fn join_failures(failures: &[ArgumentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_message_covers_ranges() {
        let err = ToolError::Arity {
            identity: ToolIdentity::new("fs.read"),
            min: 1,
            max: Some(2),
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "tool `tool.fs.read` expects 1..=2 argument(s), got 3"
        );
        assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
    }

    #[test]
    fn nested_and_registration_errors_keep_inner_kind() {
        let nested = ToolError::Nested {
            identity: ToolIdentity::new("fs.delete"),
            kind: ErrorKind::Policy,
            reason: "denied".into(),
        };
        assert_eq!(nested.kind(), ErrorKind::Policy);

        let registration = ToolError::Registration {
            module: "fs".into(),
            source: Box::new(ToolError::DuplicateIdentity {
                identity: ToolIdentity::new("fs.read"),
            }),
        };
        assert_eq!(registration.kind(), ErrorKind::DuplicateIdentity);
    }
}
