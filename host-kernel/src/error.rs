//! Errors surfaced to the host by the invocation pipeline.

use host_policy::PolicyError;
use host_primitives::{ErrorKind, ToolIdentity};
use host_tools::ToolError;
use thiserror::Error;

/// Result alias for invocations.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Every failure an invocation can surface.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Lookup, argument, sandbox or tool-reported failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Authorization failure.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The execution context has no sandbox root.
    #[error("no sandbox root configured for context")]
    MissingSandbox,

    /// Tool function panicked; the panic was contained.
    #[error("tool `{identity}` panicked: {message}")]
    Panic {
        /// Tool that panicked.
        identity: ToolIdentity,
        /// Panic payload rendered as text.
        message: String,
    },

    /// Nested invocations went deeper than allowed.
    #[error("call to `{identity}` exceeds the maximum nesting depth of {max}")]
    DepthExceeded {
        /// Tool whose call was refused.
        identity: ToolIdentity,
        /// Configured maximum depth.
        max: usize,
    },

    /// Blocking invocation task did not complete.
    #[error("blocking invocation failed: {reason}")]
    Join {
        /// Reason reported by the runtime.
        reason: String,
    },
}

impl InvokeError {
    /// Machine-readable category of the failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Tool(err) => err.kind(),
            Self::Policy(err) => err.kind(),
            Self::MissingSandbox => ErrorKind::Configuration,
            Self::Panic { .. } | Self::DepthExceeded { .. } | Self::Join { .. } => {
                ErrorKind::Execution
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_wrapped_error() {
        let not_found = InvokeError::from(ToolError::NotFound {
            identity: ToolIdentity::new("x"),
        });
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.to_string(), "tool `tool.x` is not registered");

        assert_eq!(
            InvokeError::from(PolicyError::Missing).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(InvokeError::MissingSandbox.kind(), ErrorKind::Configuration);

        let panic = InvokeError::Panic {
            identity: ToolIdentity::new("x"),
            message: "boom".into(),
        };
        assert_eq!(panic.kind(), ErrorKind::Execution);
        assert_eq!(panic.to_string(), "tool `tool.x` panicked: boom");
    }
}
