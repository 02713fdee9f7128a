//! Invocation pipeline of the script host.
//!
//! An [`Executor`] takes `(identity, raw args)` from the interpreter, resolves
//! the tool in the [`ExecutionContext`]'s registry, authorizes it against the
//! context's policy, coerces the arguments and runs the tool function with a
//! runtime handle. Panics inside tools are contained here.

#![warn(missing_docs, clippy::pedantic)]

mod call;
mod context;
mod error;
mod observer;

pub use call::{DEFAULT_MAX_DEPTH, Executor};
pub use context::{ExecutionContext, ExecutionContextBuilder};
pub use error::{InvokeError, InvokeResult};
pub use observer::{CompositePolicyObserver, PolicyObserver, TracingPolicyObserver};
