//! Trust gate for embeddable scripting runtimes.
//!
//! Every host capability a script can reach is a registered tool. Calls pass
//! through identity resolution, an ordered policy decision, argument
//! coercion and, inside the tool, sandbox path confinement. The component
//! crates are re-exported behind feature flags; [`Host`] wires them together
//! from a [`config::HostConfig`].

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use host_primitives as primitives;

/// Tool registry, argument pipeline and sandbox (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use host_tools as tools;

/// Policy engine (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use host_policy as policy;

/// Invocation pipeline (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use host_kernel as kernel;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use host_config as config;

/// Logging bootstrap (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use host_telemetry as telemetry;

#[cfg(feature = "config")]
mod host;

#[cfg(feature = "config")]
pub use host::Host;
