//! Configuration management for the script host.
//!
//! A JSON [`HostConfig`] document names the sandbox root, the execution
//! policy, the nesting limit and the logging setup. Policy and sandbox root are
//! trusted host data; scripts never supply them.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{SANDBOX_ROOT_ENV, apply_env_overrides, from_json_str, load_from_path};
pub use schema::{HostConfig, PolicyConfig};
