//! Tracing bootstrap for hosts embedding the script runtime.
//!
//! Call [`init_tracing`] once at startup. `RUST_LOG`, when set, overrides the
//! configured filter.

#![warn(missing_docs, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info";

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit newline-delimited JSON instead of human-readable lines.
    pub json: bool,
    /// Include the event target (module path) in each line.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            json: false,
            with_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Builds the filter: `RUST_LOG` if set and valid, else the configured
    /// directives, else `info`.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global subscriber.
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one is left in place.
pub fn init_tracing(config: &TelemetryConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = if config.json {
        registry
            .with(fmt::layer().with_target(config.with_target).json())
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(config.with_target))
            .try_init()
    };

    match installed {
        Ok(()) => {
            debug!(
                filter = %config.filter,
                json = config.json,
                "tracing subscriber installed"
            );
            true
        }
        Err(err) => {
            debug!(error = %err, "tracing subscriber already installed");
            false
        }
    }
}
