//! Trust level of the environment issuing a call.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Trust level of the calling environment.
///
/// Configuration and bootstrap code run `Privileged`; user scripts run
/// `Normal`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustContext {
    /// Host-controlled environment allowed to call trusted tools.
    Privileged,
    /// Script environment.
    #[default]
    Normal,
}

impl TrustContext {
    /// Returns `true` for [`TrustContext::Privileged`].
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Privileged)
    }
}

impl Display for TrustContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Privileged => f.write_str("privileged"),
            Self::Normal => f.write_str("normal"),
        }
    }
}
