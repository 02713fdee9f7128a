//! Canonical tool identities.
//!
//! Every lookup, policy rule, and call-limit key goes through
//! [`canonical_identity`], so `FS.Read`, `tool.fs.read`, and
//! `tool.tool.fs.read` all name the same tool.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};

/// Prefix carried by every canonical identity.
pub const TOOL_PREFIX: &str = "tool.";

/// Normalises a tool identifier to its canonical `tool.<group>.<name>` form.
///
/// The input is lowercased, every leading `tool.` is stripped, and exactly one
/// prefix is put back. The function is idempotent and never fails; an empty
/// input yields `"tool."`.
#[must_use]
pub fn canonical_identity(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut rest = lowered.as_str();
    while let Some(stripped) = rest.strip_prefix(TOOL_PREFIX) {
        rest = stripped;
    }
    format!("{TOOL_PREFIX}{rest}")
}

/// Canonical identity of a registered tool.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct ToolIdentity(String);

impl ToolIdentity {
    /// Canonicalises the supplied identifier.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(canonical_identity(raw.as_ref()))
    }

    /// Builds an identity from a group and a short name.
    ///
    /// An empty group yields the canonical form of `name` alone.
    #[must_use]
    pub fn from_parts(group: &str, name: &str) -> Self {
        if group.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{group}.{name}"))
        }
    }

    /// Returns the canonical identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identity without its `tool.` prefix.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[TOOL_PREFIX.len()..]
    }
}

impl Display for ToolIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ToolIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ToolIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ToolIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ToolIdentity {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<ToolIdentity> for String {
    fn from(value: ToolIdentity) -> Self {
        value.0
    }
}

// Deserialisation canonicalises so that config files cannot smuggle in a
// non-canonical key.
impl<'de> Deserialize<'de> for ToolIdentity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_repeated_prefixes() {
        assert_eq!(canonical_identity("tool.tool.fs.read"), "tool.fs.read");
        assert_eq!(canonical_identity("fs.read"), "tool.fs.read");
        assert_eq!(canonical_identity("TOOL.Fs.READ"), "tool.fs.read");
    }

    #[test]
    fn empty_input_yields_bare_prefix() {
        assert_eq!(canonical_identity(""), "tool.");
        assert_eq!(canonical_identity("tool."), "tool.");
    }

    #[test]
    fn canonicalisation_is_idempotent() {
        for raw in ["", "x", "tool.", "Tool.tool.git.Log", "fs.read", "tool.toolbox.run"] {
            let once = canonical_identity(raw);
            assert_eq!(canonical_identity(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn prefix_must_include_the_dot() {
        assert_eq!(canonical_identity("toolbox.run"), "tool.toolbox.run");
    }

    #[test]
    fn from_parts_joins_group_and_name() {
        assert_eq!(ToolIdentity::from_parts("fs", "read").as_str(), "tool.fs.read");
        assert_eq!(ToolIdentity::from_parts("", "fs.read").as_str(), "tool.fs.read");
        assert_eq!(ToolIdentity::from_parts("Tool.FS", "Read").short(), "fs.read");
    }

    #[test]
    fn deserialising_canonicalises() {
        let identity: ToolIdentity = serde_json::from_str("\"Tool.Git.Log\"").expect("decode");
        assert_eq!(identity.as_str(), "tool.git.log");
    }
}
