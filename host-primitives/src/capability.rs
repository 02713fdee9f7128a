//! Capability descriptors shared by tool requirements and policy grants.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_RESOURCE_LEN: usize = 64;
const MAX_VERB_LEN: usize = 32;
const MAX_SCOPE_LEN: usize = 4096;

/// Resource name of the synthetic capability describing tool execution.
pub const EXECUTE_RESOURCE: &str = "tool";
/// Verb of the synthetic capability describing tool execution.
pub const EXECUTE_VERB: &str = "execute";
/// Scope pattern covering every scope.
pub const ANY_SCOPE: &str = "*";

/// A `(resource, verbs, scopes)` triple.
///
/// The same shape is used for what a tool requires and for what a policy
/// grants. Scopes are glob patterns on the grant side and concrete values on
/// the requirement side.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCapability")]
pub struct Capability {
    resource: String,
    verbs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    scopes: BTreeSet<String>,
}

impl Capability {
    /// Starts building a capability for the supplied resource.
    #[must_use]
    pub fn builder(resource: impl Into<String>) -> CapabilityBuilder {
        CapabilityBuilder {
            resource: resource.into(),
            verbs: BTreeSet::new(),
            scopes: BTreeSet::new(),
        }
    }

    /// Synthetic capability describing "execute `identity`".
    #[must_use]
    pub fn execute(identity: &str) -> Self {
        Self {
            resource: EXECUTE_RESOURCE.to_owned(),
            verbs: BTreeSet::from([EXECUTE_VERB.to_owned()]),
            scopes: BTreeSet::from([identity.to_owned()]),
        }
    }

    /// Resource the capability applies to.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Verbs covered by the capability.
    #[must_use]
    pub fn verbs(&self) -> &BTreeSet<String> {
        &self.verbs
    }

    /// Scopes (or scope patterns) covered by the capability.
    #[must_use]
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let verbs: Vec<&str> = self.verbs.iter().map(String::as_str).collect();
        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        write!(
            f,
            "{{{}, [{}], [{}]}}",
            self.resource,
            verbs.join(","),
            scopes.join(",")
        )
    }
}

/// Builder for [`Capability`].
#[derive(Debug)]
pub struct CapabilityBuilder {
    resource: String,
    verbs: BTreeSet<String>,
    scopes: BTreeSet<String>,
}

impl CapabilityBuilder {
    /// Adds a verb.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapability`] if the verb is empty or too long.
    pub fn verb(mut self, verb: impl Into<String>) -> Result<Self> {
        let verb = verb.into();
        validate_verb(&verb)?;
        self.verbs.insert(verb);
        Ok(self)
    }

    /// Adds several verbs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapability`] on the first invalid verb.
    pub fn verbs<I, S>(self, verbs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        verbs.into_iter().try_fold(self, CapabilityBuilder::verb)
    }

    /// Adds a scope entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapability`] if the scope is empty, too long, or
    /// contains a NUL byte.
    pub fn scope(mut self, scope: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        validate_scope(&scope)?;
        self.scopes.insert(scope);
        Ok(self)
    }

    /// Adds several scopes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapability`] on the first invalid scope.
    pub fn scopes<I, S>(self, scopes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        scopes.into_iter().try_fold(self, CapabilityBuilder::scope)
    }

    /// Finalises the capability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapability`] if the resource is invalid or no
    /// verb was registered.
    pub fn build(self) -> Result<Capability> {
        validate_resource(&self.resource)?;
        if self.verbs.is_empty() {
            return Err(Error::InvalidCapability {
                reason: format!("capability `{}` needs at least one verb", self.resource),
            });
        }

        Ok(Capability {
            resource: self.resource,
            verbs: self.verbs,
            scopes: self.scopes,
        })
    }
}

#[derive(Deserialize)]
struct RawCapability {
    resource: String,
    verbs: Vec<String>,
    #[serde(default)]
    scopes: Vec<String>,
}

impl TryFrom<RawCapability> for Capability {
    type Error = Error;

    fn try_from(raw: RawCapability) -> Result<Self> {
        Capability::builder(raw.resource)
            .verbs(raw.verbs)?
            .scopes(raw.scopes)?
            .build()
    }
}

fn validate_resource(resource: &str) -> Result<()> {
    if resource.trim().is_empty() {
        return Err(Error::InvalidCapability {
            reason: "resource cannot be empty".into(),
        });
    }
    if resource.len() > MAX_RESOURCE_LEN {
        return Err(Error::InvalidCapability {
            reason: format!("resource length must be <= {MAX_RESOURCE_LEN}"),
        });
    }
    Ok(())
}

fn validate_verb(verb: &str) -> Result<()> {
    if verb.trim().is_empty() {
        return Err(Error::InvalidCapability {
            reason: "verb cannot be empty".into(),
        });
    }
    if verb.len() > MAX_VERB_LEN {
        return Err(Error::InvalidCapability {
            reason: format!("verb length must be <= {MAX_VERB_LEN}"),
        });
    }
    Ok(())
}

fn validate_scope(scope: &str) -> Result<()> {
    if scope.is_empty() {
        return Err(Error::InvalidCapability {
            reason: "scope cannot be empty".into(),
        });
    }
    if scope.contains('\0') {
        return Err(Error::InvalidCapability {
            reason: "scope cannot contain NUL bytes".into(),
        });
    }
    if scope.len() > MAX_SCOPE_LEN {
        return Err(Error::InvalidCapability {
            reason: format!("scope length must be <= {MAX_SCOPE_LEN}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_capability_success() {
        let capability = Capability::builder("fs")
            .verbs(["read", "write"])
            .and_then(|b| b.scope("/data/*"))
            .and_then(CapabilityBuilder::build)
            .expect("build");

        assert_eq!(capability.resource(), "fs");
        assert_eq!(capability.verbs().len(), 2);
        assert!(capability.scopes().contains("/data/*"));
        assert_eq!(capability.to_string(), "{fs, [read,write], [/data/*]}");
    }

    #[test]
    fn capability_requires_verb() {
        let err = Capability::builder("fs")
            .scope("*")
            .and_then(CapabilityBuilder::build)
            .expect_err("should fail");

        assert!(matches!(err, Error::InvalidCapability { .. }));
    }

    #[test]
    fn rejects_empty_resource_and_nul_scope() {
        assert!(Capability::builder(" ").verb("read").and_then(CapabilityBuilder::build).is_err());
        assert!(Capability::builder("fs").scope("a\0b").is_err());
    }

    #[test]
    fn execute_capability_names_identity() {
        let capability = Capability::execute("tool.fs.read");
        assert_eq!(capability.resource(), EXECUTE_RESOURCE);
        assert!(capability.verbs().contains(EXECUTE_VERB));
        assert!(capability.scopes().contains("tool.fs.read"));
    }

    #[test]
    fn deserialisation_validates() {
        let capability: Capability =
            serde_json::from_str(r#"{"resource":"fs","verbs":["write"],"scopes":["*"]}"#)
                .expect("decode");
        assert!(capability.scopes().contains(ANY_SCOPE));

        let err = serde_json::from_str::<Capability>(r#"{"resource":"fs","verbs":[]}"#);
        assert!(err.is_err());
    }
}
