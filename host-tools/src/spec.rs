//! Declarative tool and argument specifications.

use std::collections::HashSet;

use host_primitives::{ToolIdentity, TypeTag, Value};
use serde::Serialize;

use crate::args::coerce_value;
use crate::error::{ToolError, ToolResult};

/// Declared argument of a tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArgSpec {
    name: String,
    #[serde(rename = "type")]
    type_tag: TypeTag,
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl ArgSpec {
    /// Declares a required argument.
    #[must_use]
    pub fn required(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            required: true,
            default: None,
            description: None,
        }
    }

    /// Declares an optional argument.
    #[must_use]
    pub fn optional(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            required: false,
            ..Self::required(name, type_tag)
        }
    }

    /// Value used when the argument is omitted.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Argument name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Whether the caller must supply the argument.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Default used when omitted.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Signature and descriptive metadata of a tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    group: String,
    name: String,
    args: Vec<ArgSpec>,
    returns: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

impl ToolSpec {
    /// Creates a spec for `tool.<group>.<name>` returning [`TypeTag::Any`].
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            args: Vec::new(),
            returns: TypeTag::Any,
            description: None,
            tags: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, returns: TypeTag) -> Self {
        self.returns = returns;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a free-form tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Canonical identity derived from group and name.
    #[must_use]
    pub fn identity(&self) -> ToolIdentity {
        ToolIdentity::from_parts(&self.group, &self.name)
    }

    /// Tool group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Short tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arguments in call order.
    #[must_use]
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Number of required arguments.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.args.iter().filter(|arg| arg.is_required()).count()
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> TypeTag {
        self.returns
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Free-form tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Checks the spec can be registered.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSpec`] if the name or its canonical short
    /// form is empty, an argument name is empty or repeated, a required
    /// argument follows an optional one, or a default does not coerce to its
    /// argument's type.
    pub fn validate(&self) -> ToolResult<()> {
        let invalid = |reason: String| ToolError::InvalidSpec {
            identity: self.identity().to_string(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("tool name cannot be empty".into()));
        }
        if self.identity().short().is_empty() {
            return Err(invalid("tool name has no name after the `tool.` prefix".into()));
        }

        let mut seen = HashSet::new();
        let mut optional_seen = false;
        for arg in &self.args {
            if arg.name.trim().is_empty() {
                return Err(invalid("argument name cannot be empty".into()));
            }
            if !seen.insert(arg.name.as_str()) {
                return Err(invalid(format!("argument `{}` declared twice", arg.name)));
            }
            if arg.required && optional_seen {
                return Err(invalid(format!(
                    "required argument `{}` follows an optional one",
                    arg.name
                )));
            }
            optional_seen |= !arg.required;

            if let Some(default) = &arg.default {
                coerce_value(default.clone(), arg.type_tag).map_err(|err| {
                    invalid(format!("default for argument `{}`: {err}", arg.name))
                })?;
            }
        }

        Ok(())
    }
}
