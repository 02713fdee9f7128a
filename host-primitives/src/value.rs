//! Dynamically-typed script values and the type tags tools declare.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Value passed between scripts and host tools.
///
/// The set of kinds is closed; adding a variant forces every conversion in
/// the argument pipeline to be revisited.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value; an omitted optional argument.
    #[default]
    Nil,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Heterogeneous list.
    List(Vec<Value>),
    /// String-keyed map.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Nil => ValueKind::Nil,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// Returns `true` for [`Value::Nil`].
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the string slice when this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer when this is a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float when this is a [`Value::Float`].
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean when this is a [`Value::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the list when this is a [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map when this is a [`Value::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueKind {
    /// [`Value::Nil`].
    Nil,
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Int`].
    Int,
    /// [`Value::Float`].
    Float,
    /// [`Value::String`].
    String,
    /// [`Value::List`].
    List,
    /// [`Value::Map`].
    Map,
}

impl ValueKind {
    /// Lowercase name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type a tool declares for an argument or its return value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// Exact string.
    String,
    /// Integer; numeric strings and integral floats are accepted.
    Int,
    /// Float; integers and numeric strings are accepted.
    Float,
    /// Boolean; `1`/`0` and their string forms are accepted.
    Bool,
    /// List of strings.
    SliceString,
    /// List of integers.
    SliceInt,
    /// List of floats.
    SliceFloat,
    /// List of booleans.
    SliceBool,
    /// List of arbitrary values.
    SliceAny,
    /// Map with string values.
    MapString,
    /// Map with arbitrary values.
    MapAny,
    /// No coercion.
    Any,
}

impl TypeTag {
    /// Snake-case name used in error messages and checksums.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::SliceString => "slice_string",
            Self::SliceInt => "slice_int",
            Self::SliceFloat => "slice_float",
            Self::SliceBool => "slice_bool",
            Self::SliceAny => "slice_any",
            Self::MapString => "map_string",
            Self::MapAny => "map_any",
            Self::Any => "any",
        }
    }

    /// Element type of a collection tag, or `None` for scalars and [`TypeTag::Any`].
    #[must_use]
    pub const fn element(self) -> Option<TypeTag> {
        match self {
            Self::SliceString | Self::MapString => Some(Self::String),
            Self::SliceInt => Some(Self::Int),
            Self::SliceFloat => Some(Self::Float),
            Self::SliceBool => Some(Self::Bool),
            Self::SliceAny | Self::MapAny => Some(Self::Any),
            _ => None,
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_numbers_keep_integer_and_float_apart() {
        let value: Value = serde_json::from_str(r#"[42, 42.5, "x", null, true, {"k": 1}]"#)
            .expect("decode");
        let items = value.as_list().expect("list");
        assert_eq!(items[0], Value::Int(42));
        assert_eq!(items[1], Value::Float(42.5));
        assert_eq!(items[2].as_str(), Some("x"));
        assert!(items[3].is_nil());
        assert_eq!(items[4].as_bool(), Some(true));
        assert_eq!(items[5].kind(), ValueKind::Map);
    }

    #[test]
    fn option_converts_to_nil() {
        assert_eq!(Value::from(None::<i64>), Value::Nil);
        assert_eq!(Value::from(Some("a")), Value::String("a".into()));
    }

    #[test]
    fn collection_tags_expose_element_type() {
        assert_eq!(TypeTag::SliceString.element(), Some(TypeTag::String));
        assert_eq!(TypeTag::MapAny.element(), Some(TypeTag::Any));
        assert_eq!(TypeTag::Int.element(), None);
        assert_eq!(TypeTag::SliceBool.to_string(), "slice_bool");
    }
}
