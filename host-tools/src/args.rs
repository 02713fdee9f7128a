//! Argument pipeline: arity check, then per-argument coercion by type tag.

use std::collections::BTreeMap;

use host_primitives::{TypeTag, Value, ValueKind};
use tracing::debug;

use crate::error::{ArgumentFailure, CoercionError, ToolError, ToolResult};
use crate::registry::ToolImplementation;

/// Integers with a larger magnitude lose precision as `f64`.
const MAX_EXACT_FLOAT_INT: u64 = 1 << 53;
/// `i64::MIN` as an `f64`; exact because it is a power of two.
const I64_MIN_AS_F64: f64 = -9_223_372_036_854_775_808.0;

/// Coerced arguments handed to a tool function.
///
/// Declared arguments are addressed by name; trailing arguments accepted by a
/// variadic tool are available uncoerced through [`CallArgs::extra`]. An
/// argument that is [`Value::Nil`] reads as absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallArgs {
    names: Vec<String>,
    values: Vec<Value>,
    extra: Vec<Value>,
}

impl CallArgs {
    /// Builds arguments directly, bypassing coercion.
    #[must_use]
    pub fn from_named<I, S>(named: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (names, values) = named
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self {
            names,
            values,
            extra: Vec::new(),
        }
    }

    /// Value of a declared argument, `None` when omitted or nil.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.names.iter().position(|n| n == name)?;
        self.values.get(index).filter(|value| !value.is_nil())
    }

    /// Value of a declared argument, failing when omitted or nil.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingArgument`].
    pub fn require(&self, name: &str) -> ToolResult<&Value> {
        self.get(name).ok_or_else(|| ToolError::MissingArgument {
            argument: name.to_owned(),
        })
    }

    /// String argument.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// String argument, failing when omitted.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingArgument`].
    pub fn require_str(&self, name: &str) -> ToolResult<&str> {
        self.str(name).ok_or_else(|| ToolError::MissingArgument {
            argument: name.to_owned(),
        })
    }

    /// Integer argument.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// Float argument.
    #[must_use]
    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    /// Boolean argument.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// List argument.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    /// List of strings, for arguments declared [`TypeTag::SliceString`].
    #[must_use]
    pub fn strings(&self, name: &str) -> Option<Vec<&str>> {
        self.list(name)?.iter().map(Value::as_str).collect()
    }

    /// Map argument.
    #[must_use]
    pub fn map(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.get(name).and_then(Value::as_map)
    }

    /// Trailing arguments of a variadic call.
    #[must_use]
    pub fn extra(&self) -> &[Value] {
        &self.extra
    }

    /// Declared argument values in call order, followed by the extras.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        let mut values = self.values;
        values.extend(self.extra);
        values
    }
}

/// Checks arity and coerces `raw` against the implementation's argument specs.
///
/// Every failing argument is reported, not only the first.
///
/// # Errors
///
/// Returns [`ToolError::Arity`] or [`ToolError::ArgumentMismatch`].
pub fn coerce_args(implementation: &ToolImplementation, raw: Vec<Value>) -> ToolResult<CallArgs> {
    let spec = implementation.spec();
    let declared = spec.args();
    let min = spec.required_count();
    let max = (!implementation.is_variadic()).then_some(declared.len());

    if raw.len() < min || max.is_some_and(|max| raw.len() > max) {
        return Err(ToolError::Arity {
            identity: implementation.identity().clone(),
            min,
            max,
            got: raw.len(),
        });
    }

    let mut supplied = raw.into_iter();
    let mut names = Vec::with_capacity(declared.len());
    let mut values = Vec::with_capacity(declared.len());
    let mut failures = Vec::new();

    for (position, arg) in declared.iter().enumerate() {
        names.push(arg.name().to_owned());
        let value = match supplied.next() {
            Some(value) => value,
            None => arg.default_value().cloned().unwrap_or_default(),
        };
        match coerce_value(value, arg.type_tag()) {
            Ok(value) => values.push(value),
            Err(error) => {
                failures.push(ArgumentFailure {
                    argument: arg.name().to_owned(),
                    position,
                    error,
                });
                values.push(Value::Nil);
            }
        }
    }

    if !failures.is_empty() {
        debug!(
            identity = %implementation.identity(),
            failures = failures.len(),
            "argument coercion failed"
        );
        return Err(ToolError::ArgumentMismatch {
            identity: implementation.identity().clone(),
            failures,
        });
    }

    Ok(CallArgs {
        names,
        values,
        extra: supplied.collect(),
    })
}

/// Coerces one value to `tag`.
///
/// [`Value::Nil`] passes through unchanged for every tag.
///
/// # Errors
///
/// Returns [`CoercionError`] when the value cannot be converted losslessly.
pub fn coerce_value(value: Value, tag: TypeTag) -> Result<Value, CoercionError> {
    if value.is_nil() {
        return Ok(Value::Nil);
    }

    match tag {
        TypeTag::Any => Ok(value),
        TypeTag::String => match value {
            Value::String(_) => Ok(value),
            other => Err(CoercionError::new(tag, other.kind())),
        },
        TypeTag::Int => to_int(&value)
            .map(Value::Int)
            .ok_or_else(|| CoercionError::new(tag, value.kind())),
        TypeTag::Float => to_float(&value)
            .map(Value::Float)
            .ok_or_else(|| CoercionError::new(tag, value.kind())),
        TypeTag::Bool => to_bool(&value)
            .map(Value::Bool)
            .ok_or_else(|| CoercionError::new(tag, value.kind())),
        TypeTag::SliceString
        | TypeTag::SliceInt
        | TypeTag::SliceFloat
        | TypeTag::SliceBool
        | TypeTag::SliceAny => coerce_list(value, tag),
        TypeTag::MapString | TypeTag::MapAny => coerce_map(value, tag),
    }
}

fn coerce_list(value: Value, tag: TypeTag) -> Result<Value, CoercionError> {
    let items = match value {
        Value::List(items) => items,
        other => return Err(CoercionError::new(tag, other.kind())),
    };
    let element = tag.element().unwrap_or(TypeTag::Any);

    let mut coerced = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match coerce_element(item, element) {
            Ok(item) => coerced.push(item),
            Err(cause) => {
                return Err(CoercionError::in_element(
                    tag,
                    ValueKind::List,
                    format!("index {index}"),
                    cause,
                ));
            }
        }
    }
    Ok(Value::List(coerced))
}

fn coerce_map(value: Value, tag: TypeTag) -> Result<Value, CoercionError> {
    let entries = match value {
        Value::Map(entries) => entries,
        other => return Err(CoercionError::new(tag, other.kind())),
    };
    let element = tag.element().unwrap_or(TypeTag::Any);

    let mut coerced = BTreeMap::new();
    for (key, item) in entries {
        match coerce_element(item, element) {
            Ok(item) => {
                coerced.insert(key, item);
            }
            Err(cause) => {
                return Err(CoercionError::in_element(
                    tag,
                    ValueKind::Map,
                    format!("key `{key}`"),
                    cause,
                ));
            }
        }
    }
    Ok(Value::Map(coerced))
}

// Elements of typed collections must be present; only `Any` admits nil.
fn coerce_element(item: Value, element: TypeTag) -> Result<Value, CoercionError> {
    if item.is_nil() && element != TypeTag::Any {
        return Err(CoercionError::new(element, ValueKind::Nil));
    }
    coerce_value(item, element)
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => {
            // `-I64_MIN_AS_F64` is 2^63, one past `i64::MAX`.
            let integral = f.is_finite() && f.fract() == 0.0;
            (integral && *f >= I64_MIN_AS_F64 && *f < -I64_MIN_AS_F64).then(|| *f as i64)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| to_int(&Value::Float(trimmed.parse::<f64>().ok()?)))
        }
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => (i.unsigned_abs() <= MAX_EXACT_FLOAT_INT).then(|| *i as f64),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(1) => Some(true),
        Value::Int(0) => Some(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
