use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::DbcError;
use crate::types::SqlValue;

/// Resolves `@name` references to values while a query is being rewritten.
///
/// Implementations must be read-only; a source is consulted once per occurrence.
pub trait NamedParams {
    fn get(&self, name: &str) -> Option<SqlValue>;
}

impl NamedParams for HashMap<String, SqlValue> {
    fn get(&self, name: &str) -> Option<SqlValue> {
        HashMap::get(self, name).cloned()
    }
}

impl NamedParams for BTreeMap<String, SqlValue> {
    fn get(&self, name: &str) -> Option<SqlValue> {
        BTreeMap::get(self, name).cloned()
    }
}

impl<P: NamedParams + ?Sized> NamedParams for &P {
    fn get(&self, name: &str) -> Option<SqlValue> {
        (**self).get(name)
    }
}

/// Named parameters taken from the fields of a serializable struct.
///
/// A field's tag is its serde name, so `#[serde(rename = "user_id")]` binds `@user_id` and
/// `#[serde(skip)]` leaves a field unbound. The name index is built once, here.
///
/// ```rust
/// use serde::Serialize;
/// use sql_dbc::prelude::*;
///
/// #[derive(Serialize)]
/// struct Filter {
///     #[serde(rename = "min_id")]
///     lower: i64,
/// }
///
/// let params = StructParams::new(&Filter { lower: 10 })?;
/// assert_eq!(params.get("min_id"), Some(SqlValue::Int(10)));
/// # Ok::<(), DbcError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StructParams {
    index: HashMap<String, SqlValue>,
}

impl StructParams {
    /// # Errors
    /// Returns `DbcError::Parameter` if `value` does not serialize to a struct or map, cannot be
    /// serialized at all, or holds an integer field above `i64::MAX`.
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Result<Self, DbcError> {
        let json = serde_json::to_value(value)
            .map_err(|e| DbcError::Parameter(format!("cannot serialize named parameters: {e}")))?;
        let JsonValue::Object(fields) = json else {
            return Err(DbcError::Parameter(format!(
                "Unsupported named parameters type: {}",
                std::any::type_name::<T>()
            )));
        };
        let index = fields
            .into_iter()
            .map(|(name, value)| json_to_sql_value(&name, value).map(|v| (name, v)))
            .collect::<Result<_, DbcError>>()?;
        Ok(Self { index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl NamedParams for StructParams {
    fn get(&self, name: &str) -> Option<SqlValue> {
        self.index.get(name).cloned()
    }
}

/// Unsigned integers that do not fit an `i64` are refused rather than rounded to a float.
fn json_to_sql_value(name: &str, value: JsonValue) -> Result<SqlValue, DbcError> {
    Ok(match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Bool(b),
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Int(i),
            (None, Some(f)) if n.is_f64() => SqlValue::Float(f),
            _ => {
                return Err(DbcError::Parameter(format!(
                    "named parameter {name}: {n} does not fit a 64-bit signed integer"
                )));
            }
        },
        JsonValue::String(s) => SqlValue::Text(s),
        other @ (JsonValue::Array(_) | JsonValue::Object(_)) => SqlValue::JSON(other),
    })
}
