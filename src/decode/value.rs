use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::types::SqlValue;

/// Why a cell could not be converted; the decoder adds the column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl Mismatch {
    #[must_use]
    pub fn new(expected: &'static str, value: &SqlValue) -> Self {
        Self {
            expected,
            found: value.kind(),
        }
    }
}

/// Conversion from a cell value into a Rust value: the scan target of the decoder.
pub trait FromValue: Sized {
    /// # Errors
    /// Returns a `Mismatch` when the value has an incompatible kind or is out of range.
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch>;
}

macro_rules! impl_from_value_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
                    let wide = match value {
                        SqlValue::Int(i) => *i,
                        SqlValue::Bool(b) => i64::from(*b),
                        SqlValue::Text(s) => s
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| Mismatch::new(stringify!($t), value))?,
                        _ => return Err(Mismatch::new(stringify!($t), value)),
                    };
                    <$t>::try_from(wide).map_err(|_| Mismatch::new(stringify!($t), value))
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        match value {
            SqlValue::Float(f) => Ok(*f),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(i) => Ok(*i as f64),
            SqlValue::Text(s) => s.trim().parse().map_err(|_| Mismatch::new("f64", value)),
            _ => Err(Mismatch::new("f64", value)),
        }
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        f64::from_value(value)
            .map(|f| f as f32)
            .map_err(|_| Mismatch::new("f32", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        if let Some(b) = value.as_bool() {
            return Ok(*b);
        }
        match value.as_text().map(str::trim) {
            Some("true" | "TRUE" | "t" | "1") => Ok(true),
            Some("false" | "FALSE" | "f" | "0") => Ok(false),
            _ => Err(Mismatch::new("bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Blob(b) => {
                String::from_utf8(b.clone()).map_err(|_| Mismatch::new("String", value))
            }
            SqlValue::Int(i) => Ok(i.to_string()),
            SqlValue::Float(f) => Ok(f.to_string()),
            SqlValue::Bool(b) => Ok(b.to_string()),
            SqlValue::Timestamp(ts) => Ok(ts.format("%F %T%.f").to_string()),
            SqlValue::JSON(j) => Ok(j.to_string()),
            SqlValue::Null => Err(Mismatch::new("String", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        match value {
            SqlValue::Blob(b) => Ok(b.clone()),
            SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(Mismatch::new("Vec<u8>", value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        value
            .as_timestamp()
            .ok_or_else(|| Mismatch::new("NaiveDateTime", value))
    }
}

impl FromValue for JsonValue {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        match value {
            SqlValue::JSON(j) => Ok(j.clone()),
            SqlValue::Text(s) => serde_json::from_str(s).map_err(|_| Mismatch::new("json", value)),
            SqlValue::Null => Ok(JsonValue::Null),
            _ => Err(Mismatch::new("json", value)),
        }
    }
}

impl FromValue for SqlValue {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &SqlValue) -> Result<Self, Mismatch> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
