//! Typed extraction capabilities.
//!
//! [`FromValue`] is a capability-dispatch contract: for each supported
//! target type there is one conversion from a [`Value`], selected
//! statically by the type the caller requests. Conversions fail with a
//! type-mismatch error naming the expected and actual type tags; the
//! path-based accessors on [`Table`](crate::Table) rewrite those errors to
//! carry the full dotted path.
//!
//! ## Examples
//!
//! ```rust
//! use envtoml::parse;
//!
//! let doc = parse("timeout = 30\nratio = 0.5").unwrap();
//! assert_eq!(doc.get_as::<i64>("timeout").unwrap(), 30);
//! // Floats widen from integers.
//! assert_eq!(doc.get_as::<f64>("timeout").unwrap(), 30.0);
//! assert_eq!(doc.get_as::<f64>("ratio").unwrap(), 0.5);
//! ```

use crate::error::ExtractError;
use crate::value::{Datetime, LocalDate, LocalDatetime, LocalTime};
use crate::{Table, Value};

/// A conversion from a document value to a concrete Rust type.
///
/// One implementation exists per supported target type; the compiler
/// resolves the capability from the type the caller asks for, never by
/// runtime inspection.
pub trait FromValue: Sized {
    /// The type tag used in `expected …` error messages.
    const EXPECTED: &'static str;

    /// Convert `value`, or fail with a type-conversion error carrying an
    /// empty path (the accessor fills the path in).
    fn from_value(value: &Value) -> Result<Self, ExtractError>;
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Integer(i) => Ok(*i),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Non-negative integer: rejects negative values with a type mismatch.
impl FromValue for u64 {
    const EXPECTED: &'static str = "non-negative integer";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Integer(i) if *i >= 0 => Ok(*i as u64),
            Value::Integer(_) => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                "negative integer",
            )),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Float, widened from an integer when necessary.
impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

impl FromValue for Datetime {
    const EXPECTED: &'static str = "datetime";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Datetime(dt) => Ok(*dt),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Accepts the matching variant, or narrows from a full offset datetime by
/// discarding the offset.
impl FromValue for LocalDatetime {
    const EXPECTED: &'static str = "local datetime";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::LocalDatetime(dt) => Ok(*dt),
            Value::Datetime(dt) => Ok(LocalDatetime {
                date: dt.date,
                time: dt.time,
            }),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Accepts the matching variant, or narrows from either fuller datetime
/// variant by discarding the time (and offset).
impl FromValue for LocalDate {
    const EXPECTED: &'static str = "local date";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::LocalDate(date) => Ok(*date),
            Value::LocalDatetime(dt) => Ok(dt.date),
            Value::Datetime(dt) => Ok(dt.date),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Accepts the matching variant, or narrows from either fuller datetime
/// variant by discarding the date (and offset).
impl FromValue for LocalTime {
    const EXPECTED: &'static str = "local time";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::LocalTime(time) => Ok(*time),
            Value::LocalDatetime(dt) => Ok(dt.time),
            Value::Datetime(dt) => Ok(dt.time),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Any conversion failure collapses to `None`; callers requesting an
/// optional treat "wrong type" and "missing" alike.
impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        Ok(T::from_value(value).ok())
    }
}

/// Converts every element, failing on the first element that does not
/// convert.
impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Array(elements) => elements.iter().map(T::from_value).collect(),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

impl FromValue for Table {
    const EXPECTED: &'static str = "table";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        match value {
            Value::Table(table) => Ok(table.clone()),
            other => Err(ExtractError::type_mismatch(
                Self::EXPECTED,
                other.type_name(),
            )),
        }
    }
}

/// Identity capability.
impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: &Value) -> Result<Self, ExtractError> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TimeOffset;

    fn date() -> LocalDate {
        LocalDate {
            year: 2024,
            month: 2,
            day: 29,
        }
    }

    fn time() -> LocalTime {
        LocalTime {
            hour: 12,
            minute: 0,
            second: 0,
            nanosecond: 0,
        }
    }

    #[test]
    fn integer_widens_to_float_but_not_back() {
        assert_eq!(f64::from_value(&Value::Integer(7)).unwrap(), 7.0);
        assert!(i64::from_value(&Value::Float(7.0)).is_err());
    }

    #[test]
    fn non_negative_integer_rejects_negative() {
        assert_eq!(u64::from_value(&Value::Integer(5)).unwrap(), 5);
        let err = u64::from_value(&Value::Integer(-5)).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn local_date_narrows_from_full_datetime() {
        let full = Value::Datetime(Datetime {
            date: date(),
            time: time(),
            offset: Some(TimeOffset { minutes: 60 }),
        });
        assert_eq!(LocalDate::from_value(&full).unwrap(), date());
        assert_eq!(LocalTime::from_value(&full).unwrap(), time());
        assert_eq!(
            LocalDatetime::from_value(&full).unwrap(),
            LocalDatetime {
                date: date(),
                time: time(),
            }
        );
        // No widening the other way.
        assert!(Datetime::from_value(&Value::LocalDate(date())).is_err());
    }

    #[test]
    fn option_collapses_any_failure_to_none() {
        assert_eq!(
            Option::<i64>::from_value(&Value::from("nope")).unwrap(),
            None
        );
        assert_eq!(Option::<i64>::from_value(&Value::Integer(1)).unwrap(), Some(1));
    }

    #[test]
    fn vec_fails_on_first_bad_element() {
        let mixed = Value::Array(vec![Value::Integer(1), Value::from("two")]);
        assert!(Vec::<i64>::from_value(&mixed).is_err());
        let good = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(Vec::<i64>::from_value(&good).unwrap(), vec![1, 2]);
    }

    #[test]
    fn value_capability_is_identity() {
        let value = Value::from("raw");
        assert_eq!(Value::from_value(&value).unwrap(), value);
    }
}
